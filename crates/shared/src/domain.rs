use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id_newtype!(FrameId);

impl FrameId {
    /// Frame keys are the stringified time-step index.
    pub fn from_index(index: usize) -> Self {
        Self(index.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayMode {
    #[serde(rename = "3d")]
    Surface3D,
    #[serde(rename = "2d")]
    Animated2D,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Surface3D => f.write_str("3d"),
            DisplayMode::Animated2D => f.write_str("2d"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "3d" | "surface" | "surface3d" => Ok(DisplayMode::Surface3D),
            "2d" | "animated" | "animated2d" | "animation" => Ok(DisplayMode::Animated2D),
            other => Err(format!(
                "unknown display mode '{other}', expected one of: 3d, 2d"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Fixed value at the boundary.
    Dirichlet,
    /// Fixed flux through the boundary.
    Neumann,
    Robin,
}

impl FromStr for BoundaryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dirichlet" | "fixed" => Ok(BoundaryKind::Dirichlet),
            "neumann" | "flux" => Ok(BoundaryKind::Neumann),
            "robin" => Ok(BoundaryKind::Robin),
            other => Err(format!(
                "unknown boundary kind '{other}', expected one of: dirichlet, neumann, robin"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    #[default]
    Explicit,
    Implicit,
    CrankNicolson,
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explicit" => Ok(Scheme::Explicit),
            "implicit" => Ok(Scheme::Implicit),
            "crank-nicolson" | "crank_nicolson" | "cn" => Ok(Scheme::CrankNicolson),
            other => Err(format!(
                "unknown scheme '{other}', expected one of: explicit, implicit, crank-nicolson"
            )),
        }
    }
}

/// Temperature field returned by the solver, one row per time step and one
/// column per spatial point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolutionGrid(Vec<Vec<f64>>);

impl SolutionGrid {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self(rows)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.0
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.0.get(index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.0.len()
    }

    pub fn cell_count(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    /// True when the grid holds no values at all, including `[[], []]`.
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().flat_map(|row| row.iter().copied())
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.0
    }
}

impl From<Vec<Vec<f64>>> for SolutionGrid {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        Self(rows)
    }
}

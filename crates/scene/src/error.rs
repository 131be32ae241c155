use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    Spatial,
    Temporal,
}

impl fmt::Display for GridAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridAxis::Spatial => f.write_str("spatial"),
            GridAxis::Temporal => f.write_str("temporal"),
        }
    }
}

/// Which part of the grid disagreed with the declared axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeDimension {
    Rows,
    Row(usize),
}

impl fmt::Display for ShapeDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeDimension::Rows => f.write_str("grid row count"),
            ShapeDimension::Row(index) => write!(f, "row {index} length"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("invalid grid: {axis} axis needs at least {minimum} steps, got {steps}")]
    InvalidGrid {
        axis: GridAxis,
        steps: usize,
        minimum: usize,
    },
    #[error("shape mismatch: {dimension} is {actual}, expected {expected}")]
    ShapeMismatch {
        dimension: ShapeDimension,
        expected: usize,
        actual: usize,
    },
    #[error("solution grid is empty")]
    EmptyGrid,
}

use serde::{Deserialize, Serialize};

use crate::{
    domain::{BoundaryKind, Scheme, SolutionGrid},
    error::ParameterError,
};

pub const SOLVE_HEAT_EQUATION_PATH: &str = "/solve/heat-equation/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCondition {
    #[serde(rename = "type")]
    pub kind: BoundaryKind,
    pub value: String,
}

impl BoundaryCondition {
    pub fn new(kind: BoundaryKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConditions {
    pub left: BoundaryCondition,
    pub right: BoundaryCondition,
}

/// Solver configuration as sent to the solve endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveParameters {
    /// Thermal diffusivity.
    pub alpha: f64,
    /// Domain length.
    pub length: f64,
    /// Number of spatial points.
    pub nx: usize,
    /// Number of time steps.
    pub nt: usize,
    pub dt: f64,
    pub initial_condition: String,
    pub boundary_conditions: BoundaryConditions,
    pub source_term: String,
    pub scheme: Scheme,
}

impl Default for SolveParameters {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            length: 1.0,
            nx: 50,
            nt: 100,
            dt: 0.01,
            initial_condition: "sin(pi * x)".into(),
            boundary_conditions: BoundaryConditions {
                left: BoundaryCondition::new(BoundaryKind::Dirichlet, "0"),
                right: BoundaryCondition::new(BoundaryKind::Dirichlet, "0"),
            },
            source_term: "0".into(),
            scheme: Scheme::Explicit,
        }
    }
}

impl SolveParameters {
    /// Checks the scalar fields the solver cannot work without. Grid sizes
    /// are checked where the axes are derived.
    pub fn validate(&self) -> Result<(), ParameterError> {
        ensure_positive("alpha", self.alpha)?;
        ensure_positive("length", self.length)?;
        ensure_positive("dt", self.dt)?;
        ensure_expression("initial_condition", &self.initial_condition)?;
        ensure_expression(
            "boundary_conditions.left.value",
            &self.boundary_conditions.left.value,
        )?;
        ensure_expression(
            "boundary_conditions.right.value",
            &self.boundary_conditions.right.value,
        )?;
        Ok(())
    }
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::NotPositive { field, value })
    }
}

fn ensure_expression(field: &'static str, value: &str) -> Result<(), ParameterError> {
    if value.trim().is_empty() {
        Err(ParameterError::EmptyExpression { field })
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    pub solution: SolutionGrid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

use shared::protocol::SolveParameters;

use crate::error::{GridAxis, SceneError};

/// Coordinate sequences for one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSet {
    pub spatial: Vec<f64>,
    pub temporal: Vec<f64>,
}

impl AxisSet {
    pub fn from_parameters(params: &SolveParameters) -> Result<Self, SceneError> {
        build_axes(params.nx, params.length, params.nt, params.dt)
    }
}

/// Derives the spatial axis `i * length / (n - 1)` and the temporal axis
/// `i * dt`.
///
/// The last spatial point is pinned to `domain_length` so the right boundary
/// is exact regardless of rounding in the division.
pub fn build_axes(
    spatial_steps: usize,
    domain_length: f64,
    time_steps: usize,
    time_step: f64,
) -> Result<AxisSet, SceneError> {
    if spatial_steps < 2 {
        return Err(SceneError::InvalidGrid {
            axis: GridAxis::Spatial,
            steps: spatial_steps,
            minimum: 2,
        });
    }
    if time_steps < 1 {
        return Err(SceneError::InvalidGrid {
            axis: GridAxis::Temporal,
            steps: time_steps,
            minimum: 1,
        });
    }

    let last = spatial_steps - 1;
    let divisions = last as f64;
    let spatial = (0..spatial_steps)
        .map(|i| {
            if i == last {
                domain_length
            } else {
                i as f64 * domain_length / divisions
            }
        })
        .collect();
    let temporal = (0..time_steps).map(|i| i as f64 * time_step).collect();

    Ok(AxisSet { spatial, temporal })
}

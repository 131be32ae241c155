use std::sync::Arc;

use shared::domain::{DisplayMode, FrameId, SolutionGrid};
use tracing::debug;

use crate::{
    axes::AxisSet,
    error::{SceneError, ShapeDimension},
};

pub const TIME_TITLE: &str = "Time";
pub const POSITION_TITLE: &str = "Position";
pub const TEMPERATURE_TITLE: &str = "Temperature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisTitles {
    pub x: &'static str,
    pub y: &'static str,
    pub z: Option<&'static str>,
}

/// Static surface: x is time, y is position, z is the grid as received.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceScene {
    z: Vec<Vec<f64>>,
    x_axis: Vec<f64>,
    y_axis: Vec<f64>,
    titles: AxisTitles,
}

impl SurfaceScene {
    pub fn z(&self) -> &[Vec<f64>] {
        &self.z
    }

    pub fn x_axis(&self) -> &[f64] {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &[f64] {
        &self.y_axis
    }

    pub fn titles(&self) -> AxisTitles {
        self.titles
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitialFrame {
    pub x: Arc<[f64]>,
    pub y: Vec<f64>,
}

/// One time step's line. `x` is shared by every frame of a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub x: Arc<[f64]>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliderStep {
    pub label: String,
    pub target: FrameId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn as_array(&self) -> [f64; 2] {
        [self.min, self.max]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedScene {
    initial_frame: InitialFrame,
    frames: Vec<Frame>,
    slider_steps: Vec<SliderStep>,
    value_range: ValueRange,
    titles: AxisTitles,
}

impl AnimatedScene {
    pub fn initial_frame(&self) -> &InitialFrame {
        &self.initial_frame
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn slider_steps(&self) -> &[SliderStep] {
        &self.slider_steps
    }

    pub fn value_range(&self) -> ValueRange {
        self.value_range
    }

    pub fn titles(&self) -> AxisTitles {
        self.titles
    }

    pub fn frame(&self, id: &FrameId) -> Option<&Frame> {
        self.frames.iter().find(|frame| &frame.id == id)
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = &FrameId> + '_ {
        self.frames.iter().map(|frame| &frame.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scene {
    Surface3D(SurfaceScene),
    Animated2D(AnimatedScene),
}

impl Scene {
    pub fn mode(&self) -> DisplayMode {
        match self {
            Scene::Surface3D(_) => DisplayMode::Surface3D,
            Scene::Animated2D(_) => DisplayMode::Animated2D,
        }
    }
}

/// Builds the complete scene for `mode` or fails without producing anything.
pub fn build_scene(
    grid: &SolutionGrid,
    axes: &AxisSet,
    mode: DisplayMode,
) -> Result<Scene, SceneError> {
    if grid.is_empty() {
        return Err(SceneError::EmptyGrid);
    }
    check_shape(grid, axes)?;

    let scene = match mode {
        DisplayMode::Surface3D => Scene::Surface3D(surface(grid, axes)),
        DisplayMode::Animated2D => Scene::Animated2D(animated(grid, axes)?),
    };
    debug!(
        mode = %mode,
        rows = grid.row_count(),
        columns = axes.spatial.len(),
        "scene built"
    );
    Ok(scene)
}

/// Global `[min, max]` over every cell of the grid.
pub fn value_range(grid: &SolutionGrid) -> Result<ValueRange, SceneError> {
    let mut values = grid.values();
    let first = values.next().ok_or(SceneError::EmptyGrid)?;
    let (min, max) = values.fold((first, first), |(min, max), value| {
        (min.min(value), max.max(value))
    });
    Ok(ValueRange { min, max })
}

fn check_shape(grid: &SolutionGrid, axes: &AxisSet) -> Result<(), SceneError> {
    if grid.row_count() != axes.temporal.len() {
        return Err(SceneError::ShapeMismatch {
            dimension: ShapeDimension::Rows,
            expected: axes.temporal.len(),
            actual: grid.row_count(),
        });
    }
    for (index, row) in grid.rows().iter().enumerate() {
        if row.len() != axes.spatial.len() {
            return Err(SceneError::ShapeMismatch {
                dimension: ShapeDimension::Row(index),
                expected: axes.spatial.len(),
                actual: row.len(),
            });
        }
    }
    Ok(())
}

fn surface(grid: &SolutionGrid, axes: &AxisSet) -> SurfaceScene {
    SurfaceScene {
        z: grid.rows().to_vec(),
        x_axis: axes.temporal.clone(),
        y_axis: axes.spatial.clone(),
        titles: AxisTitles {
            x: TIME_TITLE,
            y: POSITION_TITLE,
            z: Some(TEMPERATURE_TITLE),
        },
    }
}

fn animated(grid: &SolutionGrid, axes: &AxisSet) -> Result<AnimatedScene, SceneError> {
    let value_range = value_range(grid)?;
    let x: Arc<[f64]> = Arc::from(axes.spatial.as_slice());

    let frames: Vec<Frame> = grid
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| Frame {
            id: FrameId::from_index(index),
            x: Arc::clone(&x),
            y: row.clone(),
        })
        .collect();

    // Steps are derived from the frames so label i always targets frame i.
    let slider_steps = frames
        .iter()
        .zip(&axes.temporal)
        .map(|(frame, time)| SliderStep {
            label: format!("t={}", two_decimals(*time)),
            target: frame.id.clone(),
        })
        .collect();

    let initial_frame = InitialFrame {
        x,
        y: frames[0].y.clone(),
    };

    Ok(AnimatedScene {
        initial_frame,
        frames,
        slider_steps,
        value_range,
        titles: AxisTitles {
            x: POSITION_TITLE,
            y: TEMPERATURE_TITLE,
            z: None,
        },
    })
}

/// Two-decimal label text where exact half-cent ties round away from zero.
///
/// `{:.2}` rounds exact ties to even. The only f64 values sitting exactly on
/// a half-cent are odd multiples of 1/8, so those are nudged past the tie.
pub(crate) fn two_decimals(value: f64) -> String {
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths.abs() % 2.0 == 1.0 {
        let nudged = value + value.signum() * 0.001;
        return format!("{nudged:.2}");
    }
    format!("{value:.2}")
}

#[cfg(test)]
#[path = "tests/builder_tests.rs"]
mod tests;

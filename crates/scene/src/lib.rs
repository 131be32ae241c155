//! Turns a solver grid into renderer-agnostic scene descriptions.
//!
//! Everything here is pure and synchronous: axes are derived from the solve
//! parameters, the grid is shape-checked against them, and one of the two
//! scene variants is assembled in full before anything is handed to a
//! renderer.

mod axes;
mod builder;
mod error;

pub use axes::{build_axes, AxisSet};
pub use builder::{
    build_scene, value_range, AnimatedScene, AxisTitles, Frame, InitialFrame, Scene,
    SliderStep, SurfaceScene, ValueRange, POSITION_TITLE, TEMPERATURE_TITLE, TIME_TITLE,
};
pub use error::{GridAxis, SceneError, ShapeDimension};

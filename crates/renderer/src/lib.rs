use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use shared::domain::FrameId;
use thiserror::Error;

mod figure;
mod html;

pub use figure::{animation_figure, figure_for, surface_figure, AnimationSettings, Figure};
pub use html::HtmlRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatterMode {
    Lines,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trace {
    Surface {
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<Vec<f64>>,
    },
    Scatter {
        x: Arc<[f64]>,
        y: Vec<f64>,
        mode: ScatterMode,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLayout {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
}

impl AxisLayout {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            range: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneAxes {
    pub xaxis: AxisLayout,
    pub yaxis: AxisLayout,
    pub zaxis: AxisLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameTiming {
    pub duration: u64,
    pub redraw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub duration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnimationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnimationMode>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fromcurrent: bool,
    pub frame: FrameTiming,
    pub transition: Transition,
}

/// What the renderer should animate: every registered frame from the
/// current one, or a jump to a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackRequest(pub Option<Vec<FrameId>>, pub AnimationOptions);

impl PlaybackRequest {
    pub fn play_all(frame_duration_ms: u64) -> Self {
        Self(
            None,
            AnimationOptions {
                mode: None,
                fromcurrent: true,
                frame: FrameTiming {
                    duration: frame_duration_ms,
                    redraw: true,
                },
                transition: Transition { duration: 0 },
            },
        )
    }

    pub fn jump_to(frame_id: FrameId) -> Self {
        Self(
            Some(vec![frame_id]),
            AnimationOptions {
                mode: Some(AnimationMode::Immediate),
                fromcurrent: false,
                frame: FrameTiming {
                    duration: 0,
                    redraw: true,
                },
                transition: Transition { duration: 0 },
            },
        )
    }

    pub fn frames(&self) -> Option<&[FrameId]> {
        self.0.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuButton {
    pub label: String,
    pub method: String,
    pub args: PlaybackRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateMenu {
    #[serde(rename = "type")]
    pub kind: String,
    pub showactive: bool,
    pub x: f64,
    pub y: f64,
    pub direction: String,
    pub buttons: Vec<MenuButton>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliderStepSpec {
    pub label: String,
    pub method: String,
    pub args: PlaybackRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Padding {
    pub t: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub size: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentValue {
    pub visible: bool,
    pub prefix: String,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slider {
    pub active: usize,
    pub pad: Padding,
    pub steps: Vec<SliderStepSpec>,
    pub currentvalue: CurrentValue,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Layout {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autosize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<SceneAxes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<AxisLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<AxisLayout>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updatemenus: Vec<UpdateMenu>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sliders: Vec<Slider>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RenderConfig {
    pub responsive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSpec {
    pub name: FrameId,
    pub data: Vec<Trace>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOperation {
    Initialize,
    RegisterFrames,
    Play,
}

impl fmt::Display for RenderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderOperation::Initialize => f.write_str("initialize"),
            RenderOperation::RegisterFrames => f.write_str("register frames"),
            RenderOperation::Play => f.write_str("play"),
        }
    }
}

#[derive(Debug, Error)]
#[error("renderer failed to {operation} on '{target}': {message}")]
pub struct RenderError {
    pub operation: RenderOperation,
    pub target: String,
    pub message: String,
}

impl RenderError {
    pub fn new(
        operation: RenderOperation,
        target: impl Into<String>,
        err: &anyhow::Error,
    ) -> Self {
        Self {
            operation,
            target: target.into(),
            message: format!("{err:#}"),
        }
    }
}

/// Charting engine driven by scene descriptions.
///
/// `initialize` resolves only once the first frame is committed; callers
/// rely on that as the completion signal before registering frames.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn initialize(
        &self,
        target: &str,
        traces: &[Trace],
        layout: &Layout,
        config: &RenderConfig,
    ) -> anyhow::Result<()>;
    async fn register_frames(&self, target: &str, frames: &[FrameSpec]) -> anyhow::Result<()>;
    async fn play(&self, target: &str, request: &PlaybackRequest) -> anyhow::Result<()>;
}

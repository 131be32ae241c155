use std::sync::Arc;

use scene::{AnimatedScene, Scene, SurfaceScene};
use serde::Serialize;

use crate::{
    AxisLayout, CurrentValue, Font, FrameSpec, Layout, MenuButton, Padding, PlaybackRequest,
    RenderConfig, SceneAxes, ScatterMode, Slider, SliderStepSpec, Trace, UpdateMenu,
};

pub const SURFACE_TITLE: &str = "Heat Equation Solution (3D)";
pub const ANIMATION_TITLE: &str = "Heat Equation Animation";
const DEFAULT_FRAME_DURATION_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSettings {
    /// Delay between frames while the Play button runs.
    pub frame_duration_ms: u64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
        }
    }
}

/// Everything one plot needs: what to draw first and what to register after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub traces: Vec<Trace>,
    pub layout: Layout,
    pub config: RenderConfig,
    pub frames: Vec<FrameSpec>,
}

pub fn figure_for(scene: &Scene, settings: &AnimationSettings) -> Figure {
    match scene {
        Scene::Surface3D(surface) => surface_figure(surface),
        Scene::Animated2D(animated) => animation_figure(animated, settings),
    }
}

pub fn surface_figure(scene: &SurfaceScene) -> Figure {
    let titles = scene.titles();
    let layout = Layout {
        title: SURFACE_TITLE.into(),
        autosize: Some(true),
        scene: Some(SceneAxes {
            xaxis: AxisLayout::titled(titles.x),
            yaxis: AxisLayout::titled(titles.y),
            zaxis: AxisLayout::titled(titles.z.unwrap_or_default()),
        }),
        ..Layout::default()
    };

    Figure {
        traces: vec![Trace::Surface {
            x: scene.x_axis().to_vec(),
            y: scene.y_axis().to_vec(),
            z: scene.z().to_vec(),
        }],
        layout,
        config: RenderConfig { responsive: true },
        frames: Vec::new(),
    }
}

pub fn animation_figure(scene: &AnimatedScene, settings: &AnimationSettings) -> Figure {
    let titles = scene.titles();
    let initial = scene.initial_frame();

    let frames = scene
        .frames()
        .iter()
        .map(|frame| FrameSpec {
            name: frame.id.clone(),
            data: vec![line(&frame.x, &frame.y)],
        })
        .collect();

    let steps = scene
        .slider_steps()
        .iter()
        .map(|step| SliderStepSpec {
            label: step.label.clone(),
            method: "animate".into(),
            args: PlaybackRequest::jump_to(step.target.clone()),
        })
        .collect();

    let layout = Layout {
        title: ANIMATION_TITLE.into(),
        xaxis: Some(AxisLayout::titled(titles.x)),
        yaxis: Some(AxisLayout {
            title: titles.y.into(),
            range: Some(scene.value_range().as_array()),
        }),
        updatemenus: vec![UpdateMenu {
            kind: "buttons".into(),
            showactive: false,
            x: 0.1,
            y: 1.15,
            direction: "left".into(),
            buttons: vec![MenuButton {
                label: "Play".into(),
                method: "animate".into(),
                args: PlaybackRequest::play_all(settings.frame_duration_ms),
            }],
        }],
        sliders: vec![Slider {
            active: 0,
            pad: Padding { t: 30 },
            steps,
            currentvalue: CurrentValue {
                visible: true,
                prefix: "Time: ".into(),
                font: Font {
                    size: 14,
                    color: "#333".into(),
                },
            },
        }],
        ..Layout::default()
    };

    Figure {
        traces: vec![line(&initial.x, &initial.y)],
        layout,
        config: RenderConfig { responsive: true },
        frames,
    }
}

fn line(x: &Arc<[f64]>, y: &[f64]) -> Trace {
    Trace::Scatter {
        x: Arc::clone(x),
        y: y.to_vec(),
        mode: ScatterMode::Lines,
    }
}

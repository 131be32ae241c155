use std::{collections::HashSet, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{FrameSpec, Layout, PlaybackRequest, RenderConfig, Renderer, Trace};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Renders into a standalone HTML page that loads Plotly and replays the
/// calls it received, in the same order.
#[derive(Default)]
pub struct HtmlRenderer {
    plots: Mutex<Vec<PlotState>>,
}

enum PlotState {
    Chart(ChartState),
    Message { target: String, text: String },
}

impl PlotState {
    fn target(&self) -> &str {
        match self {
            PlotState::Chart(chart) => &chart.target,
            PlotState::Message { target, .. } => target,
        }
    }
}

struct ChartState {
    target: String,
    traces: Vec<Trace>,
    layout: Layout,
    config: RenderConfig,
    frames: Vec<FrameSpec>,
    autoplay: Option<PlaybackRequest>,
    notice: Option<String>,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever `target` showed with a plain error message.
    pub async fn show_message(&self, target: &str, text: impl Into<String>) {
        let mut plots = self.plots.lock().await;
        replace(
            &mut plots,
            PlotState::Message {
                target: target.to_string(),
                text: text.into(),
            },
        );
    }

    /// Shows `text` under the chart drawn for `target`, keeping the chart.
    /// Returns `false` when `target` has no chart.
    pub async fn annotate(&self, target: &str, text: impl Into<String>) -> bool {
        let mut plots = self.plots.lock().await;
        match chart_mut(&mut plots, target) {
            Ok(chart) => {
                chart.notice = Some(text.into());
                true
            }
            Err(_) => false,
        }
    }

    pub async fn frame_count(&self, target: &str) -> Option<usize> {
        let plots = self.plots.lock().await;
        plots.iter().find_map(|plot| match plot {
            PlotState::Chart(chart) if chart.target == target => Some(chart.frames.len()),
            _ => None,
        })
    }

    pub async fn document(&self) -> Result<String> {
        let plots = self.plots.lock().await;
        let mut body = String::new();
        let mut script = String::new();

        for plot in plots.iter() {
            match plot {
                PlotState::Chart(chart) => {
                    body.push_str(&format!(
                        "<div id=\"{}\" class=\"plot\"></div>\n",
                        escape_html(&chart.target)
                    ));
                    if let Some(notice) = &chart.notice {
                        body.push_str(&format!(
                            "<p class=\"notice\" style=\"color:#b26a00;\">{}</p>\n",
                            escape_html(notice)
                        ));
                    }
                    script.push_str(&chart_script(chart)?);
                }
                PlotState::Message { target, text } => {
                    body.push_str(&format!(
                        "<div id=\"{}\" class=\"plot\"><p style=\"color:red;\">Error: {}</p></div>\n",
                        escape_html(target),
                        escape_html(text)
                    ));
                }
            }
        }

        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Heat equation</title>\n<script src=\"{PLOTLY_CDN}\"></script>\n</head>\n<body>\n{body}<script>\n{script}</script>\n</body>\n</html>\n"
        ))
    }

    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let document = self.document().await?;
        tokio::fs::write(path, document)
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        info!(path = %path.display(), "wrote visualization");
        Ok(())
    }
}

#[async_trait]
impl Renderer for HtmlRenderer {
    async fn initialize(
        &self,
        target: &str,
        traces: &[Trace],
        layout: &Layout,
        config: &RenderConfig,
    ) -> Result<()> {
        if traces.is_empty() {
            bail!("initial plot needs at least one trace");
        }
        let mut plots = self.plots.lock().await;
        replace(
            &mut plots,
            PlotState::Chart(ChartState {
                target: target.to_string(),
                traces: traces.to_vec(),
                layout: layout.clone(),
                config: *config,
                frames: Vec::new(),
                autoplay: None,
                notice: None,
            }),
        );
        debug!(plot = target, traces = traces.len(), "plot initialized");
        Ok(())
    }

    async fn register_frames(&self, target: &str, frames: &[FrameSpec]) -> Result<()> {
        let mut plots = self.plots.lock().await;
        let chart = chart_mut(&mut plots, target)?;

        let mut names: HashSet<&str> = chart.frames.iter().map(|f| f.name.as_str()).collect();
        for frame in frames {
            if frame.data.is_empty() {
                bail!("frame '{}' has no traces", frame.name);
            }
            if !names.insert(frame.name.as_str()) {
                bail!("duplicate frame name '{}'", frame.name);
            }
        }

        chart.frames.extend_from_slice(frames);
        debug!(plot = target, frames = frames.len(), "frames registered");
        Ok(())
    }

    async fn play(&self, target: &str, request: &PlaybackRequest) -> Result<()> {
        let mut plots = self.plots.lock().await;
        let chart = chart_mut(&mut plots, target)?;
        if chart.frames.is_empty() {
            bail!("no frames registered to animate");
        }
        if let Some(ids) = request.frames() {
            for id in ids {
                if !chart.frames.iter().any(|frame| &frame.name == id) {
                    bail!("unknown frame '{id}'");
                }
            }
        }
        chart.autoplay = Some(request.clone());
        Ok(())
    }
}

fn replace(plots: &mut Vec<PlotState>, plot: PlotState) {
    plots.retain(|existing| existing.target() != plot.target());
    plots.push(plot);
}

fn chart_mut<'a>(plots: &'a mut [PlotState], target: &str) -> Result<&'a mut ChartState> {
    plots
        .iter_mut()
        .find_map(|plot| match plot {
            PlotState::Chart(chart) if chart.target == target => Some(chart),
            _ => None,
        })
        .ok_or_else(|| anyhow!("no plot initialized for target '{target}'"))
}

fn chart_script(chart: &ChartState) -> Result<String> {
    let target = script_json(&chart.target)?;
    let traces = script_json(&chart.traces)?;
    let layout = script_json(&chart.layout)?;
    let config = script_json(&chart.config)?;

    let mut script = format!("Plotly.newPlot({target}, {traces}, {layout}, {config})");
    if !chart.frames.is_empty() {
        let frames = script_json(&chart.frames)?;
        script.push_str(&format!(
            ".then(function () {{ return Plotly.addFrames({target}, {frames}); }})"
        ));
    }
    if let Some(request) = &chart.autoplay {
        let PlaybackRequest(ids, options) = request;
        let ids = script_json(ids)?;
        let options = script_json(options)?;
        script.push_str(&format!(
            ".then(function () {{ return Plotly.animate({target}, {ids}, {options}); }})"
        ));
    }
    script.push_str(";\n");
    Ok(script)
}

fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("failed to serialize plot data")?;
    Ok(json.replace("</", "<\\/"))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[path = "tests/html_tests.rs"]
mod tests;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{
    HttpSolveClient, PlaybackState, SessionSettings, SubmitOutcome, VisualizationError,
    VisualizationSession,
};
use renderer::{AnimationSettings, HtmlRenderer};
use shared::{
    domain::{BoundaryKind, DisplayMode, FrameId, Scheme},
    presets,
    protocol::{BoundaryCondition, SolveParameters},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

/// Solve the 1D heat equation on a remote solver and write the chart as an
/// HTML page.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    /// `3d` for a surface, `2d` for an animated profile.
    #[arg(long, default_value = "2d")]
    mode: DisplayMode,
    #[arg(long)]
    alpha: Option<f64>,
    #[arg(long)]
    length: Option<f64>,
    #[arg(long)]
    nx: Option<usize>,
    #[arg(long)]
    nt: Option<usize>,
    #[arg(long)]
    dt: Option<f64>,
    #[arg(long, conflicts_with = "initial_preset")]
    initial_condition: Option<String>,
    #[arg(long)]
    initial_preset: Option<usize>,
    #[arg(long)]
    left_type: Option<BoundaryKind>,
    #[arg(long, conflicts_with = "left_preset")]
    left_value: Option<String>,
    #[arg(long)]
    left_preset: Option<usize>,
    #[arg(long)]
    right_type: Option<BoundaryKind>,
    #[arg(long, conflicts_with = "right_preset")]
    right_value: Option<String>,
    #[arg(long)]
    right_preset: Option<usize>,
    #[arg(long, conflicts_with = "source_preset")]
    source_term: Option<String>,
    #[arg(long)]
    source_preset: Option<usize>,
    #[arg(long)]
    scheme: Option<Scheme>,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
    #[arg(long)]
    frame_duration_ms: Option<u64>,
    /// Start the animation as soon as the page loads.
    #[arg(long)]
    autoplay: bool,
    /// Open the animation on this frame instead.
    #[arg(long, conflicts_with = "autoplay")]
    frame: Option<String>,
    /// Print the preset catalogues and exit.
    #[arg(long)]
    list_presets: bool,
}

impl Args {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(v) = &self.server_url {
            settings.server_url = v.clone();
        }
        if let Some(v) = &self.output {
            settings.output_path = v.clone();
        }
        if let Some(v) = self.timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = self.frame_duration_ms {
            settings.frame_duration_ms = v;
        }
    }

    fn solve_parameters(&self) -> Result<SolveParameters> {
        let mut params = SolveParameters::default();
        if let Some(v) = self.alpha {
            params.alpha = v;
        }
        if let Some(v) = self.length {
            params.length = v;
        }
        if let Some(v) = self.nx {
            params.nx = v;
        }
        if let Some(v) = self.nt {
            params.nt = v;
        }
        if let Some(v) = self.dt {
            params.dt = v;
        }
        if let Some(v) = self.scheme {
            params.scheme = v;
        }

        if let Some(v) = expression(
            &self.initial_condition,
            self.initial_preset,
            presets::INITIAL_CONDITIONS,
            "initial",
        )? {
            params.initial_condition = v;
        }
        if let Some(v) = expression(
            &self.source_term,
            self.source_preset,
            presets::SOURCE_TERMS,
            "source",
        )? {
            params.source_term = v;
        }

        let left = &mut params.boundary_conditions.left;
        apply_boundary(left, self.left_type, &self.left_value, self.left_preset, "left")?;
        let right = &mut params.boundary_conditions.right;
        apply_boundary(right, self.right_type, &self.right_value, self.right_preset, "right")?;

        Ok(params)
    }
}

fn expression(
    explicit: &Option<String>,
    preset: Option<usize>,
    catalogue: &[&'static str],
    label: &str,
) -> Result<Option<String>> {
    if let Some(v) = explicit {
        return Ok(Some(v.clone()));
    }
    match preset {
        Some(index) => presets::pick(catalogue, index)
            .map(|v| Some(v.to_string()))
            .ok_or_else(|| {
                anyhow!(
                    "--{label}-preset {index} is out of range (0..{})",
                    catalogue.len()
                )
            }),
        None => Ok(None),
    }
}

fn apply_boundary(
    condition: &mut BoundaryCondition,
    kind: Option<BoundaryKind>,
    value: &Option<String>,
    preset: Option<usize>,
    side: &str,
) -> Result<()> {
    if let Some(kind) = kind {
        condition.kind = kind;
    }
    if let Some(v) = expression(value, preset, presets::BOUNDARY_VALUES, side)? {
        condition.value = v;
    }
    Ok(())
}

fn print_presets() {
    for (title, catalogue) in [
        ("initial conditions", presets::INITIAL_CONDITIONS),
        ("boundary values", presets::BOUNDARY_VALUES),
        ("source terms", presets::SOURCE_TERMS),
    ] {
        println!("{title}:");
        for (index, expr) in catalogue.iter().enumerate() {
            println!("  {index}: {expr}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.list_presets {
        print_presets();
        return Ok(());
    }

    let mut settings = load_settings()?;
    args.apply_to(&mut settings);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let params = args.solve_parameters()?;
    let solver = Arc::new(
        HttpSolveClient::new(&settings.server_url)
            .with_context(|| format!("invalid server url '{}'", settings.server_url))?,
    );
    info!(endpoint = %solver.endpoint(), "using solver");

    let renderer = Arc::new(HtmlRenderer::new());
    let session = VisualizationSession::new(
        solver,
        renderer.clone(),
        SessionSettings {
            request_timeout: settings.request_timeout(),
            animation: AnimationSettings {
                frame_duration_ms: settings.frame_duration_ms,
            },
            ..SessionSettings::default()
        },
    );

    let outcome = session.submit(&params, args.mode).await;
    let failure = publish(&session, &renderer, outcome, &args).await;

    renderer
        .write_to(&settings.output_path)
        .await
        .with_context(|| format!("failed to write '{}'", settings.output_path.display()))?;
    println!("Wrote {}", settings.output_path.display());

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Puts one submission's result on the page and returns the error that
/// should fail the run, if any.
///
/// Rejected animation frames leave the first frame drawn; the chart stays and
/// the message is shown underneath it.
async fn publish(
    session: &VisualizationSession,
    page: &HtmlRenderer,
    outcome: Result<SubmitOutcome, VisualizationError>,
    args: &Args,
) -> Option<VisualizationError> {
    let target = session.settings().target.as_str();
    let err = match outcome {
        Ok(SubmitOutcome::Rendered { mode, .. }) => {
            if mode == DisplayMode::Animated2D {
                start_playback(session, args).await;
            }
            return None;
        }
        Ok(SubmitOutcome::Stale { token }) => {
            warn!(token = %token, "solve result superseded, nothing to show");
            return None;
        }
        Err(err) => err,
    };

    let first_frame_only = matches!(err, VisualizationError::Render(_))
        && session.playback_state().await == Some(PlaybackState::Initialized);
    if first_frame_only {
        let notice = format!(
            "Animation unavailable, showing the first time step. {}",
            err.user_message()
        );
        if page.annotate(target, notice).await {
            warn!(plot = %target, "animation frames rejected, keeping first frame: {err}");
            return None;
        }
    }

    page.show_message(target, err.user_message()).await;
    Some(err)
}

async fn start_playback(session: &VisualizationSession, args: &Args) {
    let result: Result<(), VisualizationError> = if args.autoplay {
        session.play().await
    } else if let Some(frame) = &args.frame {
        session.scrub(&FrameId(frame.clone())).await
    } else {
        Ok(())
    };
    if let Err(err) = result {
        warn!("playback not started: {err}");
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

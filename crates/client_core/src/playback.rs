//! Animation lifecycle for one rendered 2D scene.
//!
//! The renderer needs an existing plot before frames can be attached, so
//! loading is a two-step handshake: the initial frame is committed and
//! acknowledged (`Initialized`), and only then is the whole frame set
//! registered in one batch (`FramesLoaded`). Play and scrub address frames by
//! identifier only.

use std::{fmt, sync::Arc};

use renderer::{AnimationSettings, Figure, PlaybackRequest, RenderError, RenderOperation, Renderer};
use shared::domain::FrameId;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Uninitialized,
    Initialized,
    FramesLoaded,
    Playing,
    Scrubbing { frame: FrameId },
    Discarded,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Uninitialized => f.write_str("uninitialized"),
            PlaybackState::Initialized => f.write_str("initialized"),
            PlaybackState::FramesLoaded => f.write_str("frames loaded"),
            PlaybackState::Playing => f.write_str("playing"),
            PlaybackState::Scrubbing { frame } => write!(f, "scrubbing to frame {frame}"),
            PlaybackState::Discarded => f.write_str("discarded"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback already set up (state: {state})")]
    AlreadyInitialized { state: PlaybackState },
    #[error("playback controls are inactive until frames are loaded (state: {state})")]
    Inert { state: PlaybackState },
    #[error("unknown frame '{0}'")]
    UnknownFrame(FrameId),
    #[error("playback was discarded")]
    Discarded,
    #[error(transparent)]
    Render(#[from] RenderError),
}

pub struct PlaybackController {
    renderer: Arc<dyn Renderer>,
    target: String,
    settings: AnimationSettings,
    state: PlaybackState,
    frame_ids: Vec<FrameId>,
}

impl PlaybackController {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        target: impl Into<String>,
        settings: AnimationSettings,
    ) -> Self {
        Self {
            renderer,
            target: target.into(),
            settings,
            state: PlaybackState::Uninitialized,
            frame_ids: Vec::new(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn frame_ids(&self) -> &[FrameId] {
        &self.frame_ids
    }

    /// Draws the figure's initial traces, waits for the renderer to
    /// acknowledge them, then registers every frame in one call.
    ///
    /// When registration fails the plot keeps showing the first frame and
    /// the controller stays `Initialized`.
    pub async fn load(&mut self, figure: &Figure) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Uninitialized => {}
            PlaybackState::Discarded => return Err(PlaybackError::Discarded),
            _ => {
                return Err(PlaybackError::AlreadyInitialized {
                    state: self.state.clone(),
                })
            }
        }

        self.renderer
            .initialize(&self.target, &figure.traces, &figure.layout, &figure.config)
            .await
            .map_err(|err| RenderError::new(RenderOperation::Initialize, &self.target, &err))?;
        self.transition(PlaybackState::Initialized);

        if let Err(err) = self
            .renderer
            .register_frames(&self.target, &figure.frames)
            .await
        {
            let err = RenderError::new(RenderOperation::RegisterFrames, &self.target, &err);
            warn!(
                plot = %self.target,
                frames = figure.frames.len(),
                "frame registration rejected, playback stays on the first frame: {err}"
            );
            return Err(err.into());
        }

        self.frame_ids = figure.frames.iter().map(|frame| frame.name.clone()).collect();
        self.transition(PlaybackState::FramesLoaded);
        Ok(())
    }

    /// Animates every registered frame starting from the current one.
    pub async fn play(&mut self) -> Result<(), PlaybackError> {
        self.ensure_loaded()?;
        let request = PlaybackRequest::play_all(self.settings.frame_duration_ms);
        self.send(&request).await?;
        self.transition(PlaybackState::Playing);
        Ok(())
    }

    /// Jumps straight to `frame`, as the time slider does.
    pub async fn scrub(&mut self, frame: &FrameId) -> Result<(), PlaybackError> {
        self.ensure_loaded()?;
        if !self.frame_ids.contains(frame) {
            return Err(PlaybackError::UnknownFrame(frame.clone()));
        }
        self.send(&PlaybackRequest::jump_to(frame.clone())).await?;
        self.transition(PlaybackState::Scrubbing {
            frame: frame.clone(),
        });
        Ok(())
    }

    /// Called when the renderer reports that an animation run has finished.
    pub fn settle(&mut self) {
        if matches!(
            self.state,
            PlaybackState::Playing | PlaybackState::Scrubbing { .. }
        ) {
            self.transition(PlaybackState::FramesLoaded);
        }
    }

    pub fn discard(&mut self) {
        if self.state != PlaybackState::Discarded {
            self.frame_ids.clear();
            self.transition(PlaybackState::Discarded);
        }
    }

    fn ensure_loaded(&self) -> Result<(), PlaybackError> {
        match &self.state {
            PlaybackState::FramesLoaded
            | PlaybackState::Playing
            | PlaybackState::Scrubbing { .. } => Ok(()),
            PlaybackState::Discarded => Err(PlaybackError::Discarded),
            state => Err(PlaybackError::Inert {
                state: state.clone(),
            }),
        }
    }

    async fn send(&self, request: &PlaybackRequest) -> Result<(), RenderError> {
        self.renderer
            .play(&self.target, request)
            .await
            .map_err(|err| RenderError::new(RenderOperation::Play, &self.target, &err))
    }

    fn transition(&mut self, next: PlaybackState) {
        debug!(plot = %self.target, from = %self.state, to = %next, "playback transition");
        if next == PlaybackState::FramesLoaded && self.state == PlaybackState::Initialized {
            info!(
                plot = %self.target,
                frames = self.frame_ids.len(),
                "animation frames loaded"
            );
        }
        self.state = next;
    }
}

#[cfg(test)]
#[path = "tests/playback_tests.rs"]
mod tests;

use std::time::Duration;

use renderer::RenderError;
use scene::SceneError;
use shared::error::{ErrorBody, ParameterError};
use thiserror::Error;

use crate::playback::PlaybackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailure {
    /// The solver answered with a non-2xx status.
    Status,
    Transport,
    Timeout,
    MalformedResponse,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteSolveError {
    pub failure: RemoteFailure,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteSolveError {
    /// Uses the solver's `detail` field when the body is the service's JSON
    /// error shape, the raw body text otherwise.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.message(),
            Err(_) if body.is_empty() => format!("solver returned HTTP {status}"),
            Err(_) => body.to_string(),
        };
        Self {
            failure: RemoteFailure::Status,
            status: Some(status),
            message,
        }
    }

    /// Non-2xx status whose body could not be read.
    pub fn unreadable_status(status: u16, err: &reqwest::Error) -> Self {
        Self {
            failure: RemoteFailure::Status,
            status: Some(status),
            message: format!("solver returned HTTP {status}, error body unreadable: {err}"),
        }
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self {
                failure: RemoteFailure::Timeout,
                status: None,
                message: format!("solver request timed out: {err}"),
            };
        }
        Self {
            failure: RemoteFailure::Transport,
            status: err.status().map(|status| status.as_u16()),
            message: format!("failed to reach solver: {err}"),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self {
            failure: RemoteFailure::Timeout,
            status: None,
            message: format!("solver did not answer within {} ms", after.as_millis()),
        }
    }

    pub fn malformed(detail: impl std::fmt::Display) -> Self {
        Self {
            failure: RemoteFailure::MalformedResponse,
            status: None,
            message: format!("malformed solver response: {detail}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum VisualizationError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("solver request failed: {0}")]
    RemoteSolve(#[from] RemoteSolveError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Playback(PlaybackError),
}

impl From<PlaybackError> for VisualizationError {
    fn from(value: PlaybackError) -> Self {
        match value {
            PlaybackError::Render(err) => Self::Render(err),
            other => Self::Playback(other),
        }
    }
}

impl VisualizationError {
    /// Only solver failures can succeed on a retry with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteSolve(_))
    }

    /// The single line shown in place of the chart.
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteSolve(err) => match err.status {
                Some(status) => format!("Solver error (HTTP {status}): {}", err.message),
                None => format!("Solver unavailable: {}", err.message),
            },
            Self::InvalidParameters(err) => format!("Invalid parameters: {err}"),
            Self::Scene(err) => format!("Cannot display solution: {err}"),
            Self::Render(err) => format!("Chart error: {err}"),
            Self::Playback(err) => format!("Playback error: {err}"),
        }
    }
}

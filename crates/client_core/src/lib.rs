use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use renderer::{AnimationSettings, Renderer};
use reqwest::Client;
use scene::{build_scene, AxisSet};
use shared::{
    domain::{DisplayMode, FrameId, SolutionGrid},
    protocol::{SolveParameters, SolveResponse, SOLVE_HEAT_EQUATION_PATH},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};
use url::Url;

pub mod dispatch;
pub mod error;
pub mod playback;

pub use error::{RemoteFailure, RemoteSolveError, VisualizationError};
pub use playback::{PlaybackController, PlaybackError, PlaybackState};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PLOT_TARGET: &str = "plot";

#[async_trait]
pub trait SolveService: Send + Sync {
    async fn solve(&self, params: &SolveParameters) -> Result<SolutionGrid, RemoteSolveError>;
}

/// Builds `{server_url}/solve/heat-equation/`, keeping any path prefix the
/// server is mounted under.
pub fn solve_endpoint(server_url: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(server_url.trim())?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(SOLVE_HEAT_EQUATION_PATH.trim_start_matches('/'))
}

pub struct HttpSolveClient {
    http: Client,
    endpoint: Url,
}

impl HttpSolveClient {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            http: Client::new(),
            endpoint: solve_endpoint(server_url)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SolveService for HttpSolveClient {
    async fn solve(&self, params: &SolveParameters) -> Result<SolutionGrid, RemoteSolveError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(params)
            .send()
            .await
            .map_err(|err| RemoteSolveError::transport(&err))?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            return match response.text().await {
                Ok(body) => Err(RemoteSolveError::from_status(status, &body)),
                Err(err) => {
                    warn!(status, "failed to read solver error body: {err}");
                    Err(RemoteSolveError::unreadable_status(status, &err))
                }
            };
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| RemoteSolveError::transport(&err))?;
        let parsed: SolveResponse =
            serde_json::from_slice(&body).map_err(RemoteSolveError::malformed)?;
        Ok(parsed.solution)
    }
}

/// Identifies one submission; only the most recent one may reach the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub target: String,
    pub request_timeout: Duration,
    pub animation: AnimationSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            target: DEFAULT_PLOT_TARGET.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            animation: AnimationSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SolveStarted {
        token: RequestToken,
        mode: DisplayMode,
    },
    SceneRendered {
        token: RequestToken,
        mode: DisplayMode,
    },
    StaleResponseDiscarded {
        token: RequestToken,
        latest: Option<RequestToken>,
    },
    PlaybackStateChanged(PlaybackState),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rendered {
        token: RequestToken,
        mode: DisplayMode,
    },
    /// A newer submission was made while this one was in flight.
    Stale { token: RequestToken },
}

struct SessionState {
    latest: Option<RequestToken>,
    playback: Option<PlaybackController>,
}

/// Runs solve requests and keeps the chart showing the result of the most
/// recent one.
pub struct VisualizationSession {
    solver: Arc<dyn SolveService>,
    renderer: Arc<dyn Renderer>,
    settings: SessionSettings,
    next_token: AtomicU64,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl VisualizationSession {
    pub fn new(
        solver: Arc<dyn SolveService>,
        renderer: Arc<dyn Renderer>,
        settings: SessionSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            solver,
            renderer,
            settings,
            next_token: AtomicU64::new(0),
            inner: Mutex::new(SessionState {
                latest: None,
                playback: None,
            }),
            events,
        })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Solves `params` remotely and replaces the chart with the result.
    ///
    /// Axis parameters are checked before anything is sent. A response that
    /// arrives after a newer submission is dropped, whether it succeeded or
    /// not.
    pub async fn submit(
        &self,
        params: &SolveParameters,
        mode: DisplayMode,
    ) -> Result<SubmitOutcome, VisualizationError> {
        let token = RequestToken(self.next_token.fetch_add(1, Ordering::SeqCst) + 1);
        self.inner.lock().await.latest = Some(token);
        self.emit(SessionEvent::SolveStarted { token, mode });

        let prepared = params
            .validate()
            .map_err(VisualizationError::from)
            .and_then(|()| AxisSet::from_parameters(params).map_err(VisualizationError::from));
        let axes = match prepared {
            Ok(axes) => axes,
            Err(err) => return self.fail(token, err).await,
        };

        info!(
            token = %token,
            mode = %mode,
            nx = params.nx,
            nt = params.nt,
            scheme = ?params.scheme,
            "submitting solve request"
        );
        let solved = match tokio::time::timeout(
            self.settings.request_timeout,
            self.solver.solve(params),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RemoteSolveError::timeout(self.settings.request_timeout)),
        };

        let mut state = self.inner.lock().await;
        let latest = state.latest;
        if latest != Some(token) {
            info!(token = %token, latest = ?latest, "discarding stale solve response");
            self.emit(SessionEvent::StaleResponseDiscarded { token, latest });
            return Ok(SubmitOutcome::Stale { token });
        }

        if let Some(previous) = state.playback.as_mut() {
            previous.discard();
        }
        let result = match solved {
            Ok(grid) => self.render(&mut state, &grid, &axes, mode).await,
            Err(err) => Err(err.into()),
        };
        drop(state);

        match result {
            Ok(()) => {
                info!(token = %token, mode = %mode, "scene rendered");
                self.emit(SessionEvent::SceneRendered { token, mode });
                Ok(SubmitOutcome::Rendered { token, mode })
            }
            Err(err) => {
                self.report(token, &err);
                Err(err)
            }
        }
    }

    pub async fn playback_state(&self) -> Option<PlaybackState> {
        let state = self.inner.lock().await;
        state.playback.as_ref().map(|playback| playback.state().clone())
    }

    pub async fn play(&self) -> Result<(), VisualizationError> {
        let mut state = self.inner.lock().await;
        let playback = state.playback.as_mut().ok_or(PlaybackError::Inert {
            state: PlaybackState::Uninitialized,
        })?;
        playback.play().await?;
        self.emit(SessionEvent::PlaybackStateChanged(playback.state().clone()));
        Ok(())
    }

    pub async fn scrub(&self, frame: &FrameId) -> Result<(), VisualizationError> {
        let mut state = self.inner.lock().await;
        let playback = state.playback.as_mut().ok_or(PlaybackError::Inert {
            state: PlaybackState::Uninitialized,
        })?;
        playback.scrub(frame).await?;
        self.emit(SessionEvent::PlaybackStateChanged(playback.state().clone()));
        Ok(())
    }

    pub async fn settle(&self) {
        let mut state = self.inner.lock().await;
        if let Some(playback) = state.playback.as_mut() {
            playback.settle();
            self.emit(SessionEvent::PlaybackStateChanged(playback.state().clone()));
        }
    }

    /// Drops the current chart state, e.g. when the view is left.
    pub async fn discard(&self) {
        let mut state = self.inner.lock().await;
        state.latest = None;
        if let Some(playback) = state.playback.as_mut() {
            playback.discard();
            self.emit(SessionEvent::PlaybackStateChanged(playback.state().clone()));
        }
    }

    async fn render(
        &self,
        state: &mut SessionState,
        grid: &SolutionGrid,
        axes: &AxisSet,
        mode: DisplayMode,
    ) -> Result<(), VisualizationError> {
        let scene = build_scene(grid, axes, mode)?;

        let mut playback = PlaybackController::new(
            Arc::clone(&self.renderer),
            self.settings.target.clone(),
            self.settings.animation,
        );
        let result = dispatch::present_scene(
            self.renderer.as_ref(),
            &mut playback,
            &scene,
            &self.settings.animation,
        )
        .await;
        self.emit(SessionEvent::PlaybackStateChanged(playback.state().clone()));
        state.playback = Some(playback);
        result
    }

    async fn fail(
        &self,
        token: RequestToken,
        err: VisualizationError,
    ) -> Result<SubmitOutcome, VisualizationError> {
        let mut state = self.inner.lock().await;
        if state.latest == Some(token) {
            if let Some(previous) = state.playback.as_mut() {
                previous.discard();
            }
        }
        drop(state);
        self.report(token, &err);
        Err(err)
    }

    fn report(&self, token: RequestToken, err: &VisualizationError) {
        if err.is_retryable() {
            warn!(token = %token, "solve failed: {err}");
        } else {
            error!(token = %token, "cannot display solution: {err}");
        }
        self.emit(SessionEvent::Error(err.user_message()));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

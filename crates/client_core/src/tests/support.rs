//! Test doubles for the solver and renderer seams.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use renderer::{FrameSpec, Layout, PlaybackRequest, RenderConfig, Renderer, Trace};
use shared::{
    domain::{FrameId, SolutionGrid},
    protocol::SolveParameters,
};
use tokio::sync::{oneshot, Mutex, Notify};

use crate::{RemoteSolveError, SolveService};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Initialize {
        target: String,
        traces: usize,
        title: String,
    },
    RegisterFrames {
        target: String,
        names: Vec<FrameId>,
    },
    Play {
        target: String,
        request: PlaybackRequest,
    },
}

#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<RenderCall>>,
    fail_initialize: bool,
    fail_register: bool,
}

impl RecordingRenderer {
    pub fn rejecting_frames() -> Self {
        Self {
            fail_register: true,
            ..Self::default()
        }
    }

    pub fn rejecting_initialize() -> Self {
        Self {
            fail_initialize: true,
            ..Self::default()
        }
    }

    pub async fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn initialize(
        &self,
        target: &str,
        traces: &[Trace],
        layout: &Layout,
        _config: &RenderConfig,
    ) -> Result<()> {
        if self.fail_initialize {
            return Err(anyhow!("plot container missing"));
        }
        self.calls.lock().await.push(RenderCall::Initialize {
            target: target.to_string(),
            traces: traces.len(),
            title: layout.title.clone(),
        });
        Ok(())
    }

    async fn register_frames(&self, target: &str, frames: &[FrameSpec]) -> Result<()> {
        if self.fail_register {
            return Err(anyhow!("malformed frame"));
        }
        self.calls.lock().await.push(RenderCall::RegisterFrames {
            target: target.to_string(),
            names: frames.iter().map(|frame| frame.name.clone()).collect(),
        });
        Ok(())
    }

    async fn play(&self, target: &str, request: &PlaybackRequest) -> Result<()> {
        self.calls.lock().await.push(RenderCall::Play {
            target: target.to_string(),
            request: request.clone(),
        });
        Ok(())
    }
}

/// Answers each call with the next scripted result.
pub struct ScriptedSolver {
    responses: Mutex<VecDeque<Result<SolutionGrid, RemoteSolveError>>>,
    calls: AtomicUsize,
}

impl ScriptedSolver {
    pub fn new(responses: Vec<Result<SolutionGrid, RemoteSolveError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(grid: SolutionGrid) -> Self {
        Self::new(vec![Ok(grid)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SolveService for ScriptedSolver {
    async fn solve(&self, _params: &SolveParameters) -> Result<SolutionGrid, RemoteSolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(RemoteSolveError::malformed("no scripted response left")))
    }
}

/// First call blocks until released; later calls answer immediately.
pub struct GatedSolver {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub entered: Arc<Notify>,
    first: SolutionGrid,
    rest: SolutionGrid,
}

impl GatedSolver {
    pub fn new(first: SolutionGrid, rest: SolutionGrid) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                gate: Mutex::new(Some(rx)),
                entered: Arc::new(Notify::new()),
                first,
                rest,
            },
            tx,
        )
    }
}

#[async_trait]
impl SolveService for GatedSolver {
    async fn solve(&self, _params: &SolveParameters) -> Result<SolutionGrid, RemoteSolveError> {
        let gate = self.gate.lock().await.take();
        match gate {
            Some(rx) => {
                self.entered.notify_one();
                let _ = rx.await;
                Ok(self.first.clone())
            }
            None => Ok(self.rest.clone()),
        }
    }
}

pub struct PendingSolver;

#[async_trait]
impl SolveService for PendingSolver {
    async fn solve(&self, _params: &SolveParameters) -> Result<SolutionGrid, RemoteSolveError> {
        std::future::pending().await
    }
}

pub fn small_grid() -> SolutionGrid {
    SolutionGrid::new(vec![vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]])
}

pub fn small_params() -> SolveParameters {
    SolveParameters {
        nx: 3,
        length: 2.0,
        nt: 2,
        dt: 0.5,
        ..SolveParameters::default()
    }
}

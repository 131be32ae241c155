use super::*;
use crate::test_support::{
    small_grid, small_params, GatedSolver, PendingSolver, RecordingRenderer, RenderCall,
    ScriptedSolver,
};
use anyhow::Result;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use renderer::Renderer;
use scene::{GridAxis, SceneError};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot,
};

#[derive(Clone)]
struct SolverState {
    tx: Arc<Mutex<Option<oneshot::Sender<Value>>>>,
    status: StatusCode,
    body: Value,
}

async fn solve_handler(
    State(state): State<SolverState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(payload);
    }
    (state.status, Json(state.body))
}

async fn spawn_solver_server(
    status: StatusCode,
    body: Value,
) -> Result<(String, oneshot::Receiver<Value>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();
    let state = SolverState {
        tx: Arc::new(Mutex::new(Some(tx))),
        status,
        body,
    };
    let app = Router::new()
        .route("/solve/heat-equation/", post(solve_handler))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), rx))
}

async fn spawn_raw_server(status: StatusCode, body: &'static str) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route(
        "/solve/heat-equation/",
        post(move || async move { (status, body) }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

/// Answers with a 500 whose body ends before its declared length.
async fn spawn_truncating_server() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request_complete(&request) {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = socket
            .write_all(
                b"HTTP/1.1 500 Internal Server Error\r\n\
content-type: application/json\r\n\
content-length: 64\r\n\r\n\
{\"detail\": \"trunc",
            )
            .await;
        let _ = socket.shutdown().await;
    });
    Ok(format!("http://{addr}"))
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(split) = text.find("\r\n\r\n") else {
        return false;
    };
    let length = text[..split]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    raw.len() >= split + 4 + length
}

fn session_with(
    solver: Arc<dyn SolveService>,
    renderer: Arc<RecordingRenderer>,
) -> Arc<VisualizationSession> {
    VisualizationSession::new(
        solver,
        renderer as Arc<dyn Renderer>,
        SessionSettings::default(),
    )
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[test]
fn endpoint_keeps_server_path_prefix() {
    assert_eq!(
        solve_endpoint("http://localhost:8000").expect("url").as_str(),
        "http://localhost:8000/solve/heat-equation/"
    );
    assert_eq!(
        solve_endpoint("http://localhost:8000/").expect("url").as_str(),
        "http://localhost:8000/solve/heat-equation/"
    );
    assert_eq!(
        solve_endpoint(" https://example.org/api ").expect("url").as_str(),
        "https://example.org/api/solve/heat-equation/"
    );
    assert!(solve_endpoint("not a url").is_err());
}

#[tokio::test]
async fn http_client_posts_parameters_and_returns_solution() {
    let (server_url, payload_rx) = spawn_solver_server(
        StatusCode::OK,
        json!({ "solution": [[0.0, 1.0, 2.0], [1.0, 2.0, 3.0]], "parameters": {} }),
    )
    .await
    .expect("spawn server");

    let client = HttpSolveClient::new(&server_url).expect("client");
    let grid = client.solve(&small_params()).await.expect("solve");
    assert_eq!(grid, small_grid());

    let payload = payload_rx.await.expect("payload");
    assert_eq!(payload["nx"], 3);
    assert_eq!(payload["nt"], 2);
    assert_eq!(payload["length"], 2.0);
    assert_eq!(payload["initial_condition"], "sin(pi * x)");
    assert_eq!(payload["boundary_conditions"]["left"]["type"], "dirichlet");
    assert_eq!(payload["boundary_conditions"]["right"]["value"], "0");
    assert_eq!(payload["scheme"], "explicit");
}

#[tokio::test]
async fn http_client_surfaces_server_detail() {
    let (server_url, _payload_rx) = spawn_solver_server(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "detail": "Error parsing initial condition" }),
    )
    .await
    .expect("spawn server");

    let client = HttpSolveClient::new(&server_url).expect("client");
    let err = client.solve(&small_params()).await.expect_err("must fail");
    assert_eq!(err.failure, RemoteFailure::Status);
    assert_eq!(err.status, Some(500));
    assert_eq!(err.message, "Error parsing initial condition");
}

#[tokio::test]
async fn http_client_reports_unreadable_error_body() {
    let server_url = spawn_truncating_server().await.expect("spawn server");

    let client = HttpSolveClient::new(&server_url).expect("client");
    let err = client.solve(&small_params()).await.expect_err("must fail");
    assert_eq!(err.failure, RemoteFailure::Status);
    assert_eq!(err.status, Some(500));
    assert!(
        err.message.contains("error body unreadable"),
        "unexpected message: {}",
        err.message
    );
}

#[tokio::test]
async fn http_client_rejects_body_without_solution() {
    let server_url = spawn_raw_server(StatusCode::OK, r#"{"result": []}"#)
        .await
        .expect("spawn server");

    let client = HttpSolveClient::new(&server_url).expect("client");
    let err = client.solve(&small_params()).await.expect_err("must fail");
    assert_eq!(err.failure, RemoteFailure::MalformedResponse);
}

#[tokio::test]
async fn http_client_reports_unreachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let client = HttpSolveClient::new(&format!("http://{addr}")).expect("client");
    let err = client.solve(&small_params()).await.expect_err("must fail");
    assert_eq!(err.failure, RemoteFailure::Transport);
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn animated_submit_loads_frames_after_initial_draw() {
    let solver = Arc::new(ScriptedSolver::returning(small_grid()));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver.clone(), renderer.clone());
    let mut events = session.subscribe_events();

    let outcome = session
        .submit(&small_params(), DisplayMode::Animated2D)
        .await
        .expect("submit");

    assert_eq!(
        outcome,
        SubmitOutcome::Rendered {
            token: RequestToken(1),
            mode: DisplayMode::Animated2D
        }
    );
    assert_eq!(solver.calls(), 1);
    assert_eq!(session.playback_state().await, Some(PlaybackState::FramesLoaded));

    let calls = renderer.calls().await;
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], RenderCall::Initialize { target, .. } if target == "plot"));
    assert!(matches!(
        &calls[1],
        RenderCall::RegisterFrames { names, .. } if names.len() == 2
    ));

    let seen = drain(&mut events);
    assert!(matches!(
        seen.first(),
        Some(SessionEvent::SolveStarted {
            token: RequestToken(1),
            ..
        })
    ));
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::SceneRendered {
            mode: DisplayMode::Animated2D,
            ..
        })
    ));
}

#[tokio::test]
async fn surface_submit_draws_once_without_frames() {
    let solver = Arc::new(ScriptedSolver::returning(small_grid()));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver, renderer.clone());

    session
        .submit(&small_params(), DisplayMode::Surface3D)
        .await
        .expect("submit");

    assert_eq!(
        renderer.calls().await,
        vec![RenderCall::Initialize {
            target: "plot".into(),
            traces: 1,
            title: "Heat Equation Solution (3D)".into(),
        }]
    );
    // Surfaces have no animation lifecycle.
    assert_eq!(session.playback_state().await, Some(PlaybackState::Uninitialized));
    assert!(matches!(
        session.play().await,
        Err(VisualizationError::Playback(PlaybackError::Inert { .. }))
    ));
}

#[tokio::test]
async fn invalid_axes_are_rejected_before_any_request() {
    let solver = Arc::new(ScriptedSolver::returning(small_grid()));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver.clone(), renderer.clone());

    let params = SolveParameters {
        nx: 1,
        ..small_params()
    };
    let err = session
        .submit(&params, DisplayMode::Animated2D)
        .await
        .expect_err("must fail");

    assert!(matches!(
        err,
        VisualizationError::Scene(SceneError::InvalidGrid {
            axis: GridAxis::Spatial,
            steps: 1,
            ..
        })
    ));
    assert!(!err.is_retryable());
    assert_eq!(solver.calls(), 0);
    assert!(renderer.calls().await.is_empty());
}

#[tokio::test]
async fn invalid_parameters_are_rejected_before_any_request() {
    let solver = Arc::new(ScriptedSolver::returning(small_grid()));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver.clone(), renderer.clone());
    let mut events = session.subscribe_events();

    let params = SolveParameters {
        dt: 0.0,
        ..small_params()
    };
    let err = session
        .submit(&params, DisplayMode::Surface3D)
        .await
        .expect_err("must fail");

    assert!(matches!(err, VisualizationError::InvalidParameters(_)));
    assert_eq!(solver.calls(), 0);
    let seen = drain(&mut events);
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::Error(message)) if message.starts_with("Invalid parameters")
    ));
}

#[tokio::test]
async fn empty_solution_never_reaches_renderer() {
    let solver = Arc::new(ScriptedSolver::returning(SolutionGrid::new(Vec::new())));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver, renderer.clone());

    let err = session
        .submit(&small_params(), DisplayMode::Animated2D)
        .await
        .expect_err("must fail");

    assert!(matches!(err, VisualizationError::Scene(SceneError::EmptyGrid)));
    assert!(renderer.calls().await.is_empty());
    assert_eq!(session.playback_state().await, None);
}

#[tokio::test]
async fn mismatched_solution_never_reaches_renderer() {
    let grid = SolutionGrid::new(vec![vec![0.0, 1.0], vec![1.0, 2.0]]);
    let solver = Arc::new(ScriptedSolver::returning(grid));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver, renderer.clone());

    let err = session
        .submit(&small_params(), DisplayMode::Surface3D)
        .await
        .expect_err("must fail");

    assert!(matches!(
        err,
        VisualizationError::Scene(SceneError::ShapeMismatch { .. })
    ));
    assert!(renderer.calls().await.is_empty());
}

#[tokio::test]
async fn server_error_is_reported_with_detail() {
    let solver = Arc::new(ScriptedSolver::new(vec![Err(RemoteSolveError::from_status(
        500,
        r#"{"detail": "Error parsing source term"}"#,
    ))]));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver, renderer.clone());
    let mut events = session.subscribe_events();

    let err = session
        .submit(&small_params(), DisplayMode::Animated2D)
        .await
        .expect_err("must fail");

    assert!(err.is_retryable());
    assert_eq!(
        err.user_message(),
        "Solver error (HTTP 500): Error parsing source term"
    );
    assert!(renderer.calls().await.is_empty());
    let seen = drain(&mut events);
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::Error(message)) if message.contains("Error parsing source term")
    ));
}

#[tokio::test]
async fn slow_solver_times_out_as_retryable() {
    let renderer = Arc::new(RecordingRenderer::default());
    let session = VisualizationSession::new(
        Arc::new(PendingSolver),
        renderer.clone() as Arc<dyn Renderer>,
        SessionSettings {
            request_timeout: Duration::from_millis(50),
            ..SessionSettings::default()
        },
    );

    let err = session
        .submit(&small_params(), DisplayMode::Animated2D)
        .await
        .expect_err("must time out");

    match &err {
        VisualizationError::RemoteSolve(remote) => {
            assert_eq!(remote.failure, RemoteFailure::Timeout)
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
    assert!(renderer.calls().await.is_empty());
}

#[tokio::test]
async fn stale_response_is_discarded() {
    let older = SolutionGrid::new(vec![vec![9.0, 9.0, 9.0], vec![9.0, 9.0, 9.0]]);
    let (solver, release) = GatedSolver::new(older, small_grid());
    let entered = Arc::clone(&solver.entered);
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(Arc::new(solver), renderer.clone());
    let mut events = session.subscribe_events();

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            session
                .submit(&small_params(), DisplayMode::Animated2D)
                .await
        })
    };
    entered.notified().await;

    let second = session
        .submit(&small_params(), DisplayMode::Surface3D)
        .await
        .expect("second submit");
    assert_eq!(
        second,
        SubmitOutcome::Rendered {
            token: RequestToken(2),
            mode: DisplayMode::Surface3D
        }
    );

    release.send(()).expect("release first solve");
    let first = first.await.expect("join").expect("first submit");
    assert_eq!(
        first,
        SubmitOutcome::Stale {
            token: RequestToken(1)
        }
    );

    // Only the newer surface ever reached the chart.
    let calls = renderer.calls().await;
    assert_eq!(calls.len(), 1);
    assert!(matches!(
        &calls[0],
        RenderCall::Initialize { title, .. } if title == "Heat Equation Solution (3D)"
    ));

    let seen = drain(&mut events);
    assert!(seen.iter().any(|event| matches!(
        event,
        SessionEvent::StaleResponseDiscarded {
            token: RequestToken(1),
            latest: Some(RequestToken(2)),
        }
    )));
}

#[tokio::test]
async fn rejected_frames_keep_first_frame_and_report() {
    let solver = Arc::new(ScriptedSolver::returning(small_grid()));
    let renderer = Arc::new(RecordingRenderer::rejecting_frames());
    let session = session_with(solver, renderer.clone());
    let mut events = session.subscribe_events();

    let err = session
        .submit(&small_params(), DisplayMode::Animated2D)
        .await
        .expect_err("must fail");

    assert!(matches!(err, VisualizationError::Render(_)));
    assert!(!err.is_retryable());
    assert_eq!(session.playback_state().await, Some(PlaybackState::Initialized));
    assert_eq!(renderer.calls().await.len(), 1);

    assert!(matches!(
        session.play().await,
        Err(VisualizationError::Playback(PlaybackError::Inert {
            state: PlaybackState::Initialized
        }))
    ));

    let seen = drain(&mut events);
    assert!(seen
        .iter()
        .any(|event| matches!(event, SessionEvent::Error(message) if message.starts_with("Chart error"))));
}

#[tokio::test]
async fn controls_drive_the_current_animation() {
    let solver = Arc::new(ScriptedSolver::returning(small_grid()));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver, renderer.clone());

    assert!(matches!(
        session.play().await,
        Err(VisualizationError::Playback(PlaybackError::Inert { .. }))
    ));

    session
        .submit(&small_params(), DisplayMode::Animated2D)
        .await
        .expect("submit");

    session.play().await.expect("play");
    assert_eq!(session.playback_state().await, Some(PlaybackState::Playing));

    session.scrub(&FrameId("1".into())).await.expect("scrub");
    assert_eq!(
        session.playback_state().await,
        Some(PlaybackState::Scrubbing {
            frame: FrameId("1".into())
        })
    );
    assert!(matches!(
        session.scrub(&FrameId("7".into())).await,
        Err(VisualizationError::Playback(PlaybackError::UnknownFrame(_)))
    ));

    session.settle().await;
    assert_eq!(session.playback_state().await, Some(PlaybackState::FramesLoaded));

    let calls = renderer.calls().await;
    assert!(matches!(
        &calls[3],
        RenderCall::Play { request, .. } if request.frames() == Some(&[FrameId("1".into())][..])
    ));
}

#[tokio::test]
async fn new_submission_discards_previous_animation() {
    let solver = Arc::new(ScriptedSolver::new(vec![Ok(small_grid()), Ok(small_grid())]));
    let renderer = Arc::new(RecordingRenderer::default());
    let session = session_with(solver, renderer.clone());

    session
        .submit(&small_params(), DisplayMode::Animated2D)
        .await
        .expect("first");
    session
        .submit(&small_params(), DisplayMode::Animated2D)
        .await
        .expect("second");

    // Fresh controller for the second scene.
    assert_eq!(session.playback_state().await, Some(PlaybackState::FramesLoaded));
    assert_eq!(renderer.calls().await.len(), 4);

    session.discard().await;
    assert_eq!(session.playback_state().await, Some(PlaybackState::Discarded));
    assert!(matches!(
        session.play().await,
        Err(VisualizationError::Playback(PlaybackError::Discarded))
    ));
}

// HTTP control surface for the operator station
//
// GET /controle?comando=<token>  -> 200 "OK" | 400 invalid | 403 emergency
// GET /status                    -> safety state as JSON
// GET /video_feed                -> multipart JPEG stream (best effort)

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::arbiter::CommandArbiter;
use crate::camera::{CameraFeed, MULTIPART_BOUNDARY, multipart_part};
use crate::config::CAMERA_FRAME_PERIOD;
use crate::messages::{StatusReport, Verdict};
use crate::safety::SafetyState;

#[derive(Clone)]
pub struct AppState {
    pub arbiter: Arc<CommandArbiter>,
    pub safety: SafetyState,
    pub camera: Option<CameraFeed>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/controle", get(controle))
        .route("/status", get(status))
        .route("/video_feed", get(video_feed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!("Control surface at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

impl IntoResponse for Verdict {
    fn into_response(self) -> Response {
        match self {
            Verdict::Accepted => (StatusCode::OK, "OK").into_response(),
            Verdict::Rejected(_) => {
                (StatusCode::FORBIDDEN, "EMERGENCIA: Obstáculo detectado!").into_response()
            }
            Verdict::Invalid(_) => (StatusCode::BAD_REQUEST, "Comando inválido").into_response(),
        }
    }
}

/// First `comando` value in the query string. Missing or unparseable
/// parameters give an empty token, which the arbiter rejects as invalid.
fn command_token(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> String {
    let Ok(Query(params)) = query else {
        return String::new();
    };
    params
        .into_iter()
        .find(|(key, _)| key == "comando")
        .map(|(_, value)| value)
        .unwrap_or_default()
}

async fn controle(
    State(app): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let token = command_token(query);
    let arbiter = app.arbiter.clone();

    // bus access blocks
    match tokio::task::spawn_blocking(move || arbiter.handle(&token)).await {
        Ok(Ok(verdict)) => verdict.into_response(),
        Ok(Err(e)) => {
            error!("Motor write failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!("Command handler failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn status(State(app): State<AppState>) -> Json<StatusReport> {
    Json(StatusReport::from(app.safety.snapshot()))
}

async fn video_feed(State(app): State<AppState>) -> Response {
    let Some(feed) = app.camera.filter(|feed| feed.is_running()) else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Camera unavailable").into_response();
    };

    let (tx, rx) = mpsc::channel::<Result<Vec<u8>, std::io::Error>>(2);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(CAMERA_FRAME_PERIOD);
        let mut last_seq = 0;
        while feed.is_running() {
            tick.tick().await;
            if let Some(frame) = feed.latest_after(last_seq) {
                last_seq = frame.seq;
                if tx.send(Ok(multipart_part(&frame.jpeg))).await.is_err() {
                    // client went away
                    break;
                }
            }
        }
    });

    (
        [(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={MULTIPART_BOUNDARY}"),
        )],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

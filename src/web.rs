//! Axum-based HTTP surface for sensor values and coordinator control

use crate::config::WindowConfig;
use crate::coordinator::CoordinatorHandle;
use crate::logging::get_logger;
use crate::sensors::{DeviceInfo, derive_sensors};
use axum::extract::rejection::JsonRejection;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub entry_id: String,
    pub coordinator: CoordinatorHandle,
}

impl AppState {
    pub fn new(entry_id: impl Into<String>, coordinator: CoordinatorHandle) -> Self {
        Self {
            entry_id: entry_id.into(),
            coordinator,
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn sensors(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.coordinator.state();
    Json(derive_sensors(&snapshot, &state.entry_id, Utc::now()))
}

async fn device(State(state): State<AppState>) -> impl IntoResponse {
    Json(DeviceInfo::for_entry(&state.entry_id))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let s = state.coordinator.state();
    let mut root = serde_json::json!({
        "entry_id": state.entry_id,
        "last_update_success": s.last_update_success,
        "last_error": s.last_error,
        "last_refresh": s.last_refresh,
        "last_attempt": s.last_attempt,
        "options": s.options,
        "window": serde_json::Value::Null,
    });

    if let Some(data) = s.data.as_deref() {
        root["window"] = serde_json::json!({
            "start": data.meta.window_start,
            "end": data.meta.window_end,
            "timezone_mode": data.meta.timezone_mode,
            "fetched_at": data.meta.fetched_at,
        });
        root["rows"] = serde_json::json!({
            "current": data.current.len(),
            "forecast": data.forecast.len(),
        });
    }

    Json(root)
}

async fn refresh(State(state): State<AppState>) -> Response {
    match state.coordinator.request_refresh() {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({"status": "queued"})),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

async fn get_options(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.state().options)
}

async fn put_options(
    State(state): State<AppState>,
    body: Result<Json<WindowConfig>, JsonRejection>,
) -> Response {
    let Json(options) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    if let Err(e) = options.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state.coordinator.update_options(options.clone()) {
        Ok(()) => {
            get_logger("web").info(&format!(
                "Options replaced via API for entry {}",
                state.entry_id
            ));
            (StatusCode::ACCEPTED, Json(options)).into_response()
        }
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sensors", get(sensors))
        .route("/api/device", get(device))
        .route("/api/status", get(status))
        .route("/api/refresh", post(refresh))
        .route("/api/options", get(get_options).put(put_options))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(state: AppState, host: &str, port: u16, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state);
    let logger = get_logger("web");

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;

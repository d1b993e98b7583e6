//! API route definitions.

use crate::alert::{self, lifecycle};
use crate::api::state::AppState;
use crate::detect::incident;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/incidents", get(list_incidents))
        .route("/alerts", get(list_alerts))
        .route("/alerts/{id}", get(get_alert))
        .route("/alerts/{id}/acknowledge", post(acknowledge_alert))
        .route("/alerts/{id}/resolve", post(resolve_alert))
        .route("/process", post(run_batch))
}

/// Internal errors surface as a 500 with a terse message; details go to
/// the log, not the wire.
struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal error" })),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

fn envelope(data: Value, meta: Value) -> Json<Value> {
    Json(json!({ "data": data, "meta": meta }))
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<String>,
    limit: Option<usize>,
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    let incidents =
        incident::list_recent_incidents(&state.pool, query.status.as_deref(), limit)?;
    Ok(envelope(
        serde_json::to_value(&incidents)?,
        json!({ "total": incidents.len() }),
    ))
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    let alerts = alert::list_recent_alerts(&state.pool, query.status.as_deref(), limit)?;
    Ok(envelope(
        serde_json::to_value(&alerts)?,
        json!({ "total": alerts.len() }),
    ))
}

async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match alert::get_alert(&state.pool, &id)? {
        Some(found) => Ok(envelope(serde_json::to_value(&found)?, json!({})).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "alert not found" })),
        )
            .into_response()),
    }
}

#[derive(Deserialize)]
struct AcknowledgeBody {
    user_id: String,
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AcknowledgeBody>,
) -> Result<Response, ApiError> {
    let acknowledged = lifecycle::acknowledge(&state.pool, &id, &body.user_id)?;
    if acknowledged {
        Ok(envelope(json!({ "acknowledged": true }), json!({})).into_response())
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no unacknowledged alert with that id" })),
        )
            .into_response())
    }
}

#[derive(Deserialize)]
struct ResolveBody {
    notes: String,
}

async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ResolveBody>,
) -> Result<Response, ApiError> {
    let resolved = lifecycle::resolve(&state.pool, &id, &body.notes)?;
    if resolved {
        Ok(envelope(json!({ "resolved": true }), json!({})).into_response())
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "alert not found" })),
        )
            .into_response())
    }
}

async fn run_batch(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let outcome = state.engine.process_reports().await?;
    Ok(envelope(
        serde_json::to_value(&outcome)?,
        json!({ "timestamp": chrono::Utc::now().to_rfc3339() }),
    ))
}

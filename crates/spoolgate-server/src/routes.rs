// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP routes: health, printer listing, and raw print submission.
//
// Errors are plain-text bodies with a status code; successes are JSON.
// Every response carries permissive CORS headers (including Private Network
// Access) so browser pages on other origins can reach the local agent.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use spoolgate_core::error::SpoolgateError;
use spoolgate_core::types::PrinterIdentifier;

use crate::form::PrintForm;
use crate::state::AppState;

type ApiError = (StatusCode, String);

pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit();
    Router::new()
        .route("/health", get(health).options(preflight))
        .route("/printers", get(printers).options(preflight))
        .route(
            "/print",
            post(print)
                .options(preflight)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(middleware::map_response(add_cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn add_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-private-network"),
        HeaderValue::from_static("true"),
    );
    response
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Handle GET /health.
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Spoolgate is running",
        "time": chrono::Local::now().to_rfc3339(),
    }))
}

/// Handle GET /printers.
async fn printers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    info!("fetching printer list");
    let printers = state.agent.list_printers().await.map_err(|e| {
        warn!(error = %e, "failed to list printers");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to list printers: {e}"),
        )
    })?;

    info!(count = printers.len(), "printer list ready");
    Ok(Json(json!({
        "count": printers.len(),
        "printers": printers,
    })))
}

/// Handle POST /print.
async fn print(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "unreadable print request body");
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, "Invalid form data".to_owned())
    })?;
    let form = PrintForm::parse(&body).map_err(|e| {
        warn!(error = %e.0, "invalid print request body");
        (StatusCode::BAD_REQUEST, "Invalid form data".to_owned())
    })?;

    let printer_name = form.printer_name.trim();
    if printer_name.is_empty() {
        warn!("print request without printer name");
        return Err((StatusCode::BAD_REQUEST, "Missing printerName".into()));
    }
    if form.text.is_empty() {
        warn!(printer = printer_name, "print request with empty text");
        return Err((StatusCode::BAD_REQUEST, "Missing text".into()));
    }
    if form.text.len() > state.max_payload_bytes {
        warn!(printer = printer_name, bytes = form.text.len(), "print text too large");
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Text too large (max {} MB)",
                state.max_payload_bytes / (1024 * 1024)
            ),
        ));
    }

    let printer = PrinterIdentifier::new(printer_name);
    let size = form.text.len();
    let job = state.agent.job(printer.clone(), form.text);
    let job_id = job.id;

    state.agent.submit(job).await.map_err(|e| {
        warn!(job = %job_id, printer = %printer, error = %e, "print failed");
        error_response(&e)
    })?;

    info!(job = %job_id, printer = %printer, bytes = size, "print succeeded");
    Ok(Json(json!({
        "status": "success",
        "message": format!("Printed on {printer}"),
        "printer": printer,
        "size": format!("{size} bytes"),
    })))
}

/// Map a core error onto a status code and message.
fn error_response(err: &SpoolgateError) -> ApiError {
    match err {
        SpoolgateError::DeviceOffline(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        SpoolgateError::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        e if e.is_transmission_failure() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Print failed: {err}"),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {err}"),
        ),
    }
}

// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Callable role endpoints — `POST /callable/{operation}`.
//!
//! Operation results (success or failure) are always `200 {"result": ...}`.
//! Only routing, body and throttling problems use HTTP error statuses.

use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use crate::gateway::api::auth::Caller;
use crate::gateway::api::types::{CallableRequest, CallableResponse, ProtocolError, RolePayload};
use crate::gateway::{client_key_from_headers, AppState, RATE_LIMIT_WINDOW_SECS};
use crate::identity::{RoleError, RoleOperation, RoleOutcome};

// ── Handlers ───────────────────────────────────────────────────────

/// POST /callable/{operation} — run one role operation
pub async fn call_role_operation(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Result<Json<CallableRequest<RolePayload>>, JsonRejection>,
) -> Response {
    let Ok(op) = name.parse::<RoleOperation>() else {
        return ProtocolError::new("NOT_FOUND", format!("Unknown operation: {name}"))
            .into_response_with(StatusCode::NOT_FOUND);
    };

    let payload = match body {
        Ok(Json(request)) => request.data.unwrap_or_default(),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return ProtocolError::new("INVALID_ARGUMENT", rejection.body_text())
                .into_response_with(StatusCode::PAYLOAD_TOO_LARGE);
        }
        Err(rejection) => {
            tracing::warn!(operation = %op, "malformed callable body: {rejection}");
            return ProtocolError::new("INVALID_ARGUMENT", rejection.body_text())
                .into_response_with(StatusCode::BAD_REQUEST);
        }
    };

    let client_key = match &caller {
        Ok(Some(c)) => format!("uid:{}", c.uid),
        _ => client_key_from_headers(&headers),
    };
    if !state.rate_limiter.allow_mutation(&client_key) {
        tracing::warn!(operation = %op, "role mutation rate limit exceeded for key: {client_key}");
        state.metrics.record(op.callable_name(), "rate-limited");
        return ProtocolError::new(
            "RESOURCE_EXHAUSTED",
            format!("Too many role changes. Retry in {RATE_LIMIT_WINDOW_SECS}s."),
        )
        .into_response_with(StatusCode::TOO_MANY_REQUESTS);
    }

    let outcome = match caller {
        Ok(caller) => {
            state
                .roles
                .invoke(op, caller.as_ref(), payload.email.as_deref())
                .await
        }
        // Provider outage, not a bad token.
        Err(e) => RoleOutcome::from(Err::<String, _>(RoleError::DirectoryUnavailable(e))),
    };
    state.metrics.record(op.callable_name(), outcome.label());

    Json(CallableResponse { result: outcome }).into_response()
}

// ── Router ─────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new().route("/callable/{operation}", post(call_role_operation))
}

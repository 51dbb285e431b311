// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use crate::identity::RoleOutcome;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

// ── Callable envelope ────────────────────────────────────────────

/// Inbound callable body: `{"data": ...}`. `data` may be null or absent.
#[derive(Debug, Deserialize)]
pub struct CallableRequest<T> {
    pub data: Option<T>,
}

/// Outbound callable body: `{"result": ...}`.
#[derive(Debug, Serialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

/// Payload shared by every role operation.
#[derive(Debug, Default, Deserialize)]
pub struct RolePayload {
    #[serde(default)]
    pub email: Option<String>,
}

pub type RoleResponse = CallableResponse<RoleOutcome>;

// ── Protocol errors ──────────────────────────────────────────────

/// Errors outside the operation itself (bad route, bad body, throttling).
/// Operation failures are never reported this way.
#[derive(Debug, Serialize)]
pub struct ProtocolError {
    pub error: ProtocolErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ProtocolErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl ProtocolError {
    pub fn new(status: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ProtocolErrorBody {
                status,
                message: message.into(),
            },
        }
    }

    pub fn into_response_with(self, code: StatusCode) -> Response {
        (code, Json(self)).into_response()
    }
}

// ── Health ───────────────────────────────────────────────────────

#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub directory: String,
    pub bootstrap_configured: bool,
    pub uptime_secs: u64,
}

// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use crate::gateway::AppState;
use crate::identity::{CallerContext, DirectoryError};
use std::convert::Infallible;

/// The calling account, if the request carried a token the directory accepts.
///
/// Never rejects: operations decide for themselves what an anonymous caller
/// may do, and report it in the result payload. An invalid or expired token
/// is `Ok(None)`; a provider that could not answer is `Err`.
pub struct Caller(pub Result<Option<CallerContext>, DirectoryError>);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(Caller(Ok(None)));
        };

        match state.callers.resolve(token).await {
            Ok(caller) => Ok(Caller(Ok(Some(caller)))),
            Err(DirectoryError::InvalidToken) => {
                tracing::warn!("rejected bearer token: invalid or expired");
                Ok(Caller(Ok(None)))
            }
            Err(e) => {
                tracing::error!("caller resolution failed: {e}");
                Ok(Caller(Err(e)))
            }
        }
    }
}

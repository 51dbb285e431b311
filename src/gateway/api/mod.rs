// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod auth;
pub mod roles;
pub mod types;

use axum::Router;
use crate::gateway::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().merge(roles::router())
}

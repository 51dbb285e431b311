// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Caller context: who is invoking an operation, and with which claims.
//!
//! Tokens are never validated locally. A bearer token is handed to the
//! identity provider, which answers with the account it belongs to.

use super::claims::Claims;
use super::directory::{DirectoryError, Identity};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub uid: String,
    pub email: Option<String>,
    pub claims: Claims,
}

impl CallerContext {
    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }
}

impl From<Identity> for CallerContext {
    fn from(identity: Identity) -> Self {
        Self {
            uid: identity.uid,
            email: identity.email,
            claims: identity.claims,
        }
    }
}

/// Resolves a bearer token to the calling account.
#[async_trait]
pub trait CallerResolver: Send + Sync {
    async fn resolve(&self, bearer_token: &str) -> Result<CallerContext, DirectoryError>;
}

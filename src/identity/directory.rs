// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Authentication directory abstraction.
//!
//! The directory owns identities and their claims. The gateway only ever
//! performs two calls against it: resolve an email to an identity, then
//! replace that identity's claims object.

use super::claims::Claims;
use async_trait::async_trait;
use serde::Serialize;

/// A user account as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub claims: Claims,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("There is no user record corresponding to {0}")]
    UserNotFound(String),
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),
    #[error("The ID token is invalid or has expired")]
    InvalidToken,
    #[error("Identity provider returned {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("Identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Malformed identity provider response: {0}")]
    Decode(String),
}

impl DirectoryError {
    /// Provider-side error identifier, when the failure carries one.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            DirectoryError::UserNotFound(_) => Some("USER_NOT_FOUND"),
            DirectoryError::InvalidToken => Some("INVALID_ID_TOKEN"),
            DirectoryError::Provider { message, .. } => {
                Some(message.split(':').next().unwrap_or(message).trim())
            }
            _ => None,
        }
    }
}

/// The two remote operations the role gateway depends on.
#[async_trait]
pub trait AuthDirectory: Send + Sync {
    /// Backend name, for health output and logs.
    fn name(&self) -> &str;

    /// Resolve an email address to an identity.
    async fn lookup_by_email(&self, email: &str) -> Result<Identity, DirectoryError>;

    /// Overwrite the identity's claims object. Flags not present in `claims`
    /// are removed from the identity.
    async fn replace_claims(&self, uid: &str, claims: &Claims) -> Result<(), DirectoryError>;
}

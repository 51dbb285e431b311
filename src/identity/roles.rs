// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Role assignment.
//!
//! Six operations, one shape: authorize the caller, resolve the target email
//! in the directory, then **replace** the target's claims object with a fixed
//! flag set.
//!
//! **Replacement, not merge.** Granting `author` to an existing admin writes
//! `{author: true}` and the admin flag is gone. Revoking admin drops `author`
//! and `invitado` as well. Clients that need several flags at once have no
//! operation for it; this mirrors the deployed behavior and is kept as is.
//!
//! `RestoreBootstrapAdmin` is the recovery path for the one configured
//! super-admin account: it can only be called by that account, only while it
//! is not admin, and it only ever promotes that same account.

use super::caller::CallerContext;
use super::claims::{Claims, RoleFlag};
use super::directory::{AuthDirectory, DirectoryError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The callable role operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleOperation {
    GrantAdmin,
    RevokeAdmin,
    GrantAuthor,
    RevokeAuthor,
    ResetToGuest,
    RestoreBootstrapAdmin,
}

impl RoleOperation {
    pub const ALL: [RoleOperation; 6] = [
        RoleOperation::GrantAdmin,
        RoleOperation::RevokeAdmin,
        RoleOperation::GrantAuthor,
        RoleOperation::RevokeAuthor,
        RoleOperation::ResetToGuest,
        RoleOperation::RestoreBootstrapAdmin,
    ];

    /// Name used in the callable route, e.g. `/callable/grantAdmin`.
    pub fn callable_name(self) -> &'static str {
        match self {
            RoleOperation::GrantAdmin => "grantAdmin",
            RoleOperation::RevokeAdmin => "revokeAdmin",
            RoleOperation::GrantAuthor => "grantAuthor",
            RoleOperation::RevokeAuthor => "revokeAuthor",
            RoleOperation::ResetToGuest => "resetToGuest",
            RoleOperation::RestoreBootstrapAdmin => "restoreBootstrapAdmin",
        }
    }

    /// The complete claims object written to the target.
    pub fn claims(self) -> Claims {
        match self {
            RoleOperation::GrantAdmin | RoleOperation::RestoreBootstrapAdmin => {
                Claims::new().with(RoleFlag::Admin, true)
            }
            RoleOperation::RevokeAdmin => Claims::new().with(RoleFlag::Admin, false),
            RoleOperation::GrantAuthor => Claims::new().with(RoleFlag::Author, true),
            RoleOperation::RevokeAuthor => Claims::new().with(RoleFlag::Author, false),
            RoleOperation::ResetToGuest => Claims::new()
                .with(RoleFlag::Author, false)
                .with(RoleFlag::Admin, false)
                .with(RoleFlag::Guest, true),
        }
    }

    fn success_message(self, target_email: &str) -> String {
        match self {
            RoleOperation::GrantAdmin => "Admin role granted".into(),
            RoleOperation::RevokeAdmin => "User is no longer an admin".into(),
            RoleOperation::GrantAuthor => "User is now an author".into(),
            RoleOperation::RevokeAuthor => "User is no longer an author".into(),
            RoleOperation::ResetToGuest => "User is now a guest".into(),
            RoleOperation::RestoreBootstrapAdmin => {
                format!("Admin credentials restored for {target_email}")
            }
        }
    }
}

impl fmt::Display for RoleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.callable_name())
    }
}

impl FromStr for RoleOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleOperation::ALL
            .into_iter()
            .find(|op| op.callable_name() == s)
            .ok_or_else(|| format!("Unknown operation: {s}"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("Authentication is required for this action")]
    Unauthenticated,
    #[error("You do not have permission to perform this action")]
    PermissionDenied,
    #[error("{0} is already an admin")]
    AlreadyAdmin(String),
    #[error("Only {0} can restore its admin credentials")]
    NotBootstrapAccount(String),
    #[error("No bootstrap admin account is configured")]
    BootstrapNotConfigured,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("There is no user record corresponding to {0}")]
    UserNotFound(String),
    #[error("Failed to update claims: {0}")]
    ClaimsUpdateFailed(#[source] DirectoryError),
    #[error("Identity directory unavailable: {0}")]
    DirectoryUnavailable(#[source] DirectoryError),
}

impl RoleError {
    /// Stable machine-readable code carried in the error payload.
    pub fn code(&self) -> &'static str {
        match self {
            RoleError::Unauthenticated => "unauthenticated",
            RoleError::PermissionDenied | RoleError::NotBootstrapAccount(_) => "permission-denied",
            RoleError::AlreadyAdmin(_) => "already-admin",
            RoleError::BootstrapNotConfigured => "failed-precondition",
            RoleError::InvalidArgument(_) => "invalid-argument",
            RoleError::UserNotFound(_) => "user-not-found",
            RoleError::ClaimsUpdateFailed(_) => "claims-update-failed",
            RoleError::DirectoryUnavailable(_) => "directory-unavailable",
        }
    }

    /// True when the request was rejected before the directory was contacted.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RoleError::Unauthenticated
                | RoleError::PermissionDenied
                | RoleError::AlreadyAdmin(_)
                | RoleError::NotBootstrapAccount(_)
                | RoleError::BootstrapNotConfigured
                | RoleError::InvalidArgument(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// What a caller receives: a message or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RoleOutcome {
    Success { message: String },
    Failure { error: ErrorDetails },
}

impl RoleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RoleOutcome::Success { .. })
    }

    /// `success`, or the error code.
    pub fn label(&self) -> &str {
        match self {
            RoleOutcome::Success { .. } => "success",
            RoleOutcome::Failure { error } => &error.code,
        }
    }
}

impl From<Result<String, RoleError>> for RoleOutcome {
    fn from(result: Result<String, RoleError>) -> Self {
        match result {
            Ok(message) => RoleOutcome::Success { message },
            Err(e) => RoleOutcome::Failure {
                error: ErrorDetails {
                    code: e.code().to_string(),
                    message: e.to_string(),
                },
            },
        }
    }
}

/// Authorizes and applies role changes against an injected directory.
#[derive(Clone)]
pub struct RoleGateway {
    directory: Arc<dyn AuthDirectory>,
    bootstrap_email: Option<String>,
}

impl RoleGateway {
    pub fn new(directory: Arc<dyn AuthDirectory>, bootstrap_email: Option<String>) -> Self {
        Self {
            directory,
            bootstrap_email: bootstrap_email.filter(|e| !e.trim().is_empty()),
        }
    }

    pub fn directory(&self) -> &Arc<dyn AuthDirectory> {
        &self.directory
    }

    pub fn bootstrap_email(&self) -> Option<&str> {
        self.bootstrap_email.as_deref()
    }

    pub async fn grant_admin(&self, caller: Option<&CallerContext>, email: &str) -> Result<String, RoleError> {
        self.assign(RoleOperation::GrantAdmin, caller, Some(email)).await
    }

    pub async fn revoke_admin(&self, caller: Option<&CallerContext>, email: &str) -> Result<String, RoleError> {
        self.assign(RoleOperation::RevokeAdmin, caller, Some(email)).await
    }

    pub async fn grant_author(&self, caller: Option<&CallerContext>, email: &str) -> Result<String, RoleError> {
        self.assign(RoleOperation::GrantAuthor, caller, Some(email)).await
    }

    pub async fn revoke_author(&self, caller: Option<&CallerContext>, email: &str) -> Result<String, RoleError> {
        self.assign(RoleOperation::RevokeAuthor, caller, Some(email)).await
    }

    pub async fn reset_to_guest(&self, caller: Option<&CallerContext>, email: &str) -> Result<String, RoleError> {
        self.assign(RoleOperation::ResetToGuest, caller, Some(email)).await
    }

    pub async fn restore_bootstrap_admin(&self, caller: Option<&CallerContext>) -> Result<String, RoleError> {
        let caller = caller.ok_or(RoleError::Unauthenticated)?;
        if caller.is_admin() {
            let who = caller.email.clone().unwrap_or_else(|| caller.uid.clone());
            tracing::warn!(caller = %caller.uid, "bootstrap restore refused: caller is already admin");
            return Err(RoleError::AlreadyAdmin(who));
        }
        let bootstrap = self
            .bootstrap_email
            .as_deref()
            .ok_or(RoleError::BootstrapNotConfigured)?;
        if caller.email.as_deref() != Some(bootstrap) {
            tracing::warn!(caller = %caller.uid, "bootstrap restore refused: caller is not the bootstrap account");
            return Err(RoleError::NotBootstrapAccount(bootstrap.to_owned()));
        }

        self.apply(RoleOperation::RestoreBootstrapAdmin, caller, bootstrap)
            .await
    }

    /// Run `op`. `email` is ignored by `RestoreBootstrapAdmin`.
    pub async fn execute(
        &self,
        op: RoleOperation,
        caller: Option<&CallerContext>,
        email: Option<&str>,
    ) -> Result<String, RoleError> {
        match op {
            RoleOperation::RestoreBootstrapAdmin => self.restore_bootstrap_admin(caller).await,
            _ => self.assign(op, caller, email).await,
        }
    }

    /// Like [`execute`](Self::execute), folded into the payload returned to
    /// callers. Never fails.
    pub async fn invoke(
        &self,
        op: RoleOperation,
        caller: Option<&CallerContext>,
        email: Option<&str>,
    ) -> RoleOutcome {
        self.execute(op, caller, email).await.into()
    }

    async fn assign(
        &self,
        op: RoleOperation,
        caller: Option<&CallerContext>,
        email: Option<&str>,
    ) -> Result<String, RoleError> {
        let caller = caller.ok_or(RoleError::Unauthenticated)?;
        if !caller.is_admin() {
            tracing::warn!(operation = %op, caller = %caller.uid, "role change refused: caller is not admin");
            return Err(RoleError::PermissionDenied);
        }

        let email = email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| RoleError::InvalidArgument("email is required".into()))?;

        self.apply(op, caller, email).await
    }

    /// Lookup then replace. The second call needs the uid from the first.
    async fn apply(
        &self,
        op: RoleOperation,
        caller: &CallerContext,
        email: &str,
    ) -> Result<String, RoleError> {
        let identity = match self.directory.lookup_by_email(email).await {
            Ok(identity) => identity,
            Err(DirectoryError::UserNotFound(_)) => {
                tracing::warn!(operation = %op, target = %email, "target user not found");
                return Err(RoleError::UserNotFound(email.to_owned()));
            }
            Err(e) => {
                tracing::error!(operation = %op, target = %email, "directory lookup failed: {e}");
                return Err(RoleError::DirectoryUnavailable(e));
            }
        };

        let claims = op.claims();
        if let Err(e) = self.directory.replace_claims(&identity.uid, &claims).await {
            tracing::error!(operation = %op, target = %email, uid = %identity.uid, "claims update failed: {e}");
            return Err(RoleError::ClaimsUpdateFailed(e));
        }

        tracing::info!(
            operation = %op,
            caller = %caller.uid,
            target = %email,
            uid = %identity.uid,
            "claims replaced"
        );
        Ok(op.success_message(email))
    }
}

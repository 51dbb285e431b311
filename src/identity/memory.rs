// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! In-process directory for local development and tests.
//!
//! Seeded from `[[directory.users]]` in the config file. Each seeded user may
//! carry a static bearer token that stands in for a real ID token.

use super::caller::{CallerContext, CallerResolver};
use super::claims::Claims;
use super::directory::{AuthDirectory, DirectoryError, Identity};
use crate::config::DirectoryUserConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: Mutex<HashMap<String, Identity>>,
    tokens: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, Claims)>>,
    calls: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: &[DirectoryUserConfig]) -> Self {
        let dir = Self::new();
        for user in seed {
            let uid = user
                .uid
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
            dir.insert(Identity {
                uid: uid.clone(),
                email: Some(user.email.clone()),
                claims: Claims::from(user.claims.clone()),
            });
            if let Some(token) = &user.token {
                dir.issue_token(&uid, token);
            }
        }
        dir
    }

    pub fn insert(&self, identity: Identity) {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(identity.uid.clone(), identity);
    }

    /// Register `token` as a bearer credential for `uid`.
    pub fn issue_token(&self, uid: &str, token: &str) {
        self.tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(token.to_owned(), uid.to_owned());
    }

    pub fn get(&self, uid: &str) -> Option<Identity> {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(uid)
            .cloned()
    }

    /// Every `(uid, claims)` pair written so far, oldest first.
    pub fn writes(&self) -> Vec<(String, Claims)> {
        self.writes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn last_write(&self) -> Option<(String, Claims)> {
        self.writes().pop()
    }

    /// Number of directory operations served (lookups and writes).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuthDirectory for InMemoryDirectory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Identity, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let users = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        users
            .values()
            .find(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(email.to_owned()))
    }

    async fn replace_claims(&self, uid: &str, claims: &Claims) -> Result<(), DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        claims.validate().map_err(DirectoryError::InvalidClaims)?;

        let mut users = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let user = users
            .get_mut(uid)
            .ok_or_else(|| DirectoryError::UserNotFound(uid.to_owned()))?;
        user.claims = claims.clone();

        self.writes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((uid.to_owned(), claims.clone()));
        Ok(())
    }
}

#[async_trait]
impl CallerResolver for InMemoryDirectory {
    async fn resolve(&self, bearer_token: &str) -> Result<CallerContext, DirectoryError> {
        let uid = self
            .tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(bearer_token)
            .cloned()
            .ok_or(DirectoryError::InvalidToken)?;
        self.get(&uid)
            .map(CallerContext::from)
            .ok_or(DirectoryError::InvalidToken)
    }
}

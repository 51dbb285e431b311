// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod caller;
pub mod claims;
pub mod directory;
pub mod memory;
pub mod roles;
pub mod toolkit;

pub use caller::{CallerContext, CallerResolver};
pub use claims::{Claims, RoleFlag};
pub use directory::{AuthDirectory, DirectoryError, Identity};
pub use memory::InMemoryDirectory;
pub use roles::{RoleError, RoleGateway, RoleOperation, RoleOutcome};
pub use toolkit::IdentityToolkitDirectory;

use crate::config::DirectoryConfig;
use std::sync::Arc;

/// A directory backend seen through both of its roles: claims store for the
/// role gateway, and token resolver for inbound callers.
#[derive(Clone)]
pub struct DirectoryBackend {
    pub directory: Arc<dyn AuthDirectory>,
    pub callers: Arc<dyn CallerResolver>,
}

impl DirectoryBackend {
    pub fn new<D>(backend: Arc<D>) -> Self
    where
        D: AuthDirectory + CallerResolver + 'static,
    {
        Self {
            directory: backend.clone(),
            callers: backend,
        }
    }
}

/// Factory: create the configured directory backend.
pub fn create_directory(config: &DirectoryConfig) -> anyhow::Result<DirectoryBackend> {
    match config.backend.as_str() {
        "identity_toolkit" => {
            if config.access_token.is_none() {
                tracing::warn!("identity_toolkit backend has no access token; admin calls will be rejected unless an emulator is used");
            }
            Ok(DirectoryBackend::new(Arc::new(IdentityToolkitDirectory::new(config)?)))
        }
        "memory" => {
            let dir = InMemoryDirectory::from_seed(&config.users);
            tracing::info!(users = dir.len(), "using in-memory directory");
            Ok(DirectoryBackend::new(Arc::new(dir)))
        }
        other => anyhow::bail!("Unknown directory backend '{other}' (expected 'identity_toolkit' or 'memory')"),
    }
}

// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable holding the directory's server access token.
pub const ENV_ACCESS_TOKEN: &str = "CLAIMS_GATEWAY_ACCESS_TOKEN";
/// Environment variable overriding `[bootstrap] admin_email`.
pub const ENV_BOOTSTRAP_EMAIL: &str = "CLAIMS_GATEWAY_BOOTSTRAP_EMAIL";

const REDACTED: &str = "***";

// ── Top-level ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub directory: DirectoryConfig,
    pub bootstrap: BootstrapConfig,
    pub observability: ObservabilityConfig,
    /// Where this config was loaded from. Not serialized.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
    #[serde(skip)]
    pub source: ConfigSource,
}

/// How [`Config::load`] arrived at its values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from `config_path`.
    File,
    /// `config_path` does not exist; defaults apply.
    Missing,
    /// No path could be determined (no home directory).
    #[default]
    Defaults,
}

// ── Gateway ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Allow binding to a non-loopback address.
    pub allow_public_bind: bool,
    pub request_timeout_secs: u64,
    /// Role mutations per client per minute. 0 disables the limit.
    pub mutations_per_minute: u32,
    /// Extra CORS origins allowed to call the gateway from a browser.
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            allow_public_bind: false,
            request_timeout_secs: 30,
            mutations_per_minute: 30,
            allowed_origins: Vec::new(),
        }
    }
}

// ── Directory ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// `identity_toolkit` or `memory`.
    pub backend: String,
    /// Base URL of the Identity Toolkit API (or emulator).
    pub endpoint: Option<String>,
    pub project_id: Option<String>,
    /// Web API key used to resolve caller ID tokens.
    pub api_key: Option<String>,
    /// Server access token for project-scoped admin calls.
    pub access_token: Option<String>,
    /// Seed accounts for the `memory` backend.
    pub users: Vec<DirectoryUserConfig>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: "identity_toolkit".into(),
            endpoint: None,
            project_id: None,
            api_key: None,
            access_token: None,
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUserConfig {
    pub email: String,
    #[serde(default)]
    pub uid: Option<String>,
    /// Static bearer token accepted for this account.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub claims: BTreeMap<String, bool>,
}

// ── Bootstrap ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// The one account allowed to restore its own admin flag.
    pub admin_email: Option<String>,
}

// ── Observability ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub log_level: String,
    pub ansi: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            ansi: true,
        }
    }
}

impl ObservabilityConfig {
    pub fn level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl Config {
    /// `<config_dir>/claims-gateway/config.toml` for the current user.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "claims-gateway")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` (or the default location), then apply environment
    /// overrides. A missing file yields defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(raw) => expand_path(raw)?,
            None => match Self::default_path() {
                Some(p) => p,
                None => {
                    let mut config = Self::default();
                    config.apply_env_overrides();
                    return Ok(config);
                }
            },
        };

        let mut config = Self::load_file(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                config_path: Some(path.to_path_buf()),
                source: ConfigSource::Missing,
                ..Self::default()
            });
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        config.source = ConfigSource::File;
        Ok(config)
    }

    /// Report where the config came from. Call once logging is set up.
    pub fn log_source(&self) {
        let path = self
            .config_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match self.source {
            ConfigSource::File => tracing::info!(path = %path, "loaded config"),
            ConfigSource::Missing => {
                tracing::info!(path = %path, "config file not found, using defaults")
            }
            ConfigSource::Defaults => {
                tracing::warn!("no home directory found; using default config")
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(token) = non_empty_env(ENV_ACCESS_TOKEN) {
            self.directory.access_token = Some(token);
        }
        if let Some(email) = non_empty_env(ENV_BOOTSTRAP_EMAIL) {
            self.bootstrap.admin_email = Some(email);
        }
    }

    /// Copy with secrets masked, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some(REDACTED.into());
            }
        };
        mask(&mut copy.directory.api_key);
        mask(&mut copy.directory.access_token);
        for user in &mut copy.directory.users {
            mask(&mut user.token);
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Failed to expand config path '{raw}'"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Custom claims attached to an identity by the directory.
//!
//! A claims object is a flat map of role flag → bool. Writing claims always
//! replaces the whole object; nothing in this crate merges flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Claim names the identity provider reserves for its own tokens.
pub const RESERVED_CLAIMS: &[&str] = &[
    "acr", "amr", "at_hash", "aud", "auth_time", "azp", "cnf", "c_hash", "exp", "firebase",
    "iat", "iss", "jti", "nbf", "nonce", "sub",
];

/// Maximum size of the serialized claims payload accepted by the provider.
pub const MAX_CLAIMS_BYTES: usize = 1000;

/// Role flags this gateway knows how to assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleFlag {
    Admin,
    Author,
    /// Guest flag. The wire name is kept for compatibility with existing clients.
    Guest,
}

impl RoleFlag {
    pub fn claim_name(self) -> &'static str {
        match self {
            RoleFlag::Admin => "admin",
            RoleFlag::Author => "author",
            RoleFlag::Guest => "invitado",
        }
    }
}

impl fmt::Display for RoleFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.claim_name())
    }
}

/// A claims object: role name → flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, bool>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style flag setter.
    pub fn with(mut self, flag: RoleFlag, value: bool) -> Self {
        self.set(flag, value);
        self
    }

    pub fn set(&mut self, flag: RoleFlag, value: bool) {
        self.0.insert(flag.claim_name().to_string(), value);
    }

    /// Returns the flag value, or `None` when the claim is not present.
    pub fn get(&self, flag: RoleFlag) -> Option<bool> {
        self.0.get(flag.claim_name()).copied()
    }

    /// Only an explicit `true` counts; missing or `false` is not admin.
    pub fn is_admin(&self) -> bool {
        self.get(RoleFlag::Admin) == Some(true)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Parse the provider's `customAttributes` string.
    ///
    /// Non-boolean attributes set by other tooling are skipped rather than
    /// rejected; they are not role flags.
    pub fn from_attributes(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
        let flags = value
            .into_iter()
            .filter_map(|(k, v)| v.as_bool().map(|b| (k, b)))
            .collect();
        Ok(Self(flags))
    }

    /// Serialize into the provider's `customAttributes` string.
    pub fn to_attributes(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Check the object against the provider's write rules.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = self.0.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
            return Err(format!("claim '{name}' is reserved"));
        }
        let size = self.to_attributes().map_err(|e| e.to_string())?.len();
        if size > MAX_CLAIMS_BYTES {
            return Err(format!(
                "claims payload is {size} bytes, limit is {MAX_CLAIMS_BYTES}"
            ));
        }
        Ok(())
    }
}

impl FromIterator<(RoleFlag, bool)> for Claims {
    fn from_iter<I: IntoIterator<Item = (RoleFlag, bool)>>(iter: I) -> Self {
        let mut claims = Claims::new();
        for (flag, value) in iter {
            claims.set(flag, value);
        }
        claims
    }
}

impl From<BTreeMap<String, bool>> for Claims {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self(map)
    }
}

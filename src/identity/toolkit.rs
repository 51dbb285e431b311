// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Identity Toolkit v1 REST client.
//!
//! Project-scoped admin calls (`accounts:lookup`, `accounts:update`) carry a
//! server access token. Caller tokens are resolved through the public
//! `accounts:lookup` endpoint, so the provider does the verification.
//! Point `endpoint` at an emulator for local runs.

use super::caller::{CallerContext, CallerResolver};
use super::claims::Claims;
use super::directory::{AuthDirectory, DirectoryError, Identity};
use crate::config::DirectoryConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

#[derive(Debug, Clone)]
pub struct IdentityToolkitDirectory {
    client: Client,
    endpoint: String,
    project_id: String,
    api_key: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    custom_attributes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl UserRecord {
    fn into_identity(self) -> Result<Identity, DirectoryError> {
        let claims = match self.custom_attributes.as_deref() {
            Some(raw) => Claims::from_attributes(raw)
                .map_err(|e| DirectoryError::Decode(format!("customAttributes: {e}")))?,
            None => Claims::default(),
        };
        Ok(Identity {
            uid: self.local_id,
            email: self.email,
            claims,
        })
    }
}

impl IdentityToolkitDirectory {
    pub fn new(config: &DirectoryConfig) -> anyhow::Result<Self> {
        let project_id = config
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("[directory] project_id is required for the identity_toolkit backend"))?;

        Ok(Self {
            client: Client::new(),
            endpoint: config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            project_id,
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn project_url(&self, method: &str) -> String {
        format!("{}/v1/projects/{}/{method}", self.endpoint, self.project_id)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Turn a non-2xx response into `DirectoryError::Provider`, keeping the
    /// provider's error message when the body is the usual error envelope.
    async fn check(resp: Response) -> Result<Response, DirectoryError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|env| env.error.message)
            .unwrap_or(text);
        Err(DirectoryError::Provider {
            status: status.as_u16(),
            message,
        })
    }

    async fn lookup(&self, req: RequestBuilder) -> Result<Option<Identity>, DirectoryError> {
        let resp = Self::check(req.send().await?).await?;
        let body: LookupResponse = resp
            .json()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))?;
        body.users
            .into_iter()
            .next()
            .map(UserRecord::into_identity)
            .transpose()
    }
}

fn is_code(err: &DirectoryError, codes: &[&str]) -> bool {
    err.provider_code().is_some_and(|c| codes.contains(&c))
}

#[async_trait]
impl AuthDirectory for IdentityToolkitDirectory {
    fn name(&self) -> &str {
        "identity_toolkit"
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Identity, DirectoryError> {
        let req = self
            .authorize(self.client.post(self.project_url("accounts:lookup")))
            .json(&serde_json::json!({ "email": [email] }));

        match self.lookup(req).await {
            Ok(Some(identity)) => Ok(identity),
            Ok(None) => Err(DirectoryError::UserNotFound(email.to_owned())),
            Err(e) if is_code(&e, &["USER_NOT_FOUND", "EMAIL_NOT_FOUND"]) => {
                Err(DirectoryError::UserNotFound(email.to_owned()))
            }
            Err(e) => Err(e),
        }
    }

    async fn replace_claims(&self, uid: &str, claims: &Claims) -> Result<(), DirectoryError> {
        claims.validate().map_err(DirectoryError::InvalidClaims)?;
        let attributes = claims
            .to_attributes()
            .map_err(|e| DirectoryError::InvalidClaims(e.to_string()))?;

        let req = self
            .authorize(self.client.post(self.project_url("accounts:update")))
            .json(&serde_json::json!({
                "localId": uid,
                "customAttributes": attributes,
            }));

        match Self::check(req.send().await?).await {
            Ok(_) => Ok(()),
            Err(e) if is_code(&e, &["USER_NOT_FOUND"]) => {
                Err(DirectoryError::UserNotFound(uid.to_owned()))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CallerResolver for IdentityToolkitDirectory {
    async fn resolve(&self, bearer_token: &str) -> Result<CallerContext, DirectoryError> {
        let url = format!("{}/v1/accounts:lookup", self.endpoint);
        let mut req = self.client.post(url);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }
        let req = req.json(&serde_json::json!({ "idToken": bearer_token }));

        match self.lookup(req).await {
            Ok(Some(identity)) => Ok(identity.into()),
            Ok(None) => Err(DirectoryError::InvalidToken),
            Err(e)
                if is_code(
                    &e,
                    &["INVALID_ID_TOKEN", "TOKEN_EXPIRED", "USER_NOT_FOUND", "USER_DISABLED"],
                ) =>
            {
                Err(DirectoryError::InvalidToken)
            }
            Err(e) => Err(e),
        }
    }
}

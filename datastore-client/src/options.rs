//! Connection parameters for a store client.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Production REST endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://datastore.googleapis.com";

/// Request timeout applied by the HTTP transport.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// `host:port` of a running emulator.
pub const EMULATOR_HOST_ENV: &str = "DATASTORE_EMULATOR_HOST";

/// Project id used when none is configured explicitly.
pub const PROJECT_ID_ENV: &str = "DATASTORE_PROJECT_ID";

const GOOGLE_CLOUD_PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

/// Service-account credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_email", &self.client_email)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything needed to bind a client to one store instance.
///
/// Field names follow the `camelCase` layout of the Datastore client options
/// so configuration files written for other clients deserialize as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatastoreOptions {
    /// Google Cloud project that owns the store.
    pub project_id: Option<String>,
    /// Path to a service-account JSON key. Its `project_id` is used when
    /// `project_id` is not set.
    pub key_file: Option<PathBuf>,
    pub credentials: Option<Credentials>,
    /// Endpoint override: a full URL, or a bare `host:port` for an emulator.
    pub api_endpoint: Option<String>,
    /// Partition namespace applied to every key and query.
    pub namespace: Option<String>,
    /// OAuth2 bearer token sent with every request.
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for DatastoreOptions {
    fn default() -> Self {
        Self {
            project_id: None,
            key_file: None,
            credentials: None,
            api_endpoint: None,
            namespace: None,
            access_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    project_id: Option<String>,
}

impl DatastoreOptions {
    /// Options pointing at an emulator listening on `host` (`host:port`).
    pub fn for_emulator(host: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            api_endpoint: Some(host.into()),
            ..Default::default()
        }
    }

    /// Reads the emulator host and project id from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            project_id: non_empty(PROJECT_ID_ENV).or_else(|| non_empty(GOOGLE_CLOUD_PROJECT_ENV)),
            api_endpoint: non_empty(EMULATOR_HOST_ENV),
            ..Default::default()
        }
    }

    /// Base URL requests are sent to, without trailing slash.
    pub fn endpoint_url(&self) -> String {
        match self.api_endpoint.as_deref().map(str::trim) {
            Some(endpoint) if endpoint.contains("://") => {
                endpoint.trim_end_matches('/').to_string()
            }
            Some(host) if !host.is_empty() => format!("http://{}", host.trim_end_matches('/')),
            _ => DEFAULT_API_ENDPOINT.to_string(),
        }
    }

    /// Returns the configured project id, falling back to the key file.
    pub fn resolve_project_id(&self) -> StoreResult<String> {
        if let Some(project_id) = self.project_id.as_deref().filter(|p| !p.is_empty()) {
            return Ok(project_id.to_string());
        }

        if let Some(path) = &self.key_file {
            let raw = std::fs::read_to_string(path)?;
            let key: ServiceAccountKey = serde_json::from_str(&raw)?;
            if let Some(project_id) = key.project_id.filter(|p| !p.is_empty()) {
                return Ok(project_id);
            }
            return Err(StoreError::Config(format!(
                "key file {} has no project_id",
                path.display()
            )));
        }

        Err(StoreError::Config("project id is required".to_string()))
    }
}

//! Platform session
//!
//! An immutable session value (host, credential, tenant) constructed once
//! and shared by reference across concurrent calls. The session probe is the
//! only endpoint besides the job service the platform exposes; it verifies
//! the credential and that the configured tenant is in scope before any
//! operation runs.

use crate::config::ResolvedConfig;
use crate::error::{Error, Result};
use crate::fields::Fields;
use crate::platform::http::HttpClient;
use serde_json::Value;
use url::Url;

/// Path of the session/auth probe endpoint
const SESSION_PATH: &str = "api/session";
/// Path of the job-execution service
const PROCESSES_PATH: &str = "api/processes";

/// Immutable authenticated session. Read-only after construction and safe
/// for concurrent reuse.
#[derive(Clone, Debug)]
pub struct Session {
    host: Url,
    user: String,
    secret: String,
    tenant: String,
    email: String,
    http: HttpClient,
}

impl Session {
    /// Build a session without probing the platform
    pub fn new(config: &ResolvedConfig) -> Result<Self> {
        let host = Url::parse(&config.host)
            .map_err(|e| Error::Validation(format!("invalid host '{}': {}", config.host, e)))?;
        if host.cannot_be_a_base() {
            return Err(Error::Validation(format!(
                "host '{}' is not a usable base URL",
                config.host
            )));
        }

        let http = HttpClient::new(&config.user, &config.secret)?;

        Ok(Self {
            host,
            user: config.user.clone(),
            secret: config.secret.clone(),
            tenant: config.tenant.clone(),
            email: config.email.clone(),
            http,
        })
    }

    /// Build a session and verify it against the session endpoint
    pub async fn connect(config: &ResolvedConfig) -> Result<Self> {
        let session = Self::new(config)?;
        session.probe().await?;
        Ok(session)
    }

    /// Probe the session endpoint: verifies the credential and that the
    /// configured tenant appears in the returned account list. A missing
    /// tenant is a hard configuration error, not a retryable condition.
    pub async fn probe(&self) -> Result<Value> {
        let body = self.http.get(&self.session_url(), &[]).await?;

        let accounts: Vec<&str> = body
            .get("accounts")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a.get("name").and_then(|n| n.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        if !accounts.contains(&self.tenant.as_str()) {
            return Err(Error::Validation(format!(
                "tenant '{}' is not in the account list for user '{}'",
                self.tenant, self.user
            )));
        }

        tracing::debug!(tenant = %self.tenant, "session verified");
        Ok(body)
    }

    /// Identity of the authenticated caller as reported by the platform,
    /// returned as an opaque map.
    pub async fn caller_identity(&self) -> Result<Fields> {
        let body = self.probe().await?;
        match body {
            Value::Object(map) => Ok(map),
            other => Err(Error::MalformedResponse(format!(
                "session payload is not an object: {}",
                other
            ))),
        }
    }

    /// HTTP client bound to this session's credential
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Credential secret, embedded in job submissions so the script's own
    /// platform calls run as the caller. Never logged.
    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// URL of the session probe endpoint
    pub fn session_url(&self) -> String {
        self.join(SESSION_PATH)
    }

    /// URL of the job-creation endpoint
    pub fn processes_url(&self) -> String {
        self.join(PROCESSES_PATH)
    }

    /// Absolute URL for a platform-issued href (hrefs come back
    /// host-relative)
    pub fn href_url(&self, href: &str) -> String {
        self.join(href.trim_start_matches('/'))
    }

    fn join(&self, path: &str) -> String {
        self.host
            .join(path)
            .map(|u| u.to_string())
            // The host was validated as a base URL; joining a relative
            // path cannot fail, but never panic on a platform-issued href.
            .unwrap_or_else(|_| format!("{}{}", self.host, path))
    }
}

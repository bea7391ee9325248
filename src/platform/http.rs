//! HTTP utilities for platform REST calls

use crate::error::{classify_status, Error, Result};
use reqwest::Client;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..MAX_LOG_BODY_LENGTH],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for platform API calls. Carries the basic-auth
/// credential; safe to share across concurrent calls.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    user: String,
    secret: String,
}

impl HttpClient {
    /// Create a new HTTP client for the given credential
    pub fn new(user: &str, secret: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("flowbridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            user: user.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Make a GET request, optionally with query parameters
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(query)
            .basic_auth(&self.user, Some(&self.secret))
            .send()
            .await?;

        Self::into_json(response).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.secret))
            .json(body)
            .send()
            .await?;

        Self::into_json(response).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<Value> {
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .basic_auth(&self.user, Some(&self.secret))
            .send()
            .await?;

        Self::into_json(response).await
    }

    async fn into_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Security: only log sanitized/truncated error bodies
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(classify_status(status.as_u16(), &sanitize_for_log(&body)));
        }

        // Handle empty response
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("response is not JSON: {}", e)))
    }
}

//! HTTP implementation of the remote job source
//!
//! Every response comes wrapped in an envelope:
//! `{"success": true, "data": {...}}` or
//! `{"success": false, "error": {"code": "...", "message": "..."}}`.
//! The envelope is unwrapped here so callers only ever see the payload.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{ConversationSource, JobSource, SourceError};
use crate::config::ApiConfig;
use crate::domain::{ConversationState, JobState, MessageBatch};

/// Environment variable that overrides the configured base URL
pub const BASE_URL_ENV: &str = "HYPERPLEXITY_API_URL";

/// Maximum characters of a non-JSON error body carried into the error
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Pick the effective base URL; a non-empty override wins over config
pub fn resolve_base_url(configured: &str, env_override: Option<String>) -> String {
    debug!(%configured, ?env_override, "resolve_base_url: called");
    match env_override.map(|s| s.trim().trim_end_matches('/').to_string()) {
        Some(url) if !url.is_empty() => url,
        _ => configured.trim_end_matches('/').to_string(),
    }
}

/// Remote job source speaking the REST API
pub struct HttpSource {
    base_url: String,
    api_key: String,
    http: Client,
}

impl HttpSource {
    /// Create a source with an explicit base URL and key
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?timeout, "HttpSource::new: called");
        let http = Client::builder().timeout(timeout).build().map_err(SourceError::Network)?;
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http,
        })
    }

    /// Create a source from configuration, reading the key from the environment
    pub fn from_config(config: &ApiConfig) -> Result<Self, SourceError> {
        debug!(?config, "HttpSource::from_config: called");
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SourceError::MissingApiKey(config.api_key_env.clone()))?;
        let base_url = resolve_base_url(&config.base_url, std::env::var(BASE_URL_ENV).ok());
        Self::new(base_url, api_key, Duration::from_millis(config.timeout_ms))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a path and unwrap the response envelope
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "get_json: called");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), body_len = text.len(), "get_json: response received");
        unwrap_envelope(status.as_u16(), status.is_success(), &text)
    }

    async fn get_typed<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, SourceError> {
        let value = self.get_json(path, query).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Turn an HTTP body into the payload it carries, or the error it reports
///
/// The body is parsed before the status is checked so a non-2xx response
/// still surfaces the backend's own error message.
fn unwrap_envelope(status: u16, success: bool, text: &str) -> Result<Value, SourceError> {
    debug!(status, success, "unwrap_envelope: called");
    let body: Value = match serde_json::from_str(text) {
        Ok(body) => body,
        Err(e) if success => {
            debug!(error = %e, "unwrap_envelope: 2xx body is not JSON");
            return Err(SourceError::InvalidResponse(format!("response is not JSON: {}", e)));
        }
        Err(_) => {
            debug!("unwrap_envelope: error body is not JSON");
            return Err(SourceError::Api {
                status,
                code: String::new(),
                message: truncate(text),
            });
        }
    };

    if body.get("success") == Some(&Value::Bool(false)) {
        debug!("unwrap_envelope: success=false envelope");
        let err = body
            .get("error")
            .filter(|e| !e.is_null())
            .or_else(|| body.get("message"))
            .cloned()
            .unwrap_or_else(|| Value::String("API returned success=false".to_string()));
        let (code, message) = match err {
            Value::Object(map) => (
                map.get("code").and_then(Value::as_str).unwrap_or_default().to_string(),
                map.get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            ),
            Value::String(s) => (String::new(), s),
            other => (String::new(), other.to_string()),
        };
        return Err(SourceError::Api { status, code, message });
    }

    if !success {
        debug!(status, "unwrap_envelope: non-2xx without error envelope");
        return Err(SourceError::Api {
            status,
            code: String::new(),
            message: truncate(text),
        });
    }

    match body {
        Value::Object(mut map) if map.contains_key("data") => Ok(map.remove("data").unwrap_or(Value::Null)),
        other => Ok(other),
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[async_trait]
impl JobSource for HttpSource {
    async fn get_status(&self, job_id: &str) -> Result<JobState, SourceError> {
        debug!(%job_id, "get_status: called");
        let mut state: JobState = self.get_typed(&format!("/jobs/{}", job_id), &[]).await?;
        if state.job_id.is_none() {
            state.job_id = Some(job_id.to_string());
        }
        Ok(state)
    }

    async fn get_messages(&self, job_id: &str, since: Option<u64>) -> Result<MessageBatch, SourceError> {
        debug!(%job_id, ?since, "get_messages: called");
        let query: Vec<(&str, String)> = since.map(|s| ("since_seq", s.to_string())).into_iter().collect();
        self.get_typed(&format!("/jobs/{}/messages", job_id), &query).await
    }
}

#[async_trait]
impl ConversationSource for HttpSource {
    async fn get_conversation(
        &self,
        conversation_id: &str,
        session_id: &str,
    ) -> Result<ConversationState, SourceError> {
        debug!(%conversation_id, %session_id, "get_conversation: called");
        let mut state: ConversationState = self
            .get_typed(
                &format!("/conversations/{}", conversation_id),
                &[("session_id", session_id.to_string())],
            )
            .await?;
        state.fill_ids(conversation_id, session_id);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_data_envelope() {
        let body = json!({"success": true, "data": {"job_id": "j1"}}).to_string();
        let value = unwrap_envelope(200, true, &body).unwrap();
        assert_eq!(value, json!({"job_id": "j1"}));
    }

    #[test]
    fn test_bare_body_passes_through() {
        let value = unwrap_envelope(200, true, r#"{"status": "queued"}"#).unwrap();
        assert_eq!(value["status"], "queued");
    }

    #[test]
    fn test_structured_error_envelope() {
        let body = json!({"success": false, "error": {"code": "missing_config", "message": "no config"}}).to_string();
        match unwrap_envelope(400, false, &body) {
            Err(SourceError::Api { status, code, message }) => {
                assert_eq!(status, 400);
                assert_eq!(code, "missing_config");
                assert_eq!(message, "no config");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_string_error_envelope_on_2xx() {
        let body = json!({"success": false, "error": "quota exceeded"}).to_string();
        match unwrap_envelope(200, true, &body) {
            Err(SourceError::Api { message, code, .. }) => {
                assert_eq!(message, "quota exceeded");
                assert!(code.is_empty());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_json_error_body_is_truncated() {
        let body = "x".repeat(2000);
        match unwrap_envelope(502, false, &body) {
            Err(SourceError::Api { status, message, .. }) => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_json_success_body_is_invalid() {
        assert!(matches!(
            unwrap_envelope(200, true, "<html>"),
            Err(SourceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_json_error_without_envelope() {
        match unwrap_envelope(404, false, r#"{"detail": "not found"}"#) {
            Err(SourceError::Api { status, message, .. }) => {
                assert_eq!(status, 404);
                assert!(message.contains("not found"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_base_url() {
        assert_eq!(
            resolve_base_url("https://api.example.com/v1/", None),
            "https://api.example.com/v1"
        );
        assert_eq!(
            resolve_base_url("https://api.example.com/v1", Some("http://localhost:9000/".to_string())),
            "http://localhost:9000"
        );
        assert_eq!(
            resolve_base_url("https://api.example.com/v1", Some("  ".to_string())),
            "https://api.example.com/v1"
        );
    }
}

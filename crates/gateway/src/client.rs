//! Records API HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). One method per
//! remote call; each either decodes the expected shape or returns a
//! [`GatewayError`]. Nothing here retries.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::GatewayError;
use crate::export::{CleanSource, ExportResult};
use crate::model::{ChangeSet, ChartKind, EntityDraft, Province, StudentRecord};

pub const DEFAULT_API_BASE: &str = "http://localhost:5000";
const USER_AGENT: &str = concat!("examdesk/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`GatewayClient`].
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Records API client (blocking).
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    api_base: Url,
}

impl GatewayClient {
    pub fn new(opts: GatewayOptions) -> Result<Self, GatewayError> {
        let api_base = Url::parse(opts.api_base.trim())
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", opts.api_base, e)))?;
        if api_base.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(opts.api_base));
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(opts.timeout)
            .build()
            .map_err(|e| GatewayError::Network(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, api_base })
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_str().trim_end_matches('/')
    }

    /// Resolve a server-relative path such as a `download_url`.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.api_base(), path.trim_start_matches('/'))
    }

    // ── Students ────────────────────────────────────────────────────

    /// `POST /students`
    pub fn create_student(&self, draft: &EntityDraft) -> Result<Value, GatewayError> {
        let url = self.endpoint(&["students"])?;
        let body = self.send(self.http.post(url).json(draft))?;
        decode_ack(&body)
    }

    /// `GET /students/{id}`: every record with that identifier, all years.
    pub fn fetch_student(&self, id: &str) -> Result<Vec<StudentRecord>, GatewayError> {
        let url = self.endpoint(&["students", id])?;
        let body = self.send(self.http.get(url))?;
        decode(&body)
    }

    /// `PUT /students/{id}/{year}`
    pub fn update_student(
        &self,
        id: &str,
        year: &str,
        changes: &ChangeSet,
    ) -> Result<Value, GatewayError> {
        let url = self.endpoint(&["students", id, year])?;
        let body = self.send(self.http.put(url).json(changes))?;
        decode_ack(&body)
    }

    /// `DELETE /students/{id}/{year}`
    pub fn delete_student(&self, id: &str, year: &str) -> Result<Value, GatewayError> {
        let url = self.endpoint(&["students", id, year])?;
        let body = self.send(self.http.delete(url))?;
        decode_ack(&body)
    }

    // ── Export / clean ──────────────────────────────────────────────

    /// `POST /save`
    pub fn save_export(&self) -> Result<ExportResult, GatewayError> {
        let url = self.endpoint(&["save"])?;
        let body = self.send(self.http.post(url))?;
        decode(&body)
    }

    /// `POST /clean/{source}`
    pub fn clean(&self, source: CleanSource) -> Result<ExportResult, GatewayError> {
        let url = self.endpoint(&["clean", source.as_segment()])?;
        let body = self.send(self.http.post(url).header("Accept", "application/json"))?;
        decode(&body)
    }

    // ── History ─────────────────────────────────────────────────────

    /// `GET /history`, undecoded.
    ///
    /// The audit log may carry non-finite number literals that strict JSON
    /// rejects, so decoding is left to the caller.
    pub fn fetch_history_text(&self) -> Result<String, GatewayError> {
        let url = self.endpoint(&["history"])?;
        self.send(self.http.get(url))
    }

    /// `DELETE /history`
    pub fn clear_history(&self) -> Result<Value, GatewayError> {
        let url = self.endpoint(&["history"])?;
        let body = self.send(self.http.delete(url))?;
        decode_ack(&body)
    }

    /// `DELETE /history/{index}`: index into the server's stored order.
    pub fn delete_history_item(&self, index: usize) -> Result<Value, GatewayError> {
        let index = index.to_string();
        let url = self.endpoint(&["history", &index])?;
        let body = self.send(self.http.delete(url))?;
        decode_ack(&body)
    }

    // ── Reference data ──────────────────────────────────────────────

    /// `GET /tinh-data`
    pub fn provinces(&self) -> Result<Vec<Province>, GatewayError> {
        let url = self.endpoint(&["tinh-data"])?;
        let body = self.send(self.http.get(url))?;
        let json: Value = decode(&body)?;
        let rows = json
            .get("data")
            .cloned()
            .ok_or_else(|| GatewayError::Decode("missing 'data' in province response".into()))?;
        serde_json::from_value(rows).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// `GET /chart/...`
    pub fn chart_data(&self, kind: &ChartKind) -> Result<Value, GatewayError> {
        let url = self.endpoint(&kind.segments())?;
        let body = self.send(self.http.get(url))?;
        decode(&body)
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send and return the body text of a 2xx response.
    fn send(&self, req: RequestBuilder) -> Result<String, GatewayError> {
        let req = req
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let method = req.method().clone();
        let url = req.url().clone();
        log::debug!("{} {}", method, url);

        let response = self.http.execute(req).map_err(|e| {
            log::warn!("{} {} failed: {}", method, url, e);
            if e.is_timeout() {
                GatewayError::Network(format!("request timed out: {e}"))
            } else {
                GatewayError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let success = response.status().is_success();
        let body = response
            .text()
            .map_err(|e| GatewayError::Network(format!("cannot read response body: {e}")))?;

        if !success {
            let message = api_message(&body, status);
            log::warn!("{} {} -> {}: {}", method, url, status, message);
            return Err(GatewayError::Api { status, message });
        }

        log::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Mutation acknowledgements are informational; an empty body is accepted.
fn decode_ack(body: &str) -> Result<Value, GatewayError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    decode(body)
}

/// Pull a human message out of an error body, or fall back to a generic one.
fn api_message(body: &str, status: u16) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            for key in ["error", "message", "detail"] {
                if let Some(msg) = json.get(key).and_then(Value::as_str) {
                    if !msg.trim().is_empty() {
                        return msg.trim().to_string();
                    }
                }
            }
        }
        Err(_) => {
            let text = body.trim();
            // HTML error pages are noise
            if !text.is_empty() && !text.starts_with('<') && text.len() <= 512 {
                return text.to_string();
            }
        }
    }
    format!("request failed with status {status}")
}

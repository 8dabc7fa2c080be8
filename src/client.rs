// Client Module - HTTP access to the ball machine's REST API
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::binder::BoundAction;
use crate::error::{ConsoleError, Result};
use crate::host::HostAddress;
use crate::paths::ConcretePath;
use crate::routines::ActionRoutine;
use crate::types::{HttpMethod, MachineStatus, Mode};

pub const STATUS_URL: &str = "/system/status";
pub const MODE_URL: &str = "/system/mode";

/// Shared HTTP client; cheap to clone into spawned tasks
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(host: &HostAddress, base_path: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConsoleError::Network(format!("could not build HTTP client: {}", e)))?;
        Ok(ApiClient {
            http,
            base_url: host.api_base(base_path),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.base_url, relative)
    }

    /// GET `relative` and return the `data` member of the response envelope
    pub async fn get_data(&self, relative: &str) -> Result<Value> {
        let url = self.url(relative);
        self.send(HttpMethod::Get, &url, None).await
    }

    pub async fn fetch_status(&self) -> Result<MachineStatus> {
        let data = self.get_data(STATUS_URL).await?;
        serde_json::from_value(data).map_err(|e| ConsoleError::Api(format!("malformed status: {}", e)))
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<Value> {
        let url = self.url(MODE_URL);
        let body = json!({"data": {"mode_text": mode.api_text()}});
        self.send(HttpMethod::Put, &url, Some(&body)).await
    }

    /// Issue `routine` against the node at `target`: `base + target + suffix` with the static payload
    pub async fn invoke_action(&self, target: &ConcretePath, routine: &ActionRoutine) -> Result<Value> {
        let url = format!("{}{}{}", self.base_url, target.url_path(), routine.url_suffix);
        self.send(routine.method, &url, routine.payload.as_ref()).await
    }

    pub async fn invoke(&self, action: &BoundAction) -> Result<Value> {
        self.invoke_action(&action.target, &action.routine).await
    }

    async fn send(&self, method: HttpMethod, url: &str, body: Option<&Value>) -> Result<Value> {
        debug!("{} {}", method, url);
        let mut request = self.http.request(method.as_reqwest(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!("{} {} failed: {}", method, url, e);
            ConsoleError::Network(format!("{} {}: {}", method, url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConsoleError::Api(format!("{} {} returned HTTP {}", method, url, status)));
        }

        let envelope: Value = response.json().await?;
        unwrap_envelope(envelope)
    }
}

/// Extract `data` from `{data, errors?}`; a non-empty `errors` array fails the call
pub fn unwrap_envelope(envelope: Value) -> Result<Value> {
    match envelope {
        Value::Object(mut map) => {
            if let Some(Value::Array(errors)) = map.get("errors") {
                if !errors.is_empty() {
                    let messages: Vec<String> = errors
                        .iter()
                        .map(|e| match e {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect();
                    return Err(ConsoleError::Api(messages.join("; ")));
                }
            }
            match map.remove("data") {
                Some(data) => Ok(data),
                None => Ok(Value::Object(map)),
            }
        }
        other => Ok(other),
    }
}

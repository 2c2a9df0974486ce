use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use taskpilot_core::api::{ToolCall, ToolConfig, ToolInvoker, ToolOutcome};

use crate::http::{build_client, read_response, HttpCallError, ResponseBody};

const DEFAULT_INPUT_FIELD: &str = "query";

/// Tool backed by an HTTP webhook that takes `{ <input_field>: context }`.
#[derive(Clone)]
pub struct WebhookToolInvoker {
    name: String,
    url: String,
    input_field: String,
    send_caller: bool,
    http: reqwest::Client,
}

impl WebhookToolInvoker {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            name: name.into(),
            url: url.into(),
            input_field: DEFAULT_INPUT_FIELD.to_string(),
            send_caller: false,
            http: build_client(timeout)?,
        })
    }

    /// `None` when the tool has no webhook configured.
    pub fn from_config(name: &str, cfg: &ToolConfig, timeout: Duration) -> anyhow::Result<Option<Self>> {
        let Some(url) = cfg.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        let mut invoker = Self::new(name, url, timeout)?;
        if !cfg.input_field.trim().is_empty() {
            invoker.input_field = cfg.input_field.trim().to_string();
        }
        invoker.send_caller = cfg.send_caller;
        Ok(Some(invoker))
    }

    fn payload(&self, call: &ToolCall) -> Value {
        let mut payload = Map::new();
        payload.insert(self.input_field.clone(), Value::String(call.context.clone()));
        if self.send_caller {
            payload.insert(
                "user_id".to_string(),
                Value::String(call.caller.user_id.clone()),
            );
            if let Some(channel) = &call.caller.channel_id {
                payload.insert("channel_id".to_string(), Value::String(channel.clone()));
            }
        }
        Value::Object(payload)
    }

    async fn post(&self, call: &ToolCall) -> Result<ResponseBody, HttpCallError> {
        let resp = self
            .http
            .post(&self.url)
            .timeout(call.timeout)
            .json(&self.payload(call))
            .send()
            .await
            .map_err(|err| HttpCallError::from_reqwest(err, self.url.clone()))?;
        read_response(resp).await
    }
}

/// Prefer the `response` field, then `output`, then the whole body.
fn extract_output(body: ResponseBody) -> Value {
    match body {
        ResponseBody::Json(Value::Object(mut map)) => {
            for key in ["response", "output"] {
                match map.remove(key) {
                    Some(Value::Null) | None => {}
                    Some(v) => return v,
                }
            }
            Value::Object(map)
        }
        ResponseBody::Json(v) => v,
        ResponseBody::Text(text) => Value::String(text),
        ResponseBody::Empty => Value::Null,
    }
}

#[async_trait]
impl ToolInvoker for WebhookToolInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, call: &ToolCall) -> ToolOutcome {
        tracing::debug!(
            target: "taskpilot.tools",
            stage = "webhook.in",
            tool = %self.name,
            url = %self.url,
            task_id = %call.task_id,
            context_len = call.context.len()
        );

        match self.post(call).await {
            Ok(body) => {
                tracing::debug!(target: "taskpilot.tools", stage = "webhook.out", tool = %self.name);
                ToolOutcome::ok(extract_output(body))
            }
            Err(err) => {
                tracing::warn!(target: "taskpilot.tools", tool = %self.name, error = %err, "webhook call failed");
                let message = match err.kind() {
                    crate::http::HttpCallErrorKind::Timeout => {
                        format!("timeout calling {}", self.name)
                    }
                    crate::http::HttpCallErrorKind::Status => format!(
                        "HTTP error {}: {}",
                        err.status().unwrap_or_default(),
                        err.message()
                    ),
                    _ => err.to_string(),
                };
                ToolOutcome::failed(message)
            }
        }
    }
}

//! Shared HTTP plumbing for the webhook tools and the LLM collaborators.

mod error;

pub use error::{HttpCallError, HttpCallErrorKind};

use std::time::Duration;

use serde_json::Value;

pub(crate) const BODY_PREVIEW_LIMIT: usize = 512;

pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Trimmed, length-capped view of a response body for logs and errors.
pub fn preview_body(body: &str) -> String {
    preview_chars(body.trim(), BODY_PREVIEW_LIMIT, "<empty body>")
}

pub(crate) fn preview_chars(text: &str, limit: usize, empty: &str) -> String {
    if text.is_empty() {
        return empty.to_string();
    }

    let mut out = String::new();
    let mut truncated = false;
    for (idx, ch) in text.chars().enumerate() {
        if idx >= limit {
            truncated = true;
            break;
        }
        out.push(ch);
    }

    if truncated {
        out.push_str("...");
    }

    out
}

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

/// Read the response, failing on non-2xx status. Bodies that are not JSON
/// come back as text.
pub async fn read_response(resp: reqwest::Response) -> Result<ResponseBody, HttpCallError> {
    let status = resp.status();
    let url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .map_err(|err| HttpCallError::from_reqwest(err, url.clone()))?;

    if !status.is_success() {
        return Err(HttpCallError::status_error(
            status.as_u16(),
            url,
            preview_body(&body),
        ));
    }

    if body.trim().is_empty() {
        return Ok(ResponseBody::Empty);
    }

    Ok(match serde_json::from_str::<Value>(&body) {
        Ok(v) => ResponseBody::Json(v),
        Err(_) => ResponseBody::Text(body),
    })
}

/// Read the response as JSON, failing on non-2xx status or undecodable body.
pub async fn parse_json_response(resp: reqwest::Response) -> Result<Value, HttpCallError> {
    let status = resp.status();
    let url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .map_err(|err| HttpCallError::from_reqwest(err, url.clone()))?;

    if !status.is_success() {
        return Err(HttpCallError::status_error(
            status.as_u16(),
            url,
            preview_body(&body),
        ));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str::<Value>(&body).map_err(|err| {
        HttpCallError::decode_error(status.as_u16(), url, err.to_string(), preview_body(&body))
    })
}

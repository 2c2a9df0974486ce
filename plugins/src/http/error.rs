use std::{error::Error as StdError, fmt};

use taskpilot_core::api::CollaboratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpCallErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Status,
    Unknown,
}

impl HttpCallErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HttpCallErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct HttpCallError {
    kind: HttpCallErrorKind,
    status: Option<u16>,
    url: Option<String>,
    message: String,
    source: Option<anyhow::Error>,
}

impl HttpCallError {
    pub fn kind(&self) -> HttpCallErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, url: String) -> Self {
        let kind = if err.is_timeout() {
            HttpCallErrorKind::Timeout
        } else if err.is_connect() {
            HttpCallErrorKind::Connect
        } else if err.is_request() {
            HttpCallErrorKind::Request
        } else if err.is_body() {
            HttpCallErrorKind::Body
        } else if err.is_decode() {
            HttpCallErrorKind::Decode
        } else {
            HttpCallErrorKind::Unknown
        };
        let status = err.status().map(|s| s.as_u16());
        let message = err.to_string();
        HttpCallError {
            kind,
            status,
            url: Some(url),
            message,
            source: Some(anyhow::Error::new(err)),
        }
    }

    pub(crate) fn status_error(status: u16, url: String, preview: String) -> Self {
        HttpCallError {
            kind: HttpCallErrorKind::Status,
            status: Some(status),
            url: Some(url),
            message: preview,
            source: None,
        }
    }

    pub(crate) fn decode_error(status: u16, url: String, err: String, preview: String) -> Self {
        HttpCallError {
            kind: HttpCallErrorKind::Decode,
            status: Some(status),
            url: Some(url),
            message: format!("failed to decode response body: {err} | body={preview}"),
            source: None,
        }
    }

    /// Map onto the scheduler's collaborator failure taxonomy.
    pub fn into_collaborator_error(
        self,
        collaborator: &'static str,
        timeout_ms: u64,
    ) -> CollaboratorError {
        match self.kind {
            HttpCallErrorKind::Timeout => CollaboratorError::Timeout {
                collaborator,
                after_ms: timeout_ms,
            },
            HttpCallErrorKind::Status => CollaboratorError::Status {
                status: self.status.unwrap_or_default(),
                body: self.message,
            },
            HttpCallErrorKind::Decode => CollaboratorError::Malformed(self.message),
            _ => CollaboratorError::Transport(self.to_string()),
        }
    }
}

impl fmt::Display for HttpCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        if let Some(url) = &self.url {
            write!(f, " url={}", url)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl StdError for HttpCallError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_status() {
        let err = HttpCallError::status_error(
            502,
            "https://example.com/hook".to_string(),
            "bad gateway".to_string(),
        );
        let msg = err.to_string();
        assert!(msg.contains("kind=status"));
        assert!(msg.contains("status=502"));
        assert!(msg.contains("url=https://example.com/hook"));
        assert!(msg.contains("bad gateway"));
    }

    #[test]
    fn test_maps_to_collaborator_error() {
        let err = HttpCallError::status_error(429, "u".into(), "slow down".into());
        assert_eq!(
            err.into_collaborator_error("planner", 1_000),
            CollaboratorError::Status {
                status: 429,
                body: "slow down".to_string()
            }
        );

        let err = HttpCallError::decode_error(200, "u".into(), "eof".into(), "{".into());
        assert!(matches!(
            err.into_collaborator_error("planner", 1_000),
            CollaboratorError::Malformed(_)
        ));
    }
}

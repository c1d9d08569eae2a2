//! Classification of transport failures for messages and metrics

use reqwest::Error as ReqwestError;

/// Cause of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request exceeded the configured timeout
    Timeout,
    /// Connection refused, DNS failure or TLS handshake failure
    Connect,
    /// Upstream answered with a non-2xx status
    Status(u16),
    /// Body was not valid JSON or not an envelope
    Decode,
    /// Any other request failure
    Request,
}

impl TransportErrorKind {
    /// Classify a reqwest error
    pub fn classify(err: &ReqwestError) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if err.is_connect() {
            return Self::Connect;
        }
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        if err.is_decode() {
            return Self::Decode;
        }
        Self::Request
    }

    /// Short description used in error messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "request timed out",
            Self::Connect => "connection failed",
            Self::Status(code) => match code {
                300..=399 => "unexpected redirect",
                401 | 403 => "access denied",
                404 => "endpoint not found",
                429 => "rate limit exceeded",
                500..=599 => "upstream server error",
                _ => "unexpected HTTP status",
            },
            Self::Decode => "malformed response",
            Self::Request => "request failed",
        }
    }

    /// Remediation hint shown by the CLI
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Timeout => "Retry later or narrow the date range",
            Self::Connect => "Verify internet connectivity and DNS resolution",
            Self::Status(code) => match code {
                401 | 403 => "Check the ECOS access token",
                429 => "Lower --max-per-window or raise --min-interval-ms",
                500..=599 => "ECOS may be under maintenance, try again later",
                _ => "Check --base-url and the request parameters",
            },
            Self::Decode => "ECOS returned an unexpected body, check --base-url",
            Self::Request => "Check network connectivity and try again",
        }
    }

    /// Label used on metrics
    pub fn metric_label(&self) -> String {
        match self {
            Self::Timeout => "timeout".to_string(),
            Self::Connect => "connect".to_string(),
            Self::Status(code) => code.to_string(),
            Self::Decode => "decode".to_string(),
            Self::Request => "request".to_string(),
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{} (HTTP {code})", self.description()),
            _ => write!(f, "{}", self.description()),
        }
    }
}

use std::fmt;

/// Error type for gateway operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure (connect, timeout, broken body stream).
    Network(String),
    /// Non-2xx response. `message` comes from the body when the server sent one.
    Api { status: u16, message: String },
    /// Response body does not match the expected shape.
    Decode(String),
    /// Writing a downloaded file failed.
    Io(String),
    /// The configured API base cannot be used to build endpoint URLs.
    InvalidUrl(String),
}

impl GatewayError {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Api { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Decode(msg) => write!(f, "unexpected response: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::InvalidUrl(msg) => write!(f, "invalid API base URL: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

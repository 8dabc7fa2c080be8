// Error Module - Typed failures surfaced by the client, binder and config layers
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Transport-level failure: connection refused, timeout, DNS, ...
    #[error("network error: {0}")]
    Network(String),

    /// The API answered, but not with something usable (bad status, non-JSON body, `errors` array)
    #[error("API error: {0}")]
    Api(String),

    /// Malformed user input, e.g. a host address that does not match `scheme://host:port`
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("document nesting exceeds depth limit of {limit} at {path}")]
    DepthLimit { path: String, limit: usize },

    #[error("no routine '{label}' declared for {path}")]
    UnknownRoutine { path: String, label: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl From<reqwest::Error> for ConsoleError {
    fn from(e: reqwest::Error) -> Self {
        // A body that failed to decode is the server's fault, not the wire's
        if e.is_decode() {
            ConsoleError::Api(format!("response is not valid JSON: {}", e))
        } else if e.is_status() {
            ConsoleError::Api(e.to_string())
        } else {
            ConsoleError::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

//! Error types and handling for vitrine-core operations.
//!
//! Probe-level failures never reach this type: a missing candidate is just a
//! miss and the resolver moves on to the next one. What surfaces here are the
//! terminal outcomes a caller has to react to, plus the plumbing failures of
//! configuration and the persisted hint store.
//!
//! ## Error Categories
//!
//! - **Resolution**: every candidate for an asset was exhausted, or the caller
//!   walked away before the result arrived
//! - **Network**: the HTTP client could not be built or a request failed hard
//! - **Storage**: the persisted hint cache could not be read or written
//! - **Configuration**: invalid settings or config files
//!
//! ```rust
//! use vitrine_core::Error;
//!
//! let err = Error::Unresolvable { url: "/galeria/a.jpg".into() };
//! assert_eq!(err.category(), "resolution");
//! assert!(!err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for vitrine-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// Only raised where a request failure cannot be absorbed as a probe miss,
    /// such as building the HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The persisted hint store could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// URL is malformed or cannot be joined to the site origin.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Every candidate for the asset failed.
    ///
    /// Recorded as a terminal `failed` cache entry; later requests for the same
    /// URL observe this error without touching the network until the entry is
    /// cleared or expires.
    #[error("No working URL found for '{url}'")]
    Unresolvable {
        /// The nominal URL that was requested.
        url: String,
    },

    /// The caller abandoned the resolution before it completed.
    #[error("Resolution cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error might go away on a later attempt.
    ///
    /// Terminal resolution failures are deliberately not recoverable: the
    /// cache pins them until an explicit clear or TTL expiry.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Cancelled => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier for logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::InvalidUrl(_) => "url",
            Self::Unresolvable { .. } | Self::Cancelled => "resolution",
        }
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

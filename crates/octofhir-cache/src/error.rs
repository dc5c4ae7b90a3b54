//! Error types for the tiered cache.
//!
//! A cache miss is never an error: every read returns `Ok(None)` when no tier
//! holds the record. Errors are reserved for missing capabilities (programmer
//! errors) and for failures reported by the remote or persistent tiers.

use std::fmt;

/// Boxed collaborator error, kept as the source of the cache error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An operation needs a capability that was not configured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Which capability was missing and for what operation.
        message: String,
    },

    /// The remote tier failed.
    #[error("Remote cache error: {source}")]
    Remote {
        /// The error reported by the remote tier.
        #[source]
        source: BoxError,
    },

    /// The persistent tier failed.
    #[error("Persistent store error: {source}")]
    Persistent {
        /// The error reported by the persistent tier.
        #[source]
        source: BoxError,
    },

    /// A value could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the codec failure.
        message: String,
    },

    /// Settings could not be loaded or are invalid.
    #[error("Settings error: {message}")]
    Settings {
        /// Description of the settings problem.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error for an operation that needs a
    /// persistent capability which is absent.
    #[must_use]
    pub fn missing_capability(operation: &str, capability: &str) -> Self {
        Self::configuration(format!(
            "`{operation}` requires a persistent store with a `{capability}` capability"
        ))
    }

    /// Wraps a remote tier failure.
    #[must_use]
    pub fn remote(source: impl Into<BoxError>) -> Self {
        Self::Remote {
            source: source.into(),
        }
    }

    /// Wraps a persistent tier failure.
    #[must_use]
    pub fn persistent(source: impl Into<BoxError>) -> Self {
        Self::Persistent {
            source: source.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new `Settings` error.
    #[must_use]
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` if the error came from the remote tier.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Returns `true` if the error came from the persistent tier.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } | Self::Settings { .. } => ErrorCategory::Configuration,
            Self::Remote { .. } | Self::Persistent { .. } => ErrorCategory::Collaborator,
            Self::Serialization { .. } => ErrorCategory::Codec,
        }
    }
}

/// Categories of cache errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing capability or invalid settings.
    Configuration,
    /// Failure reported by a remote or persistent tier.
    Collaborator,
    /// Encoding or decoding failure.
    Codec,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Collaborator => write!(f, "collaborator"),
            Self::Codec => write!(f, "codec"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = CacheError::missing_capability("refetch", "get");
        assert_eq!(
            err.to_string(),
            "Configuration error: `refetch` requires a persistent store with a `get` capability"
        );

        let err = CacheError::serialization("bad json");
        assert_eq!(err.to_string(), "Serialization error: bad json");
    }

    #[test]
    fn test_collaborator_source_is_kept() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = CacheError::remote(io);

        assert!(err.is_remote());
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "reset by peer");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            CacheError::configuration("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            CacheError::persistent("db down").category(),
            ErrorCategory::Collaborator
        );
        assert_eq!(CacheError::serialization("x").category(), ErrorCategory::Codec);
        assert_eq!(ErrorCategory::Collaborator.to_string(), "collaborator");
    }
}

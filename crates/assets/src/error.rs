//! # Error Types
//!
//! ## Table of Contents
//! - **FetchError**: Failures of the tiered fetch pipeline
//! - **BundleError**: Failures of bundle download / load / unload
//! - **ConfigError**: Failures reading or writing `AssetConfig`, or building
//!   the pipeline from it

use crate::kind::AssetKind;
use crate::tier::StorageTier;
use thiserror::Error;

/// Errors produced while resolving an asset through the storage tiers.
///
/// `NotFound`, `Decode`, `Network` and `TimedOut` are per-tier errors: the
/// fetcher records them and moves on to the next tier. Only `ExhaustedTiers`,
/// `Cancelled` and `InvalidRequest` ever reach the caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// The tier had no asset under any extension variant
    #[error("asset not found in {tier:?}: {path}")]
    NotFound { tier: StorageTier, path: String },

    /// Bytes were retrieved but could not be interpreted as the requested kind
    #[error("could not decode {kind:?}: {reason}")]
    Decode { kind: AssetKind, reason: String },

    /// The transport reported an error string
    #[error("network error: {0}")]
    Network(String),

    /// The transport did not answer within the configured timeout
    #[error("timed out after {secs}s fetching {location}")]
    TimedOut { location: String, secs: u64 },

    /// Terminal failure: every tier was attempted and none produced the asset
    #[error("all {attempts} tier(s) failed for {path}")]
    ExhaustedTiers { path: String, attempts: usize },

    /// The request was cancelled through its `CancelToken`
    #[error("request cancelled")]
    Cancelled,

    /// Local filesystem failure
    #[error("io error: {0}")]
    Io(String),

    /// The request itself is malformed (e.g. empty path)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Whether the fetcher should advance to the next tier after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Decode { .. }
                | Self::Network(_)
                | Self::TimedOut { .. }
                | Self::Io(_)
        )
    }

    pub(crate) fn decode(kind: AssetKind, reason: impl ToString) -> Self {
        Self::Decode { kind, reason: reason.to_string() }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Errors produced by the bundle manager
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BundleError {
    #[error("network error: {0}")]
    Network(String),

    /// Zero bytes and no transport error
    #[error("empty response")]
    EmptyResponse,

    #[error("could not decode bundle: {0}")]
    Decode(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Neither the fresh download nor any cached version was accepted
    #[error("bundle {name} rejected and no cached version was accepted")]
    ValidationRejected { name: String },

    #[error("bundle {0} is not loaded into memory")]
    NotLoaded(String),

    /// A load call finished without producing any new asset
    #[error("no assets were loaded")]
    NoAssetsLoaded,

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    /// Empty, or not a single plain directory name
    #[error("invalid bundle name: {0:?}")]
    InvalidName(String),

    #[error("download cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BundleError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Errors loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(FetchError::Network("boom".into()).is_recoverable());
        assert!(FetchError::NotFound { tier: StorageTier::Web, path: "a".into() }.is_recoverable());
        assert!(!FetchError::Cancelled.is_recoverable());
        assert!(!FetchError::ExhaustedTiers { path: "a".into(), attempts: 4 }.is_recoverable());
    }
}

//! # Existence Prober
//!
//! Answers "is this asset here?" for one tier, trying the bare logical path
//! first and then each extension variant of the requested kind.
//!
//! Two strategies:
//! - **Stat**: ask the filesystem directly
//! - **Load**: ask the transport, where absence shows up as an error. Needed
//!   when bundled assets sit inside an archive or behind HTTP.

use crate::cancel::CancelToken;
use crate::config::ProbeStrategyConfig;
use crate::error::FetchError;
use crate::kind::AssetKind;
use crate::path::{PathFormatter, UriStyle};
use crate::platform::Platform;
use crate::transport::Transport;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How existence is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    Stat,
    Load,
}

impl ProbeStrategy {
    /// Resolve the configured strategy for a platform
    pub fn resolve(config: ProbeStrategyConfig, platform: Platform) -> Self {
        match config {
            ProbeStrategyConfig::Stat => Self::Stat,
            ProbeStrategyConfig::Load => Self::Load,
            ProbeStrategyConfig::Auto if platform.requires_load_probe() => Self::Load,
            ProbeStrategyConfig::Auto => Self::Stat,
        }
    }
}

/// Outcome of probing one logical path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub exists: bool,
    /// Logical path plus the winning extension
    pub resolved_path: String,
    /// Winning extension including the dot, empty for the bare name
    pub extension: String,
}

impl ProbeResult {
    fn found(path: &str, extension: &str) -> Self {
        Self {
            exists: true,
            resolved_path: format!("{}{}", path, extension),
            extension: extension.to_string(),
        }
    }

    fn missing(path: &str) -> Self {
        Self { exists: false, resolved_path: path.to_string(), extension: String::new() }
    }
}

/// Try `path` with each variant of `kind` until `exists` says yes.
///
/// Each check completes before the next begins. Cancellation aborts between
/// or during checks.
pub async fn probe_variants<F, Fut>(
    path: &str,
    kind: AssetKind,
    cancel: &CancelToken,
    mut exists: F,
) -> Result<ProbeResult, FetchError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = bool>,
{
    if path.is_empty() {
        return Ok(ProbeResult::missing(path));
    }

    for extension in kind.extension_variants() {
        let candidate = format!("{}{}", path, extension);
        let hit = cancel.run(exists(candidate)).await.map_err(|_| FetchError::Cancelled)?;
        if hit {
            return Ok(ProbeResult::found(path, extension));
        }
    }

    Ok(ProbeResult::missing(path))
}

/// True when `path` names a regular file
pub async fn stat_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Probes the local tiers, bundled and app-private
#[derive(Clone)]
pub struct ExistenceProber {
    formatter: PathFormatter,
    transport: Arc<dyn Transport>,
    strategy: ProbeStrategy,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ExistenceProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistenceProber")
            .field("formatter", &self.formatter)
            .field("strategy", &self.strategy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ExistenceProber {
    pub fn new(
        formatter: PathFormatter,
        transport: Arc<dyn Transport>,
        strategy: ProbeStrategy,
    ) -> Self {
        Self { formatter, transport, strategy, timeout: None }
    }

    /// Bound each load-based check; a timed out check counts as a miss
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn strategy(&self) -> ProbeStrategy {
        self.strategy
    }

    /// Probe the bundled tier with the configured strategy
    pub async fn probe_bundled(
        &self,
        path: &str,
        kind: AssetKind,
        cancel: &CancelToken,
    ) -> Result<ProbeResult, FetchError> {
        let formatter = &self.formatter;
        let result = match self.strategy {
            ProbeStrategy::Stat => {
                probe_variants(path, kind, cancel, |candidate| {
                    let location = formatter.bundled_probe_path(&candidate);
                    async move { stat_file(Path::new(&location)).await }
                })
                .await?
            }
            ProbeStrategy::Load => {
                let transport = &self.transport;
                let timeout = self.timeout;
                probe_variants(path, kind, cancel, |candidate| {
                    let location = formatter.bundled_uri(&candidate, UriStyle::Escaped);
                    async move {
                        match timeout {
                            Some(limit) => tokio::time::timeout(limit, transport.exists(&location))
                                .await
                                .unwrap_or(false),
                            None => transport.exists(&location).await,
                        }
                    }
                })
                .await?
            }
        };

        if !result.exists {
            debug!(path = %path, strategy = ?self.strategy, "bundled probe missed every variant");
        }
        Ok(result)
    }

    /// Probe app-private storage, which is always a real filesystem
    pub async fn probe_app_private(
        &self,
        path: &str,
        kind: AssetKind,
        cancel: &CancelToken,
    ) -> Result<ProbeResult, FetchError> {
        let formatter = &self.formatter;
        probe_variants(path, kind, cancel, |candidate| {
            let location = formatter.app_private_path(&candidate);
            async move { stat_file(&location).await }
        })
        .await
    }
}

//! # Asset Configuration
//!
//! TOML-based configuration for storage roots, probing and timeouts.

use crate::error::ConfigError;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the existence prober checks the bundled tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStrategyConfig {
    /// Pick per platform
    #[default]
    Auto,
    /// Filesystem stat
    Stat,
    /// Load through the transport; absence is an error
    Load,
}

/// Force the reachability monitor into a mode regardless of probe results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForcedOnlineMode {
    #[default]
    None,
    Online,
    Offline,
}

/// Asset pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Root of read-only assets shipped with the app
    #[serde(default = "default_bundled_root")]
    pub bundled_root: PathBuf,

    /// Root of app-private read/write storage (web cache, bundle cache)
    #[serde(default = "default_app_private_root")]
    pub app_private_root: PathBuf,

    /// Optional directory backing the embedded-resources tier
    #[serde(default)]
    pub resources_root: Option<PathBuf>,

    #[serde(default)]
    pub platform: Platform,

    #[serde(default)]
    pub probe_strategy: ProbeStrategyConfig,

    /// Per-request transport timeout in seconds (0 disables)
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub forced_online_mode: ForcedOnlineMode,

    /// Interval between reachability broadcasts
    #[serde(default = "default_reachability_interval")]
    pub reachability_interval_ms: u64,
}

fn default_bundled_root() -> PathBuf { PathBuf::from("./StreamingAssets") }
fn default_app_private_root() -> PathBuf { PathBuf::from("./PersistentData") }
fn default_timeout() -> u64 { 30 }
fn default_user_agent() -> String { format!("brandxr-assets/{}", env!("CARGO_PKG_VERSION")) }
fn default_reachability_interval() -> u64 { 500 }

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            bundled_root: default_bundled_root(),
            app_private_root: default_app_private_root(),
            resources_root: None,
            platform: Platform::default(),
            probe_strategy: ProbeStrategyConfig::default(),
            request_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            forced_online_mode: ForcedOnlineMode::default(),
            reachability_interval_ms: default_reachability_interval(),
        }
    }
}

impl AssetConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from TOML file or return default
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load asset config {}: {}", path.display(), e);
                }
            }
        }
        Self::default()
    }

    /// Save to TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `None` when the timeout is disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn reachability_interval(&self) -> Duration {
        Duration::from_millis(self.reachability_interval_ms.max(1))
    }

    /// Root all bundle caches live under
    pub fn bundle_cache_root(&self) -> PathBuf {
        self.app_private_root.join("AssetBundles")
    }

    pub fn with_bundled_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.bundled_root = root.into();
        self
    }

    pub fn with_app_private_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.app_private_root = root.into();
        self
    }

    pub fn with_resources_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.resources_root = Some(root.into());
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

/// Example TOML configuration file
pub const EXAMPLE_CONFIG: &str = r#"
# BrandXR asset pipeline configuration

# Read-only assets shipped with the application
bundled_root = "./StreamingAssets"

# App-private read/write storage. Web downloads are cached here and
# asset bundles are cached under <app_private_root>/AssetBundles/.
app_private_root = "./PersistentData"

# Optional directory backing the embedded-resources tier
# resources_root = "./Resources"

# desktop | android | ios | webgl
platform = "desktop"

# auto | stat | load
# "load" checks existence by fetching, for bundled assets packed in archives
probe_strategy = "auto"

# Transport timeout per request, in seconds (0 disables)
request_timeout_secs = 30

user_agent = "brandxr-assets"

# none | online | offline
forced_online_mode = "none"

# How often connectivity state is broadcast
reachability_interval_ms = 500
"#;

//! # Tiered Fetcher
//!
//! Resolves an [`AssetRequest`] by walking its storage tiers in order:
//!
//! 1. **Bundled**: probe variants under the bundled root, load the escaped URI
//! 2. **EmbeddedResources**: look the extension-less stem up in the registry
//! 3. **AppPrivate**: explicit file name, logical path, then derived cache name
//! 4. **Web**: GET the logical path, optionally persisting a cache copy
//!
//! Each tier either produces a decoded asset or a [`TierAttempt`] describing
//! why it missed. A tier attempt completes before the next one starts, no
//! tier runs twice per request, and the first success ends the walk.

use crate::cancel::CancelToken;
use crate::decode::{self, Asset};
use crate::error::FetchError;
use crate::kind::AssetKind;
use crate::path::{cache_file_name, strip_extension, PathFormatter, UriStyle};
use crate::probe::{ExistenceProber, ProbeStrategy};
use crate::resources::ResourceRegistry;
use crate::tier::{dispatch_order, StorageTier};
use crate::transport::Transport;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ============================================================================
// Request / Outcome
// ============================================================================

/// One asset fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    /// Logical path, or a URL for the web tier
    pub path: String,
    pub kind: AssetKind,
    /// Persist web downloads to app-private storage
    pub cache_on_success: bool,
    /// Explicit cache file name, overriding the derived one
    pub file_name: Option<String>,
    /// Tiers to walk, `TryAll` expanded at dispatch
    pub tiers: Vec<StorageTier>,
}

impl AssetRequest {
    pub fn new(path: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            path: path.into(),
            kind,
            cache_on_success: false,
            file_name: None,
            tiers: vec![StorageTier::TryAll],
        }
    }

    pub fn text(path: impl Into<String>) -> Self {
        Self::new(path, AssetKind::Text)
    }

    pub fn csv(path: impl Into<String>) -> Self {
        Self::new(path, AssetKind::Csv)
    }

    pub fn texture(path: impl Into<String>) -> Self {
        Self::new(path, AssetKind::Texture)
    }

    pub fn audio_clip(path: impl Into<String>) -> Self {
        Self::new(path, AssetKind::AudioClip)
    }

    pub fn cache_on_success(mut self, cache: bool) -> Self {
        self.cache_on_success = cache;
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn tier(mut self, tier: StorageTier) -> Self {
        self.tiers = vec![tier];
        self
    }

    pub fn tiers(mut self, tiers: impl IntoIterator<Item = StorageTier>) -> Self {
        self.tiers = tiers.into_iter().collect();
        self
    }

    /// Explicit file name, ignoring blanks
    fn explicit_file_name(&self) -> Option<&str> {
        self.file_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Why one tier did not produce the asset
#[derive(Debug, Clone, PartialEq)]
pub struct TierAttempt {
    pub tier: StorageTier,
    /// Last location the tier tried
    pub location: String,
    pub error: FetchError,
}

/// A resolved asset and how it was found
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub asset: Asset,
    pub tier: StorageTier,
    /// Location the bytes were read from
    pub location: String,
    /// Tiers that missed before the winning one, in order
    pub attempts: Vec<TierAttempt>,
    /// Where a web download was cached, if it was
    pub cached_to: Option<PathBuf>,
}

/// Per-tier miss before the tier is attached
struct Miss {
    location: String,
    error: FetchError,
}

impl Miss {
    fn new(location: impl Into<String>, error: FetchError) -> Self {
        Self { location: location.into(), error }
    }
}

struct Hit {
    asset: Asset,
    location: String,
    cached_to: Option<PathBuf>,
}

// ============================================================================
// Fetcher
// ============================================================================

/// Walks storage tiers until one yields the requested asset
#[derive(Clone)]
pub struct TieredFetcher {
    formatter: PathFormatter,
    prober: ExistenceProber,
    transport: Arc<dyn Transport>,
    resources: Arc<ResourceRegistry>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for TieredFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredFetcher")
            .field("formatter", &self.formatter)
            .field("prober", &self.prober)
            .field("resources", &self.resources.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TieredFetcher {
    pub fn new(
        formatter: PathFormatter,
        transport: Arc<dyn Transport>,
        resources: Arc<ResourceRegistry>,
        strategy: ProbeStrategy,
    ) -> Self {
        let prober = ExistenceProber::new(formatter.clone(), transport.clone(), strategy);
        Self { formatter, prober, transport, resources, timeout: None }
    }

    /// Bound every transport call; a timeout is a miss for that tier
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self.prober = self.prober.with_timeout(timeout);
        self
    }

    pub fn formatter(&self) -> &PathFormatter {
        &self.formatter
    }

    /// Resolve `request`, returning the first tier's success.
    ///
    /// Per-tier misses are collected in [`FetchOutcome::attempts`]; the caller
    /// only sees an error once every tier missed, or on cancellation.
    pub async fn fetch(
        &self,
        request: &AssetRequest,
        cancel: &CancelToken,
    ) -> Result<FetchOutcome, FetchError> {
        let path = request.path.trim();
        if path.is_empty() {
            return Err(FetchError::InvalidRequest("empty asset path".into()));
        }

        let order = dispatch_order(&request.tiers);
        if order.is_empty() {
            return Err(FetchError::InvalidRequest("no storage tiers selected".into()));
        }

        let mut attempts = Vec::with_capacity(order.len());
        for tier in order {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let result = match tier {
                StorageTier::Bundled => self.try_bundled(request, path, cancel).await,
                StorageTier::EmbeddedResources => self.try_embedded(request, path, cancel).await,
                StorageTier::AppPrivate => self.try_app_private(request, path, cancel).await,
                StorageTier::Web => self.try_web(request, path, cancel).await,
                // Expanded by dispatch_order
                StorageTier::TryAll => continue,
            };

            match result {
                Ok(hit) => {
                    info!(path = %path, tier = %tier, location = %hit.location, "asset resolved");
                    return Ok(FetchOutcome {
                        asset: hit.asset,
                        tier,
                        location: hit.location,
                        attempts,
                        cached_to: hit.cached_to,
                    });
                }
                Err(miss) if !miss.error.is_recoverable() => return Err(miss.error),
                Err(miss) => {
                    debug!(
                        path = %path,
                        tier = %tier,
                        location = %miss.location,
                        "tier missed: {}",
                        miss.error
                    );
                    attempts.push(TierAttempt { tier, location: miss.location, error: miss.error });
                }
            }
        }

        warn!(path = %path, attempts = attempts.len(), "asset not found in any tier");
        Err(FetchError::ExhaustedTiers { path: path.to_string(), attempts: attempts.len() })
    }

    async fn try_bundled(
        &self,
        request: &AssetRequest,
        path: &str,
        cancel: &CancelToken,
    ) -> Result<Hit, Miss> {
        let probe = self
            .prober
            .probe_bundled(path, request.kind, cancel)
            .await
            .map_err(|e| Miss::new(self.formatter.bundled_uri(path, UriStyle::Escaped), e))?;

        let location = self.formatter.bundled_uri(&probe.resolved_path, UriStyle::Escaped);
        if !probe.exists {
            let missing =
                FetchError::NotFound { tier: StorageTier::Bundled, path: path.to_string() };
            return Err(Miss::new(location, missing));
        }

        let bytes = self.transfer(&location, cancel).await.map_err(|e| Miss::new(&location, e))?;
        let asset = self
            .decode(request.kind, &probe.resolved_path, bytes, cancel)
            .await
            .map_err(|e| Miss::new(&location, e))?;

        Ok(Hit { asset, location, cached_to: None })
    }

    async fn try_embedded(
        &self,
        request: &AssetRequest,
        path: &str,
        cancel: &CancelToken,
    ) -> Result<Hit, Miss> {
        let stem = strip_extension(path);
        let lookup = cancel
            .run(self.resources.lookup(stem))
            .await
            .map_err(|_| Miss::new(stem, FetchError::Cancelled))?;

        let hit = match lookup {
            Ok(Some(hit)) => hit,
            Ok(None) => {
                return Err(Miss::new(
                    stem,
                    FetchError::NotFound {
                        tier: StorageTier::EmbeddedResources,
                        path: path.to_string(),
                    },
                ))
            }
            Err(e) => return Err(Miss::new(stem, e.into())),
        };

        let asset = self
            .decode(request.kind, &hit.resolved_name, hit.bytes, cancel)
            .await
            .map_err(|e| Miss::new(&hit.resolved_name, e))?;

        Ok(Hit { asset, location: hit.resolved_name, cached_to: None })
    }

    async fn try_app_private(
        &self,
        request: &AssetRequest,
        path: &str,
        cancel: &CancelToken,
    ) -> Result<Hit, Miss> {
        let mut candidates: Vec<String> = Vec::with_capacity(3);
        for candidate in [
            request.explicit_file_name().map(str::to_string),
            Some(path.to_string()),
            Some(cache_file_name(path)),
        ]
            .into_iter()
            .flatten()
        {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }

        let mut last = Miss::new(
            self.formatter.app_private_path(path).to_string_lossy(),
            FetchError::NotFound { tier: StorageTier::AppPrivate, path: path.to_string() },
        );

        for candidate in candidates {
            let probe = self
                .prober
                .probe_app_private(&candidate, request.kind, cancel)
                .await
                .map_err(|e| Miss::new(&candidate, e))?;
            if !probe.exists {
                continue;
            }

            let file = self.formatter.app_private_path(&probe.resolved_path);
            let location = file.to_string_lossy().into_owned();

            let read = cancel
                .run(tokio::fs::read(&file))
                .await
                .map_err(|_| Miss::new(&location, FetchError::Cancelled))?;
            let bytes = match read {
                Ok(bytes) => bytes,
                Err(e) => {
                    last = Miss::new(location, e.into());
                    continue;
                }
            };

            match self.decode(request.kind, &probe.resolved_path, bytes, cancel).await {
                Ok(asset) => return Ok(Hit { asset, location, cached_to: None }),
                Err(FetchError::Cancelled) => {
                    return Err(Miss::new(location, FetchError::Cancelled))
                }
                Err(e) => last = Miss::new(location, e),
            }
        }

        Err(last)
    }

    async fn try_web(
        &self,
        request: &AssetRequest,
        path: &str,
        cancel: &CancelToken,
    ) -> Result<Hit, Miss> {
        let location = self.formatter.web_location(path);
        let bytes = self.transfer(&location, cancel).await.map_err(|e| Miss::new(&location, e))?;

        let raw = request.cache_on_success.then(|| bytes.clone());
        let asset = self
            .decode(request.kind, &location, bytes, cancel)
            .await
            .map_err(|e| Miss::new(&location, e))?;

        let cached_to = match raw {
            Some(raw) => self.write_cache(request, path, &raw).await,
            None => None,
        };

        Ok(Hit { asset, location, cached_to })
    }

    /// Fetch through the transport, bounded by the timeout and the token
    async fn transfer(&self, location: &str, cancel: &CancelToken) -> Result<Vec<u8>, FetchError> {
        let response = match self.timeout {
            Some(limit) => cancel
                .run(tokio::time::timeout(limit, self.transport.fetch(location, None)))
                .await
                .map_err(|_| FetchError::Cancelled)?
                .map_err(|_| FetchError::TimedOut {
                    location: location.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => cancel
                .run(self.transport.fetch(location, None))
                .await
                .map_err(|_| FetchError::Cancelled)?,
        };

        match response.error {
            Some(error) => Err(FetchError::Network(error)),
            None => Ok(response.bytes),
        }
    }

    /// Decode off the async executor
    async fn decode(
        &self,
        kind: AssetKind,
        resolved: &str,
        bytes: Vec<u8>,
        cancel: &CancelToken,
    ) -> Result<Asset, FetchError> {
        let format = self.formatter.platform().preferred_texture_format();
        let resolved = resolved.to_string();
        let task =
            tokio::task::spawn_blocking(move || decode::decode(kind, &resolved, &bytes, format));

        match cancel.run(task).await {
            Err(_) => Err(FetchError::Cancelled),
            Ok(Err(join)) => Err(FetchError::decode(kind, join)),
            Ok(Ok(result)) => {
                if let Err(e) = &result {
                    warn!(kind = ?kind, "decode failed: {}", e);
                }
                result
            }
        }
    }

    /// Persist raw web bytes. Failures are logged, never returned.
    async fn write_cache(
        &self,
        request: &AssetRequest,
        path: &str,
        bytes: &[u8],
    ) -> Option<PathBuf> {
        let name = request
            .explicit_file_name()
            .map(str::to_string)
            .unwrap_or_else(|| cache_file_name(path));
        let target = self.formatter.app_private_path(&name);

        if let Some(parent) = target.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %target.display(), "failed to create cache directory: {}", e);
                return None;
            }
        }

        match tokio::fs::write(&target, bytes).await {
            Ok(()) => {
                info!(path = %target.display(), bytes = bytes.len(), "cached web download");
                Some(target)
            }
            Err(e) => {
                warn!(path = %target.display(), "failed to write cache file: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::png_bytes;
    use crate::platform::Platform;
    use crate::transport::MemoryTransport;
    use std::path::Path;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        transport: Arc<MemoryTransport>,
        resources: Arc<ResourceRegistry>,
        fetcher: TieredFetcher,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::create_dir_all(root.join("bundled")).unwrap();
        std::fs::create_dir_all(root.join("private")).unwrap();

        let transport = Arc::new(MemoryTransport::new());
        let resources = Arc::new(ResourceRegistry::new());
        let formatter =
            PathFormatter::new(Platform::Desktop, root.join("bundled"), root.join("private"));
        let strategy = ProbeStrategy::Stat;
        let fetcher = TieredFetcher::new(formatter, transport.clone(), resources.clone(), strategy);
        Fixture { _dir: dir, root, transport, resources, fetcher }
    }

    fn bundled_uri(root: &Path, rel: &str) -> String {
        format!("file://{}/bundled/{}", root.display(), rel)
    }

    #[tokio::test]
    async fn test_falls_through_to_web() {
        let fx = fixture();
        fx.transport.insert("https://cdn.example.com/intro", b"hello from the web".to_vec());

        let request = AssetRequest::text("https://cdn.example.com/intro")
            .tiers([StorageTier::Bundled, StorageTier::Web]);
        let outcome = fx.fetcher.fetch(&request, &CancelToken::new()).await.unwrap();

        assert_eq!(outcome.tier, StorageTier::Web);
        assert_eq!(outcome.asset.into_text().as_deref(), Some("hello from the web"));
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.attempts[0].tier, StorageTier::Bundled);
        assert!(matches!(outcome.attempts[0].error, FetchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bundled_texture_uses_probed_extension() {
        let fx = fixture();
        std::fs::create_dir_all(fx.root.join("bundled/skybox")).unwrap();
        std::fs::write(fx.root.join("bundled/skybox/front.jpg"), b"on disk").unwrap();
        let uri = bundled_uri(&fx.root, "skybox/front.jpg");
        fx.transport.insert(uri.clone(), png_bytes(2, 2));

        let request = AssetRequest::texture("skybox/front").tier(StorageTier::Bundled);
        let outcome = fx.fetcher.fetch(&request, &CancelToken::new()).await.unwrap();

        assert_eq!(outcome.location, uri);
        assert_eq!(fx.transport.requests(), vec![uri]);
        let texture = outcome.asset.into_texture().unwrap();
        assert_eq!(texture.name, "front");
        assert_eq!(texture.width, 2);
    }

    #[tokio::test]
    async fn test_embedded_resource_by_stem() {
        let fx = fixture();
        fx.resources.register("copy/welcome.txt", b"embedded".to_vec());

        let request = AssetRequest::text("copy/welcome.md").tier(StorageTier::EmbeddedResources);
        let outcome = fx.fetcher.fetch(&request, &CancelToken::new()).await.unwrap();

        assert_eq!(outcome.tier, StorageTier::EmbeddedResources);
        assert_eq!(outcome.location, "copy/welcome.txt");
        assert_eq!(outcome.asset.into_text().as_deref(), Some("embedded"));
    }

    #[tokio::test]
    async fn test_web_cache_then_app_private_hit() {
        let fx = fixture();
        let url = "http://cdn.example.com/data/prices.csv";
        fx.transport.insert(url, b"item,price\nlamp,40\n".to_vec());

        let request = AssetRequest::csv(url).tier(StorageTier::Web).cache_on_success(true);
        let outcome = fx.fetcher.fetch(&request, &CancelToken::new()).await.unwrap();
        let cached = outcome.cached_to.unwrap();
        assert_eq!(cached, fx.root.join("private/http_cdn_example_com_data_prices.csv"));
        assert_eq!(std::fs::read(&cached).unwrap(), b"item,price\nlamp,40\n");

        fx.transport.remove(url);
        let offline = AssetRequest::csv(url).tiers([StorageTier::AppPrivate, StorageTier::Web]);
        let outcome = fx.fetcher.fetch(&offline, &CancelToken::new()).await.unwrap();
        assert_eq!(outcome.tier, StorageTier::AppPrivate);
        assert_eq!(outcome.asset.into_csv().unwrap().rows, vec![vec!["lamp", "40"]]);
    }

    #[tokio::test]
    async fn test_explicit_file_name_for_cache() {
        let fx = fixture();
        fx.transport.insert("https://x.io/a?id=7", b"named".to_vec());

        let request = AssetRequest::text("https://x.io/a?id=7")
            .tier(StorageTier::Web)
            .cache_on_success(true)
            .file_name("greeting.txt");
        let outcome = fx.fetcher.fetch(&request, &CancelToken::new()).await.unwrap();
        assert_eq!(outcome.cached_to, Some(fx.root.join("private/greeting.txt")));

        let again = AssetRequest::text("https://x.io/a?id=7")
            .tier(StorageTier::AppPrivate)
            .file_name("greeting");
        let outcome = fx.fetcher.fetch(&again, &CancelToken::new()).await.unwrap();
        assert_eq!(outcome.asset.into_text().as_deref(), Some("named"));
    }

    #[tokio::test]
    async fn test_decode_failure_falls_through() {
        let fx = fixture();
        fx.resources.register("logo.png", b"not a png".to_vec());
        fx.transport.insert("logo", png_bytes(1, 1));

        let request = AssetRequest::texture("logo")
            .tiers([StorageTier::EmbeddedResources, StorageTier::Web]);
        let outcome = fx.fetcher.fetch(&request, &CancelToken::new()).await.unwrap();

        assert_eq!(outcome.tier, StorageTier::Web);
        assert!(matches!(
            outcome.attempts[0].error,
            FetchError::Decode { kind: AssetKind::Texture, .. }
        ));
    }

    #[tokio::test]
    async fn test_exhausted_tiers() {
        let fx = fixture();
        let request = AssetRequest::text("missing");
        let err = fx.fetcher.fetch(&request, &CancelToken::new()).await.unwrap_err();
        assert_eq!(err, FetchError::ExhaustedTiers { path: "missing".into(), attempts: 4 });
    }

    #[tokio::test]
    async fn test_empty_path_is_invalid() {
        let fx = fixture();
        let request = AssetRequest::text("  ");
        let err = fx.fetcher.fetch(&request, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_tier_miss() {
        let fx = fixture();
        let fetcher = fx.fetcher.clone().with_timeout(Some(Duration::from_secs(5)));
        fx.transport.stall("https://slow.example.com/intro.txt");

        let request =
            AssetRequest::text("https://slow.example.com/intro.txt").tier(StorageTier::Web);
        let err = fetcher.fetch(&request, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::ExhaustedTiers { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_cancel_stops_remaining_tiers() {
        let fx = fixture();
        fx.transport.stall("https://slow.example.com/intro.txt");
        let cancel = CancelToken::new();
        let trigger = cancel.clone();

        let request =
            AssetRequest::text("https://slow.example.com/intro.txt").tier(StorageTier::Web);
        let fetch = fx.fetcher.fetch(&request, &cancel);
        let (result, _) = tokio::join!(fetch, async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });

        assert_eq!(result.unwrap_err(), FetchError::Cancelled);
    }
}

//! # Bundle Manager - Download, Cache, Validate, Load
//!
//! ## Table of Contents
//! - **VersionKind / BundleDescriptor**: what to download and its live state
//! - **BundleCache**: on-disk cache, `AssetBundles/<name>/<date>/<version>.bundle`
//! - **AcceptancePolicy**: application hook deciding whether a bundle is kept
//! - **BundleManager**: the download state machine plus load / unload
//!
//! ## State machine
//! ```text
//! Idle → Downloading → Validating → Ready
//!             ↓             ↓
//!          Failed       Reverting → Ready | Failed
//! ```
//! A rejected bundle is dropped from the cache and previously cached
//! versions are tried newest first until the policy accepts one.

use crate::archive::LoadedBundle;
use crate::cancel::CancelToken;
use crate::decode::{self, Asset};
use crate::error::{BundleError, FetchError};
use crate::hash::{bundle_checksum, VersionHash};
use crate::kind::AssetKind;
use crate::path::PathFormatter;
use crate::platform::TextureFormat;
use crate::transport::{ProgressFn, Transport};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

// ============================================================================
// Descriptor
// ============================================================================

/// Version identifier requested for a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionKind {
    /// Always fetched, never cached
    #[default]
    None,
    Integer(u32),
    Hash(VersionHash),
}

impl VersionKind {
    /// Cache key, `None` for unversioned bundles
    pub fn version_hash(&self) -> Option<VersionHash> {
        match self {
            Self::None => None,
            Self::Integer(n) => Some(VersionHash::from_integer(*n)),
            Self::Hash(hash) => Some(*hash),
        }
    }

    pub fn parse_hash(hex: &str) -> Result<Self, BundleError> {
        VersionHash::parse(hex)
            .map(Self::Hash)
            .map_err(|e| BundleError::InvalidVersion(format!("{}: {}", hex, e)))
    }
}

/// Lifecycle of one bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleState {
    #[default]
    Idle,
    Downloading,
    Validating,
    Reverting,
    Ready,
    Failed,
}

/// One asset pulled out of a loaded bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleAsset {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl BundleAsset {
    pub fn kind(&self) -> Option<AssetKind> {
        AssetKind::from_mime(&self.mime_type)
    }

    /// Decode with the decoder matching the asset's MIME type
    pub fn decode(&self, format: TextureFormat) -> Result<Asset, FetchError> {
        let kind = self
            .kind()
            .ok_or_else(|| {
                FetchError::InvalidRequest(format!("no decoder for {}", self.mime_type))
            })?;
        decode::decode(kind, &self.name, &self.data, format)
    }
}

/// One load operation against a bundle's in-memory handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// `None` for a load-all request
    pub name: Option<String>,
    pub kind: Option<AssetKind>,
    pub assets: Vec<BundleAsset>,
}

impl LoadRequest {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// A bundle to download, and everything the manager learns about it
#[derive(Debug, Clone, Default)]
pub struct BundleDescriptor {
    pub name: String,
    /// Source location; `StreamingAssets/` and `PersistentData/` prefixes
    /// are rebased onto the local roots
    pub path: String,
    pub version: VersionKind,
    /// Leading four bytes of the file's SHA-256, `0` skips the check
    pub checksum: u32,
    progress: f32,
    state: BundleState,
    cache_dir: Option<PathBuf>,
    handle: Option<Arc<LoadedBundle>>,
    requests: Vec<LoadRequest>,
}

impl BundleDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self { name: name.into(), path: path.into(), ..Default::default() }
    }

    pub fn with_version(mut self, version: VersionKind) -> Self {
        self.version = version;
        self
    }

    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = checksum;
        self
    }

    /// Percent complete for the current download attempt
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn state(&self) -> BundleState {
        self.state
    }

    /// Directory the active version is cached in
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&LoadedBundle> {
        self.handle.as_deref()
    }

    pub fn requests(&self) -> &[LoadRequest] {
        &self.requests
    }

    /// Load requests that produced at least one asset
    pub fn non_empty_requests(&self) -> usize {
        self.requests.iter().filter(|r| !r.is_empty()).count()
    }

    /// Every asset loaded so far, oldest first
    pub fn loaded_assets(&self) -> impl Iterator<Item = &BundleAsset> {
        self.requests.iter().flat_map(|r| r.assets.iter())
    }

    /// Most recently loaded asset named `name`
    pub fn asset(&self, name: &str) -> Option<&BundleAsset> {
        self.loaded_assets().filter(|a| a.name == name).last()
    }

    fn set_state(&mut self, state: BundleState) {
        if self.state != state {
            info!(bundle = %self.name, from = ?self.state, to = ?state, "bundle state");
            self.state = state;
        }
    }

    fn fail(&mut self, error: BundleError) -> BundleError {
        warn!(bundle = %self.name, "bundle failed: {}", error);
        self.set_state(BundleState::Failed);
        error
    }
}

// ============================================================================
// Acceptance policy
// ============================================================================

/// Decides whether a downloaded or cached bundle may be used
pub trait AcceptancePolicy: Send + Sync {
    fn accept(&self, name: &str, version: Option<VersionHash>, bundle: &LoadedBundle) -> bool;
}

/// Accepts every bundle
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AcceptancePolicy for AcceptAll {
    fn accept(&self, _name: &str, _version: Option<VersionHash>, _bundle: &LoadedBundle) -> bool {
        true
    }
}

// ============================================================================
// Cache
// ============================================================================

/// A bundle version found in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBundle {
    pub version: VersionHash,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// On-disk bundle cache rooted at `<app_private>/AssetBundles`
#[derive(Debug, Clone)]
pub struct BundleCache {
    root: PathBuf,
}

impl BundleCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Friday, October 16, 2026`
    pub fn date_stamp(date: NaiveDate) -> String {
        date.format("%A, %B %-d, %Y").to_string()
    }

    /// A bundle name must be a single plain directory name: not empty, no
    /// separators, no `.` or `..`, nothing absolute
    pub fn check_name(name: &str) -> Result<&str, BundleError> {
        let single = matches!(
            Path::new(name).components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        );
        if !single || name.trim().is_empty() || name.contains(&['/', '\\', ':'][..]) {
            return Err(BundleError::InvalidName(name.to_string()));
        }
        Ok(name)
    }

    pub fn bundle_dir(&self, name: &str) -> Result<PathBuf, BundleError> {
        Ok(self.root.join(Self::check_name(name)?))
    }

    pub fn dated_dir(&self, name: &str, date: NaiveDate) -> Result<PathBuf, BundleError> {
        Ok(self.bundle_dir(name)?.join(Self::date_stamp(date)))
    }

    /// Every cached version of `name`, newest first
    pub async fn cached_versions(&self, name: &str) -> std::io::Result<Vec<CachedBundle>> {
        let mut found = Vec::new();
        let dir = self
            .bundle_dir(name)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let mut dates = match tokio::fs::read_dir(dir).await {
            Ok(dates) => dates,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e),
        };

        while let Some(date) = dates.next_entry().await? {
            if !date.file_type().await?.is_dir() {
                continue;
            }
            let mut files = tokio::fs::read_dir(date.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().map_or(true, |e| e != "bundle") {
                    continue;
                }
                let Some(version) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| VersionHash::parse(s).ok())
                else {
                    continue;
                };
                let modified = file.metadata().await?.modified()?;
                found.push(CachedBundle { version, path, modified });
            }
        }

        found.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
        Ok(found)
    }

    pub async fn find(
        &self,
        name: &str,
        version: VersionHash,
    ) -> std::io::Result<Option<CachedBundle>> {
        Ok(self.cached_versions(name).await?.into_iter().find(|c| c.version == version))
    }

    /// Write `bytes` as today's copy of `version`
    pub async fn store(
        &self,
        name: &str,
        version: VersionHash,
        bytes: &[u8],
    ) -> Result<PathBuf, BundleError> {
        let dir = self.dated_dir(name, chrono::Local::now().date_naive())?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.bundle", version.to_hex()));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Delete one cached file, and its date directory once empty
    pub async fn remove(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await?;
        if let Some(dir) = path.parent() {
            // Fails while other versions remain
            let _ = tokio::fs::remove_dir(dir).await;
        }
        Ok(())
    }

    /// Delete the cache of each named bundle, or of every bundle when
    /// `names` is empty. Only direct subdirectories of the cache root whose
    /// name matches are touched. False if the cache root does not exist or
    /// any deletion failed.
    pub async fn clear(&self, names: &[String]) -> bool {
        if tokio::fs::metadata(&self.root).await.map(|m| !m.is_dir()).unwrap_or(true) {
            debug!(root = %self.root.display(), "no bundle cache to clear");
            return false;
        }

        let dirs = match list_dirs(&self.root).await {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!(root = %self.root.display(), "failed to list bundle cache: {}", e);
                return false;
            }
        };

        let targets: Vec<PathBuf> = if names.is_empty() {
            dirs
        } else {
            dirs.into_iter()
                .filter(|dir| {
                    dir.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| names.iter().any(|wanted| wanted.trim() == n))
                })
                .collect()
        };

        let mut ok = true;
        for target in targets {
            match tokio::fs::remove_dir_all(&target).await {
                Ok(()) => info!(path = %target.display(), "cleared bundle cache"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %target.display(), "failed to clear bundle cache: {}", e);
                    ok = false;
                }
            }
        }
        ok
    }
}

async fn list_dirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            out.push(entry.path());
        }
    }
    Ok(out)
}

// ============================================================================
// Progress
// ============================================================================

/// Forwards only strictly increasing percentages
struct ProgressTracker<'a> {
    last: Mutex<f32>,
    sink: Option<&'a ProgressFn<'a>>,
}

impl<'a> ProgressTracker<'a> {
    fn new(sink: Option<&'a ProgressFn<'a>>) -> Self {
        Self { last: Mutex::new(f32::NEG_INFINITY), sink }
    }

    fn report(&self, percent: f32) {
        let percent = percent.clamp(0.0, 100.0);
        let mut last = self.last.lock();
        if percent > *last {
            *last = percent;
            if let Some(sink) = self.sink {
                sink(percent);
            }
        }
    }

    fn current(&self) -> f32 {
        self.last.lock().max(0.0)
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Downloads, caches and loads bundles
#[derive(Clone)]
pub struct BundleManager {
    formatter: PathFormatter,
    transport: Arc<dyn Transport>,
    policy: Arc<dyn AcceptancePolicy>,
    cache: BundleCache,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for BundleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleManager")
            .field("cache", &self.cache)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Bytes of the bundle being validated and where they live on disk
struct Candidate {
    bytes: Vec<u8>,
    cached_at: Option<PathBuf>,
    from_cache: bool,
}

impl BundleManager {
    /// `cache_root` is normally
    /// [`AssetConfig::bundle_cache_root`](crate::AssetConfig::bundle_cache_root)
    pub fn new(
        formatter: PathFormatter,
        transport: Arc<dyn Transport>,
        policy: Arc<dyn AcceptancePolicy>,
        cache_root: impl Into<PathBuf>,
    ) -> Self {
        Self { formatter, transport, policy, cache: BundleCache::new(cache_root), timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &BundleCache {
        &self.cache
    }

    /// Download (or load from cache), validate and open a bundle.
    ///
    /// `on_progress` receives strictly increasing percentages ending at 100
    /// once the bytes are in hand.
    pub async fn download(
        &self,
        descriptor: &mut BundleDescriptor,
        on_progress: Option<&ProgressFn<'_>>,
        cancel: &CancelToken,
    ) -> Result<(), BundleError> {
        if let Err(e) = BundleCache::check_name(&descriptor.name) {
            return Err(descriptor.fail(e));
        }

        descriptor.progress = 0.0;
        descriptor.set_state(BundleState::Downloading);

        let tracker = ProgressTracker::new(on_progress);
        tracker.report(0.0);

        let result = self.fetch_candidate(descriptor, &tracker, cancel).await;
        descriptor.progress = tracker.current();
        let candidate = result.map_err(|e| descriptor.fail(e))?;

        if descriptor.checksum != 0 {
            let actual = bundle_checksum(&candidate.bytes);
            if actual != descriptor.checksum {
                let cached = candidate.cached_at.as_deref().filter(|_| candidate.from_cache);
                if let Some(path) = cached {
                    warn!(
                        bundle = %descriptor.name,
                        path = %path.display(),
                        "cached bundle fails checksum"
                    );
                }
                let expected = descriptor.checksum;
                return Err(descriptor.fail(BundleError::ChecksumMismatch { expected, actual }));
            }
        }

        let bundle = LoadedBundle::decode(&candidate.bytes).map_err(|e| descriptor.fail(e))?;
        descriptor.set_state(BundleState::Validating);

        let version = descriptor.version.version_hash();
        let cached_at = match (&candidate.cached_at, version) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(version)) => {
                match self.cache.store(&descriptor.name, version, &candidate.bytes).await {
                    Ok(path) => {
                        info!(bundle = %descriptor.name, path = %path.display(), "cached bundle");
                        Some(path)
                    }
                    Err(e) => {
                        warn!(bundle = %descriptor.name, "failed to cache bundle: {}", e);
                        None
                    }
                }
            }
            (None, None) => None,
        };

        if self.policy.accept(&descriptor.name, version, &bundle) {
            self.activate(descriptor, bundle, cached_at.as_deref());
            return Ok(());
        }

        warn!(
            bundle = %descriptor.name,
            version = ?version,
            "bundle rejected, reverting to cached versions"
        );
        if let Some(path) = &cached_at {
            if let Err(e) = self.cache.remove(path).await {
                warn!(path = %path.display(), "failed to remove rejected bundle: {}", e);
            }
        }
        descriptor.set_state(BundleState::Reverting);
        self.revert(descriptor, cancel).await
    }

    async fn fetch_candidate(
        &self,
        descriptor: &BundleDescriptor,
        tracker: &ProgressTracker<'_>,
        cancel: &CancelToken,
    ) -> Result<Candidate, BundleError> {
        if let Some(version) = descriptor.version.version_hash() {
            match self.cache.find(&descriptor.name, version).await {
                Ok(Some(cached)) => {
                    let read = cancel
                        .run(tokio::fs::read(&cached.path))
                        .await
                        .map_err(|_| BundleError::Cancelled)?;
                    match read {
                        Ok(bytes) => {
                            debug!(
                                bundle = %descriptor.name,
                                path = %cached.path.display(),
                                "serving bundle from cache"
                            );
                            tracker.report(100.0);
                            return Ok(Candidate {
                                bytes,
                                cached_at: Some(cached.path),
                                from_cache: true,
                            });
                        }
                        Err(e) => {
                            warn!(path = %cached.path.display(), "unreadable cached bundle: {}", e)
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(bundle = %descriptor.name, "failed to scan bundle cache: {}", e),
            }
        }

        let location = self.formatter.resolve_bundle_location(&descriptor.path);
        if location.trim().is_empty() {
            return Err(BundleError::Network("empty bundle location".into()));
        }
        debug!(bundle = %descriptor.name, location = %location, "downloading bundle");

        let report = |fraction: f32| tracker.report((fraction * 100.0).min(99.0));
        let fetch = self.transport.fetch(&location, Some(&report));
        let response = match self.timeout {
            Some(limit) => cancel
                .run(tokio::time::timeout(limit, fetch))
                .await
                .map_err(|_| BundleError::Cancelled)?
                .map_err(|_| {
                    BundleError::Network(format!("timed out after {}s", limit.as_secs()))
                })?,
            None => cancel.run(fetch).await.map_err(|_| BundleError::Cancelled)?,
        };

        match (response.error, response.bytes.is_empty()) {
            (Some(error), true) => return Err(BundleError::Network(error)),
            (None, true) => return Err(BundleError::EmptyResponse),
            (Some(error), false) => {
                warn!(
                    bundle = %descriptor.name,
                    received = response.bytes.len(),
                    "partial download: {}",
                    error
                );
            }
            (None, false) => {}
        }

        tracker.report(100.0);
        Ok(Candidate { bytes: response.bytes, cached_at: None, from_cache: false })
    }

    /// Try cached versions newest first until the policy accepts one
    async fn revert(
        &self,
        descriptor: &mut BundleDescriptor,
        cancel: &CancelToken,
    ) -> Result<(), BundleError> {
        let cached = self.cache.cached_versions(&descriptor.name).await.unwrap_or_else(|e| {
            warn!(bundle = %descriptor.name, "failed to scan bundle cache: {}", e);
            Vec::new()
        });

        for entry in cached {
            if cancel.is_cancelled() {
                return Err(descriptor.fail(BundleError::Cancelled));
            }

            let bytes = match tokio::fs::read(&entry.path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %entry.path.display(), "unreadable cached bundle: {}", e);
                    continue;
                }
            };
            let bundle = match LoadedBundle::decode(&bytes) {
                Ok(bundle) => bundle,
                Err(e) => {
                    warn!(path = %entry.path.display(), "corrupt cached bundle: {}", e);
                    continue;
                }
            };

            if self.policy.accept(&descriptor.name, Some(entry.version), &bundle) {
                info!(
                    bundle = %descriptor.name,
                    version = %entry.version,
                    "reverted to cached bundle"
                );
                self.activate(descriptor, bundle, Some(&entry.path));
                return Ok(());
            }
            debug!(bundle = %descriptor.name, version = %entry.version, "cached bundle rejected");
        }

        Err(descriptor.fail(BundleError::ValidationRejected { name: descriptor.name.clone() }))
    }

    fn activate(
        &self,
        descriptor: &mut BundleDescriptor,
        bundle: LoadedBundle,
        cached_at: Option<&Path>,
    ) {
        descriptor.cache_dir = cached_at.and_then(Path::parent).map(Path::to_path_buf);
        descriptor.handle = Some(Arc::new(bundle));
        descriptor.progress = 100.0;
        descriptor.set_state(BundleState::Ready);
    }

    /// Load every asset in the bundle
    pub async fn load_all(&self, descriptor: &mut BundleDescriptor) -> Result<usize, BundleError> {
        let handle = loaded_handle(descriptor)?;
        self.run_loads(descriptor, move || {
            let names: Vec<String> = handle.entries().iter().map(|e| e.name.clone()).collect();
            vec![LoadRequest { name: None, kind: None, assets: extract(&handle, &names, None) }]
        })
        .await
    }

    /// Load the named assets, one request per non-empty name
    pub async fn load_named(
        &self,
        descriptor: &mut BundleDescriptor,
        names: &[String],
    ) -> Result<usize, BundleError> {
        self.load_named_inner(descriptor, names, None).await
    }

    /// Load the named assets whose MIME type maps to `kind`
    pub async fn load_named_of_type(
        &self,
        descriptor: &mut BundleDescriptor,
        names: &[String],
        kind: AssetKind,
    ) -> Result<usize, BundleError> {
        self.load_named_inner(descriptor, names, Some(kind)).await
    }

    async fn load_named_inner(
        &self,
        descriptor: &mut BundleDescriptor,
        names: &[String],
        kind: Option<AssetKind>,
    ) -> Result<usize, BundleError> {
        let handle = loaded_handle(descriptor)?;
        let names: Vec<String> = names.iter().filter(|n| !n.trim().is_empty()).cloned().collect();
        self.run_loads(descriptor, move || {
            names
                .iter()
                .map(|name| LoadRequest {
                    name: Some(name.clone()),
                    kind,
                    assets: extract(&handle, std::slice::from_ref(name), kind),
                })
                .collect()
        })
        .await
    }

    /// Run extraction off the executor, append the requests, and succeed
    /// only if the number of non-empty requests grew
    async fn run_loads<F>(
        &self,
        descriptor: &mut BundleDescriptor,
        work: F,
    ) -> Result<usize, BundleError>
    where
        F: FnOnce() -> Vec<LoadRequest> + Send + 'static,
    {
        let before = descriptor.non_empty_requests();
        let requests = tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| BundleError::Decode(e.to_string()))?;

        let loaded: usize = requests.iter().map(|r| r.assets.len()).sum();
        descriptor.requests.extend(requests);

        if descriptor.non_empty_requests() > before {
            info!(bundle = %descriptor.name, assets = loaded, "loaded bundle assets");
            Ok(loaded)
        } else {
            debug!(bundle = %descriptor.name, "load produced no assets");
            Err(BundleError::NoAssetsLoaded)
        }
    }

    /// Release the in-memory handle; the disk cache and loaded assets stay
    pub fn unload(&self, descriptor: &mut BundleDescriptor) -> Result<(), BundleError> {
        if descriptor.handle.take().is_none() {
            return Err(BundleError::NotLoaded(descriptor.name.clone()));
        }
        info!(bundle = %descriptor.name, "unloaded bundle");
        descriptor.set_state(BundleState::Idle);
        Ok(())
    }

    /// See [`BundleCache::clear`]
    pub async fn clear_cache(&self, names: &[String]) -> bool {
        self.cache.clear(names).await
    }
}

fn loaded_handle(descriptor: &BundleDescriptor) -> Result<Arc<LoadedBundle>, BundleError> {
    descriptor
        .handle
        .clone()
        .ok_or_else(|| BundleError::NotLoaded(descriptor.name.clone()))
}

/// Extract `names` that exist and match `kind`, skipping broken entries
fn extract(bundle: &LoadedBundle, names: &[String], kind: Option<AssetKind>) -> Vec<BundleAsset> {
    let mut assets = Vec::new();
    for name in names {
        let Some(entry) = bundle.manifest.get_entry(name) else {
            debug!(bundle = %bundle.name(), asset = %name, "no such asset in bundle");
            continue;
        };
        if kind.is_some() && AssetKind::from_mime(&entry.mime_type) != kind {
            continue;
        }
        match bundle.extract(name) {
            Ok(data) => assets.push(BundleAsset {
                name: name.clone(),
                mime_type: entry.mime_type.clone(),
                data,
            }),
            Err(e) => {
                warn!(bundle = %bundle.name(), asset = %name, "failed to extract asset: {}", e)
            }
        }
    }
    assets
}

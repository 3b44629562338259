//! # AssetPipeline - Service Entry Points
//!
//! Wires config, transport, resource registry, acceptance policy and
//! messenger into one service. Construct it once at start-up and hand
//! clones to whoever needs assets.
//!
//! ## Table of Contents
//! - **Builder**: `AssetPipeline::builder(config)` with injectable parts
//! - **Fetch**: `fetch_text`, `fetch_csv`, `fetch_texture`, `fetch_audio_clip`
//! - **Callbacks**: `*_with_callbacks`, exactly one callback per request
//! - **Bundles**: download / load / unload / clear cache
//! - **Reachability**: periodic connectivity broadcasts

use crate::bundle::{AcceptAll, AcceptancePolicy, BundleDescriptor, BundleManager};
use crate::cancel::CancelToken;
use crate::config::AssetConfig;
use crate::decode::{Asset, AudioClip, CsvTable, Texture};
use crate::error::{BundleError, ConfigError, FetchError};
use crate::fetcher::{AssetRequest, FetchOutcome, TieredFetcher};
use crate::kind::AssetKind;
use crate::messenger::Messenger;
use crate::path::PathFormatter;
use crate::probe::ProbeStrategy;
use crate::reachability::{probe_url, ReachabilityMonitor};
use crate::resources::ResourceRegistry;
use crate::transport::{HttpTransport, ProgressFn, Transport};
use std::sync::Arc;
use tokio::task::JoinHandle;

// ============================================================================
// Builder
// ============================================================================

/// Builds an [`AssetPipeline`], defaulting every part not supplied
pub struct AssetPipelineBuilder {
    config: AssetConfig,
    transport: Option<Arc<dyn Transport>>,
    resources: Option<Arc<ResourceRegistry>>,
    policy: Option<Arc<dyn AcceptancePolicy>>,
    messenger: Option<Messenger>,
}

impl AssetPipelineBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn resources(mut self, resources: Arc<ResourceRegistry>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn acceptance_policy(mut self, policy: Arc<dyn AcceptancePolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn messenger(mut self, messenger: Messenger) -> Self {
        self.messenger = Some(messenger);
        self
    }

    /// Defaults: reqwest transport, registry over `resources_root`,
    /// [`AcceptAll`], fresh messenger
    pub fn build(self) -> Result<AssetPipeline, ConfigError> {
        let config = self.config;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.user_agent)?),
        };
        let resources = self.resources.unwrap_or_else(|| {
            Arc::new(match &config.resources_root {
                Some(root) => ResourceRegistry::with_root(root),
                None => ResourceRegistry::new(),
            })
        });
        let policy = self.policy.unwrap_or_else(|| Arc::new(AcceptAll));
        let messenger = self.messenger.unwrap_or_default();

        let formatter = PathFormatter::from_config(&config);
        let strategy = ProbeStrategy::resolve(config.probe_strategy, config.platform);
        let timeout = config.request_timeout();

        let fetcher =
            TieredFetcher::new(formatter.clone(), transport.clone(), resources.clone(), strategy)
                .with_timeout(timeout);
        let bundles =
            BundleManager::new(formatter, transport.clone(), policy, config.bundle_cache_root())
                .with_timeout(timeout);
        let reachability = Arc::new(ReachabilityMonitor::new(
            messenger.clone(),
            config.forced_online_mode,
            config.reachability_interval(),
        ));

        Ok(AssetPipeline {
            config,
            transport,
            resources,
            fetcher,
            bundles,
            messenger,
            reachability,
        })
    }
}

// ============================================================================
// Service
// ============================================================================

/// The asset resolution service
#[derive(Clone)]
pub struct AssetPipeline {
    config: AssetConfig,
    transport: Arc<dyn Transport>,
    resources: Arc<ResourceRegistry>,
    fetcher: TieredFetcher,
    bundles: BundleManager,
    messenger: Messenger,
    reachability: Arc<ReachabilityMonitor>,
}

impl std::fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher)
            .field("bundles", &self.bundles)
            .finish_non_exhaustive()
    }
}

impl AssetPipeline {
    pub fn builder(config: AssetConfig) -> AssetPipelineBuilder {
        AssetPipelineBuilder {
            config,
            transport: None,
            resources: None,
            policy: None,
            messenger: None,
        }
    }

    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    pub fn formatter(&self) -> &PathFormatter {
        self.fetcher.formatter()
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    pub fn reachability(&self) -> &ReachabilityMonitor {
        &self.reachability
    }

    pub fn bundles(&self) -> &BundleManager {
        &self.bundles
    }

    // ------------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------------

    /// Resolve any request, keeping the tier report
    pub async fn fetch(
        &self,
        request: &AssetRequest,
        cancel: &CancelToken,
    ) -> Result<FetchOutcome, FetchError> {
        self.fetcher.fetch(request, cancel).await
    }

    async fn fetch_as<T>(
        &self,
        mut request: AssetRequest,
        kind: AssetKind,
        cancel: &CancelToken,
        extract: fn(Asset) -> Option<T>,
    ) -> Result<T, FetchError> {
        request.kind = kind;
        let outcome = self.fetcher.fetch(&request, cancel).await?;
        extract(outcome.asset)
            .ok_or_else(|| FetchError::decode(kind, "decoder returned a different asset kind"))
    }

    pub async fn fetch_text(
        &self,
        request: AssetRequest,
        cancel: &CancelToken,
    ) -> Result<String, FetchError> {
        self.fetch_as(request, AssetKind::Text, cancel, Asset::into_text).await
    }

    pub async fn fetch_csv(
        &self,
        request: AssetRequest,
        cancel: &CancelToken,
    ) -> Result<CsvTable, FetchError> {
        self.fetch_as(request, AssetKind::Csv, cancel, Asset::into_csv).await
    }

    pub async fn fetch_texture(
        &self,
        request: AssetRequest,
        cancel: &CancelToken,
    ) -> Result<Texture, FetchError> {
        self.fetch_as(request, AssetKind::Texture, cancel, Asset::into_texture).await
    }

    pub async fn fetch_audio_clip(
        &self,
        request: AssetRequest,
        cancel: &CancelToken,
    ) -> Result<AudioClip, FetchError> {
        self.fetch_as(request, AssetKind::AudioClip, cancel, Asset::into_audio_clip).await
    }

    // ------------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------------

    pub async fn fetch_text_with_callbacks<S, F>(
        &self,
        request: AssetRequest,
        cancel: &CancelToken,
        on_success: Option<S>,
        on_failure: Option<F>,
    ) where
        S: FnOnce(String),
        F: FnOnce(FetchError),
    {
        settle(self.fetch_text(request, cancel).await, on_success, on_failure);
    }

    pub async fn fetch_csv_with_callbacks<S, F>(
        &self,
        request: AssetRequest,
        cancel: &CancelToken,
        on_success: Option<S>,
        on_failure: Option<F>,
    ) where
        S: FnOnce(CsvTable),
        F: FnOnce(FetchError),
    {
        settle(self.fetch_csv(request, cancel).await, on_success, on_failure);
    }

    pub async fn fetch_texture_with_callbacks<S, F>(
        &self,
        request: AssetRequest,
        cancel: &CancelToken,
        on_success: Option<S>,
        on_failure: Option<F>,
    ) where
        S: FnOnce(Texture),
        F: FnOnce(FetchError),
    {
        settle(self.fetch_texture(request, cancel).await, on_success, on_failure);
    }

    pub async fn fetch_audio_clip_with_callbacks<S, F>(
        &self,
        request: AssetRequest,
        cancel: &CancelToken,
        on_success: Option<S>,
        on_failure: Option<F>,
    ) where
        S: FnOnce(AudioClip),
        F: FnOnce(FetchError),
    {
        settle(self.fetch_audio_clip(request, cancel).await, on_success, on_failure);
    }

    // ------------------------------------------------------------------------
    // Bundles
    // ------------------------------------------------------------------------

    /// `on_progress` receives percentages, 0 to 100
    pub async fn download_bundle(
        &self,
        descriptor: &mut BundleDescriptor,
        on_progress: Option<&ProgressFn<'_>>,
        cancel: &CancelToken,
    ) -> Result<(), BundleError> {
        self.bundles.download(descriptor, on_progress, cancel).await
    }

    pub async fn download_bundle_with_callbacks<S, F>(
        &self,
        descriptor: &mut BundleDescriptor,
        on_success: Option<S>,
        on_failure: Option<F>,
        on_progress: Option<&ProgressFn<'_>>,
        cancel: &CancelToken,
    ) where
        S: FnOnce(&BundleDescriptor),
        F: FnOnce(&BundleDescriptor, BundleError),
    {
        match self.bundles.download(descriptor, on_progress, cancel).await {
            Ok(()) => {
                if let Some(on_success) = on_success {
                    on_success(descriptor);
                }
            }
            Err(e) => {
                if let Some(on_failure) = on_failure {
                    on_failure(descriptor, e);
                }
            }
        }
    }

    pub async fn load_all_assets_into_memory(
        &self,
        descriptor: &mut BundleDescriptor,
    ) -> Result<usize, BundleError> {
        self.bundles.load_all(descriptor).await
    }

    pub async fn load_named_assets_into_memory(
        &self,
        descriptor: &mut BundleDescriptor,
        names: &[String],
    ) -> Result<usize, BundleError> {
        self.bundles.load_named(descriptor, names).await
    }

    pub async fn load_named_assets_of_type_into_memory(
        &self,
        descriptor: &mut BundleDescriptor,
        names: &[String],
        kind: AssetKind,
    ) -> Result<usize, BundleError> {
        self.bundles.load_named_of_type(descriptor, names, kind).await
    }

    pub fn unload_from_memory(&self, descriptor: &mut BundleDescriptor) -> Result<(), BundleError> {
        self.bundles.unload(descriptor)
    }

    /// Clear the named bundles' caches, or all of them for an empty list
    pub async fn clear_cache(&self, names: &[String]) -> bool {
        self.bundles.clear_cache(names).await
    }

    // ------------------------------------------------------------------------
    // Reachability
    // ------------------------------------------------------------------------

    /// Broadcast connectivity every `reachability_interval_ms`. With no
    /// `probe_location` the probe never reaches a verdict, which counts as
    /// reachable.
    pub fn spawn_reachability_loop(
        &self,
        probe_location: Option<String>,
        cancel: CancelToken,
    ) -> JoinHandle<()> {
        let transport = self.transport.clone();
        self.reachability.clone().spawn_loop(
            move || {
                let transport = transport.clone();
                let location = probe_location.clone();
                async move {
                    match location {
                        Some(location) => probe_url(transport.as_ref(), &location).await,
                        None => None,
                    }
                }
            },
            cancel,
        )
    }
}

/// Deliver a result to at most one of two optional callbacks
fn settle<T, E, S, F>(result: Result<T, E>, on_success: Option<S>, on_failure: Option<F>)
where
    S: FnOnce(T),
    F: FnOnce(E),
{
    match result {
        Ok(value) => {
            if let Some(on_success) = on_success {
                on_success(value);
            }
        }
        Err(e) => {
            if let Some(on_failure) = on_failure {
                on_failure(e);
            }
        }
    }
}

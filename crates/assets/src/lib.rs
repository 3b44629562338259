//! # BrandXR Asset Pipeline
//!
//! Resolves logical asset paths against a fixed ladder of storage tiers,
//! decodes what it finds, and manages versioned asset bundles.
//!
//! ## Table of Contents
//!
//! 1. **PathFormatter** - Tier-specific locations and derived cache names
//! 2. **ExistenceProber** - Extension-variant probing by stat or by load
//! 3. **TieredFetcher** - Bundled → Embedded → AppPrivate → Web, cache on success
//! 4. **BundleManager** - Versioned download, on-disk cache, rollback, load/unload
//! 5. **AssetPipeline** - The service applications construct once and share
//! 6. **ReachabilityMonitor** - Online/offline broadcasts over the `Messenger`
//!
//! ## Tier order
//!
//! | Tier | Backed by | Probing |
//! |------|-----------|---------|
//! | Bundled | read-only app assets | stat, or load on Android/WebGL |
//! | EmbeddedResources | `ResourceRegistry` | stem lookup |
//! | AppPrivate | read/write storage | stat |
//! | Web | `Transport` | none, GET directly |

mod archive;
mod bundle;
mod cancel;
mod config;
mod decode;
mod error;
mod fetcher;
mod hash;
mod kind;
mod messenger;
mod path;
mod platform;
mod probe;
mod reachability;
mod resources;
mod service;
mod tier;
mod transport;

pub use archive::{BundleBuilder, BundleCompression, BundleEntry, BundleManifest, LoadedBundle};
pub use bundle::{
    AcceptAll, AcceptancePolicy, BundleAsset, BundleCache, BundleDescriptor, BundleManager,
    BundleState, CachedBundle, LoadRequest, VersionKind,
};
pub use cancel::{CancelToken, Cancelled};
pub use config::{AssetConfig, ForcedOnlineMode, ProbeStrategyConfig, EXAMPLE_CONFIG};
pub use decode::{
    decode, decode_audio, decode_csv, decode_text, decode_texture, Asset, AudioClip, CsvTable,
    Texture,
};
pub use error::{BundleError, ConfigError, FetchError};
pub use fetcher::{AssetRequest, FetchOutcome, TierAttempt, TieredFetcher};
pub use hash::{bundle_checksum, ContentHash, ContentHashError, VersionHash};
pub use kind::AssetKind;
pub use messenger::{
    Messenger, INTERNET_NOT_REACHABLE, INTERNET_REACHABLE, ONLINE_MODE_OFFLINE, ONLINE_MODE_ONLINE,
};
pub use path::{
    cache_file_name, escape_path, extension_of, strip_extension, PathFormatter, UriStyle,
};
pub use platform::{Platform, TextureFormat};
pub use probe::{probe_variants, stat_file, ExistenceProber, ProbeResult, ProbeStrategy};
pub use reachability::{probe_url, OnlineMode, ReachabilityMonitor};
pub use resources::{ResourceHit, ResourceRegistry};
pub use service::{AssetPipeline, AssetPipelineBuilder};
pub use tier::{dispatch_order, StorageTier, TRY_ALL_ORDER};
pub use transport::{HttpTransport, MemoryTransport, ProgressFn, Transport, TransportResponse};

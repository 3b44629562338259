//! End-to-end scenarios through the public `AssetPipeline` API.

use brandxr_assets::{
    cache_file_name, AssetConfig, AssetKind, AssetPipeline, AssetRequest, BundleBuilder,
    BundleCompression, BundleDescriptor, BundleError, BundleState, CancelToken, FetchError,
    MemoryTransport, Platform, ProbeStrategyConfig, StorageTier, VersionHash, VersionKind,
};
use parking_lot::Mutex;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

fn config(root: &Path) -> AssetConfig {
    AssetConfig::default()
        .with_bundled_root(root.join("StreamingAssets"))
        .with_app_private_root(root.join("PersistentData"))
}

fn memory_pipeline(root: &Path, transport: Arc<MemoryTransport>) -> AssetPipeline {
    std::fs::create_dir_all(root.join("StreamingAssets")).unwrap();
    AssetPipeline::builder(config(root)).transport(transport).build().unwrap()
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

fn showroom_bundle() -> Vec<u8> {
    BundleBuilder::new("showroom")
        .compression(BundleCompression::Zstd)
        .add_asset("welcome.txt", b"Welcome to the showroom", "text/plain")
        .unwrap()
        .add_asset("skybox/front.jpg", &jpeg_bytes(4, 4), "image/jpeg")
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn text_falls_through_bundled_to_web() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    transport.insert("intro", b"Hello from the CDN".to_vec());
    let pipeline = memory_pipeline(dir.path(), transport.clone());

    let successes = Mutex::new(Vec::new());
    let failures = Mutex::new(0);
    pipeline
        .fetch_text_with_callbacks(
            AssetRequest::text("intro").tiers([StorageTier::Bundled, StorageTier::Web]),
            &CancelToken::new(),
            Some(|text: String| successes.lock().push(text)),
            Some(|_: FetchError| *failures.lock() += 1),
        )
        .await;

    assert_eq!(*successes.lock(), vec!["Hello from the CDN".to_string()]);
    assert_eq!(*failures.lock(), 0);
    assert_eq!(transport.requests(), vec!["intro"]);
}

#[tokio::test]
async fn texture_resolves_jpg_variant_in_bundled_tier() {
    let dir = tempfile::tempdir().unwrap();
    let skybox = dir.path().join("StreamingAssets/skybox");
    std::fs::create_dir_all(&skybox).unwrap();
    std::fs::write(skybox.join("front.jpg"), jpeg_bytes(8, 4)).unwrap();

    // Real reqwest-backed transport reading file:// URIs
    let pipeline = AssetPipeline::builder(config(dir.path())).build().unwrap();

    let request = AssetRequest::texture("skybox/front").tier(StorageTier::Bundled);
    let outcome = pipeline.fetch(&request, &CancelToken::new()).await.unwrap();

    assert_eq!(outcome.tier, StorageTier::Bundled);
    assert!(outcome.location.starts_with("file://"));
    assert!(outcome.location.ends_with("skybox/front.jpg"));

    let texture = outcome.asset.into_texture().unwrap();
    assert_eq!((texture.width, texture.height), (8, 4));
    assert_eq!(texture.name, "front");
}

#[tokio::test]
async fn tiers_are_attempted_in_order_without_repeats() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    let pipeline = memory_pipeline(dir.path(), transport.clone());

    let cancel = CancelToken::new();
    let err = pipeline.fetch(&AssetRequest::text("missing"), &cancel).await.unwrap_err();
    assert_eq!(err, FetchError::ExhaustedTiers { path: "missing".into(), attempts: 4 });

    // A caller-supplied order is honoured and repeats are dropped
    transport.insert("late", b"found last".to_vec());
    let request = AssetRequest::text("late").tiers([
        StorageTier::AppPrivate,
        StorageTier::AppPrivate,
        StorageTier::EmbeddedResources,
        StorageTier::Web,
    ]);
    let outcome = pipeline.fetch(&request, &cancel).await.unwrap();
    let order: Vec<StorageTier> = outcome.attempts.iter().map(|a| a.tier).collect();
    assert_eq!(order, vec![StorageTier::AppPrivate, StorageTier::EmbeddedResources]);
    assert_eq!(outcome.tier, StorageTier::Web);
}

#[tokio::test]
async fn load_probing_hits_transport_before_web() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    transport.insert("https://cdn.example.com/theme", b"dark".to_vec());

    let mut config = config(dir.path()).with_platform(Platform::Android);
    config.probe_strategy = ProbeStrategyConfig::Auto;
    let pipeline = AssetPipeline::builder(config).transport(transport.clone()).build().unwrap();

    let request = AssetRequest::text("https://cdn.example.com/theme")
        .tiers([StorageTier::Bundled, StorageTier::Web]);
    let text = pipeline.fetch_text(request, &CancelToken::new()).await.unwrap();
    assert_eq!(text, "dark");

    let requests = transport.requests();
    // Two bundled variants probed through the transport, then one web GET
    assert_eq!(requests.len(), 3);
    assert_eq!(requests.last().map(String::as_str), Some("https://cdn.example.com/theme"));
    assert!(requests[..2].iter().all(|r| r.contains("StreamingAssets")));
}

#[tokio::test]
async fn web_cache_name_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    let url = "http://cdn.example.com/audio/intro.txt?lang=en";
    transport.insert(url, b"bonjour".to_vec());
    let pipeline = memory_pipeline(dir.path(), transport);

    let request = AssetRequest::text(url).tier(StorageTier::Web).cache_on_success(true);
    let first = pipeline.fetch(&request, &CancelToken::new()).await.unwrap();
    let second = pipeline.fetch(&request, &CancelToken::new()).await.unwrap();

    let expected = dir.path().join("PersistentData").join(cache_file_name(url));
    assert_eq!(first.cached_to.as_deref(), Some(expected.as_path()));
    assert_eq!(first.cached_to, second.cached_to);
    assert_eq!(cache_file_name(url), "http_cdn_example_com_audio_intro_txt_lang.txt");
    assert_eq!(std::fs::read(&expected).unwrap(), b"bonjour");
}

#[tokio::test]
async fn hash_versioned_bundle_downloads_with_monotonic_progress() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    let url = "https://cdn.example.com/bundles/showroom";
    transport.insert(url, showroom_bundle());
    let pipeline = memory_pipeline(dir.path(), transport.clone());

    let hash = VersionHash::parse("0123456789abcdef0123456789abcdef").unwrap();
    let mut descriptor =
        BundleDescriptor::new("showroom", url).with_version(VersionKind::Hash(hash));

    let progress = Mutex::new(Vec::new());
    let report = |p: f32| progress.lock().push(p);
    pipeline
        .download_bundle(&mut descriptor, Some(&report), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(transport.requests(), vec![url]);
    let progress = progress.into_inner();
    assert_eq!(progress.first().copied(), Some(0.0));
    assert_eq!(progress.last().copied(), Some(100.0));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.iter().filter(|p| **p == 100.0).count(), 1);

    assert_eq!(descriptor.state(), BundleState::Ready);
    assert_eq!(descriptor.progress(), 100.0);
    let handle = descriptor.handle().unwrap();
    assert!(!handle.entries().is_empty());

    let cache_dir = descriptor.cache_dir().unwrap();
    assert!(cache_dir.join(format!("{}.bundle", hash.to_hex())).exists());
    assert!(cache_dir.starts_with(dir.path().join("PersistentData/AssetBundles/showroom")));
}

#[tokio::test]
async fn zero_byte_network_failure_fires_failure_once() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    let url = "https://cdn.example.com/bundles/broken";
    transport.fail(url, Vec::new(), "connection reset");
    let pipeline = memory_pipeline(dir.path(), transport);

    let successes = Mutex::new(0);
    let failures = Mutex::new(Vec::new());
    let mut descriptor = BundleDescriptor::new("broken", url).with_version(VersionKind::Integer(3));
    pipeline
        .download_bundle_with_callbacks(
            &mut descriptor,
            Some(|_: &BundleDescriptor| *successes.lock() += 1),
            Some(|_: &BundleDescriptor, e: BundleError| failures.lock().push(e)),
            None,
            &CancelToken::new(),
        )
        .await;

    assert_eq!(*successes.lock(), 0);
    assert_eq!(*failures.lock(), vec![BundleError::Network("connection reset".into())]);
    assert_eq!(descriptor.state(), BundleState::Failed);
    assert!(!descriptor.is_loaded());
}

#[tokio::test]
async fn streaming_assets_bundle_loads_typed_assets() {
    let dir = tempfile::tempdir().unwrap();
    let bundles = dir.path().join("StreamingAssets/bundles");
    std::fs::create_dir_all(&bundles).unwrap();
    std::fs::write(bundles.join("showroom.bxrb"), showroom_bundle()).unwrap();

    let pipeline = AssetPipeline::builder(config(dir.path())).build().unwrap();
    let mut descriptor =
        BundleDescriptor::new("showroom", "Assets/StreamingAssets/bundles/showroom.bxrb");
    pipeline.download_bundle(&mut descriptor, None, &CancelToken::new()).await.unwrap();

    let names = vec!["welcome.txt".to_string(), "skybox/front.jpg".to_string()];
    let loaded = pipeline
        .load_named_assets_of_type_into_memory(&mut descriptor, &names, AssetKind::Texture)
        .await
        .unwrap();
    assert_eq!(loaded, 1);

    let texture = descriptor
        .asset("skybox/front.jpg")
        .unwrap()
        .decode(Platform::Desktop.preferred_texture_format())
        .unwrap()
        .into_texture()
        .unwrap();
    assert_eq!(texture.width, 4);

    pipeline.unload_from_memory(&mut descriptor).unwrap();
    assert_eq!(
        pipeline.load_all_assets_into_memory(&mut descriptor).await,
        Err(BundleError::NotLoaded("showroom".into()))
    );
}

#[tokio::test]
async fn clear_cache_all_or_named() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    let pipeline = memory_pipeline(dir.path(), transport.clone());

    assert!(!pipeline.clear_cache(&[]).await);

    for name in ["lobby", "showroom", "garage"] {
        let url = format!("https://cdn.example.com/bundles/{}", name);
        transport.insert(url.clone(), showroom_bundle());
        let mut descriptor = BundleDescriptor::new(name, url).with_version(VersionKind::Integer(1));
        pipeline.download_bundle(&mut descriptor, None, &CancelToken::new()).await.unwrap();
    }

    let cache_root = dir.path().join("PersistentData/AssetBundles");
    assert!(pipeline.clear_cache(&["showroom".to_string()]).await);
    assert!(!cache_root.join("showroom").exists());
    assert!(cache_root.join("lobby").exists());
    assert!(cache_root.join("garage").exists());

    assert!(pipeline.clear_cache(&[]).await);
    assert!(!cache_root.join("lobby").exists());
    assert!(!cache_root.join("garage").exists());
}

#[tokio::test]
async fn cancelled_request_reports_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = memory_pipeline(dir.path(), Arc::new(MemoryTransport::new()));
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = pipeline.fetch_text(AssetRequest::text("intro"), &cancel).await.unwrap_err();
    assert_eq!(err, FetchError::Cancelled);
}

//! # Path Formatter
//!
//! Builds tier-specific locations for a logical asset path:
//! - bundled assets: `<scheme><bundled_root>/<path>`, optionally escaped
//! - app-private storage: `<app_private_root>/<path>`
//! - web: the path itself, trimmed
//!
//! Also derives the flat cache file name used when a web download is
//! persisted to app-private storage.

use crate::config::AssetConfig;
use crate::platform::Platform;
use crate::tier::StorageTier;
use std::path::{Path, PathBuf};

/// Whether the logical part of a bundled URI is percent-escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriStyle {
    Plain,
    Escaped,
}

/// Marker a bundle path may contain to address the bundled root
const BUNDLED_KEYWORD: &str = "StreamingAssets/";
/// Marker a bundle path may contain to address app-private storage
const APP_PRIVATE_KEYWORD: &str = "PersistentData/";

/// Pure formatter from logical paths to tier locations
#[derive(Debug, Clone)]
pub struct PathFormatter {
    platform: Platform,
    bundled_root: PathBuf,
    app_private_root: PathBuf,
}

impl PathFormatter {
    pub fn new(
        platform: Platform,
        bundled_root: impl Into<PathBuf>,
        app_private_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            bundled_root: bundled_root.into(),
            app_private_root: app_private_root.into(),
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.platform, &config.bundled_root, &config.app_private_root)
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn app_private_root(&self) -> &Path {
        &self.app_private_root
    }

    /// URI used to read a bundled asset
    pub fn bundled_uri(&self, path: &str, style: UriStyle) -> String {
        if path.is_empty() {
            return String::new();
        }

        let relative = match style {
            UriStyle::Plain => path.to_string(),
            UriStyle::Escaped => escape_path(path),
        };

        format!("{}{}/{}", self.platform.file_uri_scheme(), root_str(&self.bundled_root), relative)
    }

    /// Location probed for existence in the bundled tier, without a scheme
    pub fn bundled_probe_path(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        format!("{}/{}", root_str(&self.bundled_root), path)
    }

    /// Location of a file in app-private storage
    pub fn app_private_path(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            return PathBuf::new();
        }
        self.app_private_root.join(path.trim_start_matches('/'))
    }

    pub fn web_location(&self, path: &str) -> String {
        path.trim().to_string()
    }

    /// Format a logical path for a tier. `TryAll` formats as `Bundled`, and
    /// embedded resources are addressed by their extension-less stem.
    pub fn format(&self, tier: StorageTier, path: &str) -> String {
        match tier {
            StorageTier::TryAll | StorageTier::Bundled => self.bundled_uri(path, UriStyle::Escaped),
            StorageTier::AppPrivate => self.app_private_path(path).to_string_lossy().into_owned(),
            StorageTier::EmbeddedResources => strip_extension(path).to_string(),
            StorageTier::Web => self.web_location(path),
        }
    }

    /// Where a web download of `source` is cached
    pub fn cache_file_path(&self, source: &str) -> PathBuf {
        self.app_private_root.join(cache_file_name(source))
    }

    /// Rebase bundle paths that name the bundled or app-private roots by
    /// keyword; anything else is returned unchanged.
    pub fn resolve_bundle_location(&self, path: &str) -> String {
        if let Some(index) = path.find(BUNDLED_KEYWORD) {
            let rest = &path[index + BUNDLED_KEYWORD.len()..];
            self.bundled_uri(rest, UriStyle::Plain)
        } else if let Some(index) = path.find(APP_PRIVATE_KEYWORD) {
            let rest = &path[index + APP_PRIVATE_KEYWORD.len()..];
            self.app_private_path(rest).to_string_lossy().into_owned()
        } else {
            path.to_string()
        }
    }
}

fn root_str(root: &Path) -> String {
    let s = root.to_string_lossy();
    s.trim_end_matches(['/', '\\']).to_string()
}

/// Percent-escape every segment of a relative path, keeping separators
pub fn escape_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// The logical path without its final extension
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

/// Extension of the last path segment including the dot, ignoring any query
/// string. Empty when there is none.
pub fn extension_of(source: &str) -> &str {
    let without_query = source.split(['?', '#']).next().unwrap_or(source);
    let name_start = without_query.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &without_query[name_start..];
    match name.rfind('.') {
        Some(dot) => &name[dot..],
        None => "",
    }
}

/// Deterministic flat file name for caching a downloaded `source`.
///
/// `://`, `.`, `/`, `?` and `=` become `_`, the name is cut at the last `_`
/// and the source's extension is appended, so
/// `http://cdn.example.com/audio/intro.mp3` becomes
/// `http_cdn_example_com_audio_intro.mp3`.
///
/// The appended extension ignores any query string or fragment, so
/// `https://x.io/img.png?size=large` caches as `https_x_io_img_png_size.png`
/// rather than keeping `.png?size=large` as the extension.
pub fn cache_file_name(source: &str) -> String {
    let source = source.trim();
    let sanitized = source
        .replace("://", "_")
        .replace(['.', '/', '?', '='], "_");

    let extension = extension_of(source);
    match sanitized.rfind('_') {
        Some(last) => format!("{}{}", &sanitized[..last], extension),
        None => format!("{}{}", sanitized, extension),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop() -> PathFormatter {
        PathFormatter::new(Platform::Desktop, "/app/StreamingAssets", "/data/persistent")
    }

    #[test]
    fn test_bundled_uri_styles() {
        let f = desktop();
        assert_eq!(
            f.bundled_uri("skybox/front face.png", UriStyle::Plain),
            "file:///app/StreamingAssets/skybox/front face.png"
        );
        assert_eq!(
            f.bundled_uri("skybox/front face.png", UriStyle::Escaped),
            "file:///app/StreamingAssets/skybox/front%20face.png"
        );
    }

    #[test]
    fn test_android_has_no_file_scheme() {
        let f = PathFormatter::new(Platform::Android, "jar:file:///base.apk!/assets/", "/data");
        assert_eq!(
            f.bundled_uri("intro.txt", UriStyle::Escaped),
            "jar:file:///base.apk!/assets/intro.txt"
        );
    }

    #[test]
    fn test_empty_path_formats_to_empty() {
        let f = desktop();
        assert_eq!(f.bundled_uri("", UriStyle::Escaped), "");
        assert_eq!(f.bundled_probe_path(""), "");
        assert_eq!(f.app_private_path(""), PathBuf::new());
        assert_eq!(f.format(StorageTier::Web, ""), "");
    }

    #[test]
    fn test_format_per_tier() {
        let f = desktop();
        assert_eq!(
            f.format(StorageTier::AppPrivate, "notes/intro.txt"),
            "/data/persistent/notes/intro.txt"
        );
        assert_eq!(f.format(StorageTier::EmbeddedResources, "notes/intro.txt"), "notes/intro");
        assert_eq!(f.format(StorageTier::Web, "  https://x.io/a.txt "), "https://x.io/a.txt");
        assert_eq!(f.format(StorageTier::TryAll, "a.txt"), f.format(StorageTier::Bundled, "a.txt"));
    }

    #[test]
    fn test_cache_file_name() {
        assert_eq!(
            cache_file_name("http://cdn.example.com/audio/intro.mp3"),
            "http_cdn_example_com_audio_intro.mp3"
        );
        assert_eq!(
            cache_file_name("https://x.io/img.png?size=large"),
            "https_x_io_img_png_size.png"
        );
        assert_eq!(cache_file_name("plain"), "plain");
        assert_eq!(
            cache_file_name("http://cdn.example.com/intro"),
            cache_file_name("http://cdn.example.com/intro")
        );
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("skybox/front.jpg"), "skybox/front");
        assert_eq!(strip_extension("skybox.d/front"), "skybox.d/front");
        assert_eq!(strip_extension(".hidden"), ".hidden");
        assert_eq!(strip_extension("intro"), "intro");
    }

    #[test]
    fn test_resolve_bundle_location() {
        let f = desktop();
        assert_eq!(
            f.resolve_bundle_location("Assets/StreamingAssets/bundles/env"),
            "file:///app/StreamingAssets/bundles/env"
        );
        assert_eq!(
            f.resolve_bundle_location("PersistentData/bundles/env"),
            "/data/persistent/bundles/env"
        );
        assert_eq!(
            f.resolve_bundle_location("https://cdn.example.com/env"),
            "https://cdn.example.com/env"
        );
    }
}

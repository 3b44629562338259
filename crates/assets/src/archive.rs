//! # Bundle Archive - Grouped Assets in One File
//!
//! A bundle packs many assets into a single download:
//! - one request per bundle instead of one per asset
//! - one compression format for the whole archive
//! - one version identifier for the whole set
//!
//! ## File layout
//! ```text
//! "BXRB" | u32 format version | u32 manifest length | RON manifest | archive bytes
//! ```
//! Integers are little-endian. Entry offsets are relative to the start of
//! the archive bytes.

use crate::error::BundleError;
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"BXRB";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 12;

/// Compression format for bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BundleCompression {
    None,
    Gzip,
    /// Better ratio, still fast
    #[default]
    Zstd,
    /// Fastest
    Lz4,
}

impl std::str::FromStr for BundleCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            "zstd" => Ok(Self::Zstd),
            "lz4" => Ok(Self::Lz4),
            other => Err(format!("unknown compression: {}", other)),
        }
    }
}

/// Entry in a bundle manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Asset name within the bundle, `/`-separated
    pub name: String,
    /// Hash of the uncompressed asset
    pub id: ContentHash,
    /// Offset in archive (bytes)
    pub offset: u64,
    /// Size in archive (bytes, compressed)
    pub size: u64,
    /// Uncompressed size
    pub original_size: u64,
    pub mime_type: String,
}

/// Describes the contents of a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub name: String,
    pub compression: BundleCompression,
    /// Total compressed size
    pub total_size: u64,
    /// Total uncompressed size
    pub total_original_size: u64,
    pub entries: Vec<BundleEntry>,
    /// Unix seconds
    pub created_at: u64,
    #[serde(default)]
    pub description: Option<String>,
}

impl BundleManifest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            compression: BundleCompression::default(),
            total_size: 0,
            total_original_size: 0,
            entries: Vec::new(),
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            description: None,
        }
    }

    pub fn add_entry(&mut self, entry: BundleEntry) {
        self.total_size += entry.size;
        self.total_original_size += entry.original_size;
        self.entries.push(entry);
    }

    pub fn get_entry(&self, name: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn compression_ratio(&self) -> f64 {
        if self.total_original_size == 0 {
            1.0
        } else {
            self.total_size as f64 / self.total_original_size as f64
        }
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }
}

/// A decoded bundle file: manifest plus archive bytes
#[derive(Clone)]
pub struct LoadedBundle {
    pub manifest: BundleManifest,
    archive: Vec<u8>,
}

impl std::fmt::Debug for LoadedBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedBundle")
            .field("name", &self.manifest.name)
            .field("entries", &self.manifest.entries.len())
            .field("archive_len", &self.archive.len())
            .finish()
    }
}

impl LoadedBundle {
    /// Parse a bundle file
    pub fn decode(bytes: &[u8]) -> Result<Self, BundleError> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
            return Err(BundleError::Decode("not a bundle file".into()));
        }

        let version = read_u32(&bytes[4..8]);
        if version != FORMAT_VERSION {
            return Err(BundleError::Decode(format!(
                "unsupported bundle format version {}",
                version
            )));
        }

        let manifest_len = read_u32(&bytes[8..12]) as usize;
        let manifest_end = HEADER_LEN
            .checked_add(manifest_len)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| BundleError::Decode("manifest runs past end of file".into()))?;

        let manifest_text = std::str::from_utf8(&bytes[HEADER_LEN..manifest_end])
            .map_err(|e| BundleError::Decode(format!("manifest is not UTF-8: {}", e)))?;
        let manifest = BundleManifest::from_ron(manifest_text)
            .map_err(|e| BundleError::Decode(format!("invalid manifest: {}", e)))?;

        let archive = bytes[manifest_end..].to_vec();
        Ok(Self { manifest, archive })
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.manifest.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.manifest.get_entry(name).is_some()
    }

    /// Extract and decompress one asset, verifying its content hash
    pub fn extract(&self, name: &str) -> Result<Vec<u8>, BundleError> {
        let entry = self
            .manifest
            .get_entry(name)
            .ok_or_else(|| BundleError::Decode(format!("no entry named {}", name)))?;

        let start = entry.offset as usize;
        let end = start
            .checked_add(entry.size as usize)
            .filter(|end| *end <= self.archive.len())
            .ok_or_else(|| {
                BundleError::Decode(format!("entry {} runs past end of archive", name))
            })?;

        let data = decompress(self.manifest.compression, &self.archive[start..end])
            .map_err(|e| BundleError::Decode(format!("failed to decompress {}: {}", name, e)))?;

        if !entry.id.verify(&data) {
            return Err(BundleError::Decode(format!("content hash mismatch for {}", name)));
        }
        Ok(data)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn compress(compression: BundleCompression, data: &[u8]) -> std::io::Result<Vec<u8>> {
    match compression {
        BundleCompression::None => Ok(data.to_vec()),
        BundleCompression::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        BundleCompression::Zstd => zstd::encode_all(data, 3),
        BundleCompression::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
    }
}

fn decompress(compression: BundleCompression, data: &[u8]) -> std::io::Result<Vec<u8>> {
    match compression {
        BundleCompression::None => Ok(data.to_vec()),
        BundleCompression::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            Ok(out)
        }
        BundleCompression::Zstd => zstd::decode_all(data),
        BundleCompression::Lz4 => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
    }
}

/// Builder for bundle files
#[derive(Debug)]
pub struct BundleBuilder {
    manifest: BundleManifest,
    data: Vec<u8>,
}

impl BundleBuilder {
    pub fn new(name: &str) -> Self {
        Self { manifest: BundleManifest::new(name), data: Vec::new() }
    }

    /// Set compression format. Must be called before adding assets.
    pub fn compression(mut self, compression: BundleCompression) -> Self {
        self.manifest.compression = compression;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.manifest.description = Some(description.into());
        self
    }

    pub fn add_asset(
        mut self,
        name: &str,
        data: &[u8],
        mime_type: &str,
    ) -> Result<Self, BundleError> {
        let compressed = compress(self.manifest.compression, data)?;

        self.manifest.add_entry(BundleEntry {
            name: name.to_string(),
            id: ContentHash::from_content(data),
            offset: self.data.len() as u64,
            size: compressed.len() as u64,
            original_size: data.len() as u64,
            mime_type: mime_type.to_string(),
        });
        self.data.extend(compressed);

        Ok(self)
    }

    /// Add a file, guessing its MIME type from the extension
    pub fn add_file(self, name: &str, path: &Path) -> Result<Self, BundleError> {
        let data = std::fs::read(path)?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        self.add_asset(name, &data, mime.essence_str())
    }

    /// Add every file under `dir`, named by their `/`-separated relative path
    pub fn add_dir(mut self, dir: &Path) -> Result<Self, BundleError> {
        let mut files = Vec::new();
        collect_files(dir, &mut files)?;
        files.sort();

        for file in files {
            let relative = file.strip_prefix(dir).unwrap_or(&file);
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            self = self.add_file(&name, &file)?;
        }
        Ok(self)
    }

    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    /// Encode the bundle file
    pub fn build(self) -> Result<Vec<u8>, BundleError> {
        let manifest = self
            .manifest
            .to_ron()
            .map_err(|e| BundleError::Decode(format!("failed to serialize manifest: {}", e)))?;

        let mut out = Vec::with_capacity(HEADER_LEN + manifest.len() + self.data.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(manifest.len() as u32).to_le_bytes());
        out.extend_from_slice(manifest.as_bytes());
        out.extend_from_slice(&self.data);
        Ok(out)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(compression: BundleCompression) -> Vec<u8> {
        BundleBuilder::new("environment")
            .compression(compression)
            .add_asset("intro.txt", b"welcome to the showroom", "text/plain")
            .unwrap()
            .add_asset("logo.png", b"png data here", "image/png")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_bundle_extract_every_compression() {
        for compression in [
            BundleCompression::None,
            BundleCompression::Gzip,
            BundleCompression::Zstd,
            BundleCompression::Lz4,
        ] {
            let bundle = LoadedBundle::decode(&build(compression)).unwrap();
            assert_eq!(bundle.name(), "environment");
            assert_eq!(bundle.manifest.list_names(), vec!["intro.txt", "logo.png"]);
            assert_eq!(bundle.extract("intro.txt").unwrap(), b"welcome to the showroom");
            assert_eq!(bundle.extract("logo.png").unwrap(), b"png data here");
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(LoadedBundle::decode(b""), Err(BundleError::Decode(_))));
        assert!(matches!(
            LoadedBundle::decode(b"PK\x03\x04 zip file"),
            Err(BundleError::Decode(_))
        ));

        let mut truncated = build(BundleCompression::None);
        truncated.truncate(20);
        assert!(LoadedBundle::decode(&truncated).is_err());
    }

    #[test]
    fn test_missing_entry() {
        let bundle = LoadedBundle::decode(&build(BundleCompression::Zstd)).unwrap();
        assert!(!bundle.contains("nope"));
        assert!(bundle.extract("nope").is_err());
    }

    #[test]
    fn test_add_dir_names_and_mime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("audio")).unwrap();
        std::fs::write(dir.path().join("audio/intro.wav"), b"RIFF").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();

        let bytes = BundleBuilder::new("dir").add_dir(dir.path()).unwrap().build().unwrap();
        let bundle = LoadedBundle::decode(&bytes).unwrap();

        let wav = bundle.manifest.get_entry("audio/intro.wav").unwrap();
        assert!(wav.mime_type.starts_with("audio/"));
        assert_eq!(bundle.manifest.get_entry("notes.txt").unwrap().mime_type, "text/plain");
    }
}

//! Requested asset kinds and the filename variants probed for each.

use serde::{Deserialize, Serialize};

/// The kind of asset a request wants decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    Text,
    Csv,
    Texture,
    AudioClip,
    Bundle,
}

impl AssetKind {
    /// Extensions appended to a logical path while probing, bare name first
    pub fn extension_variants(&self) -> &'static [&'static str] {
        match self {
            Self::Texture => &["", ".png", ".jpg", ".gif"],
            Self::AudioClip => &["", ".wav", ".mp3", ".ogg"],
            Self::Text => &["", ".txt"],
            Self::Csv => &["", ".csv"],
            Self::Bundle => &[""],
        }
    }

    /// Classify a MIME type, used when loading typed assets out of a bundle
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime == "text/csv" {
            Some(Self::Csv)
        } else if mime.starts_with("text/") {
            Some(Self::Text)
        } else if mime.starts_with("image/") {
            Some(Self::Texture)
        } else if mime.starts_with("audio/") {
            Some(Self::AudioClip)
        } else {
            None
        }
    }
}

impl std::str::FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "texture" | "image" => Ok(Self::Texture),
            "audio" | "audioclip" | "audio-clip" => Ok(Self::AudioClip),
            "bundle" => Ok(Self::Bundle),
            other => Err(format!("unknown asset kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variants_start_with_bare_name() {
        for kind in [AssetKind::Text, AssetKind::Csv, AssetKind::Texture, AssetKind::AudioClip] {
            assert_eq!(kind.extension_variants()[0], "");
        }
        assert_eq!(AssetKind::Texture.extension_variants(), &["", ".png", ".jpg", ".gif"]);
        assert_eq!(AssetKind::AudioClip.extension_variants(), &["", ".wav", ".mp3", ".ogg"]);
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(AssetKind::from_mime("text/csv"), Some(AssetKind::Csv));
        assert_eq!(AssetKind::from_mime("text/plain"), Some(AssetKind::Text));
        assert_eq!(AssetKind::from_mime("image/png"), Some(AssetKind::Texture));
        assert_eq!(AssetKind::from_mime("audio/mpeg"), Some(AssetKind::AudioClip));
        assert_eq!(AssetKind::from_mime("application/octet-stream"), None);
    }
}

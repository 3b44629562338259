//! Target platform conventions that affect path formatting and probing.

use serde::{Deserialize, Serialize};

/// The runtime platform the pipeline is formatting paths for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows / macOS / Linux players and editors
    #[default]
    Desktop,
    /// Bundled assets live inside the APK archive
    Android,
    Ios,
    /// Bundled assets are served over HTTP next to the player
    #[serde(rename = "webgl")]
    WebGl,
}

/// GPU texture compression a platform prefers for uploaded textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    Etc1Rgb4,
    PvrtcRgb4,
    Dxt1,
}

impl Platform {
    /// Bundled assets can't be stat'ed on these platforms, only loaded
    pub fn requires_load_probe(&self) -> bool {
        matches!(self, Self::Android | Self::WebGl)
    }

    /// Scheme prefixed to bundled-asset URIs
    pub fn file_uri_scheme(&self) -> &'static str {
        match self {
            Self::Desktop | Self::Ios => "file://",
            Self::Android | Self::WebGl => "",
        }
    }

    pub fn preferred_texture_format(&self) -> TextureFormat {
        match self {
            Self::Android => TextureFormat::Etc1Rgb4,
            Self::Ios => TextureFormat::PvrtcRgb4,
            Self::Desktop | Self::WebGl => TextureFormat::Dxt1,
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            "webgl" => Ok(Self::WebGl),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

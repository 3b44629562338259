//! # Decoders
//!
//! Turn fetched bytes into the requested asset kind:
//! - Text: strict UTF-8
//! - CSV: header row plus records, via `csv`
//! - Texture: RGBA8 pixels, via `image`
//! - AudioClip: interleaved `f32` samples, via `symphonia`
//! - Bundle: a parsed bundle archive
//!
//! Any failure is a [`FetchError::Decode`], which the fetcher treats as a
//! miss for that tier.

use crate::archive::LoadedBundle;
use crate::error::FetchError;
use crate::kind::AssetKind;
use crate::path::{extension_of, strip_extension};
use crate::platform::TextureFormat;
use std::io::Cursor;
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

/// A decoded asset
#[derive(Debug, Clone)]
pub enum Asset {
    Text(String),
    Csv(CsvTable),
    Texture(Texture),
    AudioClip(AudioClip),
    Bundle(LoadedBundle),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Text(_) => AssetKind::Text,
            Self::Csv(_) => AssetKind::Csv,
            Self::Texture(_) => AssetKind::Texture,
            Self::AudioClip(_) => AssetKind::AudioClip,
            Self::Bundle(_) => AssetKind::Bundle,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_csv(self) -> Option<CsvTable> {
        match self {
            Self::Csv(table) => Some(table),
            _ => None,
        }
    }

    pub fn into_texture(self) -> Option<Texture> {
        match self {
            Self::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn into_audio_clip(self) -> Option<AudioClip> {
        match self {
            Self::AudioClip(clip) => Some(clip),
            _ => None,
        }
    }
}

/// Parsed CSV document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the column named `header`, empty for short rows
    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == header)?;
        Some(self.rows.iter().map(|row| row.get(index).map(String::as_str).unwrap_or("")).collect())
    }
}

/// Decoded image
#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    /// File name without extension
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixels
    pub rgba: Vec<u8>,
    /// GPU format the target platform prefers when uploading
    pub format: TextureFormat,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Decoded audio
#[derive(Clone, PartialEq)]
pub struct AudioClip {
    /// File name without extension
    pub name: String,
    /// Interleaved samples
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f32 / self.sample_rate as f32
        }
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("name", &self.name)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}

/// Decode `bytes` fetched from `resolved_path` as `kind`
pub fn decode(
    kind: AssetKind,
    resolved_path: &str,
    bytes: &[u8],
    texture_format: TextureFormat,
) -> Result<Asset, FetchError> {
    match kind {
        AssetKind::Text => decode_text(bytes).map(Asset::Text),
        AssetKind::Csv => decode_csv(bytes).map(Asset::Csv),
        AssetKind::Texture => {
            decode_texture(resolved_path, bytes, texture_format).map(Asset::Texture)
        }
        AssetKind::AudioClip => decode_audio(resolved_path, bytes).map(Asset::AudioClip),
        AssetKind::Bundle => LoadedBundle::decode(bytes)
            .map(Asset::Bundle)
            .map_err(|e| FetchError::decode(AssetKind::Bundle, e)),
    }
}

pub fn decode_text(bytes: &[u8]) -> Result<String, FetchError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| FetchError::decode(AssetKind::Text, e))
}

pub fn decode_csv(bytes: &[u8]) -> Result<CsvTable, FetchError> {
    let text = std::str::from_utf8(bytes).map_err(|e| FetchError::decode(AssetKind::Csv, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FetchError::decode(AssetKind::Csv, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FetchError::decode(AssetKind::Csv, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(CsvTable { headers, rows })
}

pub fn decode_texture(
    resolved_path: &str,
    bytes: &[u8],
    format: TextureFormat,
) -> Result<Texture, FetchError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| FetchError::decode(AssetKind::Texture, e))?;
    let rgba = image.to_rgba8();
    Ok(Texture {
        name: asset_name(resolved_path),
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
        format,
    })
}

pub fn decode_audio(resolved_path: &str, bytes: &[u8]) -> Result<AudioClip, FetchError> {
    let fail = |reason: String| FetchError::decode(AssetKind::AudioClip, reason);

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    let extension = extension_of(resolved_path).trim_start_matches('.');
    if !extension.is_empty() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| fail(e.to_string()))?;
    let mut reader = probed.format;

    let track = reader.default_track().ok_or_else(|| fail("no default audio track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| fail(e.to_string()))?;

    let mut samples = Vec::<f32>::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            // End of stream
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(fail(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // A corrupt packet is skipped
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!("skipping undecodable packet: {}", e)
            }
            Err(e) => return Err(fail(e.to_string())),
        }
    }

    if channels == 0 || sample_rate == 0 {
        return Err(fail("stream has no channel layout or sample rate".into()));
    }

    Ok(AudioClip { name: asset_name(resolved_path), samples, channels, sample_rate })
}

/// Last path segment without its extension
fn asset_name(path: &str) -> String {
    let stem = strip_extension(path);
    stem.rsplit('/').next().unwrap_or(stem).to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16-bit PCM WAV file
    pub(crate) fn wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        out.extend_from_slice(&(channels * 2).to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_text_rejects_invalid_utf8() {
        assert_eq!(decode_text(b"hello").unwrap(), "hello");
        assert!(matches!(decode_text(&[0xff, 0xfe, 0x00]), Err(FetchError::Decode { .. })));
    }

    #[test]
    fn test_csv_headers_and_rows() {
        let table = decode_csv(b"name,price\nlamp,40\nchair,85\n").unwrap();
        assert_eq!(table.headers, vec!["name", "price"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("price"), Some(vec!["40", "85"]));
        assert_eq!(table.column("color"), None);
    }

    #[test]
    fn test_texture_decodes_to_rgba() {
        let texture =
            decode_texture("skybox/front.png", &png_bytes(3, 2), TextureFormat::Dxt1).unwrap();
        assert_eq!(texture.name, "front");
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(texture.rgba.len(), 3 * 2 * 4);
        assert_eq!(&texture.rgba[..4], &[255, 0, 0, 255]);

        assert!(decode_texture("x.png", b"not an image", TextureFormat::Dxt1).is_err());
    }

    #[test]
    fn test_audio_decodes_wav() {
        let wav = wav_bytes(&[0, 16384, -16384, 0], 2, 22050);
        let clip = decode_audio("sfx/click.wav", &wav).unwrap();
        assert_eq!(clip.name, "click");
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.sample_rate, 22050);
        assert_eq!(clip.frames(), 2);
        assert!((clip.samples[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_audio_rejects_garbage() {
        assert!(matches!(
            decode_audio("noise.ogg", b"definitely not audio"),
            Err(FetchError::Decode { kind: AssetKind::AudioClip, .. })
        ));
    }
}

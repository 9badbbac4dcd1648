//! Asynchronous texture loading.
//!
//! Every load runs on its own worker thread and reports back exactly once
//! through a caller-supplied delivery hook. The windowed runtime forwards the
//! event through a winit `EventLoopProxy`; the headless runtime uses a
//! `crossbeam-channel`. Loads cannot be cancelled and are never retried.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use image::{ImageReader, RgbaImage};
use reqwest::blocking::Client;
use reqwest::Url;
use tracing::{debug, info};

use crate::types::TextureRole;

/// Where a texture is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    Path(PathBuf),
    Url(Url),
}

impl TextureSource {
    /// Classifies user input: `http(s)://` is fetched, `file://` and anything
    /// without a scheme is read from disk.
    pub fn parse(input: &str) -> Result<Self, LoadError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LoadError::EmptySource);
        }

        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|err| LoadError::InvalidUrl {
                input: trimmed.to_string(),
                reason: err.to_string(),
            })?;
            return Ok(TextureSource::Url(url));
        }

        if lowered.starts_with("file://") {
            let url = Url::parse(trimmed).map_err(|err| LoadError::InvalidUrl {
                input: trimmed.to_string(),
                reason: err.to_string(),
            })?;
            let path = url.to_file_path().map_err(|_| LoadError::InvalidUrl {
                input: trimmed.to_string(),
                reason: "file URL does not name a local path".to_string(),
            })?;
            return Ok(TextureSource::Path(path));
        }

        Ok(TextureSource::Path(PathBuf::from(trimmed)))
    }
}

impl fmt::Display for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureSource::Path(path) => write!(f, "{}", path.display()),
            TextureSource::Url(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("texture source must not be empty")]
    EmptySource,
    #[error("invalid texture URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {source}")]
    Http {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{origin} decoded to an empty image")]
    EmptyImage { origin: String },
}

/// Decoded pixels ready for upload, always RGBA8 with the source alpha kept.
pub struct LoadedTexture {
    pub role: TextureRole,
    pub origin: String,
    pub pixels: RgbaImage,
}

impl LoadedTexture {
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

impl fmt::Debug for LoadedTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("LoadedTexture")
            .field("role", &self.role)
            .field("origin", &self.origin)
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}

/// The single outcome of one texture load.
#[derive(Debug)]
pub struct LoadEvent {
    pub role: TextureRole,
    pub outcome: Result<LoadedTexture, LoadError>,
}

/// Starts loading `source` on a worker thread and hands the outcome to
/// `deliver` exactly once.
pub fn spawn_load<F>(
    role: TextureRole,
    source: TextureSource,
    deliver: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce(LoadEvent) + Send + 'static,
{
    thread::Builder::new()
        .name(format!("wallhue-load-{role}"))
        .spawn(move || {
            debug!(%role, %source, "texture load started");
            let outcome = load(role, &source);
            if let Ok(texture) = &outcome {
                let (width, height) = texture.dimensions();
                info!(%role, %source, width, height, "texture loaded");
            }
            deliver(LoadEvent { role, outcome });
        })
}

/// Synchronously fetches and decodes one texture.
pub fn load(role: TextureRole, source: &TextureSource) -> Result<LoadedTexture, LoadError> {
    let origin = source.to_string();
    let pixels = match source {
        TextureSource::Path(path) => decode_bytes(&read_file(path)?, &origin)?,
        TextureSource::Url(url) => decode_bytes(&fetch_url(url)?, &origin)?,
    };

    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(LoadError::EmptyImage { origin });
    }

    Ok(LoadedTexture {
        role,
        origin,
        pixels,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn fetch_url(url: &Url) -> Result<Vec<u8>, LoadError> {
    let http_error = |source| LoadError::Http {
        url: url.clone(),
        source,
    };
    let client = Client::builder().build().map_err(http_error)?;
    let response = client
        .get(url.clone())
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(http_error)?;
    let bytes = response.bytes().map_err(http_error)?;
    Ok(bytes.to_vec())
}

fn decode_bytes(bytes: &[u8], origin: &str) -> Result<RgbaImage, LoadError> {
    let decode_error = |source| LoadError::Decode {
        origin: origin.to_string(),
        source,
    };
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| decode_error(image::ImageError::IoError(err)))?;
    let image = reader.decode().map_err(decode_error)?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn classifies_sources() {
        assert_eq!(
            TextureSource::parse("data/image.jpg").unwrap(),
            TextureSource::Path(PathBuf::from("data/image.jpg"))
        );
        assert!(matches!(
            TextureSource::parse("https://example.com/m.jpg").unwrap(),
            TextureSource::Url(_)
        ));
        assert!(matches!(
            TextureSource::parse("HTTP://example.com/a.png").unwrap(),
            TextureSource::Url(_)
        ));
        assert!(matches!(
            TextureSource::parse("   "),
            Err(LoadError::EmptySource)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn file_urls_become_paths() {
        let source = TextureSource::parse("file:///tmp/mask.png").unwrap();
        assert_eq!(source, TextureSource::Path(PathBuf::from("/tmp/mask.png")));
    }

    #[test]
    fn loads_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let texture = load(TextureRole::Image, &TextureSource::Path(path)).unwrap();
        assert_eq!(texture.role, TextureRole::Image);
        assert_eq!(texture.dimensions(), (3, 2));
        assert_eq!(texture.pixels.get_pixel(2, 1).0, [1, 2, 3, 255]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(
            TextureRole::Mask,
            &TextureSource::Path(dir.path().join("absent.jpg")),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let err = load(TextureRole::Mask, &TextureSource::Path(path)).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn spawned_load_delivers_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn_load(TextureRole::Mask, TextureSource::Path(path), move |event| {
            let _ = tx.send(event);
        })
        .unwrap();
        handle.join().unwrap();

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].role, TextureRole::Mask);
        assert!(events[0].outcome.is_ok());
    }
}

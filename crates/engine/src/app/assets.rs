use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{info, warn};

use crate::asset_keys::{resolve_image_path, AssetKeyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(usize);

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: AssetKeyError,
    },
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image '{key}' has {actual} rgba bytes, expected {expected}")]
    PixelCount {
        key: String,
        expected: usize,
        actual: usize,
    },
}

pub(crate) struct LoadedImage {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba: Vec<u8>,
}

/// Decoded RGBA images keyed by asset key. Images are decoded once at scene
/// load; the renderer only reads from the store.
pub struct AssetStore {
    assets_dir: PathBuf,
    images: Vec<LoadedImage>,
    handles_by_key: HashMap<String, ImageHandle>,
    warned_optional_keys: HashSet<String>,
}

impl AssetStore {
    pub fn new(assets_dir: PathBuf) -> Self {
        Self {
            assets_dir,
            images: Vec::new(),
            handles_by_key: HashMap::new(),
            warned_optional_keys: HashSet::new(),
        }
    }

    pub fn load_required(&mut self, key: &str) -> Result<ImageHandle, AssetError> {
        if let Some(handle) = self.handles_by_key.get(key) {
            return Ok(*handle);
        }
        let path = resolve_image_path(&self.assets_dir, key).map_err(|source| {
            AssetError::InvalidKey {
                key: key.to_string(),
                source,
            }
        })?;
        let image = load_image_rgba(&path)?;
        info!(
            asset = key,
            path = %path.display(),
            width = image.width,
            height = image.height,
            "asset_loaded"
        );
        Ok(self.push(key, image))
    }

    /// Returns `None` when the image is missing or undecodable; the caller
    /// substitutes its own fallback.
    pub fn load_optional(&mut self, key: &str) -> Option<ImageHandle> {
        match self.load_required(key) {
            Ok(handle) => Some(handle),
            Err(error) => {
                if self.warned_optional_keys.insert(key.to_string()) {
                    warn!(asset = key, error = %error, "optional_asset_missing_using_fallback");
                }
                None
            }
        }
    }

    /// Registers an already decoded image under `key`, replacing nothing that
    /// is already registered.
    pub fn insert_rgba(
        &mut self,
        key: &str,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> Result<ImageHandle, AssetError> {
        if let Some(handle) = self.handles_by_key.get(key) {
            return Ok(*handle);
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(AssetError::PixelCount {
                key: key.to_string(),
                expected,
                actual: rgba.len(),
            });
        }
        Ok(self.push(
            key,
            LoadedImage {
                width,
                height,
                rgba,
            },
        ))
    }

    pub fn image_size(&self, handle: ImageHandle) -> Option<(u32, u32)> {
        self.image(handle).map(|image| (image.width, image.height))
    }

    pub(crate) fn image(&self, handle: ImageHandle) -> Option<&LoadedImage> {
        self.images.get(handle.0)
    }

    fn push(&mut self, key: &str, image: LoadedImage) -> ImageHandle {
        let handle = ImageHandle(self.images.len());
        self.images.push(image);
        self.handles_by_key.insert(key.to_string(), handle);
        handle
    }
}

fn load_image_rgba(path: &Path) -> Result<LoadedImage, AssetError> {
    let reader = ImageReader::open(path).map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

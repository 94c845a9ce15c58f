//! Pluggable asset loaders, one per asset kind
//!
//! A loader turns fetched bytes into a usable asset value. Loaders never
//! decide what a failure means for the load as a whole - they report
//! errors to the dispatcher, which substitutes a placeholder and counts
//! the fetch as settled.

use crate::manifest::{AssetDescriptor, AssetKind, AssetKindTag};
use crate::store::AssetValue;
use crate::texture::{TextureAsset, TextureMapping};
use crate::model::ModelAsset;
use std::collections::HashMap;
use thiserror::Error;

/// Error while decoding fetched bytes
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to parse model {path}: {source}")]
    ModelParse {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("invalid model data: {message}")]
    ModelData { message: String },
    #[error("no loader registered for kind {0:?}")]
    NoLoader(AssetKindTag),
}

/// Capability to decode one asset kind
pub trait AssetLoader {
    /// Kind tag this loader handles
    fn kind(&self) -> AssetKindTag;

    /// Decode fetched bytes into an asset value
    fn decode(&self, bytes: &[u8], descriptor: &AssetDescriptor) -> Result<AssetValue, LoadError>;
}

/// One loader per kind tag
pub struct LoaderRegistry {
    loaders: HashMap<AssetKindTag, Box<dyn AssetLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Registry with the built-in texture, environment and model loaders
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TextureLoader);
        registry.register(EnvironmentLoader);
        registry.register(ModelLoader);
        registry
    }

    /// Register a loader, replacing any existing loader for the same kind
    pub fn register<L: AssetLoader + 'static>(&mut self, loader: L) {
        let kind = loader.kind();
        if self.loaders.insert(kind, Box::new(loader)).is_some() {
            log::debug!("replaced loader for kind {:?}", kind);
        }
    }

    pub fn get(&self, kind: AssetKindTag) -> Option<&dyn AssetLoader> {
        self.loaders.get(&kind).map(|l| l.as_ref())
    }

    pub fn clear(&mut self) {
        self.loaders.clear();
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Loader for plain image textures
pub struct TextureLoader;

impl AssetLoader for TextureLoader {
    fn kind(&self) -> AssetKindTag {
        AssetKindTag::Texture
    }

    fn decode(&self, bytes: &[u8], descriptor: &AssetDescriptor) -> Result<AssetValue, LoadError> {
        let path = descriptor.kind.source_path().unwrap_or(&descriptor.name);
        let mut texture = TextureAsset::decode_rgba8(bytes, path)?;

        if let AssetKind::Texture {
            equirectangular: true,
            ..
        } = descriptor.kind
        {
            texture = texture.with_mapping(TextureMapping::Equirectangular);
        }

        Ok(AssetValue::Texture(texture))
    }
}

/// Loader for HDR environment maps (EXR, Radiance HDR)
pub struct EnvironmentLoader;

impl AssetLoader for EnvironmentLoader {
    fn kind(&self) -> AssetKindTag {
        AssetKindTag::Environment
    }

    fn decode(&self, bytes: &[u8], descriptor: &AssetDescriptor) -> Result<AssetValue, LoadError> {
        let path = descriptor.kind.source_path().unwrap_or(&descriptor.name);
        let texture = TextureAsset::decode_rgba32f(bytes, path)?;
        Ok(AssetValue::Environment(texture))
    }
}

/// Loader for glTF/GLB model bundles
pub struct ModelLoader;

impl AssetLoader for ModelLoader {
    fn kind(&self) -> AssetKindTag {
        AssetKindTag::Model
    }

    fn decode(&self, bytes: &[u8], descriptor: &AssetDescriptor) -> Result<AssetValue, LoadError> {
        let path = descriptor.kind.source_path().unwrap_or(&descriptor.name);
        let model = ModelAsset::from_slice(bytes, path)?;
        Ok(AssetValue::Model(model))
    }
}

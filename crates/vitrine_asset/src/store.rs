//! Loaded asset store - name-keyed results behind the query surface
//!
//! Stores whatever each asset's last settlement produced, with an empty
//! slot standing in for failures. Queries resolve through the extraction
//! policy: callers get "the usable thing", not the loader's internal
//! object shape.

use crate::material::MaterialAsset;
use crate::model::{ModelAsset, PbrMaterial, MATERIAL_NODE};
use crate::texture::TextureAsset;
use std::collections::HashMap;

/// A fully decoded asset value
#[derive(Debug, Clone)]
pub enum AssetValue {
    Texture(TextureAsset),
    Environment(TextureAsset),
    Model(ModelAsset),
    Material(MaterialAsset),
}

/// Borrowed view resolved by [`AssetStore::get`]
#[derive(Debug)]
pub enum AssetView<'a> {
    Texture(&'a TextureAsset),
    Environment(&'a TextureAsset),
    Model(&'a ModelAsset),
    Material(&'a MaterialAsset),
    /// Material extracted from a model bundle's well-known node
    ModelMaterial(&'a PbrMaterial),
}

/// Name-keyed storage for loaded results
#[derive(Debug, Default)]
pub struct AssetStore {
    items: HashMap<String, Option<AssetValue>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an asset's result; None is the failure placeholder. A name
    /// is written at most once - the settlement completing its last fetch
    /// performs the write, and anything after that is a dispatch bug.
    pub fn insert(&mut self, name: &str, value: Option<AssetValue>) {
        if self.items.contains_key(name) {
            log::warn!("asset {} already stored, ignoring duplicate write", name);
            return;
        }
        log::debug!("stored asset: {}", name);
        self.items.insert(name.to_string(), value);
    }

    /// Resolve a stored asset. A model whose scene carries the well-known
    /// material node resolves to that extracted material; everything else
    /// resolves verbatim. Unknown and failed names warn and return None.
    pub fn get(&self, name: &str) -> Option<AssetView<'_>> {
        let slot = match self.items.get(name) {
            Some(slot) => slot,
            None => {
                log::warn!("asset not found: {}", name);
                return None;
            }
        };

        let value = match slot {
            Some(value) => value,
            None => {
                log::warn!("asset {} failed to load", name);
                return None;
            }
        };

        Some(match value {
            AssetValue::Texture(texture) => AssetView::Texture(texture),
            AssetValue::Environment(texture) => AssetView::Environment(texture),
            AssetValue::Material(material) => AssetView::Material(material),
            AssetValue::Model(model) => match model.material_at_node(MATERIAL_NODE) {
                Some(material) => AssetView::ModelMaterial(material),
                None => AssetView::Model(model),
            },
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

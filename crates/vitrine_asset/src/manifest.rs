//! Asset manifest - the fixed table of descriptors to load
//!
//! The manifest is pure data: an ordered list of named, typed asset
//! descriptors. It is constructed once (in code or from JSON) and never
//! changes while a load is in flight, which is what makes the total
//! fetch count - and therefore the progress ratio - well-defined.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind tag used for loader dispatch and queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKindTag {
    Texture,
    Environment,
    Model,
    Material,
}

/// Environment map source format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvFormat {
    Exr,
    Hdr,
}

/// Model bundle format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    Gltf,
    Glb,
}

/// Source of a single material channel: one file, or a one-level group
/// of sub-keyed files (e.g. `{"map": "wood_bc.png"}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelSource {
    File(String),
    Group(BTreeMap<String, String>),
}

impl ChannelSource {
    /// Number of fetches this channel expands into
    pub fn fetch_unit_count(&self) -> usize {
        match self {
            ChannelSource::File(_) => 1,
            ChannelSource::Group(entries) => entries.len(),
        }
    }
}

/// Per-kind descriptor payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetKind {
    /// Plain image texture
    Texture {
        path: String,
        /// Sample as an equirectangular reflection map
        #[serde(default)]
        equirectangular: bool,
    },
    /// High dynamic range environment map
    Environment { path: String, format: EnvFormat },
    /// 3D model bundle
    Model { path: String, format: ModelFormat },
    /// Composite material assembled from per-channel texture fetches
    Material {
        /// Base directory the channel files resolve against
        path: String,
        channels: BTreeMap<String, ChannelSource>,
    },
}

impl AssetKind {
    pub fn tag(&self) -> AssetKindTag {
        match self {
            AssetKind::Texture { .. } => AssetKindTag::Texture,
            AssetKind::Environment { .. } => AssetKindTag::Environment,
            AssetKind::Model { .. } => AssetKindTag::Model,
            AssetKind::Material { .. } => AssetKindTag::Material,
        }
    }

    /// Source path for single-fetch kinds; materials resolve per channel
    pub fn source_path(&self) -> Option<&str> {
        match self {
            AssetKind::Texture { path, .. }
            | AssetKind::Environment { path, .. }
            | AssetKind::Model { path, .. } => Some(path),
            AssetKind::Material { .. } => None,
        }
    }

    /// Number of underlying fetches this descriptor expands into
    pub fn fetch_unit_count(&self) -> usize {
        match self {
            AssetKind::Material { channels, .. } => {
                channels.values().map(ChannelSource::fetch_unit_count).sum()
            }
            _ => 1,
        }
    }
}

/// One named asset to load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: AssetKind,
}

/// Ordered, immutable table of asset descriptors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    descriptors: Vec<AssetDescriptor>,
}

impl AssetManifest {
    /// Build a manifest from descriptors. Names must be unique; duplicates
    /// are kept (first occurrence wins at store time) but flagged.
    pub fn new(descriptors: Vec<AssetDescriptor>) -> Self {
        let mut seen = std::collections::HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.name.as_str()) {
                log::warn!("duplicate asset name in manifest: {}", descriptor.name);
            }
        }
        Self { descriptors }
    }

    /// Parse a manifest from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let descriptors: Vec<AssetDescriptor> = serde_json::from_str(json)?;
        Ok(Self::new(descriptors))
    }

    pub fn descriptors(&self) -> &[AssetDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&AssetDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Names of all descriptors with the given kind tag, in manifest order
    pub fn names_of_kind(&self, tag: AssetKindTag) -> Vec<&str> {
        self.descriptors
            .iter()
            .filter(|d| d.kind.tag() == tag)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Total number of underlying fetches across the whole manifest.
    /// Computed before any fetch begins and never changes afterward.
    pub fn fetch_unit_count(&self) -> usize {
        self.descriptors
            .iter()
            .map(|d| d.kind.fetch_unit_count())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

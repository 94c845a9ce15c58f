//! Composite material assembly
//!
//! A material descriptor expands into one texture fetch per channel file.
//! The assembler keeps one pending join per material and counts channels
//! down as they settle, in any order; the settlement that empties the
//! count assembles and returns the finished material. Failed channels
//! keep their slot with an empty placeholder so one bad texture degrades
//! the material instead of aborting it.

use crate::loader::LoadError;
use crate::manifest::ChannelSource;
use crate::texture::TextureAsset;
use std::collections::{BTreeMap, HashMap};

/// Identifies one channel fetch within a material: the channel name plus
/// the sub-key for one-level channel groups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub channel: String,
    pub sub: Option<String>,
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sub {
            Some(sub) => write!(f, "{}.{}", self.channel, sub),
            None => write!(f, "{}", self.channel),
        }
    }
}

/// One assembled channel of a material
#[derive(Debug, Clone)]
pub enum MaterialChannel {
    /// Single texture; None marks a failed fetch
    Texture(Option<TextureAsset>),
    /// One-level group of sub-keyed textures
    Group(BTreeMap<String, Option<TextureAsset>>),
}

/// A material assembled from its channel textures
#[derive(Debug, Clone, Default)]
pub struct MaterialAsset {
    pub channels: BTreeMap<String, MaterialChannel>,
}

impl MaterialAsset {
    pub fn channel(&self, name: &str) -> Option<&MaterialChannel> {
        self.channels.get(name)
    }

    /// Texture for a channel, reaching into groups by sub-key.
    /// Returns None for unknown channels and failed fetches alike.
    pub fn texture(&self, channel: &str, sub: Option<&str>) -> Option<&TextureAsset> {
        match (self.channels.get(channel)?, sub) {
            (MaterialChannel::Texture(texture), None) => texture.as_ref(),
            (MaterialChannel::Group(group), Some(sub)) => group.get(sub)?.as_ref(),
            _ => None,
        }
    }
}

/// Decode one channel texture. Channel textures never flip vertically.
pub fn decode_channel(bytes: &[u8], path: &str) -> Result<TextureAsset, LoadError> {
    Ok(TextureAsset::decode_rgba8(bytes, path)?.with_flip_y(false))
}

#[derive(Debug)]
enum ChannelSlot {
    Pending,
    Settled(Option<TextureAsset>),
}

/// Pending join for one material descriptor. `remaining` is the sole
/// authority on completion.
#[derive(Debug)]
struct MaterialJoin {
    remaining: usize,
    slots: HashMap<ChannelKey, ChannelSlot>,
}

/// Tracks every in-flight material join, keyed by descriptor name
#[derive(Debug, Default)]
pub struct MaterialAssembler {
    joins: HashMap<String, MaterialJoin>,
}

impl MaterialAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand a material descriptor into its channel fetches and register
    /// the join. Returns `(key, resolved path)` for each fetch to begin.
    pub fn expand(
        &mut self,
        name: &str,
        base_path: &str,
        channels: &BTreeMap<String, ChannelSource>,
    ) -> Vec<(ChannelKey, String)> {
        let mut base = base_path.to_string();
        if !base.is_empty() && !base.ends_with('/') {
            base.push('/');
        }

        let mut units = Vec::new();
        for (channel, source) in channels {
            match source {
                ChannelSource::File(file) => {
                    let key = ChannelKey {
                        channel: channel.clone(),
                        sub: None,
                    };
                    units.push((key, format!("{}{}", base, file)));
                }
                ChannelSource::Group(entries) => {
                    for (sub, file) in entries {
                        let key = ChannelKey {
                            channel: channel.clone(),
                            sub: Some(sub.clone()),
                        };
                        units.push((key, format!("{}{}", base, file)));
                    }
                }
            }
        }

        if units.is_empty() {
            log::warn!("material {} references no channel textures", name);
            return units;
        }

        let slots = units
            .iter()
            .map(|(key, _)| (key.clone(), ChannelSlot::Pending))
            .collect::<HashMap<_, _>>();

        self.joins.insert(
            name.to_string(),
            MaterialJoin {
                remaining: units.len(),
                slots,
            },
        );

        units
    }

    /// Record one channel settlement. Returns the assembled material when
    /// - and only when - the last outstanding channel settles. Duplicate
    /// or unknown settlements leave the count untouched.
    pub fn apply(
        &mut self,
        name: &str,
        key: ChannelKey,
        texture: Option<TextureAsset>,
    ) -> Option<MaterialAsset> {
        let join = match self.joins.get_mut(name) {
            Some(join) => join,
            None => {
                log::warn!("channel settlement for unknown material {}", name);
                return None;
            }
        };

        match join.slots.get_mut(&key) {
            Some(slot @ ChannelSlot::Pending) => {
                *slot = ChannelSlot::Settled(texture);
                join.remaining -= 1;
            }
            Some(ChannelSlot::Settled(_)) => {
                log::warn!("duplicate settlement for material {} channel {}", name, key);
                return None;
            }
            None => {
                log::warn!("settlement for unknown channel {} of material {}", key, name);
                return None;
            }
        }

        if join.remaining > 0 {
            return None;
        }

        let join = self.joins.remove(name)?;
        let mut material = MaterialAsset::default();
        for (key, slot) in join.slots {
            let texture = match slot {
                ChannelSlot::Settled(texture) => texture,
                // remaining == 0 means every slot has settled
                ChannelSlot::Pending => None,
            };
            match key.sub {
                None => {
                    material
                        .channels
                        .insert(key.channel, MaterialChannel::Texture(texture));
                }
                Some(sub) => {
                    let entry = material
                        .channels
                        .entry(key.channel)
                        .or_insert_with(|| MaterialChannel::Group(BTreeMap::new()));
                    if let MaterialChannel::Group(group) = entry {
                        group.insert(sub, texture);
                    }
                }
            }
        }

        Some(material)
    }

    /// Number of materials still joining
    pub fn pending_count(&self) -> usize {
        self.joins.len()
    }

    pub fn clear(&mut self) {
        self.joins.clear();
    }
}

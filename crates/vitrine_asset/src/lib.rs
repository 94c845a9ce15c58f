//! # vitrine_asset - Manifest-Driven Asset Loading
//!
//! Loads a fixed manifest of typed assets through per-kind loaders:
//! - Plain textures and equirectangular environment maps (EXR/HDR)
//! - glTF/GLB model bundles
//! - Composite materials joined from per-channel texture fetches
//!
//! Individual fetch settlements - successes and failures alike - feed one
//! progress metric, and a completion gate guarantees a single "ready"
//! notification no matter which of its triggers lands first. A failed
//! fetch degrades its asset to a placeholder; the load itself always
//! completes.
//!
//! ## Example
//!
//! ```ignore
//! use vitrine_asset::prelude::*;
//! use std::time::Instant;
//!
//! let manifest = AssetManifest::from_json(manifest_json)?;
//! let (source, settlements) = DiskSource::spawn("assets");
//! let mut server = AssetServer::new(
//!     manifest,
//!     source,
//!     settlements,
//!     AssetServerConfig::default(),
//! );
//!
//! server.on_progress(|settled, total| println!("{}/{}", settled, total));
//! server.on_ready(|| println!("ready"));
//!
//! server.load(Instant::now());
//! loop {
//!     server.update(Instant::now());
//!     if server.is_ready() {
//!         break;
//!     }
//!     // drive the rest of the frame
//! }
//!
//! let logo = server.get_item("logo");
//! ```

pub mod events;
pub mod gate;
pub mod loader;
pub mod manifest;
pub mod material;
pub mod model;
pub mod progress;
pub mod server;
pub mod source;
pub mod store;
pub mod texture;

pub use events::AssetEvents;
pub use gate::CompletionGate;
pub use loader::{AssetLoader, LoadError, LoaderRegistry};
pub use manifest::{
    AssetDescriptor, AssetKind, AssetKindTag, AssetManifest, ChannelSource, EnvFormat, ModelFormat,
};
pub use material::{ChannelKey, MaterialAsset, MaterialChannel};
pub use model::{ModelAsset, PbrMaterial, MATERIAL_NODE};
pub use progress::ProgressAggregator;
pub use server::{AssetServer, AssetServerConfig};
pub use source::{DiskSource, FetchError, FetchSource, MemorySource, Settlement, UnitId};
pub use store::{AssetStore, AssetValue, AssetView};
pub use texture::{TexelFormat, TextureAsset, TextureMapping};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::loader::{AssetLoader, LoadError};
    pub use crate::manifest::{AssetDescriptor, AssetKind, AssetKindTag, AssetManifest};
    pub use crate::server::{AssetServer, AssetServerConfig};
    pub use crate::source::{DiskSource, FetchSource, MemorySource};
    pub use crate::store::{AssetValue, AssetView};
}

//! Asset server - the loading orchestrator
//!
//! Owns the manifest, the loader registry, the fetch source and the
//! completion state. `load()` begins every fetch and returns immediately;
//! `update()` drains settlements on the caller's thread, feeds the
//! progress counter, and evaluates the completion gate. All coordination
//! state is mutated from this single control flow - no locks, just the
//! monotonic settled counter and the one-shot gate.

use crate::events::AssetEvents;
use crate::gate::CompletionGate;
use crate::loader::{AssetLoader, LoaderRegistry};
use crate::manifest::{AssetDescriptor, AssetKind, AssetKindTag, AssetManifest};
use crate::material::{self, ChannelKey, MaterialAssembler};
use crate::progress::ProgressAggregator;
use crate::source::{FetchError, FetchSource, Settlement, UnitId};
use crate::store::{AssetStore, AssetValue, AssetView};
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tunable completion behavior
#[derive(Clone, Debug)]
pub struct AssetServerConfig {
    /// Window after progress reaches 100% before completion is forced
    pub grace_timeout: Duration,
    /// Absolute ceiling on a load; ready fires even with fetches stuck
    pub safety_timeout: Duration,
    /// Delay before ready on an empty manifest, keeping the signal
    /// asynchronous with the load call
    pub empty_manifest_delay: Duration,
}

impl Default for AssetServerConfig {
    fn default() -> Self {
        Self {
            grace_timeout: Duration::from_secs(2),
            safety_timeout: Duration::from_secs(30),
            empty_manifest_delay: Duration::from_secs(1),
        }
    }
}

/// Where a settled fetch routes its bytes
#[derive(Debug)]
enum UnitRoute {
    /// Whole-descriptor fetch
    Asset { name: String },
    /// One channel of a composite material
    MaterialChannel { name: String, key: ChannelKey },
}

/// The main asset server
pub struct AssetServer {
    manifest: AssetManifest,
    loaders: LoaderRegistry,
    source: Option<Box<dyn FetchSource>>,
    settlements: Option<Receiver<Settlement>>,
    /// In-flight fetches; a settled unit is removed, so duplicates and
    /// late arrivals fall through harmlessly
    pending: HashMap<UnitId, UnitRoute>,
    materials: MaterialAssembler,
    progress: ProgressAggregator,
    gate: CompletionGate,
    store: AssetStore,
    events: AssetEvents,
    next_unit: UnitId,
    loading: bool,
    destroyed: bool,
}

impl AssetServer {
    /// Create a server over a fixed manifest. `settlements` must be the
    /// receiver handed out by the source's constructor.
    pub fn new(
        manifest: AssetManifest,
        source: impl FetchSource + 'static,
        settlements: Receiver<Settlement>,
        config: AssetServerConfig,
    ) -> Self {
        Self {
            manifest,
            loaders: LoaderRegistry::with_defaults(),
            source: Some(Box::new(source)),
            settlements: Some(settlements),
            pending: HashMap::new(),
            materials: MaterialAssembler::new(),
            progress: ProgressAggregator::default(),
            gate: CompletionGate::new(
                config.grace_timeout,
                config.safety_timeout,
                config.empty_manifest_delay,
            ),
            store: AssetStore::new(),
            events: AssetEvents::new(),
            next_unit: 1,
            loading: false,
            destroyed: false,
        }
    }

    /// Register a loader, replacing the built-in for its kind
    pub fn register_loader<L: AssetLoader + 'static>(&mut self, loader: L) {
        self.loaders.register(loader);
    }

    /// Subscribe to progress updates `(settled, total)`
    pub fn on_progress<F: FnMut(usize, usize) + 'static>(&mut self, listener: F) {
        self.events.on_progress(listener);
    }

    /// Subscribe to the one-shot ready signal
    pub fn on_ready<F: FnMut() + 'static>(&mut self, listener: F) {
        self.events.on_ready(listener);
    }

    /// Begin every fetch in the manifest. Called once per server
    /// lifetime; the manifest never changes afterward, so the total
    /// fetch count is fixed here.
    pub fn load(&mut self, now: Instant) {
        if self.destroyed {
            log::warn!("load called on a destroyed asset server");
            return;
        }
        if self.loading {
            log::warn!("load called twice, ignoring");
            return;
        }
        self.loading = true;

        let total = self.manifest.fetch_unit_count();
        self.progress = ProgressAggregator::new(total);
        self.gate.begin(now, total);

        if total == 0 {
            log::info!("manifest is empty, completing after the configured delay");
            return;
        }

        let descriptors: Vec<AssetDescriptor> = self.manifest.descriptors().to_vec();
        for descriptor in &descriptors {
            match &descriptor.kind {
                AssetKind::Material { path, channels } => {
                    let units = self.materials.expand(&descriptor.name, path, channels);
                    for (key, unit_path) in units {
                        self.submit(
                            &unit_path,
                            UnitRoute::MaterialChannel {
                                name: descriptor.name.clone(),
                                key,
                            },
                        );
                    }
                }
                other => {
                    if let Some(path) = other.source_path() {
                        self.submit(
                            path,
                            UnitRoute::Asset {
                                name: descriptor.name.clone(),
                            },
                        );
                    }
                }
            }
        }

        log::info!(
            "loading {} assets ({} fetches)",
            descriptors.len(),
            total
        );
    }

    fn submit(&mut self, path: &str, route: UnitRoute) {
        let unit = self.next_unit;
        self.next_unit += 1;
        self.pending.insert(unit, route);
        if let Some(source) = self.source.as_mut() {
            source.begin(unit, path);
        }
    }

    /// Drain settled fetches and evaluate the completion gate. Call this
    /// from the main loop; it never blocks.
    pub fn update(&mut self, now: Instant) {
        if self.destroyed || !self.loading {
            return;
        }

        let drained: Vec<Settlement> = match &self.settlements {
            Some(receiver) => receiver.try_iter().collect(),
            None => Vec::new(),
        };
        for settlement in drained {
            self.handle_settlement(settlement, now);
        }

        if self.gate.poll(now, self.progress.settled()) {
            log::info!(
                "assets ready ({}/{} fetches settled)",
                self.progress.settled(),
                self.progress.total()
            );
            self.events.emit_ready();
        }
    }

    fn handle_settlement(&mut self, settlement: Settlement, now: Instant) {
        let route = match self.pending.remove(&settlement.unit) {
            Some(route) => route,
            None => {
                log::trace!("late or duplicate settlement for fetch {}", settlement.unit);
                return;
            }
        };

        match route {
            UnitRoute::Asset { name } => {
                let value = self.decode_asset(&name, settlement.bytes);
                self.store.insert(&name, value);
            }
            UnitRoute::MaterialChannel { name, key } => {
                let texture = match settlement.bytes {
                    Ok(bytes) => match material::decode_channel(&bytes, &key.to_string()) {
                        Ok(texture) => Some(texture),
                        Err(e) => {
                            log::warn!(
                                "failed to decode channel {} of material {}: {}",
                                key,
                                name,
                                e
                            );
                            None
                        }
                    },
                    Err(e) => {
                        log::warn!("fetch failed for material {} channel {}: {}", name, key, e);
                        None
                    }
                };

                if let Some(assembled) = self.materials.apply(&name, key, texture) {
                    self.store.insert(&name, Some(AssetValue::Material(assembled)));
                }
            }
        }

        let (settled, total) = self.progress.on_settled();
        log::debug!("load progress: {}/{}", settled, total);
        if !self.gate.fired() {
            self.events.emit_progress(settled, total);
        }
        if self.progress.is_complete() {
            self.gate.note_full_progress(now);
        }
    }

    fn decode_asset(
        &self,
        name: &str,
        bytes: Result<Vec<u8>, FetchError>,
    ) -> Option<AssetValue> {
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("fetch failed for {}: {}", name, e);
                return None;
            }
        };

        let descriptor = match self.manifest.get(name) {
            Some(descriptor) => descriptor,
            None => {
                log::warn!("settlement for unknown asset {}", name);
                return None;
            }
        };

        let loader = match self.loaders.get(descriptor.kind.tag()) {
            Some(loader) => loader,
            None => {
                log::warn!(
                    "no loader registered for {} ({:?})",
                    name,
                    descriptor.kind.tag()
                );
                return None;
            }
        };

        match loader.decode(&bytes, descriptor) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("failed to decode {}: {}", name, e);
                None
            }
        }
    }

    /// Resolve a loaded asset by name (see [`AssetStore::get`])
    pub fn get_item(&self, name: &str) -> Option<AssetView<'_>> {
        if self.destroyed {
            return None;
        }
        self.store.get(name)
    }

    /// Names of all manifest entries with the given kind, in manifest order
    pub fn item_names_of_kind(&self, tag: AssetKindTag) -> Vec<&str> {
        self.manifest.names_of_kind(tag)
    }

    /// Whether the one-shot ready signal has fired
    pub fn is_ready(&self) -> bool {
        self.gate.fired()
    }

    /// Settled and total fetch counts
    pub fn progress(&self) -> (usize, usize) {
        (self.progress.settled(), self.progress.total())
    }

    /// Completion ratio in [0, 1]
    pub fn progress_ratio(&self) -> f32 {
        self.progress.ratio()
    }

    /// Tear the server down: release the source and loaders, clear the
    /// store and manifest. No events fire after this.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        log::debug!("asset server destroyed");
        self.destroyed = true;
        self.source = None;
        self.settlements = None;
        self.pending.clear();
        self.materials.clear();
        self.store.clear();
        self.events.clear();
        self.loaders.clear();
        self.manifest = AssetManifest::default();
    }
}

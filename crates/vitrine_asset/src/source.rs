//! Fetch sources - where asset bytes come from
//!
//! A source begins one fetch per unit and delivers settlements over a
//! channel; the orchestrator drains the channel on its own thread and
//! never blocks on an individual fetch. A source must settle every unit
//! it accepts exactly once, success or failure.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;
use thiserror::Error;

/// Identifier of one underlying fetch
pub type UnitId = u64;

/// Error that ended a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("asset file not found: {0}")]
    NotFound(String),
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// One settled fetch: raw bytes or the failure that ended it
#[derive(Debug)]
pub struct Settlement {
    pub unit: UnitId,
    pub bytes: Result<Vec<u8>, FetchError>,
}

/// Capability to begin asynchronous byte fetches
pub trait FetchSource {
    /// Begin one fetch. The settlement arrives later on the receiver
    /// handed out at construction.
    fn begin(&mut self, unit: UnitId, path: &str);
}

/// Disk-backed source. File reads run on a worker thread; dropping the
/// source shuts the worker down.
pub struct DiskSource {
    requests: Option<Sender<(UnitId, PathBuf)>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl DiskSource {
    /// Spawn a source rooted at `root`. Returns the source and the
    /// settlement receiver for the orchestrator.
    pub fn spawn(root: impl Into<PathBuf>) -> (Self, Receiver<Settlement>) {
        let root = root.into();
        let (request_tx, request_rx) = unbounded::<(UnitId, PathBuf)>();
        let (settle_tx, settle_rx) = unbounded();

        let worker = thread::spawn(move || {
            for (unit, relative) in request_rx.iter() {
                let path = root.join(&relative);
                let bytes = match std::fs::read(&path) {
                    Ok(bytes) => Ok(bytes),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(FetchError::NotFound(path.display().to_string()))
                    }
                    Err(e) => Err(FetchError::Io {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    }),
                };

                if settle_tx.send(Settlement { unit, bytes }).is_err() {
                    // Receiver gone, nobody cares about the rest
                    break;
                }
            }
        });

        (
            Self {
                requests: Some(request_tx),
                worker: Some(worker),
            },
            settle_rx,
        )
    }
}

impl FetchSource for DiskSource {
    fn begin(&mut self, unit: UnitId, path: &str) {
        let send = self
            .requests
            .as_ref()
            .map(|tx| tx.send((unit, PathBuf::from(path))));
        if !matches!(send, Some(Ok(()))) {
            log::warn!("disk source worker unavailable, dropping fetch for {}", path);
        }
    }
}

impl Drop for DiskSource {
    fn drop(&mut self) {
        // Close the request channel first so the worker's loop ends
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// In-memory source for bundled assets and tests. Settles each fetch
/// immediately with canned bytes, or NotFound for unknown paths.
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    settlements: Sender<Settlement>,
}

impl MemorySource {
    pub fn new() -> (Self, Receiver<Settlement>) {
        let (settle_tx, settle_rx) = unbounded();
        (
            Self {
                files: HashMap::new(),
                settlements: settle_tx,
            },
            settle_rx,
        )
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }
}

impl FetchSource for MemorySource {
    fn begin(&mut self, unit: UnitId, path: &str) {
        let bytes = match self.files.get(path) {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(FetchError::NotFound(path.to_string())),
        };
        if self.settlements.send(Settlement { unit, bytes }).is_err() {
            log::warn!("settlement receiver gone, dropping fetch for {}", path);
        }
    }
}

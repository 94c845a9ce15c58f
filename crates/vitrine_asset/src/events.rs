//! Load notification channel
//!
//! A typed publish/subscribe object the orchestrator holds as a field.
//! Consumers subscribe before the load starts: "progress" fires on every
//! settlement, "ready" fires exactly once and is terminal.

type ProgressFn = Box<dyn FnMut(usize, usize)>;
type ReadyFn = Box<dyn FnMut()>;

/// Subscriber registry for the two load events
#[derive(Default)]
pub struct AssetEvents {
    progress: Vec<ProgressFn>,
    ready: Vec<ReadyFn>,
}

impl AssetEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to progress updates `(settled, total)`
    pub fn on_progress<F: FnMut(usize, usize) + 'static>(&mut self, listener: F) {
        self.progress.push(Box::new(listener));
    }

    /// Subscribe to the one-shot ready signal
    pub fn on_ready<F: FnMut() + 'static>(&mut self, listener: F) {
        self.ready.push(Box::new(listener));
    }

    pub(crate) fn emit_progress(&mut self, settled: usize, total: usize) {
        for listener in &mut self.progress {
            listener(settled, total);
        }
    }

    /// Notify every ready subscriber, then drop them: the signal is
    /// terminal and must never repeat.
    pub(crate) fn emit_ready(&mut self) {
        for listener in &mut self.ready {
            listener();
        }
        self.ready.clear();
        self.progress.clear();
    }

    pub(crate) fn clear(&mut self) {
        self.progress.clear();
        self.ready.clear();
    }
}

impl std::fmt::Debug for AssetEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetEvents")
            .field("progress_listeners", &self.progress.len())
            .field("ready_listeners", &self.ready.len())
            .finish()
    }
}

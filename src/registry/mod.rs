//! Process-wide bookkeeping of in-flight requests per session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent_loop::StopSignal;

/// One in-flight top-level request, registered under its session key.
///
/// Exposes the two cancellation tiers: `stop` cancels the token the
/// surrounding request pipeline selects on (hard stop), while
/// `request_agent_stop` raises the cooperative flag the agent runner
/// observes at its next checkpoint, leaving the pipeline (history
/// persistence etc.) to finish normally.
#[derive(Debug)]
pub struct ActiveEventHandle {
    id: Uuid,
    session_key: String,
    cancellation: CancellationToken,
    agent_stop: StopSignal,
}

impl ActiveEventHandle {
    /// Create a handle for `session_key`, wiring the runner's stop signal.
    pub fn new(session_key: impl Into<String>, agent_stop: StopSignal) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_key: session_key.into(),
            cancellation: CancellationToken::new(),
            agent_stop,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Hard-stop: cancel the surrounding request handling.
    pub fn stop(&self) {
        self.cancellation.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Token the owning pipeline selects on to observe a hard stop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cooperative stop: flag the agent run without halting the pipeline.
    pub fn request_agent_stop(&self) {
        self.agent_stop.request();
    }

    pub fn agent_stop_requested(&self) -> bool {
        self.agent_stop.is_requested()
    }
}

/// Map from session key to the set of in-flight request handles.
///
/// One owned instance is created at process start and injected wherever
/// cancellation is needed. Buckets are snapshotted before iteration, so a
/// handle (un)registering concurrently with a stop broadcast is safe; an
/// empty bucket is removed, never left dangling. A handle is reachable
/// under exactly one session key — the one it was built with.
#[derive(Debug, Default)]
pub struct ActiveEventRegistry {
    events: Mutex<HashMap<String, Vec<Arc<ActiveEventHandle>>>>,
}

impl ActiveEventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under its session key.
    pub fn register(&self, handle: Arc<ActiveEventHandle>) {
        let mut events = self.lock();
        let bucket = events.entry(handle.session_key.clone()).or_default();
        if !bucket.iter().any(|h| h.id == handle.id) {
            bucket.push(handle);
        }
    }

    /// Register a handle for the duration of a scope; the returned guard
    /// unregisters on drop, on every exit path.
    pub fn register_scoped(&self, handle: Arc<ActiveEventHandle>) -> ActiveEventGuard<'_> {
        self.register(handle.clone());
        ActiveEventGuard {
            registry: self,
            handle,
        }
    }

    /// Remove a handle; its bucket is dropped once empty.
    pub fn unregister(&self, handle: &ActiveEventHandle) {
        let mut events = self.lock();
        if let Some(bucket) = events.get_mut(&handle.session_key) {
            bucket.retain(|h| h.id != handle.id);
            if bucket.is_empty() {
                events.remove(&handle.session_key);
            }
        }
    }

    /// Hard-stop every handle under `session_key` except `exclude`.
    ///
    /// Returns the number of handles stopped.
    pub fn stop_all(&self, session_key: &str, exclude: Option<&ActiveEventHandle>) -> usize {
        let snapshot = self.snapshot(session_key);
        let mut count = 0;
        for handle in snapshot {
            if exclude.is_some_and(|e| e.id == handle.id) {
                continue;
            }
            handle.stop();
            count += 1;
        }
        tracing::debug!(session_key, count, "hard-stopped active events");
        count
    }

    /// Cooperatively flag every handle under `session_key` except `exclude`.
    ///
    /// Unlike [`stop_all`](Self::stop_all) this does not halt the
    /// surrounding pipelines; each flagged agent run aborts itself at its
    /// next checkpoint. Returns the number of handles flagged.
    pub fn request_agent_stop_all(
        &self,
        session_key: &str,
        exclude: Option<&ActiveEventHandle>,
    ) -> usize {
        let snapshot = self.snapshot(session_key);
        let mut count = 0;
        for handle in snapshot {
            if exclude.is_some_and(|e| e.id == handle.id) {
                continue;
            }
            handle.request_agent_stop();
            count += 1;
        }
        tracing::debug!(session_key, count, "requested cooperative agent stop");
        count
    }

    /// Number of handles currently registered under `session_key`.
    pub fn active_count(&self, session_key: &str) -> usize {
        self.lock().get(session_key).map_or(0, Vec::len)
    }

    fn snapshot(&self, session_key: &str) -> Vec<Arc<ActiveEventHandle>> {
        self.lock().get(session_key).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Arc<ActiveEventHandle>>>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// RAII registration for one handle.
pub struct ActiveEventGuard<'a> {
    registry: &'a ActiveEventRegistry,
    handle: Arc<ActiveEventHandle>,
}

impl ActiveEventGuard<'_> {
    pub fn handle(&self) -> &Arc<ActiveEventHandle> {
        &self.handle
    }
}

impl Drop for ActiveEventGuard<'_> {
    fn drop(&mut self) {
        self.registry.unregister(&self.handle);
    }
}

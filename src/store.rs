//! Composed pages waiting to be loaded by the browser.
//!
//! Each request stashes its page under a fresh token and hands the browser a
//! token-specific URL, so overlapping requests never read each other's page.
//! The most recent page is also kept for the legacy `/render-map` endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

#[derive(Default)]
struct Inner {
    scenes: HashMap<Uuid, Arc<str>>,
    latest: Option<Arc<str>>,
}

#[derive(Default)]
pub struct SceneStore {
    inner: Mutex<Inner>,
}

/// Keeps a stashed page reachable; dropping it removes the page
pub struct SceneTicket {
    store: Arc<SceneStore>,
    id: Uuid,
}

impl SceneStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Entries are plain strings; a panic elsewhere cannot leave them half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `html` under a new token and make it the latest page
    pub fn stash(self: &Arc<Self>, html: String) -> SceneTicket {
        let id = Uuid::new_v4();
        let html: Arc<str> = html.into();

        let mut inner = self.lock();
        inner.scenes.insert(id, html.clone());
        inner.latest = Some(html);

        SceneTicket {
            store: Arc::clone(self),
            id,
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<str>> {
        self.lock().scenes.get(id).cloned()
    }

    /// The most recently stashed page, even if its ticket was already dropped
    pub fn latest(&self) -> Option<Arc<str>> {
        self.lock().latest.clone()
    }

    /// Number of pages currently held by live tickets
    pub fn len(&self) -> usize {
        self.lock().scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SceneTicket {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SceneTicket {
    fn drop(&mut self) {
        self.store.lock().scenes.remove(&self.id);
    }
}

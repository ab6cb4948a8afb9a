//! In-memory backend with compare-and-swap updates and watch fan-out

use admit_meta::{GroupResource, NamespacedName, Object, Time, Uid};
use admit_registry::watch::{self, ListOptions, WatchEvent, WatchHandle, WatchSender, WatchStrategy};
use admit_rest::{RequestContext, StatusError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug)]
struct State<O> {
    objects: BTreeMap<NamespacedName, O>,
    revision: u64,
    watchers: Vec<WatchSender<O>>,
}

/// Object map keyed by namespace/name
///
/// Updates succeed only when the incoming resource version equals the
/// stored one; each write bumps a global revision used as the new resource
/// version and is broadcast to open watches.
#[derive(Debug)]
pub struct MemoryBackend<O> {
    resource: GroupResource,
    capacity: usize,
    state: Mutex<State<O>>,
}

impl<O> MemoryBackend<O>
where
    O: Object + Clone + 'static,
{
    pub fn new(resource: GroupResource, capacity: usize) -> Self {
        Self {
            resource,
            capacity,
            state: Mutex::new(State {
                objects: BTreeMap::new(),
                revision: 0,
                watchers: Vec::new(),
            }),
        }
    }

    /// Seed an object, assigning uid, creation time and resource version
    pub fn insert(&self, mut obj: O) -> Result<O, StatusError> {
        let mut state = self.state.lock();
        state.revision += 1;
        let meta = obj.meta_mut().map_err(StatusError::internal)?;
        if meta.uid.is_empty() {
            meta.uid = Uid::generate();
        }
        meta.creation_timestamp.get_or_insert_with(Time::now);
        meta.resource_version = state.revision.to_string();
        let key = NamespacedName::of(meta);
        state.objects.insert(key, obj.clone());
        Ok(obj)
    }

    pub fn get(&self, key: &NamespacedName) -> Option<O> {
        self.state.lock().objects.get(key).cloned()
    }

    /// Compare-and-swap write
    ///
    /// Watchers are notified without waiting; one whose buffer is full is
    /// disconnected, so a stalled consumer never holds up a write.
    pub fn update(&self, key: &NamespacedName, mut obj: O, dry_run: bool) -> Result<O, StatusError> {
        let mut state = self.state.lock();
        let stored = state
            .objects
            .get(key)
            .ok_or_else(|| StatusError::not_found(self.resource.clone(), key.name.clone()))?;
        let stored_rv = stored.meta().map_err(StatusError::internal)?.resource_version.clone();
        let meta = obj.meta_mut().map_err(StatusError::internal)?;
        if meta.resource_version != stored_rv {
            return Err(StatusError::conflict(
                self.resource.clone(),
                key.name.clone(),
                "the object has been modified; please apply your changes to the latest version and try again",
            ));
        }
        if dry_run {
            return Ok(obj);
        }

        state.revision += 1;
        meta.resource_version = state.revision.to_string();
        state.objects.insert(key.clone(), obj.clone());

        let open = state.watchers.len();
        state
            .watchers
            .retain(|w| w.try_send(WatchEvent::Modified(obj.clone())));
        let evicted = open - state.watchers.len();
        if evicted > 0 {
            tracing::warn!(resource = %self.resource, key = %key, evicted, "disconnected watchers that fell behind");
        }
        tracing::debug!(resource = %self.resource, key = %key, watchers = state.watchers.len(), "stored update");
        Ok(obj)
    }

    /// Open watches whose consumer is still attached
    pub fn watcher_count(&self) -> usize {
        let mut state = self.state.lock();
        state.watchers.retain(|w| !w.is_stopped());
        state.watchers.len()
    }
}

#[async_trait]
impl<O> WatchStrategy for MemoryBackend<O>
where
    O: Object + Clone + 'static,
{
    type Object = O;

    /// Selectors are rejected. `resource_version`, `timeout_seconds` and
    /// `allow_watch_bookmarks` are ignored: a watch starts at the current
    /// revision, stays open until stopped and never receives bookmarks.
    async fn watch(&self, ctx: &RequestContext, options: &ListOptions) -> Result<WatchHandle<O>, StatusError> {
        if ctx.is_cancelled() {
            return Err(StatusError::Cancelled);
        }
        if options.label_selector.is_some() || options.field_selector.is_some() {
            return Err(StatusError::BadRequest("selectors are not supported".to_string()));
        }
        let (tx, handle) = watch::channel(self.capacity);
        self.state.lock().watchers.push(tx);
        Ok(handle)
    }
}

//! In-memory object store
//!
//! Slots are reused through a free list; each reuse bumps the slot
//! generation so stale ids never resolve. Lifecycle events go out over
//! unbounded channels so listeners never stall a spawn or destroy.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use super::endpoint::{EndpointInfo, EndpointTags, ObjectSpec, SinkEndpoint, SourceEndpoint};
use super::{ObjectEvent, ObjectId};
use crate::manager::{SinkDescriptor, SourceDescriptor};
use crate::stream::{Frame, FrameSink, FrameSource};

struct ObjectEntry {
    source: Option<SourceEndpoint>,
    sink: Option<SinkEndpoint>,
    tags: EndpointTags,
}

struct Slot {
    generation: u32,
    entry: Option<ObjectEntry>,
}

#[derive(Default)]
struct StoreInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    listeners: Vec<Sender<ObjectEvent>>,
}

impl StoreInner {
    fn get(&self, id: ObjectId) -> Option<&ObjectEntry> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entry.as_ref())
    }

    fn notify(&mut self, event: ObjectEvent) {
        self.listeners.retain(|tx| tx.send(event).is_ok());
    }
}

/// Shared handle to the object registry
///
/// Cloning the handle is cheap; all clones see the same objects.
#[derive(Clone, Default)]
pub struct ObjectStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object and announce it with [`ObjectEvent::Constructed`]
    pub fn spawn(&self, spec: ObjectSpec) -> ObjectId {
        let mut inner = self.inner.write();

        let entry = ObjectEntry {
            source: spec.source,
            sink: spec.sink,
            tags: spec.tags,
        };

        let id = match inner.free.pop() {
            Some(index) => {
                let slot = &mut inner.slots[index as usize];
                slot.entry = Some(entry);
                ObjectId::new(index, slot.generation)
            }
            None => {
                let index = inner.slots.len() as u32;
                inner.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                ObjectId::new(index, 0)
            }
        };

        inner.notify(ObjectEvent::Constructed(id));
        tracing::debug!("spawned object {}", id);
        id
    }

    /// Destroy an object and announce it with [`ObjectEvent::Destroyed`]
    ///
    /// Returns false if the id does not refer to a live object.
    pub fn destroy(&self, id: ObjectId) -> bool {
        let entry = {
            let mut inner = self.inner.write();
            let Some(slot) = inner.slots.get_mut(id.index() as usize) else {
                return false;
            };
            if slot.generation != id.generation() || slot.entry.is_none() {
                return false;
            }

            let entry = slot.entry.take();
            slot.generation = slot.generation.wrapping_add(1);
            inner.free.push(id.index());
            inner.notify(ObjectEvent::Destroyed(id));
            entry
        };

        // capabilities are released outside the lock
        drop(entry);
        tracing::debug!("destroyed object {}", id);
        true
    }

    /// Whether `id` refers to a live object
    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.read().get(id).is_some()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .slots
            .iter()
            .filter(|slot| slot.entry.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to lifecycle events from now on
    pub fn events(&self) -> Receiver<ObjectEvent> {
        let (tx, rx) = unbounded();
        self.inner.write().listeners.push(tx);
        rx
    }

    pub fn tags(&self, id: ObjectId) -> Option<EndpointTags> {
        self.inner.read().get(id).map(|entry| entry.tags)
    }

    pub fn source_descriptor(&self, id: ObjectId) -> Option<SourceDescriptor> {
        self.inner
            .read()
            .get(id)
            .and_then(|entry| entry.source.as_ref())
            .map(|source| source.descriptor().clone())
    }

    pub fn sink_descriptor(&self, id: ObjectId) -> Option<SinkDescriptor> {
        self.inner
            .read()
            .get(id)
            .and_then(|entry| entry.sink.as_ref())
            .map(|sink| sink.descriptor().clone())
    }

    /// The object's source capability, if it produces frames of type `T`
    pub fn source_capability<T: Frame>(&self, id: ObjectId) -> Option<Arc<dyn FrameSource<T>>> {
        self.inner
            .read()
            .get(id)
            .and_then(|entry| entry.source.as_ref())
            .and_then(|source| source.capability::<T>())
    }

    /// The object's sink capability, if it accepts frames of type `T`
    pub fn sink_capability<T: Frame>(&self, id: ObjectId) -> Option<Arc<dyn FrameSink<T>>> {
        self.inner
            .read()
            .get(id)
            .and_then(|entry| entry.sink.as_ref())
            .and_then(|sink| sink.capability::<T>())
    }

    /// All live sources, ordered by id
    pub fn sources(&self) -> Vec<EndpointInfo> {
        self.list(|id, entry| {
            entry.source.as_ref().map(|source| EndpointInfo {
                id,
                name: source.descriptor().name().to_string(),
                frame_type: source.descriptor().frame_type(),
                tags: entry.tags,
            })
        })
    }

    /// All live sinks, ordered by id
    pub fn sinks(&self) -> Vec<EndpointInfo> {
        self.list(|id, entry| {
            entry.sink.as_ref().map(|sink| EndpointInfo {
                id,
                name: sink.descriptor().name().to_string(),
                frame_type: sink.descriptor().frame_type(),
                tags: entry.tags,
            })
        })
    }

    fn list<F>(&self, mut f: F) -> Vec<EndpointInfo>
    where
        F: FnMut(ObjectId, &ObjectEntry) -> Option<EndpointInfo>,
    {
        let inner = self.inner.read();
        inner
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let entry = slot.entry.as_ref()?;
                f(ObjectId::new(index as u32, slot.generation), entry)
            })
            .collect()
    }
}

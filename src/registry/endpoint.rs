//! Source and sink endpoints attached to objects

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;

use super::ObjectId;
use crate::manager::{SinkDescriptor, SourceDescriptor};
use crate::stream::{Frame, FrameSink, FrameSource};

/// Tags steering default wiring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EndpointTags {
    /// Register as the default source/sink of its frame type
    pub default_target: bool,
    /// Connect to the current default of the opposite role on construction
    pub connect_to_default: bool,
}

/// A producer capability together with its descriptor
///
/// The capability is stored type erased; it can only be taken back out
/// as the exact frame type it was registered with.
pub struct SourceEndpoint {
    descriptor: SourceDescriptor,
    capability: Box<dyn Any + Send + Sync>,
}

impl SourceEndpoint {
    pub fn new<T: Frame>(name: impl Into<String>, capability: Arc<dyn FrameSource<T>>) -> Self {
        Self {
            descriptor: SourceDescriptor::new::<T>(name),
            capability: Box::new(capability),
        }
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    /// The capability, if it produces frames of type `T`
    pub fn capability<T: Frame>(&self) -> Option<Arc<dyn FrameSource<T>>> {
        self.capability
            .downcast_ref::<Arc<dyn FrameSource<T>>>()
            .cloned()
    }
}

/// A consumer capability together with its descriptor
pub struct SinkEndpoint {
    descriptor: SinkDescriptor,
    capability: Box<dyn Any + Send + Sync>,
}

impl SinkEndpoint {
    pub fn new<T: Frame>(name: impl Into<String>, capability: Arc<dyn FrameSink<T>>) -> Self {
        Self {
            descriptor: SinkDescriptor::new::<T>(name),
            capability: Box::new(capability),
        }
    }

    pub fn descriptor(&self) -> &SinkDescriptor {
        &self.descriptor
    }

    /// The capability, if it accepts frames of type `T`
    pub fn capability<T: Frame>(&self) -> Option<Arc<dyn FrameSink<T>>> {
        self.capability
            .downcast_ref::<Arc<dyn FrameSink<T>>>()
            .cloned()
    }
}

/// Everything an object is spawned with
///
/// ```
/// use std::sync::Arc;
/// use framewire::audio::AudioFrame;
/// use framewire::registry::{ObjectSpec, ObjectStore};
/// use framewire::stream::MultiSource;
///
/// let store = ObjectStore::new();
/// let mic = Arc::new(MultiSource::<AudioFrame>::new());
/// let id = store.spawn(
///     ObjectSpec::new()
///         .with_source("microphone", mic.clone())
///         .connect_to_default(),
/// );
/// assert!(store.contains(id));
/// ```
#[derive(Default)]
pub struct ObjectSpec {
    pub(crate) source: Option<SourceEndpoint>,
    pub(crate) sink: Option<SinkEndpoint>,
    pub(crate) tags: EndpointTags,
}

impl ObjectSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a source producing frames of type `T`
    pub fn with_source<T, C>(mut self, name: impl Into<String>, capability: Arc<C>) -> Self
    where
        T: Frame,
        C: FrameSource<T> + 'static,
    {
        self.source = Some(SourceEndpoint::new::<T>(
            name,
            capability as Arc<dyn FrameSource<T>>,
        ));
        self
    }

    /// Attach a sink accepting frames of type `T`
    pub fn with_sink<T, C>(mut self, name: impl Into<String>, capability: Arc<C>) -> Self
    where
        T: Frame,
        C: FrameSink<T> + 'static,
    {
        self.sink = Some(SinkEndpoint::new::<T>(
            name,
            capability as Arc<dyn FrameSink<T>>,
        ));
        self
    }

    /// Mark the object as the default target for its frame type
    pub fn default_target(mut self) -> Self {
        self.tags.default_target = true;
        self
    }

    /// Wire the object to the current default of its frame type
    pub fn connect_to_default(mut self) -> Self {
        self.tags.connect_to_default = true;
        self
    }
}

/// Listing entry for a source or sink, for UIs and status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointInfo {
    pub id: ObjectId,
    pub name: String,
    pub frame_type: &'static str,
    pub tags: EndpointTags,
}

//! Endpoint descriptors
//!
//! Descriptors are what the manager can learn about an endpoint without
//! knowing its frame type: a display name and the frame type tag. A
//! source descriptor also carries the connect trampoline, the one place
//! where the concrete frame type is remembered.

use std::fmt;

use super::StreamManager;
use crate::error::ConnectError;
use crate::registry::ObjectId;
use crate::stream::{frame_type_name, Frame};

/// Typed connect entry point, instantiated once per frame type
pub type ConnectFn =
    fn(&mut StreamManager, ObjectId, ObjectId, bool) -> Result<(), ConnectError>;

/// Describes the producing end of an object
#[derive(Clone)]
pub struct SourceDescriptor {
    name: String,
    frame_type: &'static str,
    connect_fn: ConnectFn,
}

impl SourceDescriptor {
    pub fn new<T: Frame>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame_type: frame_type_name::<T>(),
            connect_fn: StreamManager::connect_typed::<T>,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_type(&self) -> &'static str {
        self.frame_type
    }

    /// Run `connect_typed` for this source's frame type
    pub fn connect(
        &self,
        manager: &mut StreamManager,
        src: ObjectId,
        sink: ObjectId,
        threaded: bool,
    ) -> Result<(), ConnectError> {
        (self.connect_fn)(manager, src, sink, threaded)
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("frame_type", &self.frame_type)
            .finish_non_exhaustive()
    }
}

/// Describes the consuming end of an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkDescriptor {
    name: String,
    frame_type: &'static str,
}

impl SinkDescriptor {
    pub fn new<T: Frame>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame_type: frame_type_name::<T>(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_type(&self) -> &'static str {
        self.frame_type
    }
}

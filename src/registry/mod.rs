//! Object registry the stream manager resolves endpoints through
//!
//! Objects are opaque generational ids. A producer or consumer registers
//! itself by spawning an object that carries a source and/or sink
//! endpoint; the manager only ever refers to it by id, never by pointer.
//!
//! ```text
//!   ObjectStore ──events()──► StreamManager
//!   ┌──────────────────────┐        │
//!   │ 0v0  source "mic"    │◄───────┤ connect(0v0, 2v0)
//!   │ 1v0  sink   "tap"    │        │
//!   │ 2v0  sink   "speaker"│◄───────┘
//!   └──────────────────────┘
//! ```

pub mod endpoint;
pub mod store;

pub use endpoint::{EndpointInfo, EndpointTags, ObjectSpec, SinkEndpoint, SourceEndpoint};
pub use store::ObjectStore;

use std::fmt;

use serde::Serialize;

/// Opaque identifier of an object in the [`ObjectStore`]
///
/// The generation makes ids of destroyed objects stay dead even when
/// their slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Lifecycle notification emitted by the [`ObjectStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectEvent {
    /// The object and all its endpoints exist
    Constructed(ObjectId),
    /// The object is gone, its endpoints have been released
    Destroyed(ObjectId),
}

impl ObjectEvent {
    pub fn id(&self) -> ObjectId {
        match self {
            ObjectEvent::Constructed(id) | ObjectEvent::Destroyed(id) => *id,
        }
    }
}

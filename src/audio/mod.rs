//! Audio payloads and audio specific stream adapters

pub mod frame;
pub mod reframer;

pub use frame::AudioFrame;
pub use reframer::Reframer;

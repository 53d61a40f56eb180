//! XML Reader Module
//!
//! - SliceReader: zero-copy pull reader over a byte slice
//! - Events: XML event types for pull parsing

pub mod events;
pub mod slice;

pub use events::XmlEvent;
pub use slice::SliceReader;

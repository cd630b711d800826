//! A declarative IR/RF remote-control protocol toolkit: a pattern DSL for
//! describing a protocol's wire format, shared encode/decode rule-tree
//! walkers, a partial-knowledge decode tracker, four raw wire-format
//! codecs, and a catalogue-backed protocol registry.

pub mod catalogue;
pub mod codec;
pub mod error;
pub mod numeric;
pub mod pattern;
pub mod protocol;
pub mod raw;
pub mod registry;
pub mod value;

pub use error::{RemoteProtoError, Result};
pub use protocol::{DecodeMatch, ProtocolDef, ProtocolKind, RemoteCommand, SignalData};
pub use registry::ProtocolRegistry;

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Error types for this crate.
mod error;
mod functional;
pub use error::*;

/// I/O utilities.
pub mod io;

/// base types for EBML elements, i.e. `VInt64`, `Header`.
mod base;
mod frame;
mod lacer;
/// Leaf elements in the WebM profile.
mod leaf;
/// Master (container) elements in the WebM profile.
pub mod master;
/// Supplementary elements. Currently just Void, used for padding.
mod supplement;
// Element body definitions and traits.
mod element;

/// The closed set of video/audio codec identifiers this profile allows.
pub mod registry;

/// Parses a WebM byte buffer into metadata and a lazy frame iterator.
pub mod document;
/// Assembles a WebM byte buffer from caller-supplied track declarations and frames.
pub mod mux;

pub use document::{EbmlHeader, ParseSession, SegmentInfo, Track, TrackKind};
pub use frame::Frame;
pub use mux::{MuxSession, MuxTrackHandle};

/// A prelude for common types and traits.
///
/// Wire-level container types (`Segment`, `SegmentInfo`, `Tracks`, `TrackEntry`, `Cluster`, ...)
/// live under [`prelude::master`] rather than being re-exported directly: `master::SegmentInfo`
/// would otherwise collide with the parsed-document facade [`document::SegmentInfo`].
pub mod prelude {
    pub use crate::base::*;
    pub use crate::document::*;
    pub use crate::element::*;
    pub use crate::frame::*;
    pub use crate::leaf::*;
    pub use crate::master;
    pub use crate::mux::*;
    pub use crate::registry::*;
    pub use crate::supplement::*;
}

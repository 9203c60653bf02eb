//! EBML (Extensible Binary Meta Language) parsing layer.
//!
//! EBML is the tag/length/value framing Matroska and WebM are built on.
//! Everything in here is container-generic: variable-length integers,
//! primitive value decoding, the element descriptor, and the positioned
//! reader that walks sibling elements. The Matroska-specific semantics
//! (tracks, blocks, the demux loop) live in [`crate::matroska`].

pub mod element;
pub mod reader;
pub mod values;
pub mod vint;

pub use element::{ElementType, MatroskaElement, ValueType};
pub use reader::EbmlReader;
pub use vint::VInt;

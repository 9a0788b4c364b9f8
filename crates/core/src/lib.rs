#![deny(missing_docs)]
//! Weft core: span-tracked markup trees, the source store, and position lookup.

/// Attribute-list tokenizing helpers.
pub mod attrs;
/// Arena-backed mutable document tree.
pub mod dom;
/// Forgiving HTML parser.
pub mod parser;
/// Offset to line/column translation.
pub mod position;
/// Markup serialization.
pub mod serialize;
/// Loaded source buffers.
pub mod source;
/// Byte spans into source buffers.
pub mod span;

pub use attrs::{parse_attr_token, tokenize_attrs};
pub use dom::{Attribute, Document, Element, NodeId, NodeKind};
pub use parser::{ParseError, RAW_TEXT_ELEMENTS, VOID_ELEMENTS, parse};
pub use position::SourcePos;
pub use serialize::{SerializeOptions, normalize_whitespace};
pub use source::{SourceBuffer, SourceKind, SourceStore};
pub use span::{Origin, Span, SpanError};

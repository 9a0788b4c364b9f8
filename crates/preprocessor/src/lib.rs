#![deny(missing_docs)]
//! Weft preprocessor: expands `:include`/`:import` directives, `:define` custom-tag
//! macros with slots, and `:markdown` blocks into a single page tree.

/// Preprocessor configuration.
pub mod config;
/// Directive tag and attribute names.
pub mod directives;
/// Preprocessing errors.
pub mod error;
/// Code block highlighting.
pub mod highlight;
/// Macro collection and expansion.
pub mod macros;
/// Markdown block lowering.
pub mod md_lowering;
/// Expanded pages.
pub mod page;
/// The preprocessing driver.
pub mod preprocessor;
/// Heading slugs.
pub mod slug;

mod include;
mod resolve;

pub use config::{CONFIG_FILE_NAME, MAX_RECURSIONS, MarkdownConfig, PreprocessorConfig, VirtualFile};
pub use error::{ErrorKind, PreprocessError};
pub use macros::{MacroDefinition, MacroRegistry, parse_macro_tag};
pub use page::Page;
pub use preprocessor::Preprocessor;
pub use resolve::normalize;
pub use slug::{Slugger, slugify};

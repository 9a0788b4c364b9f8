//! Directive vocabulary recognized in markup.
//!
//! Tag names are compared against the parser's uppercased element names; attribute
//! names are case-sensitive.

/// Splices a file's content at the directive's position.
pub const INCLUDE_TAG: &str = ":INCLUDE";
/// Like [`INCLUDE_TAG`], but loads each resolved path at most once per run.
pub const IMPORT_TAG: &str = ":IMPORT";
/// Path of the included file.
pub const INCLUDE_SRC: &str = "src";
/// Embed form: element name plus `key=value` attributes wrapping the loaded text.
pub const INCLUDE_AS: &str = "as";

/// Declares a custom-tag macro.
pub const DEFINE_TAG: &str = ":DEFINE";
/// `[:]namespace-name[:baseTag]` of the macro being declared.
pub const DEFINE_ARG: &str = "tag";
/// Tag a macro renders as when it names no base.
pub const DEFAULT_BASE_TAG: &str = "div";

/// Insertion point inside a macro body.
pub const SLOT_TAG: &str = ":SLOT";
/// Comma-separated names of a slot marker.
pub const SLOT_ARG: &str = "name";
/// Attribute routing an invocation child to a named slot.
pub const SLOT_ATTR: &str = ":slot";
/// Slot receiving unrouted content.
pub const DEFAULT_SLOT: &str = "default";

/// Block whose inner text is rendered as markdown.
pub const MARKDOWN_TAG: &str = ":MARKDOWN";

/// Origin name of the bootstrap fragment.
pub const EMBEDDED_ORIGIN: &str = ":embedded:";

/// Id of the properties payload script appended to a page body.
pub const PROPS_SCRIPT_ID: &str = "weft-props";

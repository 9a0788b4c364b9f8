use std::fmt;

use thiserror::Error;
use weft_core::SourcePos;

/// Location prefix rendered before a message, empty when unknown.
struct At<'a>(&'a Option<SourcePos>);

impl fmt::Display for At<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(pos) => write!(f, "{pos}: "),
            None => Ok(()),
        }
    }
}

fn at(location: &Option<SourcePos>) -> At<'_> {
    At(location)
}

/// Errors that abort a preprocessing run.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// A resolved path escaped the sandbox root.
    #[error("{}Forbidden file path \"{path}\"", at(.location))]
    ForbiddenPath {
        /// Path as written by the author.
        path: String,
        /// Including element, when there is one.
        location: Option<SourcePos>,
    },
    /// A file could not be read.
    #[error("{}Could not read file \"{path}\"", at(.location))]
    FileNotFound {
        /// Path as written by the author.
        path: String,
        /// Including element, when there is one.
        location: Option<SourcePos>,
        /// Underlying read failure.
        #[source]
        source: std::io::Error,
    },
    /// Include/import nesting hit the recursion ceiling.
    #[error("{}Too many nested includes/imports \"{path}\"", at(.location))]
    TooManyIncludes {
        /// Path as written by the author.
        path: String,
        /// Including element, when there is one.
        location: Option<SourcePos>,
    },
    /// Macro expansion nesting hit the recursion ceiling.
    #[error("{}Too many nested macros \"{tag}\"", at(.location))]
    TooManyMacros {
        /// Tag of the invocation being expanded.
        tag: String,
        /// Invocation element.
        location: Option<SourcePos>,
    },
    /// A required directive attribute is absent or blank.
    #[error("{}Missing \"{attribute}\" attribute", at(.location))]
    MissingAttribute {
        /// Name of the attribute.
        attribute: &'static str,
        /// Directive element.
        location: Option<SourcePos>,
    },
    /// A directive attribute has an invalid value.
    #[error("{}{message}", at(.location))]
    BadAttribute {
        /// What is wrong with the value.
        message: String,
        /// Directive element.
        location: Option<SourcePos>,
    },
    /// An invocation child names a slot the macro does not declare.
    #[error("{}unknown slot \"{name}\"", at(.location))]
    UnknownSlot {
        /// Requested slot name.
        name: String,
        /// Offending child.
        location: Option<SourcePos>,
    },
    /// Malformed markup.
    #[error("{}{message}", at(.location))]
    Parse {
        /// Parser message.
        message: String,
        /// Where the parser stopped.
        location: Option<SourcePos>,
    },
    /// The markdown renderer rejected a block, or produced unparsable markup.
    #[error("{}Markdown error: {message}", at(.location))]
    Markdown {
        /// Renderer message.
        message: String,
        /// Markdown directive element.
        location: Option<SourcePos>,
    },
    /// Configuration could not be read or decoded.
    #[error("Invalid configuration: {message}")]
    Config {
        /// What went wrong.
        message: String,
    },
}

/// Discriminant of [`PreprocessError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// See [`PreprocessError::ForbiddenPath`].
    ForbiddenPath,
    /// See [`PreprocessError::FileNotFound`].
    FileNotFound,
    /// See [`PreprocessError::TooManyIncludes`].
    TooManyIncludes,
    /// See [`PreprocessError::TooManyMacros`].
    TooManyMacros,
    /// See [`PreprocessError::MissingAttribute`].
    MissingAttribute,
    /// See [`PreprocessError::BadAttribute`].
    BadAttribute,
    /// See [`PreprocessError::UnknownSlot`].
    UnknownSlot,
    /// See [`PreprocessError::Parse`].
    Parse,
    /// See [`PreprocessError::Markdown`].
    Markdown,
    /// See [`PreprocessError::Config`].
    Config,
}

impl PreprocessError {
    /// Kind of the error, for matching without destructuring.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ForbiddenPath { .. } => ErrorKind::ForbiddenPath,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::TooManyIncludes { .. } => ErrorKind::TooManyIncludes,
            Self::TooManyMacros { .. } => ErrorKind::TooManyMacros,
            Self::MissingAttribute { .. } => ErrorKind::MissingAttribute,
            Self::BadAttribute { .. } => ErrorKind::BadAttribute,
            Self::UnknownSlot { .. } => ErrorKind::UnknownSlot,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Markdown { .. } => ErrorKind::Markdown,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// Resolved position of the node that triggered the error.
    pub fn location(&self) -> Option<&SourcePos> {
        match self {
            Self::ForbiddenPath { location, .. }
            | Self::FileNotFound { location, .. }
            | Self::TooManyIncludes { location, .. }
            | Self::TooManyMacros { location, .. }
            | Self::MissingAttribute { location, .. }
            | Self::BadAttribute { location, .. }
            | Self::UnknownSlot { location, .. }
            | Self::Parse { location, .. }
            | Self::Markdown { location, .. } => location.as_ref(),
            Self::Config { .. } => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> SourcePos {
        SourcePos {
            file: "index.html".into(),
            line1: 3,
            column1: 5,
            line2: 3,
            column2: 9,
        }
    }

    #[test]
    fn located_errors_are_prefixed() {
        let err = PreprocessError::UnknownSlot {
            name: "footer".into(),
            location: Some(pos()),
        };
        assert_eq!(err.to_string(), "index.html:3:5: unknown slot \"footer\"");
        assert_eq!(err.kind(), ErrorKind::UnknownSlot);
        assert_eq!(err.location().map(|p| p.line1), Some(3));
    }

    #[test]
    fn unlocated_errors_are_bare() {
        let err = PreprocessError::ForbiddenPath {
            path: "../x.html".into(),
            location: None,
        };
        assert_eq!(err.to_string(), "Forbidden file path \"../x.html\"");
        assert!(err.location().is_none());
    }

    #[test]
    fn missing_attribute_message() {
        let err = PreprocessError::MissingAttribute {
            attribute: "src",
            location: None,
        };
        assert_eq!(err.to_string(), "Missing \"src\" attribute");
        assert_eq!(PreprocessError::config("bad").kind(), ErrorKind::Config);
    }
}

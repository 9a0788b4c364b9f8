//! Ordered store of every buffer loaded during one preprocessing run.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::position::{self, SourcePos};
use crate::span::{Origin, Span};

/// Where a buffer's text came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceKind {
    /// Read from disk.
    File,
    /// Served from the in-memory virtual file table.
    Virtual,
    /// Generated text with no backing file (e.g. the bootstrap fragment).
    Synthetic,
}

/// Immutable text of one loaded file, always newline-terminated.
#[derive(Clone, Debug)]
pub struct SourceBuffer {
    /// Absolute path (or synthetic name) the text was loaded from.
    pub path: String,
    /// Buffer contents.
    pub text: String,
    /// Origin of the contents.
    pub kind: SourceKind,
}

/// Buffers indexed by [`Origin`], in load order.
#[derive(Clone, Debug, Default)]
pub struct SourceStore {
    root: PathBuf,
    buffers: Vec<SourceBuffer>,
}

impl SourceStore {
    /// Creates an empty store whose file names are reported relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            buffers: Vec::new(),
        }
    }

    /// Sandbox root used for display names.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Appends a buffer and returns its origin. A trailing newline is added when missing.
    pub fn push(&mut self, path: impl Into<String>, text: &str, kind: SourceKind) -> Origin {
        let mut text = text.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        self.buffers.push(SourceBuffer {
            path: path.into(),
            text,
            kind,
        });
        self.buffers.len() - 1
    }

    /// Buffer for `origin`, if any.
    pub fn get(&self, origin: Origin) -> Option<&SourceBuffer> {
        self.buffers.get(origin)
    }

    /// Number of loaded buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether nothing has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// All buffers in load order.
    pub fn buffers(&self) -> &[SourceBuffer] {
        &self.buffers
    }

    /// Paths of all buffers in load order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.buffers.iter().map(|b| b.path.as_str())
    }

    /// Whether a buffer was already loaded from `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        self.buffers.iter().any(|b| b.path == path)
    }

    /// Paths a cached artifact derived from this run depends on.
    pub fn dependencies(&self) -> Vec<&str> {
        self.buffers
            .iter()
            .filter(|b| b.kind != SourceKind::Synthetic)
            .map(|b| b.path.as_str())
            .collect()
    }

    /// File name of `origin` relative to the root when root-prefixed, else verbatim.
    pub fn display_name(&self, origin: Origin) -> String {
        let Some(buffer) = self.buffers.get(origin) else {
            return String::new();
        };
        match Path::new(&buffer.path).strip_prefix(&self.root) {
            Ok(relative) if !self.root.as_os_str().is_empty() => {
                relative.to_string_lossy().into_owned()
            }
            _ => buffer.path.clone(),
        }
    }

    /// Resolves a span to file, line and column, or `None` for an unknown origin.
    pub fn resolve(&self, span: &Span) -> Option<SourcePos> {
        let buffer = self.buffers.get(span.origin)?;
        Some(position::resolve(
            &buffer.text,
            span,
            self.display_name(span.origin),
        ))
    }

    /// Whether any disk file contributing to this run changed after `since`.
    ///
    /// A file whose metadata can no longer be read counts as changed.
    pub fn is_stale(&self, since: SystemTime) -> bool {
        self.buffers
            .iter()
            .filter(|b| b.kind == SourceKind::File)
            .any(|b| match std::fs::metadata(&b.path).and_then(|m| m.modified()) {
                Ok(modified) => modified > since,
                Err(_) => true,
            })
    }
}

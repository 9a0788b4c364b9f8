//! Include resolution: sandboxed path lookup, loading and classification.

use std::path::{Component, Path, PathBuf};

use log::debug;
use weft_core::{NodeId, SourceKind, Span, parse};

use crate::error::PreprocessError;
use crate::preprocessor::Preprocessor;

/// Lexically normalizes `path`: `.` segments are dropped and `..` pops a segment.
///
/// `..` never climbs above the filesystem root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `path` loads as a markup module rather than verbatim text.
fn is_markup_module(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

impl Preprocessor {
    /// Resolves `fname` against the root (leading `/`) or `current_dir`, and checks
    /// that the result stays inside the root.
    pub(crate) fn resolve_path(
        &self,
        fname: &str,
        current_dir: Option<&Path>,
        invoker: Option<NodeId>,
    ) -> Result<PathBuf, PreprocessError> {
        let (base, relative) = match fname.strip_prefix('/') {
            Some(rest) => (self.root.as_path(), rest.trim_start_matches('/')),
            None => (current_dir.unwrap_or(self.root.as_path()), fname),
        };
        let path = normalize(&base.join(relative));
        if !path.starts_with(&self.root) {
            return Err(PreprocessError::ForbiddenPath {
                path: fname.to_string(),
                location: invoker.and_then(|id| self.locate(id)),
            });
        }
        Ok(path)
    }

    /// Loads `fname` for an include directive.
    ///
    /// Returns `None` when `once` is set and the resolved path was already loaded
    /// during this run.
    pub(crate) fn load(
        &mut self,
        fname: &str,
        current_dir: &Path,
        nesting: usize,
        once: bool,
        invoker: NodeId,
    ) -> Result<Option<NodeId>, PreprocessError> {
        if nesting >= self.config.max_recursions {
            return Err(PreprocessError::TooManyIncludes {
                path: fname.to_string(),
                location: self.locate(invoker),
            });
        }
        let path = self.resolve_path(fname, Some(current_dir), Some(invoker))?;
        if once && self.sources.contains_path(&path.to_string_lossy()) {
            debug!("Skipping already imported {}", path.display());
            return Ok(None);
        }
        self.load_path(fname, &path, nesting, Some(invoker)).map(Some)
    }

    /// Reads an already resolved path and returns the fragment holding its content.
    ///
    /// Markup modules have their own includes resolved relative to their directory;
    /// other files become a single text node inside a `<lib>` element.
    pub(crate) fn load_path(
        &mut self,
        fname: &str,
        path: &Path,
        nesting: usize,
        invoker: Option<NodeId>,
    ) -> Result<NodeId, PreprocessError> {
        let (text, kind) = match self.virtual_files.get(path) {
            Some(text) => (text.clone(), SourceKind::Virtual),
            None => match std::fs::read_to_string(path) {
                Ok(text) => (text, SourceKind::File),
                Err(source) => {
                    return Err(PreprocessError::FileNotFound {
                        path: fname.to_string(),
                        location: invoker.and_then(|id| self.locate(id)),
                        source,
                    });
                }
            },
        };
        debug!("Loaded {} ({} bytes)", path.display(), text.len());
        let origin = self.sources.push(path.to_string_lossy(), &text, kind);

        if is_markup_module(path) {
            let fragment = parse(&mut self.doc, &text, origin).map_err(|e| self.parse_error(e))?;
            let dir = path.parent().unwrap_or(self.root.as_path()).to_path_buf();
            self.process_includes(fragment, &dir, nesting)?;
            return Ok(fragment);
        }

        let whole = Span {
            origin,
            start: 0,
            end: text.len(),
        };
        let fragment = self.doc.create_fragment(whole);
        let lib = self.doc.create_element("lib", whole);
        let content = self.doc.create_text(text, whole);
        self.doc.append_child(fragment, lib);
        self.doc.append_child(lib, content);
        Ok(fragment)
    }
}

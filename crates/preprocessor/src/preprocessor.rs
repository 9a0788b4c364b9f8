//! Driver tying inclusion, markdown lowering and macro expansion together.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use weft_core::{
    Document, NodeId, ParseError, SourceKind, SourcePos, SourceStore, Span, parse,
};

use crate::config::{PreprocessorConfig, VirtualFile};
use crate::directives::EMBEDDED_ORIGIN;
use crate::error::PreprocessError;
use crate::macros::MacroRegistry;
use crate::page::Page;
use crate::resolve::normalize;

/// Expands one page at a time against a sandboxed root.
///
/// Each [`read`](Preprocessor::read) owns a fresh document, source store and macro
/// registry; nothing carries over between runs except the configuration and the
/// virtual file table.
#[derive(Debug)]
pub struct Preprocessor {
    pub(crate) config: PreprocessorConfig,
    pub(crate) root: PathBuf,
    pub(crate) virtual_files: HashMap<PathBuf, String>,
    pub(crate) doc: Document,
    pub(crate) sources: SourceStore,
    pub(crate) macros: MacroRegistry,
}

impl Preprocessor {
    /// Creates a preprocessor; a relative root is taken from the current directory.
    pub fn new(config: PreprocessorConfig) -> Self {
        let root = if config.root_path.is_absolute() {
            normalize(&config.root_path)
        } else {
            let cwd = std::env::current_dir().unwrap_or_default();
            normalize(&cwd.join(&config.root_path))
        };
        let virtual_files = index_virtual_files(&root, &config.virtual_files);
        Self {
            sources: SourceStore::new(root.clone()),
            doc: Document::new(),
            macros: MacroRegistry::default(),
            config,
            root,
            virtual_files,
        }
    }

    /// Normalized sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Active configuration.
    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Drops all per-run state.
    pub fn reset(&mut self) -> &mut Self {
        self.doc = Document::new();
        self.sources = SourceStore::new(self.root.clone());
        self.macros = MacroRegistry::default();
        self
    }

    /// Drops all per-run state and replaces the virtual file table.
    pub fn reset_with(&mut self, virtual_files: Vec<VirtualFile>) -> &mut Self {
        self.virtual_files = index_virtual_files(&self.root, &virtual_files);
        self.config.virtual_files = virtual_files;
        self.reset()
    }

    /// Loads `fname` (relative to the root) and returns the fully expanded page.
    ///
    /// The run's state moves into the returned [`Page`]; on error it is discarded.
    /// Either way the preprocessor is ready for the next run.
    pub fn read(&mut self, fname: &str) -> Result<Page, PreprocessError> {
        self.reset();
        let result = self.run(fname);
        let sources = std::mem::replace(&mut self.sources, SourceStore::new(self.root.clone()));
        let document = std::mem::take(&mut self.doc);
        self.macros = MacroRegistry::default();
        let root = result?;
        debug!("Expanded {} from {} source(s)", fname, sources.len());
        Ok(Page::new(document, root, sources))
    }

    fn run(&mut self, fname: &str) -> Result<NodeId, PreprocessError> {
        let path = self.resolve_path(fname, None, None)?;
        let root = self.load_path(fname, &path, 0, None)?;
        let bootstrap = self.config.bootstrap.clone();
        if let Some(top) = self.doc.first_element_child(root) {
            // Library pages (`<lib>` and the like) only get a skeleton when a
            // bootstrap has to land in it.
            if bootstrap.is_some() || self.doc.has_tag(top, "HTML") {
                let (head, _body) = self.ensure_head_and_body(root, top);
                if let Some(bootstrap) = bootstrap {
                    self.splice_bootstrap(head, &bootstrap)?;
                }
            }
        }
        self.lower_markdown(root)?;
        self.collect_macros(root, 0)?;
        self.expand_macros(root, 0)?;
        Ok(root)
    }

    /// Parses the bootstrap fragment and include-splices it at the end of `head`.
    fn splice_bootstrap(&mut self, head: NodeId, bootstrap: &str) -> Result<(), PreprocessError> {
        let origin = self
            .sources
            .push(EMBEDDED_ORIGIN, bootstrap, SourceKind::Synthetic);
        let fragment = parse(&mut self.doc, bootstrap, origin).map_err(|e| self.parse_error(e))?;
        let root_dir = self.root.clone();
        self.process_includes(fragment, &root_dir, 0)?;
        if let Some(content) = self.doc.first_element_child(fragment) {
            self.include(content, head, None);
        }
        self.doc.join_adjacent_texts(head);
        Ok(())
    }

    fn ensure_head_and_body(&mut self, root: NodeId, top: NodeId) -> (NodeId, NodeId) {
        let span = Span::synthetic(self.doc.span(top).origin);
        let body = match self.doc.top_element(root, "BODY") {
            Some(body) => body,
            None => {
                let body = self.doc.create_element("body", span);
                self.doc.append_child(top, body);
                body
            }
        };
        let head = match self.doc.top_element(root, "HEAD") {
            Some(head) => head,
            None => {
                let head = self.doc.create_element("head", span);
                self.doc.insert_before(top, head, Some(body));
                head
            }
        };
        (head, body)
    }

    /// Position of `id` in its source file.
    pub(crate) fn locate(&self, id: NodeId) -> Option<SourcePos> {
        self.sources.resolve(&self.doc.span(id))
    }

    pub(crate) fn parse_error(&self, err: ParseError) -> PreprocessError {
        PreprocessError::Parse {
            location: self.sources.resolve(&err.span()),
            message: err.message,
        }
    }
}

fn index_virtual_files(root: &Path, files: &[VirtualFile]) -> HashMap<PathBuf, String> {
    files
        .iter()
        .map(|v| {
            let path = normalize(&root.join(v.fname.trim_start_matches('/')));
            (path, v.content.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preprocessor(files: &[(&str, &str)]) -> Preprocessor {
        let mut config = PreprocessorConfig::with_root("/site");
        config.virtual_files = files.iter().map(|(f, c)| VirtualFile::new(*f, *c)).collect();
        Preprocessor::new(config)
    }

    #[test]
    fn relative_root_is_absolutized() {
        let pre = Preprocessor::new(PreprocessorConfig::with_root("site/../pages"));
        assert!(pre.root().is_absolute());
        assert!(pre.root().ends_with("pages"));
    }

    #[test]
    fn virtual_files_are_indexed_by_normalized_path() {
        let pre = preprocessor(&[("/a/../index.html", "<html></html>")]);
        assert!(pre.virtual_files.contains_key(Path::new("/site/index.html")));
    }

    #[test]
    fn read_leaves_preprocessor_reset() {
        let mut pre = preprocessor(&[("index.html", "<html><body></body></html>")]);
        let page = pre.read("index.html").unwrap();
        assert_eq!(page.sources().len(), 1);
        assert!(pre.sources.is_empty());
        assert!(pre.doc.is_empty());

        let err = pre.read("missing.html").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::FileNotFound);
        assert!(pre.sources.is_empty());
    }

    #[test]
    fn bootstrap_creates_head_and_body() {
        let mut pre = preprocessor(&[("index.html", "<html><p>x</p></html>")]);
        pre.config.bootstrap = Some("<lib><meta charset=\"utf-8\"></lib>".into());
        let page = pre.read("index.html").unwrap();
        let doc = page.document();
        let html = page.root_element().unwrap();
        let tags: Vec<_> = doc
            .children(html)
            .iter()
            .filter_map(|&c| doc.tag_name(c))
            .collect();
        assert_eq!(tags, ["P", "HEAD", "BODY"]);
        let head = page.head().unwrap();
        assert_eq!(doc.tag_name(doc.children(head)[0]), Some("META"));
        assert_eq!(page.sources().display_name(1), EMBEDDED_ORIGIN);
    }

    #[test]
    fn html_pages_get_head_and_body_without_bootstrap() {
        let mut pre = preprocessor(&[("index.html", "<html><p>x</p></html>")]);
        let page = pre.read("index.html").unwrap();
        assert!(page.head().is_some());
        assert!(page.body().is_some());
        assert_eq!(page.sources().len(), 1);
        assert_eq!(
            page.markup(&weft_core::SerializeOptions::default()),
            "<html><p>x</p><head></head><body></body></html>"
        );
    }

    #[test]
    fn library_pages_stay_bare_without_bootstrap() {
        let mut pre = preprocessor(&[("index.html", "<lib>x</lib>")]);
        let page = pre.read("index.html").unwrap();
        assert_eq!(page.head(), None);
        assert_eq!(page.body(), None);
    }

    #[test]
    fn reset_with_replaces_virtual_files() {
        let mut pre = preprocessor(&[("a.html", "<a></a>")]);
        pre.reset_with(vec![VirtualFile::new("b.html", "<b></b>")]);
        assert!(pre.read("a.html").is_err());
        assert!(pre.read("b.html").is_ok());
    }
}

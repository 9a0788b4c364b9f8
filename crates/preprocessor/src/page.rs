//! Result of one preprocessing run.

use std::time::SystemTime;

use weft_core::{Document, NodeId, SerializeOptions, SourcePos, SourceStore, Span};

use crate::directives::PROPS_SCRIPT_ID;

/// An expanded page together with every buffer that contributed to it.
#[derive(Clone, Debug)]
pub struct Page {
    document: Document,
    root: NodeId,
    sources: SourceStore,
}

impl Page {
    pub(crate) fn new(document: Document, root: NodeId, sources: SourceStore) -> Self {
        Self {
            document,
            root,
            sources,
        }
    }

    /// Arena holding the page tree.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable arena, for callers post-processing the tree.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Fragment node at the top of the page.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// First element of the page, normally `<html>`.
    pub fn root_element(&self) -> Option<NodeId> {
        self.document.first_element_child(self.root)
    }

    /// `<head>` directly under the root element.
    pub fn head(&self) -> Option<NodeId> {
        self.document.top_element(self.root, "HEAD")
    }

    /// `<body>` directly under the root element.
    pub fn body(&self) -> Option<NodeId> {
        self.document.top_element(self.root, "BODY")
    }

    /// Buffers loaded during the run, in load order.
    pub fn sources(&self) -> &SourceStore {
        &self.sources
    }

    /// Files a cache of this page must watch.
    pub fn dependencies(&self) -> Vec<&str> {
        self.sources.dependencies()
    }

    /// Whether a disk file behind this page changed after `since`.
    pub fn is_stale(&self, since: SystemTime) -> bool {
        self.sources.is_stale(since)
    }

    /// File, line and column of `span`.
    pub fn source_pos(&self, span: &Span) -> Option<SourcePos> {
        self.sources.resolve(span)
    }

    /// Serialized page.
    pub fn markup(&self, options: &SerializeOptions) -> String {
        self.document.markup(self.root, options)
    }

    /// Appends `<script id="weft-props" type="text/json">` holding `payload` to the
    /// body, followed by a newline. Returns `None` when the page has no body.
    pub fn append_props_script(&mut self, payload: &str) -> Option<NodeId> {
        let body = self.body()?;
        let span = Span::synthetic(self.document.span(body).origin);
        let script = self.document.create_element("script", span);
        self.document.set_attribute(script, "id", PROPS_SCRIPT_ID);
        self.document.set_attribute(script, "type", "text/json");
        let text = self.document.create_text(payload, span);
        self.document.append_child(script, text);
        self.document.append_child(body, script);
        let newline = self.document.create_text("\n", span);
        self.document.append_child(body, newline);
        self.document.join_adjacent_texts(body);
        Some(script)
    }
}

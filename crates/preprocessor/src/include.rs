//! `:INCLUDE` / `:IMPORT` expansion.

use std::path::Path;

use log::debug;
use weft_core::{NodeId, parse_attr_token, tokenize_attrs};

use crate::directives::{IMPORT_TAG, INCLUDE_AS, INCLUDE_SRC, INCLUDE_TAG};
use crate::error::PreprocessError;
use crate::preprocessor::Preprocessor;

impl Preprocessor {
    /// Replaces every include directive under `root` with the content it names.
    ///
    /// Included modules resolve their own directives while loading, so one scan of
    /// `root` is enough.
    pub(crate) fn process_includes(
        &mut self,
        root: NodeId,
        current_dir: &Path,
        nesting: usize,
    ) -> Result<(), PreprocessError> {
        for directive in self.doc.lookup_tags(root, &[INCLUDE_TAG, IMPORT_TAG]) {
            let src = self
                .doc
                .get_attribute(directive, INCLUDE_SRC)
                .map(str::trim)
                .filter(|src| !src.is_empty())
                .map(str::to_string);
            let Some(src) = src else {
                return Err(PreprocessError::MissingAttribute {
                    attribute: INCLUDE_SRC,
                    location: self.locate(directive),
                });
            };
            let embed_as = self
                .doc
                .get_attribute(directive, INCLUDE_AS)
                .filter(|shape| !shape.trim().is_empty())
                .map(str::to_string);
            let once = self.doc.has_tag(directive, IMPORT_TAG);
            self.process_include(directive, &src, once, current_dir, nesting, embed_as.as_deref())?;
        }
        Ok(())
    }

    fn process_include(
        &mut self,
        directive: NodeId,
        src: &str,
        once: bool,
        current_dir: &Path,
        nesting: usize,
        embed_as: Option<&str>,
    ) -> Result<(), PreprocessError> {
        let Some(parent) = self.doc.parent(directive) else {
            return Ok(());
        };
        let before = self.doc.next_sibling(directive);
        self.doc.remove(directive);

        let loaded = self.load(src, current_dir, nesting + 1, once, directive)?;
        if let Some(content) = loaded.and_then(|fragment| self.doc.first_element_child(fragment)) {
            match embed_as {
                Some(shape) => self.embed(content, parent, before, shape),
                None => self.include(content, parent, before),
            }
        }
        self.doc.join_adjacent_texts(parent);
        Ok(())
    }

    /// Wraps the leading text of `content` in a new element described by `shape`,
    /// e.g. `style media="print"`, and inserts it before `before`.
    fn embed(&mut self, content: NodeId, parent: NodeId, before: Option<NodeId>, shape: &str) {
        let mut tokens = tokenize_attrs(shape).into_iter();
        let Some(name) = tokens.next() else {
            return;
        };
        let Some(text) = self
            .doc
            .first_child(content)
            .filter(|&first| self.doc.is_text(first))
        else {
            debug!("Nothing to embed as <{name}>: content does not start with text");
            return;
        };
        let element = self.doc.create_element(name, self.doc.span(text));
        self.doc.append_child(element, text);
        self.doc.insert_before(parent, element, before);
        for (key, value) in tokens.filter_map(parse_attr_token) {
            self.doc.set_attribute(element, key, value);
        }
    }

    /// Moves the children of `content` before `before` and cascades its attributes
    /// onto `parent` where `parent` lacks them.
    pub(crate) fn include(&mut self, content: NodeId, parent: NodeId, before: Option<NodeId>) {
        for child in self.doc.remove_children(content) {
            self.doc.insert_before(parent, child, before);
        }
        for attribute in self.doc.attributes(content).to_vec() {
            if !self.doc.has_attribute(parent, &attribute.name) {
                self.doc.put_attribute(parent, attribute);
            }
        }
    }
}

//! Custom-tag macros: `:DEFINE` collection, expansion and slot projection.
//!
//! Definitions live in a flat registry. A definition extending another macro keeps
//! the index of the definition registered under its base name at the time it was
//! collected, so every inheritance chain points strictly backwards and cannot cycle.
//! Self-reference through content or later redefinition is still possible and is
//! stopped by the recursion ceiling.

use std::collections::HashMap;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use weft_core::{NodeId, Span};

use crate::directives::{
    DEFAULT_BASE_TAG, DEFAULT_SLOT, DEFINE_ARG, DEFINE_TAG, SLOT_ARG, SLOT_ATTR, SLOT_TAG,
};
use crate::error::PreprocessError;
use crate::preprocessor::Preprocessor;

static MACRO_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[_a-zA-Z0-9]+-[-:_a-zA-Z0-9]+$").unwrap());
static BASE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-_a-zA-Z0-9]+$").unwrap());

const BAD_TAG: &str = "Bad \"tag\" attribute (missing \"-\" in custom tag name)";
const BAD_SLOT_NAME: &str = "Bad/duplicated \"name\" attribute";

/// One collected `:DEFINE`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MacroDefinition {
    /// Uppercased tag the macro is invoked as, colon prefix included.
    pub name: String,
    /// Uppercased tag the macro renders as.
    pub base: String,
    /// Detached `:DEFINE` element holding the body and default attributes.
    pub body: NodeId,
    /// Registry index of the macro this one extends.
    pub extends: Option<usize>,
}

/// Per-run macro table.
#[derive(Clone, Debug, Default)]
pub struct MacroRegistry {
    definitions: Vec<MacroDefinition>,
    by_name: HashMap<String, usize>,
}

impl MacroRegistry {
    /// Adds a definition; a later definition of the same name shadows earlier ones.
    pub fn register(&mut self, definition: MacroDefinition) -> usize {
        let index = self.definitions.len();
        debug_assert!(definition.extends.is_none_or(|base| base < index));
        self.by_name.insert(definition.name.clone(), index);
        self.definitions.push(definition);
        index
    }

    /// Index of the definition currently registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Definition at `index`.
    pub fn definition(&self, index: usize) -> Option<&MacroDefinition> {
        self.definitions.get(index)
    }

    /// Number of definitions collected, shadowed ones included.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no definition was collected.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Splits a `tag` attribute into uppercased macro and base names.
///
/// `my-card` renders as `DIV`; `:my-card:section` keeps its colon prefix.
pub fn parse_macro_tag(tag: &str) -> Option<(String, String)> {
    let (prefix, rest) = match tag.strip_prefix(':') {
        Some(rest) => (":", rest),
        None => ("", tag),
    };
    let mut parts = rest.split(':');
    let name = parts.next().unwrap_or_default();
    let base = parts.next().unwrap_or(DEFAULT_BASE_TAG);
    if !MACRO_NAME.is_match(name) || !BASE_NAME.is_match(base) {
        return None;
    }
    Some((
        format!("{prefix}{}", name.to_ascii_uppercase()),
        base.to_ascii_uppercase(),
    ))
}

impl Preprocessor {
    /// Collects every `:DEFINE` under `root`, detaching it from the tree.
    pub(crate) fn collect_macros(&mut self, root: NodeId, nesting: usize) -> Result<(), PreprocessError> {
        for define in self.doc.lookup_tags(root, &[DEFINE_TAG]) {
            self.collect_macro(define, nesting)?;
        }
        Ok(())
    }

    fn collect_macro(&mut self, define: NodeId, nesting: usize) -> Result<(), PreprocessError> {
        let tag = self
            .doc
            .get_attribute(define, DEFINE_ARG)
            .map(str::trim)
            .filter(|tag| !tag.is_empty());
        let Some(tag) = tag else {
            return Err(PreprocessError::MissingAttribute {
                attribute: DEFINE_ARG,
                location: self.locate(define),
            });
        };
        let Some((name, base)) = parse_macro_tag(tag) else {
            return Err(PreprocessError::BadAttribute {
                message: BAD_TAG.to_string(),
                location: self.locate(define),
            });
        };

        if let Some(parent) = self.doc.parent(define) {
            self.doc.remove(define);
            self.doc.join_adjacent_texts(parent);
        }
        self.doc.remove_attribute(define, DEFINE_ARG);
        self.collect_macros(define, nesting)?;
        self.expand_macros(define, nesting)?;

        let extends = self.macros.lookup(&base);
        debug!("Registered macro {name} (base {base})");
        self.macros.register(MacroDefinition {
            name,
            base,
            body: define,
            extends,
        });
        Ok(())
    }

    /// Replaces every macro invocation under `parent`, recursing into other elements.
    pub(crate) fn expand_macros(&mut self, parent: NodeId, nesting: usize) -> Result<(), PreprocessError> {
        let mut replaced = false;
        for child in self.doc.children(parent).to_vec() {
            let Some(tag) = self.doc.tag_name(child) else {
                continue;
            };
            match self.macros.lookup(tag) {
                Some(index) => {
                    let instance = self.expand_macro(child, index, nesting)?;
                    if instance != child {
                        self.doc.insert_before(parent, instance, Some(child));
                        self.doc.remove(child);
                        replaced = true;
                    }
                }
                None => self.expand_macros(child, nesting)?,
            }
        }
        if replaced {
            self.doc.join_adjacent_texts(parent);
        }
        Ok(())
    }

    /// Builds the element replacing `use_site`, an invocation of macro `index`.
    fn expand_macro(
        &mut self,
        use_site: NodeId,
        index: usize,
        nesting: usize,
    ) -> Result<NodeId, PreprocessError> {
        if nesting >= self.config.max_recursions {
            return Err(PreprocessError::TooManyMacros {
                tag: self.doc.tag_name(use_site).unwrap_or_default().to_string(),
                location: self.locate(use_site),
            });
        }
        let Some(definition) = self.macros.definition(index).cloned() else {
            return Ok(use_site);
        };
        trace!("Expanding {} at nesting {}", definition.name, nesting);

        let span = self.doc.span(use_site);
        let instance = match definition.extends {
            Some(base) => {
                let carrier = self.instantiate(&definition, DEFINE_TAG, span);
                self.expand_macro(carrier, base, nesting + 1)?
            }
            None => self.instantiate(&definition, &definition.base, span),
        };
        self.populate_macro(use_site, instance, nesting)?;

        let tag = self.doc.tag_name(instance).unwrap_or_default();
        match self.macros.lookup(tag) {
            Some(next) => self.expand_macro(instance, next, nesting + 1),
            None => Ok(instance),
        }
    }

    /// Fresh `tag` element carrying a copy of the definition's attributes and body.
    fn instantiate(&mut self, definition: &MacroDefinition, tag: &str, span: Span) -> NodeId {
        let element = self.doc.create_element(tag, span);
        for attribute in self.doc.attributes(definition.body).to_vec() {
            self.doc.put_attribute(element, attribute);
        }
        for child in self.doc.children(definition.body).to_vec() {
            let copy = self.doc.deep_clone(child);
            self.doc.append_child(element, copy);
        }
        element
    }

    /// Copies invocation attributes onto `dst` and routes invocation children into
    /// the slots of `dst`.
    fn populate_macro(&mut self, src: NodeId, dst: NodeId, nesting: usize) -> Result<(), PreprocessError> {
        for attribute in self.doc.attributes(src).to_vec() {
            self.doc.put_attribute(dst, attribute);
        }
        let slots = self.collect_slots(dst)?;
        for child in self.doc.children(src).to_vec() {
            let name = self
                .doc
                .get_attribute(child, SLOT_ATTR)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_SLOT);
            let Some(&marker) = slots.get(name) else {
                return Err(PreprocessError::UnknownSlot {
                    name: name.to_string(),
                    location: self.locate(child),
                });
            };
            if let Some(holder) = self.doc.parent(marker) {
                self.doc.insert_before(holder, child, Some(marker));
            }
        }

        let mut markers: Vec<NodeId> = slots.into_values().collect();
        markers.sort();
        markers.dedup();
        for marker in markers {
            if let Some(holder) = self.doc.parent(marker) {
                self.doc.remove(marker);
                self.doc.join_adjacent_texts(holder);
            }
        }
        self.expand_macros(dst, nesting + 1)
    }

    /// Maps slot names to their markers inside `body`, synthesizing a trailing
    /// `default` slot when none is declared.
    fn collect_slots(&mut self, body: NodeId) -> Result<HashMap<String, NodeId>, PreprocessError> {
        let mut slots = HashMap::new();
        for marker in self.doc.lookup_tags(body, &[SLOT_TAG]) {
            let Some(names) = self.doc.get_attribute(marker, SLOT_ARG) else {
                return Err(PreprocessError::MissingAttribute {
                    attribute: SLOT_ARG,
                    location: self.locate(marker),
                });
            };
            for name in names.split(',').map(str::trim) {
                if name.is_empty() || slots.contains_key(name) {
                    return Err(PreprocessError::BadAttribute {
                        message: BAD_SLOT_NAME.to_string(),
                        location: self.locate(marker),
                    });
                }
                slots.insert(name.to_string(), marker);
            }
        }
        if !slots.contains_key(DEFAULT_SLOT) {
            let marker = self.doc.create_element(SLOT_TAG, self.doc.span(body));
            self.doc.set_attribute(marker, SLOT_ARG, DEFAULT_SLOT);
            self.doc.append_child(body, marker);
            slots.insert(DEFAULT_SLOT.to_string(), marker);
        }
        Ok(slots)
    }
}

//! Arena-backed mutable markup tree.
//!
//! Every node created during one preprocessing run lives in a single [`Document`]
//! and is addressed by a [`NodeId`]. Children are kept as ordered index lists, so
//! splicing is done by resolving a sibling's position at insert time rather than
//! holding live sibling references. Detached nodes stay in the arena until the
//! document is dropped.

use crate::span::Span;

/// Handle to a node in a [`Document`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single element attribute with optional provenance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    /// Attribute name, case preserved.
    pub name: String,
    /// Raw value; `None` for a bare attribute such as `<input disabled>`.
    pub value: Option<String>,
    /// Quote character used in the source, if any.
    pub quote: Option<char>,
    /// Location of the name in its source buffer.
    pub name_span: Option<Span>,
    /// Location of the value in its source buffer.
    pub value_span: Option<Span>,
}

impl Attribute {
    /// Attribute without provenance, emitted with double quotes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            quote: Some('"'),
            name_span: None,
            value_span: None,
        }
    }

    /// Value of the attribute, empty for bare attributes.
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Element payload: uppercased tag name plus attributes in emission order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Element {
    /// ASCII-uppercased tag name.
    pub name: String,
    /// Attributes in source order.
    pub attributes: Vec<Attribute>,
}

/// What a node is.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// Parentless container produced by parsing (document or fragment root).
    Fragment,
    /// Markup element.
    Element(Element),
    /// Raw text, emitted verbatim.
    Text(String),
    /// `<!-- ... -->` body.
    Comment(String),
    /// `<!...>` declaration body, e.g. `DOCTYPE html`.
    Doctype(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    span: Span,
}

/// Owner of every node of one run.
#[derive(Clone, Debug, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever allocated, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node was allocated yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            span,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Creates a detached container node.
    pub fn create_fragment(&mut self, span: Span) -> NodeId {
        self.push(NodeKind::Fragment, span)
    }

    /// Creates a detached element; the name is ASCII-uppercased.
    pub fn create_element(&mut self, name: &str, span: Span) -> NodeId {
        self.push(
            NodeKind::Element(Element {
                name: name.to_ascii_uppercase(),
                attributes: Vec::new(),
            }),
            span,
        )
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>, span: Span) -> NodeId {
        self.push(NodeKind::Text(text.into()), span)
    }

    /// Creates a detached comment node.
    pub fn create_comment(&mut self, text: impl Into<String>, span: Span) -> NodeId {
        self.push(NodeKind::Comment(text.into()), span)
    }

    /// Creates a detached `<!...>` declaration node.
    pub fn create_doctype(&mut self, text: impl Into<String>, span: Span) -> NodeId {
        self.push(NodeKind::Doctype(text.into()), span)
    }

    /// Kind of `id`.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Whether `id` is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    /// Whether `id` is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    /// Uppercased tag name of an element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(e) => Some(e.name.as_str()),
            _ => None,
        }
    }

    /// Whether `id` is an element named `name` (uppercase).
    pub fn has_tag(&self, id: NodeId, name: &str) -> bool {
        self.tag_name(id) == Some(name)
    }

    /// Source span of `id`.
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span
    }

    /// Overwrites the span of `id`.
    pub fn set_span(&mut self, id: NodeId, span: Span) {
        self.nodes[id.0].span = span;
    }

    /// Parent of `id`, if attached.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of `id` in order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// First child of `id`.
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    /// First element child of `id`.
    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.is_element(c))
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Sibling following `id`.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == candidate {
                return true;
            }
            match self.parent(node) {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    /// Appends `child` to `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Inserts `child` into `parent` before `before`.
    ///
    /// `before` is looked up when inserting; `None`, or a node that is not a child of
    /// `parent`, appends. Inserting a node into its own subtree is ignored.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        if self.is_ancestor_or_self(child, parent) {
            debug_assert!(false, "cannot insert a node into its own subtree");
            return;
        }
        self.remove(child);
        let index = before
            .filter(|&b| b != child)
            .and_then(|b| self.children(parent).iter().position(|&c| c == b))
            .unwrap_or(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Detaches `id` from its parent and returns it.
    pub fn remove(&mut self, id: NodeId) -> NodeId {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
        id
    }

    /// Detaches and returns every child of `id`.
    pub fn remove_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for &c in &children {
            self.nodes[c.0].parent = None;
        }
        children
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Attributes of an element (empty for other nodes).
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map_or(&[], |e| e.attributes.as_slice())
    }

    /// Attribute `name` of an element.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&Attribute> {
        self.attributes(id).iter().find(|a| a.name == name)
    }

    /// Value of attribute `name`; bare attributes read as the empty string.
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute(id, name).map(Attribute::value_str)
    }

    /// Whether the element has attribute `name`.
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Sets attribute `name` to `value`, dropping any value provenance.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => {
                existing.value = Some(value.to_string());
                existing.quote.get_or_insert('"');
                existing.value_span = None;
            }
            None => element.attributes.push(Attribute::new(name, value)),
        }
    }

    /// Stores `attribute`, replacing a same-named one in place.
    pub fn put_attribute(&mut self, id: NodeId, attribute: Attribute) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        match element
            .attributes
            .iter_mut()
            .find(|a| a.name == attribute.name)
        {
            Some(existing) => *existing = attribute,
            None => element.attributes.push(attribute),
        }
    }

    /// Removes attribute `name`, returning it.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<Attribute> {
        let element = self.element_mut(id)?;
        let index = element.attributes.iter().position(|a| a.name == name)?;
        Some(element.attributes.remove(index))
    }

    /// Appends `class` to the element's class list unless already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let current = self.get_attribute(id, "class").unwrap_or("").to_string();
        if current.split_whitespace().any(|c| c == class) {
            return;
        }
        let value = if current.trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {}", current.trim(), class)
        };
        self.set_attribute(id, "class", &value);
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Replaces the text of a text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(t) = &mut self.nodes[id.0].kind {
            *t = text.into();
        }
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element(_) | NodeKind::Fragment => {
                for &c in self.children(id) {
                    self.collect_text(c, out);
                }
            }
            _ => {}
        }
    }

    /// Detached deep copy of `id`; spans and attribute provenance are kept.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.0].kind.clone();
        let span = self.nodes[id.0].span;
        let copy = self.push(kind, span);
        for child in self.nodes[id.0].children.clone() {
            let child_copy = self.deep_clone(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Overwrites the span of `id`, its descendants, and their attributes.
    pub fn restamp(&mut self, id: NodeId, span: Span) {
        self.nodes[id.0].span = span;
        if let NodeKind::Element(e) = &mut self.nodes[id.0].kind {
            for a in &mut e.attributes {
                a.name_span = Some(span);
                a.value_span = a.value.as_ref().map(|_| span);
            }
        }
        for child in self.nodes[id.0].children.clone() {
            self.restamp(child, span);
        }
    }

    /// Merges runs of adjacent text children of `parent` into single nodes.
    pub fn join_adjacent_texts(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        let mut joined: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            let previous = joined.last().copied().filter(|&p| self.is_text(p));
            match (previous, self.text(child).map(str::to_string)) {
                (Some(prev), Some(text)) => {
                    let merged = self.nodes[prev.0].span.merge(&self.nodes[child.0].span);
                    if let NodeKind::Text(t) = &mut self.nodes[prev.0].kind {
                        t.push_str(&text);
                    }
                    self.nodes[prev.0].span = merged;
                    self.nodes[child.0].parent = None;
                }
                _ => joined.push(child),
            }
        }
        self.nodes[parent.0].children = joined;
    }

    /// Elements under `root` whose tag is in `names`, in document order.
    ///
    /// The search does not descend into matched elements.
    pub fn lookup_tags(&self, root: NodeId, names: &[&str]) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.lookup_into(root, names, &mut found);
        found
    }

    fn lookup_into(&self, parent: NodeId, names: &[&str], found: &mut Vec<NodeId>) {
        for &child in self.children(parent) {
            if let Some(tag) = self.tag_name(child) {
                if names.contains(&tag) {
                    found.push(child);
                } else {
                    self.lookup_into(child, names, found);
                }
            }
        }
    }

    /// Direct child named `name` of the first element under `root`.
    pub fn top_element(&self, root: NodeId, name: &str) -> Option<NodeId> {
        let top = self.first_element_child(root)?;
        self.children(top)
            .iter()
            .copied()
            .find(|&c| self.has_tag(c, name))
    }

    /// Every node below `root` in pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::synthetic(0)
    }

    fn names(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| {
                doc.tag_name(id)
                    .map(str::to_string)
                    .or_else(|| doc.text(id).map(|t| format!("#{t}")))
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn element_names_are_uppercased() {
        let mut doc = Document::new();
        let e = doc.create_element("my-Tag", span());
        assert_eq!(doc.tag_name(e), Some("MY-TAG"));
        assert!(doc.has_tag(e, "MY-TAG"));
    }

    #[test]
    fn insert_before_resolves_sibling_at_insert_time() {
        let mut doc = Document::new();
        let root = doc.create_fragment(span());
        let a = doc.create_element("a", span());
        let b = doc.create_element("b", span());
        let c = doc.create_element("c", span());
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.insert_before(root, c, Some(b));
        assert_eq!(names(&doc, doc.children(root)), ["A", "C", "B"]);

        // moving an attached node detaches it from its old position
        doc.insert_before(root, b, Some(a));
        assert_eq!(names(&doc, doc.children(root)), ["B", "A", "C"]);

        let stray = doc.create_element("x", span());
        let d = doc.create_element("d", span());
        doc.insert_before(root, d, Some(stray));
        assert_eq!(doc.children(root).last(), Some(&d));
        assert_eq!(doc.next_sibling(a), Some(c));
    }

    #[test]
    fn remove_detaches() {
        let mut doc = Document::new();
        let root = doc.create_fragment(span());
        let a = doc.create_element("a", span());
        doc.append_child(root, a);
        doc.remove(a);
        assert!(doc.children(root).is_empty());
        assert_eq!(doc.parent(a), None);
    }

    #[test]
    fn attributes_replace_in_place() {
        let mut doc = Document::new();
        let e = doc.create_element("div", span());
        doc.set_attribute(e, "a", "1");
        doc.set_attribute(e, "b", "2");
        doc.set_attribute(e, "a", "3");
        let names: Vec<_> = doc.attributes(e).iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(doc.get_attribute(e, "a"), Some("3"));
        assert_eq!(doc.remove_attribute(e, "b").map(|a| a.name), Some("b".into()));
        assert!(!doc.has_attribute(e, "b"));
    }

    #[test]
    fn add_class_appends_once() {
        let mut doc = Document::new();
        let e = doc.create_element("div", span());
        doc.add_class(e, "a");
        doc.add_class(e, "b");
        doc.add_class(e, "a");
        assert_eq!(doc.get_attribute(e, "class"), Some("a b"));
    }

    #[test]
    fn join_adjacent_texts_merges_runs() {
        let mut doc = Document::new();
        let root = doc.create_fragment(span());
        let t1 = doc.create_text("a", Span::new(0, 0, 1).unwrap());
        let t2 = doc.create_text("b", Span::new(0, 1, 2).unwrap());
        let e = doc.create_element("br", span());
        let t3 = doc.create_text("c", span());
        for n in [t1, t2, e, t3] {
            doc.append_child(root, n);
        }
        doc.join_adjacent_texts(root);
        assert_eq!(names(&doc, doc.children(root)), ["#ab", "BR", "#c"]);
        assert_eq!(doc.span(t1), Span::new(0, 0, 2).unwrap());
        assert_eq!(doc.parent(t2), None);
    }

    #[test]
    fn deep_clone_copies_subtree() {
        let mut doc = Document::new();
        let e = doc.create_element("div", Span::new(2, 3, 9).unwrap());
        let t = doc.create_text("hi", span());
        doc.append_child(e, t);
        doc.set_attribute(e, "x", "1");
        let copy = doc.deep_clone(e);
        assert_ne!(copy, e);
        assert_eq!(doc.span(copy), doc.span(e));
        assert_eq!(doc.get_attribute(copy, "x"), Some("1"));
        assert_eq!(doc.text_content(copy), "hi");
        doc.set_text(t, "changed");
        assert_eq!(doc.text_content(copy), "hi");
    }

    #[test]
    fn lookup_tags_does_not_descend_into_matches() {
        let mut doc = Document::new();
        let root = doc.create_fragment(span());
        let outer = doc.create_element(":slot", span());
        let inner = doc.create_element(":slot", span());
        let wrapper = doc.create_element("div", span());
        let other = doc.create_element(":slot", span());
        doc.append_child(root, outer);
        doc.append_child(outer, inner);
        doc.append_child(root, wrapper);
        doc.append_child(wrapper, other);
        assert_eq!(doc.lookup_tags(root, &[":SLOT"]), vec![outer, other]);
    }

    #[test]
    fn descendants_are_preorder() {
        let mut doc = Document::new();
        let root = doc.create_fragment(span());
        let a = doc.create_element("a", span());
        let b = doc.create_element("b", span());
        let c = doc.create_element("c", span());
        doc.append_child(root, a);
        doc.append_child(a, b);
        doc.append_child(root, c);
        assert_eq!(doc.descendants(root), vec![a, b, c]);
    }
}

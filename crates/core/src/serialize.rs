//! Markup serialization of document subtrees.

use std::borrow::Cow;

use crate::dom::{Attribute, Document, NodeId, NodeKind};
use crate::parser::VOID_ELEMENTS;

/// Elements whose text is emitted untouched even when normalizing.
const PRESERVE_WHITESPACE: &[&str] = &["PRE", "SCRIPT", "STYLE", "TEXTAREA"];

/// Options for [`Document::markup`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SerializeOptions {
    /// Collapse whitespace runs in text outside whitespace-sensitive elements.
    pub normalize_whitespace: bool,
}

impl Document {
    /// Markup of `id` itself and its subtree.
    pub fn markup(&self, id: NodeId, options: &SerializeOptions) -> String {
        let mut out = String::new();
        self.write_node(id, options, false, &mut out);
        out
    }

    /// Markup of the children of `id`.
    pub fn inner_markup(&self, id: NodeId, options: &SerializeOptions) -> String {
        let preserve = self
            .tag_name(id)
            .is_some_and(|name| PRESERVE_WHITESPACE.contains(&name));
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, options, preserve, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, options: &SerializeOptions, preserve: bool, out: &mut String) {
        match self.kind(id) {
            NodeKind::Fragment => {
                for &child in self.children(id) {
                    self.write_node(child, options, preserve, out);
                }
            }
            NodeKind::Text(text) => {
                if options.normalize_whitespace && !preserve {
                    out.push_str(&normalize_whitespace(text));
                } else {
                    out.push_str(text);
                }
            }
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Doctype(text) => {
                out.push_str("<!");
                out.push_str(text);
                out.push('>');
            }
            NodeKind::Element(element) => {
                let name = element.name.to_ascii_lowercase();
                out.push('<');
                out.push_str(&name);
                for attribute in &element.attributes {
                    out.push(' ');
                    write_attribute(attribute, out);
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    return;
                }
                let preserve = preserve || PRESERVE_WHITESPACE.contains(&element.name.as_str());
                for &child in self.children(id) {
                    self.write_node(child, options, preserve, out);
                }
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
        }
    }
}

fn write_attribute(attribute: &Attribute, out: &mut String) {
    out.push_str(&attribute.name);
    let Some(value) = attribute.value.as_deref() else {
        return;
    };
    out.push('=');

    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '=' | '<' | '>' | '`'));
    let quote = match attribute.quote {
        None if !needs_quotes => {
            out.push_str(value);
            return;
        }
        Some('\'') => '\'',
        _ => '"',
    };

    let (quote, value) = if !value.contains(quote) {
        (quote, Cow::Borrowed(value))
    } else {
        let other = if quote == '"' { '\'' } else { '"' };
        if value.contains(other) {
            ('"', html_escape::encode_double_quoted_attribute(value))
        } else {
            (other, Cow::Borrowed(value))
        }
    };
    out.push(quote);
    out.push_str(&value);
    out.push(quote);
}

/// Collapses whitespace: a run containing a newline becomes `\n`, any other run of
/// two or more characters becomes a single space.
pub fn normalize_whitespace(text: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if !c.is_whitespace() {
            out.push(c);
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }
        let run = &text[start..end];
        let replacement = if run.contains('\n') {
            "\n"
        } else if run.chars().count() > 1 {
            " "
        } else {
            run
        };
        changed |= replacement != run;
        out.push_str(replacement);
    }
    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn roundtrip(text: &str, normalize_whitespace: bool) -> String {
        let mut doc = Document::new();
        let root = parse(&mut doc, text, 0).unwrap();
        doc.markup(root, &SerializeOptions { normalize_whitespace })
    }

    #[test]
    fn markup_reproduces_well_formed_input() {
        let text = "<!DOCTYPE html><html><body class='x' hidden><p>a &amp; b</p><br><!-- c --></body></html>";
        assert_eq!(roundtrip(text, false), text);
    }

    #[test]
    fn self_closing_elements_get_end_tags() {
        assert_eq!(roundtrip("<lib><b/></lib>", false), "<lib><b></b></lib>");
    }

    #[test]
    fn whitespace_normalization() {
        assert_eq!(normalize_whitespace("a  b\t \n  c d"), "a b\nc d");
        assert!(matches!(normalize_whitespace("a b"), Cow::Borrowed(_)));
        assert_eq!(
            roundtrip("<div>a   b\n\n</div><pre>a   b\n\n</pre>", true),
            "<div>a b\n</div><pre>a   b\n\n</pre>"
        );
    }

    #[test]
    fn implicitly_closed_list_items() {
        insta::assert_snapshot!(roundtrip("<ul>\n  <li>one\n  <li>two\n</ul>", true), @r"
        <ul>
        <li>one
        </li><li>two
        </li></ul>
        ");
    }

    #[test]
    fn attribute_quotes_adapt_to_values() {
        let mut doc = Document::new();
        let e = doc.create_element("div", crate::Span::default());
        doc.set_attribute(e, "title", "say \"hi\"");
        doc.set_attribute(e, "data-x", "it's \"both\"");
        doc.put_attribute(
            e,
            Attribute {
                name: "n".into(),
                value: Some("3".into()),
                quote: None,
                name_span: None,
                value_span: None,
            },
        );
        assert_eq!(
            doc.markup(e, &SerializeOptions::default()),
            r#"<div title='say "hi"' data-x="it's &quot;both&quot;" n=3></div>"#
        );
    }

    #[test]
    fn inner_markup_skips_the_element() {
        let mut doc = Document::new();
        let root = parse(&mut doc, "<section><p>x</p>\n</section>", 0).unwrap();
        let section = doc.first_element_child(root).unwrap();
        assert_eq!(doc.inner_markup(section, &SerializeOptions::default()), "<p>x</p>\n");
    }
}

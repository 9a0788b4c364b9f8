//! Forgiving HTML parser producing span-annotated nodes.
//!
//! The parser builds into an existing [`Document`] so fragments loaded from
//! different files share one arena. Every node and attribute carries a span in the
//! buffer identified by the `origin` passed to [`parse`].

use thiserror::Error;

use crate::dom::{Attribute, Document, NodeId};
use crate::span::{Origin, Span};

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "AREA", "BASE", "BR", "COL", "EMBED", "HR", "IMG", "INPUT", "LINK", "META", "PARAM", "SOURCE",
    "TRACK", "WBR",
];

/// Elements whose content is kept as a single unparsed text node.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["SCRIPT", "STYLE", "TEXTAREA", "TITLE"];

/// Elements whose end tag may be omitted.
const OPTIONAL_END: &[&str] = &[
    "HTML", "HEAD", "BODY", "P", "LI", "DT", "DD", "OPTION", "COLGROUP", "THEAD", "TBODY", "TFOOT",
    "TR", "TD", "TH",
];

/// Starts of these elements implicitly close an open `<p>`.
const CLOSES_P: &[&str] = &[
    "ADDRESS", "ARTICLE", "ASIDE", "BLOCKQUOTE", "DIV", "DL", "FIELDSET", "FOOTER", "FORM", "H1",
    "H2", "H3", "H4", "H5", "H6", "HEADER", "HR", "MAIN", "NAV", "OL", "P", "PRE", "SECTION",
    "TABLE", "UL",
];

/// Malformed markup.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// Human-readable description.
    pub message: String,
    /// Buffer being parsed.
    pub origin: Origin,
    /// Byte offset where the problem was detected.
    pub offset: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, origin: Origin, offset: usize) -> Self {
        Self {
            message: message.into(),
            origin,
            offset,
        }
    }

    /// Empty span at the error offset.
    pub fn span(&self) -> Span {
        Span {
            origin: self.origin,
            start: self.offset,
            end: self.offset,
        }
    }
}

/// Parses `text` into a new detached fragment of `doc`.
pub fn parse(doc: &mut Document, text: &str, origin: Origin) -> Result<NodeId, ParseError> {
    let root = doc.create_fragment(Span {
        origin,
        start: 0,
        end: text.len(),
    });
    let mut parser = Parser {
        doc,
        text,
        origin,
        pos: 0,
        root,
        stack: vec![root],
    };
    parser.run()?;
    Ok(root)
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b':' || b == b'_'
}

fn implicitly_closes(open: &str, incoming: &str) -> bool {
    match open {
        "P" => CLOSES_P.contains(&incoming),
        "LI" => incoming == "LI",
        "DT" | "DD" => matches!(incoming, "DT" | "DD"),
        "OPTION" => incoming == "OPTION",
        "TR" => incoming == "TR",
        "TD" | "TH" => matches!(incoming, "TD" | "TH" | "TR"),
        _ => false,
    }
}

struct Parser<'a> {
    doc: &'a mut Document,
    text: &'a str,
    origin: Origin,
    pos: usize,
    root: NodeId,
    stack: Vec<NodeId>,
}

impl Parser<'_> {
    fn span(&self, start: usize, end: usize) -> Span {
        Span {
            origin: self.origin,
            start,
            end,
        }
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> ParseError {
        ParseError::new(message, self.origin, offset)
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.text.as_bytes().get(at).copied()
    }

    fn scan_while(&self, from: usize, pred: impl Fn(u8) -> bool) -> usize {
        let bytes = self.text.as_bytes();
        let mut i = from;
        while i < bytes.len() && pred(bytes[i]) {
            i += 1;
        }
        i
    }

    fn top(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.root)
    }

    fn run(&mut self) -> Result<(), ParseError> {
        let mut text_start = 0;
        while let Some(rel) = self.text[self.pos..].find('<') {
            let lt = self.pos + rel;
            let next = self.byte(lt + 1);
            let rest = &self.text[lt..];
            let is_markup = rest.starts_with("<!")
                || next.is_some_and(is_name_start)
                || (next == Some(b'/') && self.byte(lt + 2).is_some_and(is_name_start));
            if !is_markup {
                self.pos = lt + 1;
                continue;
            }
            self.flush_text(text_start, lt);
            if rest.starts_with("<!--") {
                self.comment(lt)?;
            } else if rest.starts_with("<!") {
                self.declaration(lt)?;
            } else if next == Some(b'/') {
                self.close_tag(lt)?;
            } else {
                self.open_tag(lt)?;
            }
            text_start = self.pos;
        }
        self.flush_text(text_start, self.text.len());
        self.pos = self.text.len();
        self.finish()
    }

    fn flush_text(&mut self, start: usize, end: usize) {
        if end > start {
            let node = self
                .doc
                .create_text(&self.text[start..end], self.span(start, end));
            let top = self.top();
            self.doc.append_child(top, node);
        }
    }

    fn comment(&mut self, lt: usize) -> Result<(), ParseError> {
        let body = lt + 4;
        let Some(rel) = self.text[body..].find("-->") else {
            return Err(self.error("Unterminated comment", lt));
        };
        let end = body + rel + 3;
        let node = self
            .doc
            .create_comment(&self.text[body..body + rel], self.span(lt, end));
        let top = self.top();
        self.doc.append_child(top, node);
        self.pos = end;
        Ok(())
    }

    fn declaration(&mut self, lt: usize) -> Result<(), ParseError> {
        let body = lt + 2;
        let Some(rel) = self.text[body..].find('>') else {
            return Err(self.error("Unterminated declaration", lt));
        };
        let end = body + rel + 1;
        let node = self
            .doc
            .create_doctype(&self.text[body..body + rel], self.span(lt, end));
        let top = self.top();
        self.doc.append_child(top, node);
        self.pos = end;
        Ok(())
    }

    fn close_tag(&mut self, lt: usize) -> Result<(), ParseError> {
        let name_start = lt + 2;
        let name_end = self.scan_while(name_start, |b| !b.is_ascii_whitespace() && b != b'>');
        let name = self.text[name_start..name_end].to_ascii_uppercase();
        let Some(rel) = self.text[name_end..].find('>') else {
            return Err(self.error(format!("Unterminated tag </{}>", name.to_ascii_lowercase()), lt));
        };
        let end = name_end + rel + 1;
        self.pos = end;

        let open = self
            .stack
            .iter()
            .rposition(|&id| self.doc.has_tag(id, &name))
            .filter(|&i| i > 0);
        let Some(index) = open else {
            if OPTIONAL_END.contains(&name.as_str()) {
                return Ok(());
            }
            return Err(self.error(
                format!("Unexpected closing tag </{}>", name.to_ascii_lowercase()),
                lt,
            ));
        };
        for inner in self.stack.split_off(index + 1).into_iter().rev() {
            self.end_implicitly(inner, lt)?;
        }
        let element = self.stack[index];
        self.stack.truncate(index);
        let start = self.doc.span(element).start;
        self.doc.set_span(element, self.span(start, end));
        Ok(())
    }

    fn end_implicitly(&mut self, element: NodeId, at: usize) -> Result<(), ParseError> {
        let name = self.doc.tag_name(element).unwrap_or_default();
        if !OPTIONAL_END.contains(&name) {
            let start = self.doc.span(element).start;
            return Err(self.error(
                format!("Unclosed element <{}>", name.to_ascii_lowercase()),
                start,
            ));
        }
        let start = self.doc.span(element).start;
        self.doc.set_span(element, self.span(start, at));
        Ok(())
    }

    fn open_tag(&mut self, lt: usize) -> Result<(), ParseError> {
        let name_start = lt + 1;
        let name_end = self.scan_while(name_start, |b| {
            !b.is_ascii_whitespace() && b != b'/' && b != b'>'
        });
        let raw_name = &self.text[name_start..name_end];
        let element = self.doc.create_element(raw_name, self.span(lt, name_end));
        let name = raw_name.to_ascii_uppercase();
        self.pos = name_end;

        let self_closing = self.attributes(element, lt, &name)?;
        self.doc.set_span(element, self.span(lt, self.pos));

        while let Some(&top) = self.stack.last() {
            let closes = self
                .doc
                .tag_name(top)
                .is_some_and(|open| implicitly_closes(open, &name));
            if !closes || self.stack.len() == 1 {
                break;
            }
            self.stack.pop();
            self.end_implicitly(top, lt)?;
        }
        let top = self.top();
        self.doc.append_child(top, element);

        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            return Ok(());
        }
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            return self.raw_text(element, lt, &name);
        }
        self.stack.push(element);
        Ok(())
    }

    /// Reads attributes up to the end of the start tag; returns whether it was `/>`.
    fn attributes(&mut self, element: NodeId, lt: usize, name: &str) -> Result<bool, ParseError> {
        loop {
            self.pos = self.scan_while(self.pos, |b| b.is_ascii_whitespace());
            match self.byte(self.pos) {
                None => {
                    return Err(self.error(
                        format!("Unterminated tag <{}>", name.to_ascii_lowercase()),
                        lt,
                    ));
                }
                Some(b'>') => {
                    self.pos += 1;
                    return Ok(false);
                }
                Some(b'/') if self.byte(self.pos + 1) == Some(b'>') => {
                    self.pos += 2;
                    return Ok(true);
                }
                Some(b'/') | Some(b'=') => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => {}
            }

            let name_start = self.pos;
            let name_end = self.scan_while(name_start, |b| {
                !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/')
            });
            let mut attribute = Attribute {
                name: self.text[name_start..name_end].to_string(),
                value: None,
                quote: None,
                name_span: Some(self.span(name_start, name_end)),
                value_span: None,
            };
            self.pos = name_end;

            let after = self.scan_while(self.pos, |b| b.is_ascii_whitespace());
            if self.byte(after) == Some(b'=') {
                let value_start = self.scan_while(after + 1, |b| b.is_ascii_whitespace());
                match self.byte(value_start) {
                    Some(q @ (b'"' | b'\'')) => {
                        let inner = value_start + 1;
                        let Some(rel) = self.text[inner..].find(q as char) else {
                            return Err(self.error("Unterminated attribute value", value_start));
                        };
                        attribute.value = Some(self.text[inner..inner + rel].to_string());
                        attribute.quote = Some(q as char);
                        attribute.value_span = Some(self.span(inner, inner + rel));
                        self.pos = inner + rel + 1;
                    }
                    _ => {
                        let value_end =
                            self.scan_while(value_start, |b| !b.is_ascii_whitespace() && b != b'>');
                        attribute.value = Some(self.text[value_start..value_end].to_string());
                        attribute.value_span = Some(self.span(value_start, value_end));
                        self.pos = value_end;
                    }
                }
            }

            if !self.doc.has_attribute(element, &attribute.name) {
                self.doc.put_attribute(element, attribute);
            }
        }
    }

    fn raw_text(&mut self, element: NodeId, lt: usize, name: &str) -> Result<(), ParseError> {
        let needle = format!("</{}", name.to_ascii_lowercase());
        let close = self.text[self.pos..]
            .as_bytes()
            .windows(needle.len())
            .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
            .map(|rel| self.pos + rel);
        let Some(close) = close else {
            return Err(self.error(
                format!("Unclosed element <{}>", name.to_ascii_lowercase()),
                lt,
            ));
        };
        if close > self.pos {
            let node = self
                .doc
                .create_text(&self.text[self.pos..close], self.span(self.pos, close));
            self.doc.append_child(element, node);
        }
        let Some(rel) = self.text[close..].find('>') else {
            return Err(self.error(
                format!("Unterminated tag </{}>", name.to_ascii_lowercase()),
                close,
            ));
        };
        self.pos = close + rel + 1;
        self.doc.set_span(element, self.span(lt, self.pos));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        let end = self.text.len();
        for element in self.stack.split_off(1).into_iter().rev() {
            self.end_implicitly(element, end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(text: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = parse(&mut doc, text, 0).unwrap();
        (doc, root)
    }

    fn parse_err(text: &str) -> ParseError {
        let mut doc = Document::new();
        parse(&mut doc, text, 0).unwrap_err()
    }

    #[test]
    fn elements_text_and_spans() {
        let text = "<a>\n<b/></a>";
        let (doc, root) = parse_one(text);
        let a = doc.first_element_child(root).unwrap();
        assert_eq!(doc.tag_name(a), Some("A"));
        assert_eq!(doc.span(a), Span::new(0, 0, 12).unwrap());
        let b = doc.first_element_child(a).unwrap();
        assert_eq!(doc.span(b), Span::new(0, 4, 8).unwrap());
        assert_eq!(doc.text(doc.first_child(a).unwrap()), Some("\n"));
    }

    #[test]
    fn attribute_forms_and_spans() {
        let text = r#"<div id="x" class='a b' hidden data-n=3 :slot="head"></div>"#;
        let (doc, root) = parse_one(text);
        let div = doc.first_element_child(root).unwrap();
        let attrs = doc.attributes(div);
        let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["id", "class", "hidden", "data-n", ":slot"]);
        assert_eq!(attrs[0].value.as_deref(), Some("x"));
        assert_eq!(attrs[1].quote, Some('\''));
        assert_eq!(attrs[2].value, None);
        assert_eq!(attrs[3].value.as_deref(), Some("3"));
        assert_eq!(attrs[3].quote, None);
        let span = attrs[0].value_span.unwrap();
        assert_eq!(&text[span.start..span.end], "x");
        let span = attrs[4].name_span.unwrap();
        assert_eq!(&text[span.start..span.end], ":slot");
    }

    #[test]
    fn void_and_raw_text_elements() {
        let (doc, root) = parse_one("<p>a<br>b</p><script>if (a < b) {}</script>");
        let p = doc.first_element_child(root).unwrap();
        assert_eq!(doc.children(p).len(), 3);
        let script = doc.children(root)[1];
        assert_eq!(doc.text_content(script), "if (a < b) {}");
    }

    #[test]
    fn optional_end_tags_close_implicitly() {
        let (doc, root) = parse_one("<ul><li>a<li>b</ul>");
        let ul = doc.first_element_child(root).unwrap();
        assert_eq!(doc.children(ul).len(), 2);
        assert_eq!(doc.text_content(doc.children(ul)[1]), "b");
    }

    #[test]
    fn stray_less_than_is_text() {
        let (doc, root) = parse_one("<p>1 < 2</p>");
        assert_eq!(doc.text_content(root), "1 < 2");
    }

    #[test]
    fn comments_and_doctype() {
        let (doc, root) = parse_one("<!DOCTYPE html><!-- note --><html></html>");
        assert_eq!(doc.kind(doc.children(root)[0]), &crate::NodeKind::Doctype("DOCTYPE html".into()));
        assert_eq!(doc.kind(doc.children(root)[1]), &crate::NodeKind::Comment(" note ".into()));
    }

    #[test]
    fn directive_tags_keep_colon_prefix() {
        let (doc, root) = parse_one(r#"<lib><:INCLUDE src="x.txt"/></lib>"#);
        let lib = doc.first_element_child(root).unwrap();
        let inc = doc.first_element_child(lib).unwrap();
        assert_eq!(doc.tag_name(inc), Some(":INCLUDE"));
        assert_eq!(doc.get_attribute(inc, "src"), Some("x.txt"));
    }

    #[test]
    fn malformed_markup_is_reported() {
        assert_eq!(parse_err("<div><span></div>").message, "Unclosed element <span>");
        assert_eq!(parse_err("<div></span>").offset, 5);
        assert_eq!(parse_err("<!-- open").message, "Unterminated comment");
        assert_eq!(parse_err("<div class=\"x>").message, "Unterminated attribute value");
        assert_eq!(parse_err("<div").message, "Unterminated tag <div>");
        assert_eq!(parse_err("<section>").message, "Unclosed element <section>");
    }
}

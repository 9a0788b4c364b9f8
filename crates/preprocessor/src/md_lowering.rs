//! `:MARKDOWN` lowering.
//!
//! The inner markup of each directive is rendered by the `markdown` crate and parsed
//! back into the document. Rendered nodes carry the directive's span, so errors in
//! generated markup point at the directive. Attribute lists, heading anchors and
//! code highlighting are applied to the parsed tree.

use log::{debug, warn};
use weft_core::{Document, NodeId, SerializeOptions, Span, parse, parse_attr_token, tokenize_attrs};

use crate::config::MarkdownConfig;
use crate::directives::MARKDOWN_TAG;
use crate::error::PreprocessError;
use crate::highlight;
use crate::preprocessor::Preprocessor;
use crate::slug::Slugger;

const HEADINGS: &[&str] = &["H1", "H2", "H3", "H4", "H5", "H6"];

/// Renders markdown to markup; GFM constructs and raw HTML are allowed.
pub fn render(source: &str) -> Result<String, ::markdown::message::Message> {
    let options = ::markdown::Options {
        parse: ::markdown::ParseOptions::gfm(),
        compile: ::markdown::CompileOptions {
            allow_dangerous_html: true,
            ..::markdown::CompileOptions::gfm()
        },
    };
    ::markdown::to_html_with_options(source, &options)
}

impl Preprocessor {
    /// Lowers every markdown directive under `root`, in document order.
    pub(crate) fn lower_markdown(&mut self, root: NodeId) -> Result<(), PreprocessError> {
        let mut slugger = Slugger::new();
        for directive in self.doc.lookup_tags(root, &[MARKDOWN_TAG]) {
            self.lower_markdown_directive(directive, &mut slugger)?;
        }
        Ok(())
    }

    fn lower_markdown_directive(
        &mut self,
        directive: NodeId,
        slugger: &mut Slugger,
    ) -> Result<(), PreprocessError> {
        let source = self
            .doc
            .inner_markup(directive, &SerializeOptions::default());
        let span = self.doc.span(directive);
        let rendered = render(&source).map_err(|message| PreprocessError::Markdown {
            message: message.to_string(),
            location: self.locate(directive),
        })?;
        let fragment = parse(&mut self.doc, &rendered, span.origin).map_err(|err| {
            PreprocessError::Markdown {
                message: err.message,
                location: self.locate(directive),
            }
        })?;
        self.doc.restamp(fragment, span);
        decorate(&mut self.doc, fragment, &self.config.markdown, slugger, span);

        self.doc.remove_children(directive);
        for child in self.doc.remove_children(fragment) {
            self.doc.append_child(directive, child);
        }
        let has_class = self
            .doc
            .get_attribute(directive, "class")
            .is_some_and(|class| !class.trim().is_empty());
        if !has_class {
            let class = self.config.markdown.default_class.clone();
            self.doc.set_attribute(directive, "class", &class);
        }
        debug!(
            "Lowered markdown block ({} bytes rendered to {})",
            source.len(),
            rendered.len()
        );
        Ok(())
    }
}

/// Applies the enabled markdown extensions to a freshly rendered fragment.
pub fn decorate(
    doc: &mut Document,
    fragment: NodeId,
    config: &MarkdownConfig,
    slugger: &mut Slugger,
    span: Span,
) {
    for node in doc.descendants(fragment) {
        let Some(tag) = doc.tag_name(node) else {
            continue;
        };
        let heading = HEADINGS.contains(&tag);
        let paragraph = tag == "P";
        let code = tag == "CODE"
            && doc
                .parent(node)
                .is_some_and(|parent| doc.has_tag(parent, "PRE"));

        if config.attribute_lists && (heading || paragraph) {
            apply_attribute_list(doc, node);
        }
        if config.heading_anchors && heading {
            add_heading_anchor(doc, node, slugger, span);
        }
        if config.highlight_code && code {
            highlight_code(doc, node, span);
        }
    }
}

/// Moves a trailing `{.class #id key=value}` in the element's last text into its
/// attributes. Lists with unrecognized tokens are left as text.
fn apply_attribute_list(doc: &mut Document, element: NodeId) {
    let Some(last) = doc.children(element).last().copied() else {
        return;
    };
    let Some(text) = doc.text(last) else {
        return;
    };
    let trimmed = text.trim_end();
    let Some(open) = trimmed.strip_suffix('}').and_then(|body| body.rfind('{')) else {
        return;
    };
    let list = html_escape::decode_html_entities(&trimmed[open + 1..trimmed.len() - 1]).into_owned();
    let remaining = trimmed[..open].trim_end().to_string();

    let mut classes = Vec::new();
    let mut attributes = Vec::new();
    let tokens = tokenize_attrs(&list);
    if tokens.is_empty() {
        return;
    }
    for token in tokens {
        if let Some(class) = token.strip_prefix('.') {
            if class.is_empty() {
                return;
            }
            classes.push(class.to_string());
        } else if let Some(id) = token.strip_prefix('#') {
            if id.is_empty() {
                return;
            }
            attributes.push(("id".to_string(), id.to_string()));
        } else {
            let Some((key, value)) = parse_attr_token(token) else {
                return;
            };
            attributes.push((key.to_string(), value.to_string()));
        }
    }

    if remaining.is_empty() {
        doc.remove(last);
    } else {
        doc.set_text(last, remaining);
    }
    for (key, value) in attributes {
        doc.set_attribute(element, &key, &value);
    }
    for class in classes {
        doc.add_class(element, &class);
    }
}

/// Gives a heading an id and `tabindex`, and wraps its content in a self link.
fn add_heading_anchor(doc: &mut Document, heading: NodeId, slugger: &mut Slugger, span: Span) {
    let id = match doc.get_attribute(heading, "id").filter(|id| !id.is_empty()) {
        Some(id) => {
            let id = id.to_string();
            slugger.reserve(&id);
            id
        }
        None => {
            let text = doc.text_content(heading);
            let id = slugger.next_slug(&html_escape::decode_html_entities(&text));
            doc.set_attribute(heading, "id", &id);
            id
        }
    };
    doc.set_attribute(heading, "tabindex", "-1");

    let anchor = doc.create_element("a", span);
    doc.set_attribute(anchor, "class", "header-anchor");
    doc.set_attribute(anchor, "href", &format!("#{id}"));
    for child in doc.remove_children(heading) {
        doc.append_child(anchor, child);
    }
    doc.append_child(heading, anchor);
}

/// Replaces the text of a `pre > code.language-X` block with highlighted markup.
fn highlight_code(doc: &mut Document, code: NodeId, span: Span) {
    let Some(language) = doc
        .get_attribute(code, "class")
        .and_then(highlight::language_of)
        .map(str::to_string)
    else {
        return;
    };
    let source = html_escape::decode_html_entities(&doc.text_content(code)).into_owned();
    let highlighted = match highlight::highlight(&source, &language) {
        Some(Ok(markup)) => markup,
        Some(Err(err)) => {
            warn!("Could not highlight {language} code block: {err}");
            return;
        }
        None => return,
    };
    let Ok(fragment) = parse(doc, &highlighted, span.origin) else {
        warn!("Highlighted {language} code block is not valid markup");
        return;
    };
    doc.restamp(fragment, span);
    doc.remove_children(code);
    for child in doc.remove_children(fragment) {
        doc.append_child(code, child);
    }
    doc.add_class(code, "hljs");
}

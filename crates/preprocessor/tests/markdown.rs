use weft_core::SerializeOptions;
use weft_preprocessor::{MarkdownConfig, Preprocessor, PreprocessorConfig, VirtualFile};

fn expand_with(index: &str, markdown: MarkdownConfig) -> String {
    let mut config = PreprocessorConfig::with_root("/site");
    config.virtual_files = vec![VirtualFile::new("index.html", index)];
    config.markdown = markdown;
    Preprocessor::new(config)
        .read("index.html")
        .expect("page should expand")
        .markup(&SerializeOptions::default())
}

fn expand(index: &str) -> String {
    expand_with(index, MarkdownConfig::default())
}

fn plain() -> MarkdownConfig {
    MarkdownConfig {
        attribute_lists: false,
        heading_anchors: false,
        highlight_code: false,
        ..MarkdownConfig::default()
    }
}

#[test]
fn markdown_block_is_rendered_in_place() {
    let out = expand_with(
        "<html><body><:markdown># Hi\n\nSome *text*</:markdown></body></html>",
        plain(),
    );
    assert_eq!(
        out,
        "<html><head></head><body><:markdown class=\"weft-markdown\"><h1>Hi</h1>\n<p>Some <em>text</em></p></:markdown></body></html>"
    );
}

#[test]
fn author_class_is_kept() {
    let out = expand_with("<html><:markdown class=\"prose\">x</:markdown></html>", plain());
    insta::assert_snapshot!(out, @r#"<html><:markdown class="prose"><p>x</p></:markdown><head></head><body></body></html>"#);

    let mut config = plain();
    config.default_class = "md".into();
    let out = expand_with("<html><:markdown class=\" \">x</:markdown></html>", config);
    insta::assert_snapshot!(out, @r#"<html><:markdown class="md"><p>x</p></:markdown><head></head><body></body></html>"#);
}

#[test]
fn heading_slugs_are_unique_across_blocks() {
    let out = expand("<html><:markdown>## Intro</:markdown><:markdown>## Intro</:markdown></html>");
    assert!(out.contains("<h2 id=\"intro\" tabindex=\"-1\"><a class=\"header-anchor\" href=\"#intro\">Intro</a></h2>"), "{out}");
    assert!(out.contains("<h2 id=\"intro-1\" tabindex=\"-1\"><a class=\"header-anchor\" href=\"#intro-1\">Intro</a></h2>"), "{out}");
}

#[test]
fn generated_ids_do_not_collide_with_earlier_suffixes() {
    let out = expand("<html><:markdown>\n# A\n\n# A\n\n# A 1\n</:markdown></html>");
    for id in ["a", "a-1", "a-1-1"] {
        assert_eq!(out.matches(&format!("id=\"{id}\"")).count(), 1, "{out}");
    }
}

#[test]
fn attribute_lists_reach_headings_and_paragraphs() {
    let out = expand_with(
        "<html><:markdown>## Setup {#install .wide}\n\nNote {.tip}</:markdown></html>",
        MarkdownConfig {
            attribute_lists: true,
            ..plain()
        },
    );
    assert!(out.contains("<h2 id=\"install\" class=\"wide\">Setup</h2>"), "{out}");
    assert!(out.contains("<p class=\"tip\">Note</p>"), "{out}");
}

#[test]
fn generated_nodes_point_at_the_directive() {
    let mut config = PreprocessorConfig::with_root("/site");
    config.virtual_files = vec![VirtualFile::new(
        "index.html",
        "<html>\n  <:markdown>\n# A\n\nb\n</:markdown></html>",
    )];
    config.markdown = plain();
    let page = Preprocessor::new(config).read("index.html").unwrap();
    let doc = page.document();
    let html = page.root_element().unwrap();
    let directive = doc.first_element_child(html).unwrap();
    for node in doc.descendants(directive) {
        let pos = page.source_pos(&doc.span(node)).unwrap();
        assert_eq!((pos.file.as_str(), pos.line1, pos.column1), ("index.html", 2, 3));
    }
}

#[test]
fn markdown_may_invoke_macros() {
    let out = expand_with(
        concat!(
            "<html><:define tag=\"app-note:aside\" class=\"note\"></:define>",
            "<:markdown>Hello <app-note>*hi*</app-note></:markdown></html>",
        ),
        plain(),
    );
    assert!(out.contains("<p>Hello <aside class=\"note\"><em>hi</em></aside></p>"), "{out}");
}

#[test]
fn fenced_code_is_highlighted_with_classes() {
    let out = expand("<html><:markdown>```rust\nfn main() {}\n```</:markdown></html>");
    assert!(out.contains("<pre><code class=\"language-rust hljs\">"), "{out}");
    assert!(out.contains("class=\"hljs-"), "{out}");
    assert!(out.contains("main"), "{out}");
}

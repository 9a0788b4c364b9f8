//! Class-based syntax highlighting for markdown code blocks.

use once_cell::sync::Lazy;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Prefix of every generated scope class.
pub const CLASS_PREFIX: &str = "hljs-";

/// Language named by a `language-*` class in `class_attr`.
pub fn language_of(class_attr: &str) -> Option<&str> {
    class_attr
        .split_whitespace()
        .find_map(|class| class.strip_prefix("language-"))
        .filter(|language| !language.is_empty())
}

/// Highlights plain `code` as `language`.
///
/// Returns escaped markup made of `<span class="hljs-...">` runs, or `None` when the
/// language is unknown.
pub fn highlight(code: &str, language: &str) -> Option<Result<String, syntect::Error>> {
    let syntax = SYNTAX_SET.find_syntax_by_token(language)?;
    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        &SYNTAX_SET,
        ClassStyle::SpacedPrefixed {
            prefix: CLASS_PREFIX,
        },
    );
    for line in LinesWithEndings::from(code) {
        if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
            return Some(Err(err));
        }
    }
    Some(Ok(generator.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_class_is_found() {
        assert_eq!(language_of("foo language-rust"), Some("rust"));
        assert_eq!(language_of("language-"), None);
        assert_eq!(language_of("plain"), None);
    }

    #[test]
    fn known_language_gets_prefixed_classes() {
        let html = highlight("fn main() {}\n", "rust").unwrap().unwrap();
        assert!(html.contains("class=\"hljs-"), "{html}");
        assert!(html.contains("main"));
    }

    #[test]
    fn markup_in_code_is_escaped() {
        let html = highlight("let a = 1 < 2;\n", "rs").unwrap().unwrap();
        assert!(html.contains("&lt;"), "{html}");
    }

    #[test]
    fn unknown_language_is_skipped() {
        assert!(highlight("x", "no-such-language").is_none());
    }
}

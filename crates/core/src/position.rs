//! Offset to line/column translation for diagnostics.

use crate::span::Span;

/// Human-readable location of a span: file plus 1-based start and end positions.
///
/// The end is exclusive, so `line2`/`column2` point one past the last character.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SourcePos {
    /// File name, relative to the sandbox root when possible.
    pub file: String,
    /// Line of the span start (1-indexed).
    pub line1: usize,
    /// Column of the span start (1-indexed, in characters).
    pub column1: usize,
    /// Line of the span end (1-indexed); `<b/>` at the start of line 2 ends at 2:5.
    pub line2: usize,
    /// Column of the span end (1-indexed, in characters, exclusive).
    pub column2: usize,
}

impl std::fmt::Display for SourcePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line1, self.column1)
    }
}

/// Resolves `span` against the text of the buffer it points into.
///
/// The start offset is located by scanning from the beginning of `text`; the end
/// offset is located by continuing from the start's line. An offset that sits on a
/// newline belongs to the line that newline terminates. Offsets past the end of the
/// text are clamped.
pub fn resolve(text: &str, span: &Span, file: impl Into<String>) -> SourcePos {
    let start = span.start.min(text.len());
    let end = span.end.min(text.len()).max(start);

    let (line1, line_start1) = advance(text, 1, 0, start);
    let (line2, line_start2) = advance(text, line1, line_start1, end);

    SourcePos {
        file: file.into(),
        line1,
        column1: column(text, line_start1, start),
        line2,
        column2: column(text, line_start2, end),
    }
}

fn advance(text: &str, mut line: usize, mut line_start: usize, offset: usize) -> (usize, usize) {
    while let Some(rel) = text[line_start..].find('\n') {
        let newline = line_start + rel;
        if newline >= offset {
            break;
        }
        line_start = newline + 1;
        line += 1;
    }
    (line, line_start)
}

fn column(text: &str, line_start: usize, offset: usize) -> usize {
    let width = text
        .get(line_start..offset)
        .map_or(offset - line_start, |prefix| prefix.chars().count());
    width + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span::new(0, start, end).unwrap()
    }

    #[test]
    fn second_line_element() {
        let pos = resolve("<a>\n<b/>\n", &span(4, 8), "page.html");
        assert_eq!((pos.line1, pos.column1), (2, 1));
        assert_eq!((pos.line2, pos.column2), (2, 5));
        assert_eq!(pos.to_string(), "page.html:2:1");
    }

    #[test]
    fn span_across_lines() {
        let text = "one\ntwo\nthree\n";
        let pos = resolve(text, &span(1, 10), "f");
        assert_eq!((pos.line1, pos.column1), (1, 2));
        assert_eq!((pos.line2, pos.column2), (3, 3));
    }

    #[test]
    fn offset_on_newline_stays_on_its_line() {
        let pos = resolve("ab\ncd\n", &span(2, 2), "f");
        assert_eq!((pos.line1, pos.column1), (1, 3));
    }

    #[test]
    fn columns_count_characters() {
        let text = "é<x>\n";
        let pos = resolve(text, &span(2, 5), "f");
        assert_eq!(pos.column1, 2);
    }

    #[test]
    fn out_of_range_offsets_are_clamped() {
        let pos = resolve("a\n", &span(10, 20), "f");
        assert_eq!((pos.line1, pos.column1), (2, 1));
        assert_eq!((pos.line2, pos.column2), (2, 1));
    }
}

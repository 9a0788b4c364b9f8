//! Unique heading ids for markdown anchors.

use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Nonspacing and spacing marks kept in slugs so scripts like Devanagari or Arabic
/// survive intact.
const COMBINING_MARKS: &[RangeInclusive<char>] = &[
    '\u{0300}'..='\u{036F}',
    '\u{0483}'..='\u{0489}',
    '\u{0591}'..='\u{05C7}',
    '\u{0610}'..='\u{061A}',
    '\u{064B}'..='\u{065F}',
    '\u{0670}'..='\u{0670}',
    '\u{0900}'..='\u{0903}',
    '\u{093A}'..='\u{094F}',
    '\u{0951}'..='\u{0957}',
    '\u{0962}'..='\u{0963}',
    '\u{0E31}'..='\u{0E3A}',
    '\u{0E47}'..='\u{0E4E}',
    '\u{1AB0}'..='\u{1AFF}',
    '\u{1DC0}'..='\u{1DFF}',
    '\u{3099}'..='\u{309A}',
    '\u{FE20}'..='\u{FE2F}',
];

fn is_combining_mark(c: char) -> bool {
    COMBINING_MARKS.iter().any(|range| range.contains(&c))
}

/// Github-style slug generator; repeated texts get `-1`, `-2`, ... suffixes.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    /// Creates an empty slugger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused slug for `text`.
    ///
    /// Suffixed slugs are checked against everything issued or reserved so far, so
    /// `A`, `A`, `A 1` gives `a`, `a-1`, `a-1-1`.
    pub fn next_slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut slug = base.clone();
        while self.seen.contains_key(&slug) {
            let count = self.seen.entry(base.clone()).or_insert(0);
            *count += 1;
            slug = format!("{base}-{count}");
        }
        self.seen.insert(slug.clone(), 0);
        slug
    }

    /// Marks an author-chosen id as taken.
    pub fn reserve(&mut self, id: &str) {
        self.seen.entry(id.to_string()).or_insert(0);
    }
}

/// Lowercases `text`, turns spaces into `-` and drops punctuation.
///
/// Hyphens are neither collapsed nor trimmed, matching github-slugger.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c == ' ' {
            slug.push('-');
        } else if c == '-' || c == '_' || c.is_alphanumeric() || is_combining_mark(c) {
            slug.extend(c.to_lowercase());
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

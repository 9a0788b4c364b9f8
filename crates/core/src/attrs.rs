//! Attribute-list tokens such as `div class="a b" hidden`.

/// Splits `attrs` on whitespace, keeping quoted substrings intact.
pub fn tokenize_attrs(attrs: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut token_start: Option<usize> = None;
    let mut quote: Option<char> = None;

    for (i, c) in attrs.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => {
                token_start.get_or_insert(i);
                quote = Some(c);
            }
            None if c.is_whitespace() => {
                if let Some(start) = token_start.take() {
                    tokens.push(&attrs[start..i]);
                }
            }
            None => {
                token_start.get_or_insert(i);
            }
        }
    }

    if let Some(start) = token_start {
        tokens.push(&attrs[start..]);
    }
    tokens
}

/// Splits a `key` or `key=value` token; matching surrounding quotes are stripped
/// from the value and a bare key yields an empty value.
pub fn parse_attr_token(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=').unwrap_or((token, ""));
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, unquote(value.trim())))
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

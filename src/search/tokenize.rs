//! Tokenization for the lexical index.
//!
//! Lowercase, split on anything that is not alphanumeric, drop tokens shorter
//! than two characters. No stemming: the same text always yields the same
//! tokens, independent of locale or external models.

/// Minimum token length in characters.
pub const MIN_TOKEN_LEN: usize = 2;

/// Tokenize free text (descriptions, queries).
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// Tokenize an identifier such as an action or parameter name.
///
/// Splits on separators like `tokenize`, and additionally on camelCase
/// boundaries: `listEmployees` becomes `list`, `employees`.
pub fn tokenize_identifier(name: &str) -> Vec<String> {
    tokenize(&split_camel_case(name))
}

fn split_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if let Some(p) = prev {
            if ch.is_uppercase() && (p.is_lowercase() || p.is_ascii_digit()) {
                out.push(' ');
            }
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}

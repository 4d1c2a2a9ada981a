//! Text normalization applied before n-gram windowing.
//!
//! The steps run in a fixed order:
//!
//! 1. truncate to `max_text_chars` characters
//! 2. replace newlines with spaces
//! 3. rewrite markdown links `[label](url)` to `label`
//! 4. strip punctuation
//! 5. collapse whitespace runs to a single space and trim the edges
//! 6. lower-case
//!
//! Steps 4 to 6 run as a single pass over the characters.
//!
//! Trimming the edges in step 5 is deliberate: the windowing step pads both
//! ends with exactly one space, and leading or trailing whitespace would
//! otherwise change the first and last n-grams. Documents and queries go
//! through the same function, so the two stay comparable.

use std::borrow::Cow;

use unicode_categories::UnicodeCategories;

use crate::config::ExtractConfig;

/// Normalize `text` into the string n-grams are taken from.
///
/// The result carries no leading or trailing whitespace; padding is added by
/// the windowing step.
///
/// ```
/// use ngram::{normalize, ExtractConfig};
///
/// let cfg = ExtractConfig::default();
/// assert_eq!(normalize("Me  too!", &cfg), "me too");
/// assert_eq!(normalize("see [the docs](https://x.io)\nnow", &cfg), "see the docs now");
/// ```
pub fn normalize(text: &str, cfg: &ExtractConfig) -> String {
    let truncated = truncate_chars(text, cfg.max_text_chars);
    let single_line: Cow<str> = if truncated.contains(['\n', '\r']) {
        Cow::Owned(truncated.replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(truncated)
    };
    let unlinked = rewrite_markdown_links(&single_line);
    strip_and_collapse(&unlinked)
}

/// Return the prefix of `text` holding at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Replace every `[label](url)` with `label`.
///
/// Brackets that do not form a complete link are left in place; the
/// punctuation pass removes them afterwards.
fn rewrite_markdown_links(text: &str) -> Cow<'_, str> {
    if !text.contains("](") {
        return Cow::Borrowed(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '[' {
            if let Some((label_end, url_end)) = find_link(&chars, i) {
                out.extend(&chars[i + 1..label_end]);
                i = url_end + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    Cow::Owned(out)
}

/// Given `chars[open] == '['`, return the indices of the closing `]` and the
/// closing `)` when a link follows.
fn find_link(chars: &[char], open: usize) -> Option<(usize, usize)> {
    let label_end = open + 1 + chars[open + 1..].iter().position(|&c| c == ']' || c == '[')?;
    if chars[label_end] != ']' || chars.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let url_start = label_end + 2;
    let url_end = url_start + chars[url_start..].iter().position(|&c| c == ')')?;
    Some((label_end, url_end))
}

fn is_stripped(ch: char) -> bool {
    ch.is_ascii_punctuation() || ch.is_punctuation()
}

/// Strip punctuation, collapse whitespace, and lower-case in one pass.
fn strip_and_collapse(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() {
                pending_space = true;
            }
        } else if !is_stripped(ch) {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            // Lowercasing can expand one character into several.
            out.extend(ch.to_lowercase());
        }
    }
    out
}

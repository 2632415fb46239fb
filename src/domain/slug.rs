//! URL parameters for posts: `{id}-{parameterized title}`.
//!
//! Titles are transliterated before slugification so that inputs such as
//! “基线对齐” still yield a readable `ji-xian-dui-qi` segment. Only the leading
//! id is significant when a parameter is resolved back to a post, which keeps
//! old links working after a title edit.

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;

/// Lowercase, dash-separated ASCII rendering of `input`; empty when nothing survives.
pub fn parameterize(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    slugify(transliterate_to_ascii(input))
}

/// Stable external identifier used in post URLs.
pub fn post_param(id: i64, title: &str) -> String {
    let slug = parameterize(title);
    if slug.is_empty() {
        id.to_string()
    } else {
        format!("{id}-{slug}")
    }
}

/// Recover the post id from a parameter such as `42-a-valid-title-here`.
pub fn parse_post_param(param: &str) -> Option<i64> {
    let digits: &str = match param.find(|ch: char| !ch.is_ascii_digit()) {
        Some(0) => return None,
        Some(end) => {
            if !param[end..].starts_with('-') {
                return None;
            }
            &param[..end]
        }
        None => param,
    };

    digits.parse().ok().filter(|id: &i64| *id > 0)
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            // slugify decides what to do with the rest
            None => output.push(ch),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

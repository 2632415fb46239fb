//! Character escaping for HTML and XML output.

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escape_covers_quotes() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn xml_escape_uses_named_apostrophe() {
        assert_eq!(xml_escape("R&D's"), "R&amp;D&apos;s");
    }
}

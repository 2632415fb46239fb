//! Markdown rendering for post bodies and footnotes.

use comrak::{Options, markdown_to_html};

fn options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.render.r#unsafe = true;
    options
}

/// Render `input` to HTML, then strip anything outside the ammonia allow-list.
///
/// Raw HTML in the source survives comrak and is left to ammonia.
pub fn render_markdown(input: &str) -> String {
    let html = markdown_to_html(input, &options());
    ammonia::clean(&html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_emphasis_and_links() {
        let html = render_markdown("Hello *there*, see <https://example.com>");
        assert!(html.contains("<em>there</em>"));
        assert!(html.contains("href=\"https://example.com\""));
    }

    #[test]
    fn scripts_are_removed() {
        let html = render_markdown("before\n\n<script>alert(1)</script>\n\nafter");
        assert!(!html.contains("<script"));
        assert!(html.contains("after"));
    }
}

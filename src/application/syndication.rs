//! RSS 2.0 and plain XML renderings of the active post set.

use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::application::blog::BlogConfig;
use crate::application::posts::{PostService, PostServiceError, PostView};
use crate::util::markup::xml_escape;

/// Builds the feed documents served at `/posts.rss` and `/posts.xml`.
#[derive(Clone)]
pub struct SyndicationService {
    posts: PostService,
}

impl SyndicationService {
    pub fn new(posts: PostService) -> Self {
        Self { posts }
    }

    pub async fn rss_feed(&self) -> Result<String, PostServiceError> {
        let posts = self.posts.feed().await?;
        Ok(render_rss(self.posts.config(), &posts))
    }

    pub async fn xml_feed(&self) -> Result<String, PostServiceError> {
        let posts = self.posts.feed().await?;
        Ok(render_xml(self.posts.config(), &posts))
    }
}

pub fn render_rss(config: &BlogConfig, posts: &[PostView]) -> String {
    let mut items = String::new();
    for post in posts {
        let link = config.post_url(&post.param);
        items.push_str(&format!(
            "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <guid>{}</guid>\n      <pubDate>{}</pubDate>\n      <author>{}</author>\n{}      <description><![CDATA[{}]]></description>\n    </item>\n",
            xml_escape(&post.record.title),
            xml_escape(link.as_str()),
            xml_escape(link.as_str()),
            format_timestamp(post.record.published_at, &Rfc2822),
            xml_escape(&post.blogger_name),
            categories(&post.record.tags),
            cdata_safe(&post.short_body),
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <link>{}</link>\n    <description>{}</description>\n{}  </channel>\n</rss>\n",
        xml_escape(&config.title),
        xml_escape(config.public_url.as_str()),
        xml_escape(&config.description),
        items
    )
}

/// A `<posts>` document listing every field of each post.
pub fn render_xml(config: &BlogConfig, posts: &[PostView]) -> String {
    let mut entries = String::new();
    for post in posts {
        let record = &post.record;
        let footnotes = record
            .footnotes
            .as_deref()
            .map(|footnotes| format!("    <footnotes>{}</footnotes>\n", xml_escape(footnotes)))
            .unwrap_or_else(|| "    <footnotes nil=\"true\"/>\n".to_string());
        let tags: String = record
            .tags
            .iter()
            .map(|tag| format!("      <tag>{}</tag>\n", xml_escape(tag)))
            .collect();

        entries.push_str(&format!(
            "  <post>\n    <id type=\"integer\">{}</id>\n    <title>{}</title>\n    <url>{}</url>\n    <body>{}</body>\n{}    <state>{}</state>\n    <published-at type=\"dateTime\">{}</published-at>\n    <blogger-type>{}</blogger-type>\n    <blogger-id type=\"integer\">{}</blogger-id>\n    <blogger-name>{}</blogger-name>\n    <tags type=\"array\">\n{}    </tags>\n    <created-at type=\"dateTime\">{}</created-at>\n    <updated-at type=\"dateTime\">{}</updated-at>\n  </post>\n",
            record.id,
            xml_escape(&record.title),
            xml_escape(config.post_url(&post.param).as_str()),
            xml_escape(&record.body),
            footnotes,
            xml_escape(&record.state),
            format_timestamp(record.published_at, &Rfc3339),
            xml_escape(&record.blogger.kind),
            record.blogger.id,
            xml_escape(&post.blogger_name),
            tags,
            format_timestamp(record.created_at, &Rfc3339),
            format_timestamp(record.updated_at, &Rfc3339),
        ));
    }

    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<posts type=\"array\">\n{entries}</posts>\n")
}

fn categories(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("      <category>{}</category>\n", xml_escape(tag)))
        .collect()
}

fn format_timestamp<F>(value: OffsetDateTime, format: &F) -> String
where
    F: time::formatting::Formattable + ?Sized,
{
    value.format(format).unwrap_or_else(|_| value.to_string())
}

fn cdata_safe(input: &str) -> String {
    input.replace("]]>", "]]]]><![CDATA[>")
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use url::Url;

    use super::*;
    use crate::domain::entities::{BloggerRef, PostRecord};

    fn view(title: &str) -> PostView {
        let record = PostRecord {
            id: 4,
            title: title.to_string(),
            body: "Body with <html> & more text".to_string(),
            footnotes: None,
            state: "published".to_string(),
            published_at: datetime!(2026-03-01 10:00 UTC),
            blogger: BloggerRef::new("User", 1),
            tags: vec!["rust".to_string()],
            created_at: datetime!(2026-03-01 10:00 UTC),
            updated_at: datetime!(2026-03-02 10:00 UTC),
        };
        PostView {
            param: record.to_param(),
            short_body: record.body.clone(),
            blogger_name: "ada".to_string(),
            record,
        }
    }

    fn config() -> BlogConfig {
        BlogConfig {
            title: "Notes & Essays".to_string(),
            public_url: Url::parse("https://blog.example.com/").unwrap(),
            ..BlogConfig::default()
        }
    }

    #[test]
    fn rss_lists_items_with_links_and_escaped_channel() {
        let rss = render_rss(&config(), &[view("Hello <World> Again")]);
        assert!(rss.contains("<title>Notes &amp; Essays</title>"));
        assert!(rss.contains("<title>Hello &lt;World&gt; Again</title>"));
        assert!(rss.contains("<link>https://blog.example.com/posts/4-hello-world-again</link>"));
        assert!(rss.contains("<category>rust</category>"));
        assert!(rss.contains("<pubDate>Sun, 01 Mar 2026 10:00:00 +0000</pubDate>"));
    }

    #[test]
    fn xml_escapes_bodies_and_marks_missing_footnotes() {
        let xml = render_xml(&config(), &[view("Hello World Again")]);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<body>Body with &lt;html&gt; &amp; more text</body>"));
        assert!(xml.contains("<footnotes nil=\"true\"/>"));
        assert!(xml.contains("<id type=\"integer\">4</id>"));
    }

    #[test]
    fn empty_feeds_are_well_formed() {
        let xml = render_xml(&config(), &[]);
        assert!(xml.ends_with("<posts type=\"array\">\n</posts>\n"));
    }
}

use crate::application::blog::BlogConfig;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Paginated;
use crate::application::posts::{LISTING_TITLE, PostDetail, PostListing, PostView, Sidebar};
use crate::domain::entities::CommentRecord;
use crate::domain::error::ValidationErrors;
use crate::domain::posts::{MonthKey, PostDraft, format_human_date};
use crate::presentation::markdown::render_markdown;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use url::form_urlencoded;

/// Static body served for unknown routes and disabled write routes.
pub const NOT_FOUND_PAGE: &str = include_str!("../../static/404.html");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(source: &'static str) -> Response {
    let mut response = (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Resource not found")
        .attach(&mut response);
    response
}

/// Flash-style message carried on the redirect after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Created,
    Updated,
    Destroyed,
    Commented,
}

impl Notice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Destroyed => "destroyed",
            Self::Commented => "commented",
        }
    }

    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw? {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "destroyed" => Some(Self::Destroyed),
            "commented" => Some(Self::Commented),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Created => "Post was successfully created.",
            Self::Updated => "Post was successfully updated.",
            Self::Destroyed => "Post was successfully destroyed.",
            Self::Commented => "Comment was successfully added.",
        }
    }
}

/// Root-relative links to the posts routes, prefixed with the mount path of `public_url`.
#[derive(Debug, Clone)]
pub struct SiteLinks {
    base: String,
}

impl SiteLinks {
    pub fn new(config: &BlogConfig) -> Self {
        Self {
            base: config.mount_path().to_string(),
        }
    }

    pub fn posts(&self) -> String {
        format!("{}/posts", self.base)
    }

    pub fn new_post(&self) -> String {
        format!("{}/posts/new", self.base)
    }

    pub fn feed(&self) -> String {
        format!("{}/posts.xml", self.base)
    }

    pub fn rss(&self) -> String {
        format!("{}/posts.rss", self.base)
    }

    pub fn post(&self, param: &str) -> String {
        format!("{}/posts/{param}", self.base)
    }

    pub fn edit_post(&self, param: &str) -> String {
        format!("{}/posts/{param}/edit", self.base)
    }

    pub fn comments(&self, param: &str) -> String {
        format!("{}/posts/{param}/comments", self.base)
    }

    pub fn tagged(&self, tag: &str) -> String {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("tag", tag)
            .finish();
        format!("{}/posts/tagged?{query}", self.base)
    }

    pub fn archive(&self, month: MonthKey) -> String {
        self.archive_raw(&month.year.to_string(), &month.month.to_string())
    }

    /// Archive link built from the query values as the reader sent them.
    pub fn archive_raw(&self, year: &str, month: &str) -> String {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("year", year)
            .append_pair("month", month)
            .finish();
        format!("{}/posts/archives?{query}", self.base)
    }

    pub fn with_notice(href: String, notice: Notice) -> String {
        format!("{href}?notice={}", notice.as_str())
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub description: String,
    pub layout: String,
    pub page_title: String,
    pub home_href: String,
    pub new_post_href: String,
    pub feed_href: String,
    pub rss_href: String,
    pub include_admin_actions: bool,
    pub signed_in: bool,
    pub notice: Option<String>,
}

impl LayoutChrome {
    pub fn new(config: &BlogConfig, signed_in: bool) -> Self {
        let links = SiteLinks::new(config);
        Self {
            site_title: config.title.clone(),
            description: config.description.clone(),
            layout: config.layout.clone(),
            page_title: config.title.clone(),
            home_href: links.posts(),
            new_post_href: links.new_post(),
            feed_href: links.feed(),
            rss_href: links.rss(),
            include_admin_actions: config.include_admin_actions,
            signed_in,
            notice: None,
        }
    }

    pub fn with_title(self, title: impl AsRef<str>) -> Self {
        Self {
            page_title: format!("{} | {}", title.as_ref(), self.site_title),
            ..self
        }
    }

    pub fn with_notice(self, notice: Option<Notice>) -> Self {
        Self {
            notice: notice.map(|notice| notice.message().to_string()),
            ..self
        }
    }

    /// Write links are shown only to signed-in bloggers while admin actions are on.
    pub fn show_admin_links(&self) -> bool {
        self.include_admin_actions && self.signed_in
    }
}

#[derive(Clone)]
pub struct TagLink {
    pub name: String,
    pub href: String,
}

impl TagLink {
    pub fn new(name: &str, links: &SiteLinks) -> Self {
        Self {
            name: name.to_string(),
            href: links.tagged(name),
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub title: String,
    pub href: String,
    pub edit_href: String,
    pub published_on: String,
    pub blogger_name: String,
    pub state: String,
    pub excerpt_html: String,
    pub tags: Vec<TagLink>,
}

impl PostCard {
    pub fn from_view(view: &PostView, links: &SiteLinks) -> Self {
        Self {
            title: view.record.title.clone(),
            href: links.post(&view.param),
            edit_href: links.edit_post(&view.param),
            published_on: format_human_date(view.record.published_at),
            blogger_name: view.blogger_name.clone(),
            state: view.record.state.clone(),
            excerpt_html: render_markdown(&view.short_body),
            tags: view
                .record
                .tags
                .iter()
                .map(|tag| TagLink::new(tag, links))
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct SidebarCount {
    pub label: String,
    pub href: String,
    pub count: u64,
}

#[derive(Clone)]
pub struct RecentLink {
    pub title: String,
    pub href: String,
    pub published_on: String,
}

#[derive(Clone, Default)]
pub struct SidebarView {
    pub tags: Vec<SidebarCount>,
    pub months: Vec<SidebarCount>,
    pub recent: Vec<RecentLink>,
}

impl SidebarView {
    pub fn new(sidebar: Sidebar, links: &SiteLinks) -> Self {
        let tags = sidebar
            .tags
            .into_iter()
            .map(|tag| SidebarCount {
                href: links.tagged(&tag.name),
                label: tag.name,
                count: tag.count,
            })
            .collect();
        let months = sidebar
            .months
            .into_iter()
            .map(|bucket| SidebarCount {
                href: links.archive(bucket.month),
                label: bucket.label,
                count: bucket.count,
            })
            .collect();
        let recent = sidebar
            .recent
            .into_iter()
            .map(|post| RecentLink {
                href: links.post(&post.param),
                title: post.title,
                published_on: format_human_date(post.published_at),
            })
            .collect();

        Self {
            tags,
            months,
            recent,
        }
    }
}

#[derive(Clone)]
pub struct PaginationView {
    pub page: u32,
    pub total_pages: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

impl PaginationView {
    /// `base` is the listing URL including any filter query, without `page`.
    pub fn new<T>(posts: &Paginated<T>, base: &str) -> Self {
        let separator = if base.contains('?') { '&' } else { '?' };
        let href = |page: u32| format!("{base}{separator}page={page}");
        Self {
            page: posts.page,
            total_pages: posts.total_pages(),
            prev_href: posts.prev_page().map(href),
            next_href: posts.next_page().map(href),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.prev_href.is_some() || self.next_href.is_some()
    }
}

#[derive(Clone)]
pub struct IndexView {
    pub heading: String,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl IndexView {
    pub fn new(listing: &PostListing, base: &str, links: &SiteLinks) -> Self {
        Self {
            heading: listing
                .title
                .clone()
                .unwrap_or_else(|| LISTING_TITLE.to_string()),
            posts: listing
                .posts
                .items
                .iter()
                .map(|view| PostCard::from_view(view, links))
                .collect(),
            pagination: PaginationView::new(&listing.posts, base),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub chrome: LayoutChrome,
    pub sidebar: SidebarView,
    pub view: IndexView,
}

#[derive(Clone)]
pub struct CommentView {
    pub name: String,
    pub posted_on: String,
    pub body_html: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            name: comment.name.clone(),
            posted_on: format_human_date(comment.created_at),
            body_html: render_markdown(&comment.body),
        }
    }
}

#[derive(Clone, Default)]
pub struct CommentFormView {
    pub action: String,
    pub name: String,
    pub email: String,
    pub body: String,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct PostPageView {
    pub card: PostCard,
    pub destroy_action: String,
    pub body_html: String,
    pub footnotes_html: Option<String>,
    /// `None` when comments are not stored natively.
    pub comments: Option<Vec<CommentView>>,
    pub comment_form: CommentFormView,
    pub disqus: bool,
}

impl PostPageView {
    pub fn new(detail: &PostDetail, disqus: bool, links: &SiteLinks) -> Self {
        let card = PostCard::from_view(&detail.post, links);
        let record = &detail.post.record;
        Self {
            destroy_action: card.href.clone(),
            body_html: render_markdown(&record.body),
            footnotes_html: record
                .footnotes
                .as_deref()
                .filter(|notes| !notes.trim().is_empty())
                .map(render_markdown),
            comments: detail
                .comments
                .as_ref()
                .map(|comments| comments.iter().map(CommentView::from).collect()),
            comment_form: CommentFormView {
                action: links.comments(&detail.post.param),
                ..CommentFormView::default()
            },
            disqus,
            card,
        }
    }

    pub fn with_comment_form(self, form: CommentFormView) -> Self {
        Self {
            comment_form: CommentFormView {
                action: self.comment_form.action.clone(),
                ..form
            },
            ..self
        }
    }
}

#[derive(Template)]
#[template(path = "posts/show.html")]
pub struct ShowTemplate {
    pub chrome: LayoutChrome,
    pub sidebar: SidebarView,
    pub view: PostPageView,
}

#[derive(Clone)]
pub struct StateOption {
    pub value: String,
    pub selected: bool,
}

#[derive(Clone)]
pub struct PostFormView {
    pub heading: String,
    pub action: String,
    /// Hidden `_method` override for browsers; `None` on create.
    pub method_override: Option<String>,
    pub cancel_href: String,
    pub title: String,
    pub published_at: String,
    pub body: String,
    pub footnotes: String,
    pub tag_list: String,
    pub states: Vec<StateOption>,
    pub errors: Vec<String>,
}

impl PostFormView {
    pub fn new<'a>(
        draft: &PostDraft,
        states: impl Iterator<Item = &'a str>,
        errors: Option<&ValidationErrors>,
        links: &SiteLinks,
    ) -> Self {
        let (heading, action, method_override, cancel_href) = match draft.to_param() {
            Some(param) => (
                "Editing Post".to_string(),
                links.post(&param),
                Some("patch".to_string()),
                links.post(&param),
            ),
            None => (
                "New Post".to_string(),
                links.posts(),
                None,
                links.posts(),
            ),
        };

        Self {
            heading,
            action,
            method_override,
            cancel_href,
            title: draft.title.clone(),
            published_at: draft.published_at_input.clone(),
            body: draft.body.clone(),
            footnotes: draft.footnotes.clone().unwrap_or_default(),
            tag_list: draft.tag_list.clone(),
            states: states
                .map(|state| StateOption {
                    value: state.to_string(),
                    selected: state == draft.state,
                })
                .collect(),
            errors: errors.map(ValidationErrors::full_messages).unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/form.html")]
pub struct FormTemplate {
    pub chrome: LayoutChrome,
    pub form: PostFormView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pagination::PageRequest;

    #[test]
    fn pagination_links_keep_filters() {
        let posts = Paginated::new(vec![(); 5], PageRequest::new(2, 5), 15);
        let view = PaginationView::new(&posts, "/posts/tagged?tag=rust");
        assert_eq!(
            view.prev_href.as_deref(),
            Some("/posts/tagged?tag=rust&page=1")
        );
        assert_eq!(
            view.next_href.as_deref(),
            Some("/posts/tagged?tag=rust&page=3")
        );
        assert_eq!(view.total_pages, 3);
    }

    #[test]
    fn tag_links_are_query_encoded() {
        let links = SiteLinks::new(&BlogConfig::default());
        assert_eq!(links.tagged("rust lang"), "/posts/tagged?tag=rust+lang");
    }

    #[test]
    fn links_follow_the_public_url_path() {
        let mut config = BlogConfig::default();
        config.public_url = url::Url::parse("https://example.com/journal/").unwrap();
        let links = SiteLinks::new(&config);

        assert_eq!(links.posts(), "/journal/posts");
        assert_eq!(links.post("3-hello"), "/journal/posts/3-hello");
        assert_eq!(
            links.archive(MonthKey::new(2024, 2).unwrap()),
            "/journal/posts/archives?year=2024&month=2"
        );
        assert_eq!(
            SiteLinks::with_notice(links.posts(), Notice::Destroyed),
            "/journal/posts?notice=destroyed"
        );

        let chrome = LayoutChrome::new(&config, true);
        assert_eq!(chrome.feed_href, "/journal/posts.xml");
        assert_eq!(chrome.new_post_href, "/journal/posts/new");
    }

    #[test]
    fn notices_round_trip_through_query_values() {
        for notice in [
            Notice::Created,
            Notice::Updated,
            Notice::Destroyed,
            Notice::Commented,
        ] {
            assert_eq!(Notice::parse(Some(notice.as_str())), Some(notice));
        }
        assert_eq!(Notice::parse(Some("bogus")), None);
    }

    #[test]
    fn chrome_titles_include_site_name() {
        let config = BlogConfig::default();
        let chrome = LayoutChrome::new(&config, false).with_title("Blog Posts | rust");
        assert_eq!(chrome.page_title, "Blog Posts | rust | Blog");
        assert!(!chrome.show_admin_links());
    }
}

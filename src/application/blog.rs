//! Immutable blog configuration handed to the posts service and router.

use url::Url;

use crate::domain::posts::TruncateOptions;
use crate::domain::types::{CommentsMode, DEFAULT_SEARCH_ENGINES, SearchEngine, StateCatalog};

pub const DEFAULT_LAYOUT: &str = "application";
pub const DEFAULT_TITLE: &str = "Blog";
pub const DEFAULT_POSTS_PER_PAGE: u32 = 5;
pub const DEFAULT_SHORT_BODY_LENGTH_LIMIT: usize = 400;
pub const DEFAULT_DISPLAY_NAME_METHOD: &str = "username";
pub const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:3000/";

/// Whether and where mutations are announced to search engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingPolicy {
    Disabled,
    Engines(Vec<SearchEngine>),
}

impl PingPolicy {
    /// `true` pings the default engine set.
    pub fn enabled_with_defaults() -> Self {
        Self::Engines(DEFAULT_SEARCH_ENGINES.to_vec())
    }

    pub fn engines(&self) -> &[SearchEngine] {
        match self {
            Self::Disabled => &[],
            Self::Engines(engines) => engines,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlogConfig {
    pub layout: String,
    pub title: String,
    pub description: String,
    pub include_admin_actions: bool,
    pub ping_search_engines: PingPolicy,
    pub posts_per_page: u32,
    pub states: StateCatalog,
    pub short_body_length_limit: usize,
    pub blogger_display_name_method: String,
    pub author_edits_only: bool,
    pub include_comments: CommentsMode,
    pub public_url: Url,
}

impl BlogConfig {
    /// Absolute URL of the unpaginated XML listing.
    pub fn feed_url(&self) -> Url {
        self.public_url
            .join("posts.xml")
            .unwrap_or_else(|_| self.public_url.clone())
    }

    /// Path prefix the blog is served under, taken from `public_url`; empty at the root.
    pub fn mount_path(&self) -> &str {
        self.public_url.path().trim_end_matches('/')
    }

    pub fn post_url(&self, param: &str) -> Url {
        self.public_url
            .join(&format!("posts/{param}"))
            .unwrap_or_else(|_| self.public_url.clone())
    }

    pub fn short_body_options(&self) -> TruncateOptions {
        TruncateOptions::short_body(self.short_body_length_limit)
    }

    /// Pings only go out while the write surface itself is enabled.
    pub fn pings_enabled(&self) -> bool {
        self.include_admin_actions && !self.ping_search_engines.engines().is_empty()
    }
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            include_admin_actions: true,
            ping_search_engines: PingPolicy::Disabled,
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            states: StateCatalog::default(),
            short_body_length_limit: DEFAULT_SHORT_BODY_LENGTH_LIMIT,
            blogger_display_name_method: DEFAULT_DISPLAY_NAME_METHOD.to_string(),
            author_edits_only: false,
            include_comments: CommentsMode::None,
            public_url: Url::parse(DEFAULT_PUBLIC_URL).expect("default public url is valid"),
        }
    }
}

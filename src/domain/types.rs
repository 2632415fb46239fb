//! Shared domain enumerations driven by blog configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The configured lifecycle states, split into publicly visible and hidden ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateCatalog {
    active: Vec<String>,
    hidden: Vec<String>,
}

impl StateCatalog {
    pub fn new(active: Vec<String>, hidden: Vec<String>) -> Self {
        Self { active, hidden }
    }

    pub fn active(&self) -> &[String] {
        &self.active
    }

    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }

    pub fn is_active(&self, state: &str) -> bool {
        self.active.iter().any(|candidate| candidate == state)
    }

    pub fn contains(&self, state: &str) -> bool {
        self.is_active(state) || self.hidden.iter().any(|candidate| candidate == state)
    }

    /// Every allowed state, hidden ones first.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.hidden
            .iter()
            .chain(self.active.iter())
            .map(String::as_str)
    }

    /// State preselected on a fresh post form.
    pub fn initial_state(&self) -> &str {
        self.hidden
            .first()
            .or_else(|| self.active.first())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Default for StateCatalog {
    fn default() -> Self {
        Self::new(vec!["published".to_string()], vec!["draft".to_string()])
    }
}

/// Which comment backend posts are wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentsMode {
    /// Comments are stored alongside posts and readable through the post.
    Native,
    /// Comments are rendered by an external embed; posts hold none.
    Disqus,
    #[default]
    None,
}

impl CommentsMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Disqus => "disqus",
            Self::None => "none",
        }
    }
}

impl FromStr for CommentsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "native" => Ok(Self::Native),
            "disqus" => Ok(Self::Disqus),
            "none" | "" => Ok(Self::None),
            other => Err(format!("unknown comments mode `{other}`")),
        }
    }
}

/// Search engines that accept feed pings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEngine {
    Google,
    Bing,
}

pub const DEFAULT_SEARCH_ENGINES: &[SearchEngine] = &[SearchEngine::Google, SearchEngine::Bing];

impl SearchEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Bing => "bing",
        }
    }

    /// Base ping endpoint and the query parameter carrying the feed URL.
    pub fn endpoint(self) -> (&'static str, &'static str) {
        match self {
            Self::Google => ("https://www.google.com/webmasters/tools/ping", "sitemap"),
            Self::Bing => ("https://www.bing.com/webmaster/ping.aspx", "siteMap"),
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "bing" => Ok(Self::Bing),
            other => Err(format!("unsupported search engine `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_distinguishes_active_and_hidden_states() {
        let catalog = StateCatalog::new(
            vec!["published".into(), "featured".into()],
            vec!["draft".into()],
        );

        assert!(catalog.is_active("featured"));
        assert!(!catalog.is_active("draft"));
        assert!(catalog.contains("draft"));
        assert!(!catalog.contains("archived"));
        assert_eq!(catalog.initial_state(), "draft");
        assert_eq!(
            catalog.all().collect::<Vec<_>>(),
            vec!["draft", "published", "featured"]
        );
    }

    #[test]
    fn search_engines_parse_case_insensitively() {
        assert_eq!("Google".parse::<SearchEngine>(), Ok(SearchEngine::Google));
        assert!("altavista".parse::<SearchEngine>().is_err());
    }
}

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::Paginated;
use crate::application::repos::RepoError;
use crate::domain::comments::NewComment;
use crate::domain::entities::{CommentRecord, PostRecord, TagCount};
use crate::domain::error::{DomainError, ValidationErrors};
use crate::domain::posts::{MonthCount, MonthKey, PostDraft};

pub const LISTING_TITLE: &str = "Blog Posts";

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("post not found")]
    NotFound,
    #[error("post is invalid: {errors}")]
    Invalid {
        draft: Box<PostDraft>,
        errors: ValidationErrors,
    },
    #[error("comment is invalid: {errors}")]
    InvalidComment {
        comment: NewComment,
        errors: ValidationErrors,
    },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A post prepared for listing or display.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub record: PostRecord,
    pub param: String,
    pub short_body: String,
    pub blogger_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostListing {
    /// Page title; `None` for the unfiltered index.
    pub title: Option<String>,
    pub posts: Paginated<PostView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostView,
    /// Present only when comments are stored natively.
    pub comments: Option<Vec<CommentRecord>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentPost {
    pub title: String,
    pub param: String,
    pub published_at: OffsetDateTime,
}

impl From<&PostRecord> for RecentPost {
    fn from(record: &PostRecord) -> Self {
        Self {
            title: record.title.clone(),
            param: record.to_param(),
            published_at: record.published_at,
        }
    }
}

/// Navigation data shown next to listings and single posts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Sidebar {
    pub tags: Vec<TagCount>,
    pub months: Vec<MonthCount>,
    pub recent: Vec<RecentPost>,
}

pub fn tagged_title(tag: &str) -> String {
    format!("{LISTING_TITLE} | {tag}")
}

pub fn archive_title(month: &MonthKey) -> String {
    format!("{LISTING_TITLE} | {}", month.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_follow_listing_prefix() {
        assert_eq!(tagged_title("rust"), "Blog Posts | rust");
        let month = MonthKey::new(2026, 2).unwrap();
        assert_eq!(archive_title(&month), "Blog Posts | February 2026");
    }
}

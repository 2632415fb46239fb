//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{
    BloggerRecord, BloggerRef, BloggerTokenRecord, CommentRecord, PostRecord, TagCount,
};
use crate::domain::posts::{MonthCount, MonthKey};
use crate::domain::types::StateCatalog;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which lifecycle states a listing may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostListScope {
    /// Every post regardless of state; used for authenticated callers.
    All,
    /// Only posts whose state is one of `states`.
    Active { states: Vec<String> },
}

impl PostListScope {
    pub fn active(catalog: &StateCatalog) -> Self {
        Self::Active {
            states: catalog.active().to_vec(),
        }
    }

    pub fn admits(&self, state: &str) -> bool {
        match self {
            Self::All => true,
            Self::Active { states } => states.iter().any(|candidate| candidate == state),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQueryFilter {
    pub tag: Option<String>,
    pub month: Option<MonthKey>,
}

impl PostQueryFilter {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn in_month(month: MonthKey) -> Self {
        Self {
            month: Some(month),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub body: String,
    pub footnotes: Option<String>,
    pub state: String,
    pub published_at: OffsetDateTime,
    pub blogger: BloggerRef,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub footnotes: Option<String>,
    pub state: String,
    pub published_at: OffsetDateTime,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CreateBloggerTokenParams {
    pub blogger_id: i64,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts ordered by `published_at` descending; `page` of `None` returns every match.
    async fn list_posts(
        &self,
        scope: &PostListScope,
        filter: &PostQueryFilter,
        page: Option<PageRequest>,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(
        &self,
        scope: &PostListScope,
        filter: &PostQueryFilter,
    ) -> Result<u64, RepoError>;

    /// Post counts per calendar month, newest month first.
    async fn list_month_counts(
        &self,
        scope: &PostListScope,
    ) -> Result<Vec<MonthCount>, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Insert the post and its taggings atomically.
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Update the post and replace its taggings atomically.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Hard delete; taggings and comments go with it.
    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// Tags attached to at least one post, most used first.
    async fn list_used_tags(&self) -> Result<Vec<TagCount>, RepoError>;
}

#[async_trait]
pub trait BloggersRepo: Send + Sync {
    async fn find_blogger(&self, id: i64) -> Result<Option<BloggerRecord>, RepoError>;

    async fn find_bloggers(&self, ids: &[i64]) -> Result<Vec<BloggerRecord>, RepoError>;

    async fn find_by_username(&self, username: &str)
    -> Result<Option<BloggerRecord>, RepoError>;

    async fn create_blogger(
        &self,
        username: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<BloggerRecord, RepoError>;
}

#[async_trait]
pub trait BloggerTokensRepo: Send + Sync {
    async fn create_token(
        &self,
        params: CreateBloggerTokenParams,
    ) -> Result<BloggerTokenRecord, RepoError>;

    async fn find_by_prefix(&self, prefix: &str)
    -> Result<Option<BloggerTokenRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use time::{OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;
use url::Url;

use scriba::application::auth::{BloggerAuthService, CurrentBlogger, IssueTokenCommand};
use scriba::application::blog::BlogConfig;
use scriba::application::pagination::PageRequest;
use scriba::application::ping::{PingDispatcher, PingError, SearchEnginePinger};
use scriba::application::posts::PostService;
use scriba::application::repos::{
    BloggerTokensRepo, BloggersRepo, CommentsRepo, CreateBloggerTokenParams, CreateCommentParams,
    CreatePostParams, HealthRepo, PostListScope, PostQueryFilter, PostsRepo, PostsWriteRepo,
    RepoError, TagsRepo, UpdatePostParams,
};
use scriba::application::syndication::SyndicationService;
use scriba::domain::entities::{
    BloggerRecord, BloggerRef, BloggerTokenRecord, CommentRecord, PostRecord, TagCount,
};
use scriba::domain::posts::{MonthCount, MonthKey};
use scriba::domain::types::SearchEngine;
use scriba::infra::http::HttpState;

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    posts: Vec<PostRecord>,
    bloggers: Vec<BloggerRecord>,
    tokens: Vec<BloggerTokenRecord>,
    comments: Vec<CommentRecord>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory stand-in for every repository the posts service talks to.
#[derive(Default)]
pub struct MemoryRepos {
    state: Mutex<MemoryState>,
}

fn matches(post: &PostRecord, scope: &PostListScope, filter: &PostQueryFilter) -> bool {
    if !scope.admits(&post.state) {
        return false;
    }
    if let Some(tag) = filter.tag.as_ref()
        && !post
            .tags
            .iter()
            .any(|candidate| candidate.to_lowercase() == tag.to_lowercase())
    {
        return false;
    }
    if let Some(month) = filter.month
        && !month.contains(post.published_at)
    {
        return false;
    }
    true
}

impl MemoryRepos {
    pub async fn insert_blogger(&self, username: &str, name: Option<&str>) -> BloggerRecord {
        self.create_blogger(username, name, None)
            .await
            .expect("insert blogger")
    }

    pub async fn insert_post(
        &self,
        blogger: &BloggerRecord,
        title: &str,
        state: &str,
        published_at: OffsetDateTime,
        tags: &[&str],
    ) -> PostRecord {
        self.create_post(CreatePostParams {
            title: title.to_string(),
            body: format!("Body of {title}\nsecond line of the body"),
            footnotes: None,
            state: state.to_string(),
            published_at,
            blogger: blogger.blogger_ref(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        })
        .await
        .expect("insert post")
    }

    pub async fn post(&self, id: i64) -> Option<PostRecord> {
        self.state
            .lock()
            .await
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn revoke_all_tokens(&self) {
        let mut state = self.state.lock().await;
        for token in state.tokens.iter_mut() {
            token.revoked_at = Some(OffsetDateTime::now_utc() - time::Duration::minutes(1));
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn list_posts(
        &self,
        scope: &PostListScope,
        filter: &PostQueryFilter,
        page: Option<PageRequest>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut posts: Vec<PostRecord> = state
            .posts
            .iter()
            .filter(|post| matches(post, scope, filter))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(match page {
            Some(page) => posts
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .collect(),
            None => posts,
        })
    }

    async fn count_posts(
        &self,
        scope: &PostListScope,
        filter: &PostQueryFilter,
    ) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .filter(|post| matches(post, scope, filter))
            .count() as u64)
    }

    async fn list_month_counts(
        &self,
        scope: &PostListScope,
    ) -> Result<Vec<MonthCount>, RepoError> {
        let state = self.state.lock().await;
        let mut buckets: Vec<(MonthKey, u64)> = Vec::new();
        for post in state.posts.iter().filter(|post| scope.admits(&post.state)) {
            let month = post.month();
            match buckets.iter_mut().find(|(key, _)| *key == month) {
                Some((_, count)) => *count += 1,
                None => buckets.push((month, 1)),
            }
        }
        buckets.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(buckets
            .into_iter()
            .map(|(month, count)| MonthCount::new(month, count))
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.post(id).await)
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let now = OffsetDateTime::now_utc();
        let record = PostRecord {
            id: state.next_id(),
            title: params.title,
            body: params.body,
            footnotes: params.footnotes,
            state: params.state,
            published_at: params.published_at,
            blogger: params.blogger,
            tags: params.tags,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.body = params.body;
        post.footnotes = params.footnotes;
        post.state = params.state;
        post.published_at = params.published_at;
        post.tags = params.tags;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl TagsRepo for MemoryRepos {
    async fn list_used_tags(&self) -> Result<Vec<TagCount>, RepoError> {
        let state = self.state.lock().await;
        let mut counts: Vec<TagCount> = Vec::new();
        for tag in state.posts.iter().flat_map(|post| post.tags.iter()) {
            match counts.iter_mut().find(|count| &count.name == tag) {
                Some(count) => count.count += 1,
                None => counts.push(TagCount {
                    name: tag.clone(),
                    count: 1,
                }),
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        Ok(counts)
    }
}

#[async_trait]
impl BloggersRepo for MemoryRepos {
    async fn find_blogger(&self, id: i64) -> Result<Option<BloggerRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.bloggers.iter().find(|b| b.id == id).cloned())
    }

    async fn find_bloggers(&self, ids: &[i64]) -> Result<Vec<BloggerRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .bloggers
            .iter()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<BloggerRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .bloggers
            .iter()
            .find(|b| b.username == username)
            .cloned())
    }

    async fn create_blogger(
        &self,
        username: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<BloggerRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.bloggers.iter().any(|b| b.username == username) {
            return Err(RepoError::Duplicate {
                constraint: "bloggers_username_key".to_string(),
            });
        }
        let record = BloggerRecord {
            id: state.next_id(),
            kind: "User".to_string(),
            username: username.to_string(),
            name: name.map(str::to_string),
            email: email.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        state.bloggers.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl BloggerTokensRepo for MemoryRepos {
    async fn create_token(
        &self,
        params: CreateBloggerTokenParams,
    ) -> Result<BloggerTokenRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = BloggerTokenRecord {
            id: state.next_id(),
            blogger_id: params.blogger_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            created_at: OffsetDateTime::now_utc(),
            revoked_at: None,
        };
        state.tokens.push(record.clone());
        Ok(record)
    }

    async fn find_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<BloggerTokenRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.tokens.iter().find(|t| t.prefix == prefix).cloned())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepos {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = CommentRecord {
            id: state.next_id(),
            post_id: params.post_id,
            name: params.name,
            email: params.email,
            body: params.body,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepos {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Records every ping instead of sending it.
#[derive(Default)]
pub struct RecordingPinger {
    calls: Mutex<Vec<(SearchEngine, Url)>>,
}

impl RecordingPinger {
    pub async fn calls(&self) -> Vec<(SearchEngine, Url)> {
        self.calls.lock().await.clone()
    }

    /// Pings run on detached tasks; poll until `expected` have landed.
    pub async fn wait_for(&self, expected: usize) -> Vec<(SearchEngine, Url)> {
        for _ in 0..100 {
            let calls = self.calls().await;
            if calls.len() >= expected {
                return calls;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        self.calls().await
    }
}

#[async_trait]
impl SearchEnginePinger for RecordingPinger {
    async fn ping(&self, engine: SearchEngine, feed_url: &Url) -> Result<(), PingError> {
        self.calls.lock().await.push((engine, feed_url.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub repos: Arc<MemoryRepos>,
    pub pinger: Arc<RecordingPinger>,
    pub config: Arc<BlogConfig>,
    pub posts: PostService,
    pub auth: BloggerAuthService,
}

impl Harness {
    pub fn new(config: BlogConfig) -> Self {
        let repos = Arc::new(MemoryRepos::default());
        let pinger = Arc::new(RecordingPinger::default());
        let config = Arc::new(config);
        let pings = PingDispatcher::new(pinger.clone(), &config);
        let posts = PostService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            pings,
            config.clone(),
        );
        let auth = BloggerAuthService::new(repos.clone(), repos.clone());

        Self {
            repos,
            pinger,
            config,
            posts,
            auth,
        }
    }

    pub fn http_state(&self) -> HttpState {
        HttpState {
            posts: self.posts.clone(),
            syndication: SyndicationService::new(self.posts.clone()),
            auth: self.auth.clone(),
            health: self.repos.clone(),
            blog: self.config.clone(),
        }
    }

    /// Issue a token for `username` and return it with the authenticated blogger.
    pub async fn sign_in(&self, username: &str) -> (String, CurrentBlogger) {
        let issued = self
            .auth
            .issue(IssueTokenCommand {
                username: username.to_string(),
                name: None,
                email: None,
            })
            .await
            .expect("issue token");
        let current = self
            .auth
            .authenticate(&issued.token)
            .await
            .expect("authenticate");
        (issued.token, current)
    }
}

pub fn ts_jan() -> OffsetDateTime {
    datetime!(2024-01-15 10:00 UTC)
}

pub fn ts_feb() -> OffsetDateTime {
    datetime!(2024-02-10 09:30 UTC)
}

pub fn ts_mar() -> OffsetDateTime {
    datetime!(2024-03-05 18:45 UTC)
}

pub fn other_author_ref(id: i64) -> BloggerRef {
    BloggerRef::new("Admin", id)
}

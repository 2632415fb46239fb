use std::collections::HashMap;
use std::sync::Arc;

use crate::application::auth::CurrentBlogger;
use crate::application::blog::BlogConfig;
use crate::application::ping::PingDispatcher;
use crate::application::repos::{
    BloggersRepo, CommentsRepo, PostListScope, PostsRepo, PostsWriteRepo, TagsRepo,
};
use crate::domain::bloggers::Blogger;
use crate::domain::entities::{BloggerRecord, PostRecord};

use super::types::{PostServiceError, PostView};

#[derive(Clone)]
pub struct PostService {
    pub(crate) reader: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) tags: Arc<dyn TagsRepo>,
    pub(crate) bloggers: Arc<dyn BloggersRepo>,
    pub(crate) comments: Arc<dyn CommentsRepo>,
    pub(crate) pings: PingDispatcher,
    pub(crate) config: Arc<BlogConfig>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        tags: Arc<dyn TagsRepo>,
        bloggers: Arc<dyn BloggersRepo>,
        comments: Arc<dyn CommentsRepo>,
        pings: PingDispatcher,
        config: Arc<BlogConfig>,
    ) -> Self {
        Self {
            reader,
            writer,
            tags,
            bloggers,
            comments,
            pings,
            config,
        }
    }

    pub fn config(&self) -> &BlogConfig {
        &self.config
    }

    /// Authenticated callers see every state; everyone else only active posts.
    pub(crate) fn scope_for(&self, viewer: Option<&CurrentBlogger>) -> PostListScope {
        match viewer {
            Some(_) => PostListScope::All,
            None => self.public_scope(),
        }
    }

    pub(crate) fn public_scope(&self) -> PostListScope {
        PostListScope::active(&self.config.states)
    }

    /// Resolve authors and derived fields for a batch of posts.
    pub(crate) async fn present(
        &self,
        records: Vec<PostRecord>,
    ) -> Result<Vec<PostView>, PostServiceError> {
        let mut ids: Vec<i64> = records.iter().map(|record| record.blogger.id).collect();
        ids.sort_unstable();
        ids.dedup();

        let bloggers: HashMap<i64, BloggerRecord> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.bloggers
                .find_bloggers(&ids)
                .await?
                .into_iter()
                .map(|blogger| (blogger.id, blogger))
                .collect()
        };

        let options = self.config.short_body_options();
        records
            .into_iter()
            .map(|record| -> Result<PostView, PostServiceError> {
                let author = bloggers
                    .get(&record.blogger.id)
                    .filter(|blogger| blogger.kind == record.blogger.kind)
                    .map(|blogger| blogger as &dyn Blogger);
                let blogger_name = record
                    .blogger_display_name(author, &self.config.blogger_display_name_method)?;
                Ok(PostView {
                    param: record.to_param(),
                    short_body: record.short_body(&options),
                    blogger_name,
                    record,
                })
            })
            .collect()
    }

    pub(crate) async fn present_one(
        &self,
        record: PostRecord,
    ) -> Result<PostView, PostServiceError> {
        self.present(vec![record])
            .await?
            .pop()
            .ok_or(PostServiceError::NotFound)
    }
}

use time::OffsetDateTime;
use tracing::info;

use crate::application::auth::CurrentBlogger;
use crate::application::repos::{CreatePostParams, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;
use crate::domain::posts::{PostAttributes, PostDraft};
use crate::domain::slug::parse_post_param;

use super::service::PostService;
use super::types::PostServiceError;

impl PostService {
    /// Unsaved post for the form, preset with any supplied fields.
    pub fn new_post(&self, blogger: &CurrentBlogger, attributes: PostAttributes) -> PostDraft {
        let mut draft = PostDraft::new(Some(blogger.blogger_ref()), &self.config.states);
        draft.assign(attributes);
        draft
    }

    pub async fn edit_post(
        &self,
        blogger: &CurrentBlogger,
        param: &str,
    ) -> Result<PostDraft, PostServiceError> {
        let record = self.find_editable(blogger, param).await?;
        Ok(PostDraft::from_record(&record))
    }

    pub async fn create_post(
        &self,
        blogger: &CurrentBlogger,
        attributes: PostAttributes,
    ) -> Result<PostRecord, PostServiceError> {
        let draft = self.new_post(blogger, attributes);
        if let Err(errors) = draft.validate(&self.config.states) {
            return Err(PostServiceError::Invalid {
                draft: Box::new(draft),
                errors,
            });
        }

        let tags = draft.tags();
        let PostDraft {
            title,
            body,
            footnotes,
            state,
            published_at,
            blogger: author,
            ..
        } = draft;

        let params = CreatePostParams {
            title,
            body,
            footnotes,
            state,
            published_at: published_at.unwrap_or_else(OffsetDateTime::now_utc),
            blogger: author.unwrap_or_else(|| blogger.blogger_ref()),
            tags,
        };

        let post = self.writer.create_post(params).await?;
        info!(
            target = "application::posts",
            post_id = post.id,
            blogger = %blogger.blogger.username,
            state = %post.state,
            "post created"
        );

        self.pings.dispatch();
        Ok(post)
    }

    pub async fn update_post(
        &self,
        blogger: &CurrentBlogger,
        param: &str,
        attributes: PostAttributes,
    ) -> Result<PostRecord, PostServiceError> {
        let existing = self.find_editable(blogger, param).await?;

        let mut draft = PostDraft::from_record(&existing);
        draft.assign(attributes);
        if let Err(errors) = draft.validate(&self.config.states) {
            return Err(PostServiceError::Invalid {
                draft: Box::new(draft),
                errors,
            });
        }

        let tags = draft.tags();
        let params = UpdatePostParams {
            id: existing.id,
            title: draft.title,
            body: draft.body,
            footnotes: draft.footnotes,
            state: draft.state,
            published_at: draft.published_at.unwrap_or(existing.published_at),
            tags,
        };

        let post = self
            .writer
            .update_post(params)
            .await
            .map_err(not_found_or_repo)?;
        info!(
            target = "application::posts",
            post_id = post.id,
            blogger = %blogger.blogger.username,
            state = %post.state,
            "post updated"
        );

        self.pings.dispatch();
        Ok(post)
    }

    pub async fn destroy_post(
        &self,
        blogger: &CurrentBlogger,
        param: &str,
    ) -> Result<PostRecord, PostServiceError> {
        let existing = self.find_editable(blogger, param).await?;

        self.writer
            .delete_post(existing.id)
            .await
            .map_err(not_found_or_repo)?;
        info!(
            target = "application::posts",
            post_id = existing.id,
            blogger = %blogger.blogger.username,
            "post destroyed"
        );

        self.pings.dispatch();
        Ok(existing)
    }

    /// Look a post up within what `blogger` may change: their own posts when
    /// edits are restricted to authors, any post otherwise.
    async fn find_editable(
        &self,
        blogger: &CurrentBlogger,
        param: &str,
    ) -> Result<PostRecord, PostServiceError> {
        let id = parse_post_param(param).ok_or(PostServiceError::NotFound)?;
        let record = self
            .reader
            .find_post(id)
            .await?
            .ok_or(PostServiceError::NotFound)?;

        if self.config.author_edits_only && record.blogger != blogger.blogger_ref() {
            return Err(PostServiceError::NotFound);
        }

        Ok(record)
    }
}

fn not_found_or_repo(err: RepoError) -> PostServiceError {
    match err {
        RepoError::NotFound => PostServiceError::NotFound,
        other => PostServiceError::Repo(other),
    }
}

use tracing::info;

use crate::application::repos::CreateCommentParams;
use crate::domain::comments::{NewComment, ensure_native_comments};
use crate::domain::entities::{CommentRecord, PostRecord};

use super::service::PostService;
use super::types::PostServiceError;

impl PostService {
    /// Comments stored for `post`; a configuration error unless comments are native.
    pub async fn comments_for(
        &self,
        post: &PostRecord,
    ) -> Result<Vec<CommentRecord>, PostServiceError> {
        ensure_native_comments(self.config.include_comments)?;
        Ok(self.comments.list_for_post(post.id).await?)
    }

    /// Append a comment to a publicly visible post.
    pub async fn add_comment(
        &self,
        param: &str,
        comment: NewComment,
    ) -> Result<(PostRecord, CommentRecord), PostServiceError> {
        ensure_native_comments(self.config.include_comments)?;

        let post = self.find_visible(&self.public_scope(), param).await?;

        if let Err(errors) = comment.validate() {
            return Err(PostServiceError::InvalidComment { comment, errors });
        }

        let NewComment { name, email, body } = comment;
        let created = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                name: name.trim().to_string(),
                email: email.filter(|email| !email.trim().is_empty()),
                body,
            })
            .await?;

        info!(
            target = "application::posts",
            post_id = post.id,
            comment_id = created.id,
            "comment added"
        );

        Ok((post, created))
    }
}

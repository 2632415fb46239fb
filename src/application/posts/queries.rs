use crate::application::auth::CurrentBlogger;
use crate::application::pagination::{PageRequest, Paginated};
use crate::application::repos::{PostListScope, PostQueryFilter};
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::posts::{MonthKey, RECENT_LIMIT};
use crate::domain::slug::parse_post_param;
use crate::domain::types::CommentsMode;

use super::service::PostService;
use super::types::{
    PostDetail, PostListing, PostServiceError, PostView, RecentPost, Sidebar, archive_title,
    tagged_title,
};

impl PostService {
    pub async fn index(
        &self,
        viewer: Option<&CurrentBlogger>,
        page: u32,
    ) -> Result<PostListing, PostServiceError> {
        self.listing(viewer, PostQueryFilter::default(), page, None)
            .await
    }

    pub async fn tagged(
        &self,
        viewer: Option<&CurrentBlogger>,
        tag: Option<&str>,
        page: u32,
    ) -> Result<PostListing, PostServiceError> {
        let tag = tag
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .ok_or_else(|| DomainError::malformed("a tag is required"))?;

        self.listing(
            viewer,
            PostQueryFilter::tagged(tag),
            page,
            Some(tagged_title(tag)),
        )
        .await
    }

    pub async fn archives(
        &self,
        viewer: Option<&CurrentBlogger>,
        year: Option<&str>,
        month: Option<&str>,
        page: u32,
    ) -> Result<PostListing, PostServiceError> {
        let month = MonthKey::parse(year, month)?;

        self.listing(
            viewer,
            PostQueryFilter::in_month(month),
            page,
            Some(archive_title(&month)),
        )
        .await
    }

    async fn listing(
        &self,
        viewer: Option<&CurrentBlogger>,
        filter: PostQueryFilter,
        page: u32,
        title: Option<String>,
    ) -> Result<PostListing, PostServiceError> {
        let scope = self.scope_for(viewer);
        let request = PageRequest::new(page, self.config.posts_per_page);

        let total = self.reader.count_posts(&scope, &filter).await?;
        let records = self
            .reader
            .list_posts(&scope, &filter, Some(request))
            .await?;
        let posts = self.present(records).await?;

        Ok(PostListing {
            title,
            posts: Paginated::new(posts, request, total),
        })
    }

    /// Every active post, newest first, for the XML and RSS representations.
    ///
    /// Feeds ignore the caller and pagination.
    pub async fn feed(&self) -> Result<Vec<PostView>, PostServiceError> {
        let records = self
            .reader
            .list_posts(&self.public_scope(), &PostQueryFilter::default(), None)
            .await?;
        self.present(records).await
    }

    pub async fn show(
        &self,
        viewer: Option<&CurrentBlogger>,
        param: &str,
    ) -> Result<PostDetail, PostServiceError> {
        let record = self.find_visible(&self.scope_for(viewer), param).await?;

        let comments = match self.config.include_comments {
            CommentsMode::Native => Some(self.comments_for(&record).await?),
            CommentsMode::Disqus | CommentsMode::None => None,
        };

        Ok(PostDetail {
            post: self.present_one(record).await?,
            comments,
        })
    }

    pub(crate) async fn find_visible(
        &self,
        scope: &PostListScope,
        param: &str,
    ) -> Result<PostRecord, PostServiceError> {
        let id = parse_post_param(param).ok_or(PostServiceError::NotFound)?;
        self.reader
            .find_post(id)
            .await?
            .filter(|record| scope.admits(&record.state))
            .ok_or(PostServiceError::NotFound)
    }

    /// The newest active posts, at most five.
    pub async fn recent(&self) -> Result<Vec<PostRecord>, PostServiceError> {
        let request = PageRequest::new(1, RECENT_LIMIT);
        let records = self
            .reader
            .list_posts(&self.public_scope(), &PostQueryFilter::default(), Some(request))
            .await?;
        Ok(records)
    }

    pub async fn sidebar(&self) -> Result<Sidebar, PostServiceError> {
        let tags = self.tags.list_used_tags().await?;
        let months = self.reader.list_month_counts(&self.public_scope()).await?;
        let recent = self.recent().await?.iter().map(RecentPost::from).collect();

        Ok(Sidebar {
            tags,
            months,
            recent,
        })
    }
}

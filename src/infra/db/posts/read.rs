use async_trait::async_trait;
use sqlx::{Executor, Postgres, QueryBuilder};

use crate::application::pagination::PageRequest;
use crate::application::repos::{PostListScope, PostQueryFilter, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::posts::{MonthCount, MonthKey};
use crate::infra::db::map_sqlx_error;

use super::PostgresRepositories;
use super::types::{POST_COLUMNS, PostRow, PostTagRow, attach_tags};

impl PostgresRepositories {
    /// Tag names for `post_ids`, in the order they were attached.
    pub(crate) async fn load_post_tags<'e, E>(
        executor: E,
        post_ids: &[i64],
    ) -> Result<Vec<PostTagRow>, RepoError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, PostTagRow>(
            "SELECT tg.post_id, t.name FROM taggings tg \
             INNER JOIN tags t ON t.id = tg.tag_id \
             WHERE tg.post_id = ANY($1) \
             ORDER BY tg.post_id, tg.position",
        )
        .bind(post_ids)
        .fetch_all(executor)
        .await
        .map_err(map_sqlx_error)
    }

    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<PostRecord>, RepoError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let tag_rows = Self::load_post_tags(self.pool(), &ids).await?;
        Ok(attach_tags(rows, tag_rows))
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: &PostListScope,
        filter: &PostQueryFilter,
        page: Option<PageRequest>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts p WHERE 1=1 ");

        Self::apply_scope_conditions(&mut qb, scope);
        Self::apply_filter(&mut qb, filter);

        qb.push(" ORDER BY p.published_at DESC, p.id DESC ");

        if let Some(page) = page {
            let limit = i64::try_from(page.limit())
                .map_err(|_| RepoError::from_persistence("page size exceeds supported range"))?;
            let offset = i64::try_from(page.offset())
                .map_err(|_| RepoError::from_persistence("page offset exceeds supported range"))?;
            qb.push(" LIMIT ");
            qb.push_bind(limit);
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.hydrate(rows).await
    }

    async fn count_posts(
        &self,
        scope: &PostListScope,
        filter: &PostQueryFilter,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_scope_conditions(&mut qb, scope);
        Self::apply_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_month_counts(
        &self,
        scope: &PostListScope,
    ) -> Result<Vec<MonthCount>, RepoError> {
        #[derive(sqlx::FromRow)]
        struct MonthRow {
            bucket_year: i32,
            bucket_month: i32,
            count: i64,
        }

        let mut qb = QueryBuilder::new(
            "SELECT EXTRACT(YEAR FROM p.published_at AT TIME ZONE 'UTC')::int AS bucket_year, \
             EXTRACT(MONTH FROM p.published_at AT TIME ZONE 'UTC')::int AS bucket_month, \
             COUNT(*) AS count FROM posts p WHERE 1=1 ",
        );
        Self::apply_scope_conditions(&mut qb, scope);
        qb.push(" GROUP BY bucket_year, bucket_month ORDER BY bucket_year DESC, bucket_month DESC ");

        let rows: Vec<MonthRow> = qb
            .build_query_as::<MonthRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let month = u8::try_from(row.bucket_month)
                .ok()
                .and_then(|month| MonthKey::new(row.bucket_year, month).ok())
                .ok_or_else(|| {
                    RepoError::from_persistence(format!(
                        "invalid archive bucket {}-{}",
                        row.bucket_year, row.bucket_month
                    ))
                })?;
            counts.push(MonthCount::new(month, Self::convert_count(row.count)?));
        }

        Ok(counts)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use super::PostgresRepositories;
use super::types::{POST_COLUMNS, PostRow, attach_tags};

impl PostgresRepositories {
    /// Replace the taggings of `post_id` with `tags`, creating missing tag rows.
    async fn replace_taggings(
        tx: &mut Transaction<'_, Postgres>,
        post_id: i64,
        tags: &[String],
    ) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM taggings WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        if tags.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO tags (name) SELECT UNNEST($1::text[]) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(tags)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO taggings (post_id, tag_id, position) \
             SELECT $1, t.id, input.position::int \
             FROM UNNEST($2::text[]) WITH ORDINALITY AS input(name, position) \
             INNER JOIN tags t ON t.name = input.name",
        )
        .bind(post_id)
        .bind(tags)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn reload_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        row: PostRow,
    ) -> Result<PostRecord, RepoError> {
        let tag_rows = Self::load_post_tags(&mut **tx, &[row.id]).await?;
        attach_tags(vec![row], tag_rows)
            .pop()
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            body,
            footnotes,
            state,
            published_at,
            blogger,
            tags,
        } = params;

        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts AS p (title, body, footnotes, state, published_at, \
             blogger_type, blogger_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(title)
        .bind(body)
        .bind(footnotes)
        .bind(state)
        .bind(published_at)
        .bind(blogger.kind)
        .bind(blogger.id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        Self::replace_taggings(&mut tx, row.id, &tags).await?;
        let record = Self::reload_in_tx(&mut tx, row).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            body,
            footnotes,
            state,
            published_at,
            tags,
        } = params;

        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts AS p SET title = $2, body = $3, footnotes = $4, state = $5, \
             published_at = $6, updated_at = $7 \
             WHERE p.id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(body)
        .bind(footnotes)
        .bind(state)
        .bind(published_at)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Self::replace_taggings(&mut tx, row.id, &tags).await?;
        let record = Self::reload_in_tx(&mut tx, row).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}

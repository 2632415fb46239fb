use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    BloggerTokensRepo, BloggersRepo, CreateBloggerTokenParams, RepoError,
};
use crate::domain::entities::{BloggerRecord, BloggerTokenRecord};

use super::{PostgresRepositories, map_sqlx_error};

/// Stored author type for rows in the `bloggers` table.
const DEFAULT_BLOGGER_KIND: &str = "User";

#[derive(sqlx::FromRow)]
struct BloggerRow {
    id: i64,
    kind: String,
    username: String,
    name: Option<String>,
    email: Option<String>,
    created_at: OffsetDateTime,
}

impl From<BloggerRow> for BloggerRecord {
    fn from(row: BloggerRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            username: row.username,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BloggerTokenRow {
    id: i64,
    blogger_id: i64,
    prefix: String,
    hashed_secret: Vec<u8>,
    created_at: OffsetDateTime,
    revoked_at: Option<OffsetDateTime>,
}

impl From<BloggerTokenRow> for BloggerTokenRecord {
    fn from(row: BloggerTokenRow) -> Self {
        Self {
            id: row.id,
            blogger_id: row.blogger_id,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            created_at: row.created_at,
            revoked_at: row.revoked_at,
        }
    }
}

#[async_trait]
impl BloggersRepo for PostgresRepositories {
    async fn find_blogger(&self, id: i64) -> Result<Option<BloggerRecord>, RepoError> {
        let row = sqlx::query_as::<_, BloggerRow>(
            "SELECT id, kind, username, name, email, created_at FROM bloggers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BloggerRecord::from))
    }

    async fn find_bloggers(&self, ids: &[i64]) -> Result<Vec<BloggerRecord>, RepoError> {
        let rows = sqlx::query_as::<_, BloggerRow>(
            "SELECT id, kind, username, name, email, created_at FROM bloggers \
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BloggerRecord::from).collect())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<BloggerRecord>, RepoError> {
        let row = sqlx::query_as::<_, BloggerRow>(
            "SELECT id, kind, username, name, email, created_at FROM bloggers \
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BloggerRecord::from))
    }

    async fn create_blogger(
        &self,
        username: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<BloggerRecord, RepoError> {
        let row = sqlx::query_as::<_, BloggerRow>(
            "INSERT INTO bloggers (kind, username, name, email, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, kind, username, name, email, created_at",
        )
        .bind(DEFAULT_BLOGGER_KIND)
        .bind(username)
        .bind(name)
        .bind(email)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}

#[async_trait]
impl BloggerTokensRepo for PostgresRepositories {
    async fn create_token(
        &self,
        params: CreateBloggerTokenParams,
    ) -> Result<BloggerTokenRecord, RepoError> {
        let CreateBloggerTokenParams {
            blogger_id,
            prefix,
            hashed_secret,
        } = params;

        let row = sqlx::query_as::<_, BloggerTokenRow>(
            "INSERT INTO blogger_tokens (blogger_id, prefix, hashed_secret, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, blogger_id, prefix, hashed_secret, created_at, revoked_at",
        )
        .bind(blogger_id)
        .bind(prefix)
        .bind(hashed_secret)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<BloggerTokenRecord>, RepoError> {
        let row = sqlx::query_as::<_, BloggerTokenRow>(
            "SELECT id, blogger_id, prefix, hashed_secret, created_at, revoked_at \
             FROM blogger_tokens WHERE prefix = $1",
        )
        .bind(prefix)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BloggerTokenRecord::from))
    }
}

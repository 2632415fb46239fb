use async_trait::async_trait;

use crate::application::repos::{RepoError, TagsRepo};
use crate::domain::entities::TagCount;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TagCountRow {
    name: String,
    usage_count: i64,
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn list_used_tags(&self) -> Result<Vec<TagCount>, RepoError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            "SELECT t.name, COUNT(tg.post_id) AS usage_count \
             FROM tags t INNER JOIN taggings tg ON tg.tag_id = t.id \
             GROUP BY t.id, t.name \
             HAVING COUNT(tg.post_id) > 0 \
             ORDER BY usage_count DESC, t.name ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| -> Result<TagCount, RepoError> {
                Ok(TagCount {
                    name: row.name,
                    count: Self::convert_count(row.usage_count)?,
                })
            })
            .collect()
    }
}

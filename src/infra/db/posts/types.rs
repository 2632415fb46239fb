use std::collections::HashMap;

use time::OffsetDateTime;

use crate::domain::entities::{BloggerRef, PostRecord};

pub(crate) const POST_COLUMNS: &str = "p.id, p.title, p.body, p.footnotes, p.state, \
     p.published_at, p.blogger_type, p.blogger_id, p.created_at, p.updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) footnotes: Option<String>,
    pub(crate) state: String,
    pub(crate) published_at: OffsetDateTime,
    pub(crate) blogger_type: String,
    pub(crate) blogger_id: i64,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostTagRow {
    pub(crate) post_id: i64,
    pub(crate) name: String,
}

impl PostRow {
    pub(crate) fn into_record(self, tags: Vec<String>) -> PostRecord {
        PostRecord {
            id: self.id,
            title: self.title,
            body: self.body,
            footnotes: self.footnotes,
            state: self.state,
            published_at: self.published_at,
            blogger: BloggerRef::new(self.blogger_type, self.blogger_id),
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Zip rows with their tag names, keeping row order.
pub(crate) fn attach_tags(rows: Vec<PostRow>, tag_rows: Vec<PostTagRow>) -> Vec<PostRecord> {
    let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
    for row in tag_rows {
        tags.entry(row.post_id).or_default().push(row.name);
    }

    rows.into_iter()
        .map(|row| {
            let names = tags.remove(&row.id).unwrap_or_default();
            row.into_record(names)
        })
        .collect()
}

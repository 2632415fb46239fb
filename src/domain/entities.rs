//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

/// Polymorphic reference to whichever entity authored a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BloggerRef {
    pub kind: String,
    pub id: i64,
}

impl BloggerRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub footnotes: Option<String>,
    pub state: String,
    pub published_at: OffsetDateTime,
    pub blogger: BloggerRef,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloggerRecord {
    pub id: i64,
    pub kind: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: OffsetDateTime,
}

impl BloggerRecord {
    pub fn blogger_ref(&self) -> BloggerRef {
        BloggerRef::new(self.kind.clone(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub body: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BloggerTokenRecord {
    pub id: i64,
    pub blogger_id: i64,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
}

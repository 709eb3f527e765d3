use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A topical community posts can be filed under. Groups are created
/// administratively; the API only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
}

/// A published post as it appears in feeds and detail pages.
/// `id` doubles as the insertion sequence number: feed ordering is
/// `created_at DESC, id DESC`, so two posts written within the same
/// second still come back newest-insert-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: Uuid,
    pub author_username: String,
    pub group: Option<Group>,
    pub text: String,
    pub image_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post. Comments are listed oldest-first, unlike feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

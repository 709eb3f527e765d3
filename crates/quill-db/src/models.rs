/// Database row types. These map directly to SQLite rows.
/// Distinct from quill-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct GroupRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
}

pub struct PostRow {
    pub id: i64,
    pub author_id: String,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub group_description: Option<String>,
    pub text: String,
    pub image_id: Option<String>,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: String,
    pub author_username: String,
    pub text: String,
    pub created_at: String,
}

pub struct MediaRow {
    pub id: String,
    pub owner_id: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: String,
}

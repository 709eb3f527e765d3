use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, Group, Post};

// -- JWT Claims --

/// JWT claims shared between quill-api's REST middleware and token
/// issuance. Canonical definition lives here in quill-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Pagination --

/// Metadata attached to every paginated listing. Page numbers are
/// 1-based and already clamped to the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

// -- Feeds --

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub items: Vec<Post>,
    pub page: PageMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupFeedResponse {
    pub group: Group,
    pub items: Vec<Post>,
    pub page: PageMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub username: String,
    /// Whether the authenticated viewer follows this author.
    /// Always false for anonymous viewers and for the author themselves.
    pub following: bool,
    pub items: Vec<Post>,
    pub page: PageMeta,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPostRequest {
    pub text: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub image_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditPostRequest {
    pub text: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub image_id: Option<Uuid>,
}

/// Context for the compose form: the groups a post can be filed under.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComposeContext {
    pub groups: Vec<Group>,
}

/// Context for the edit form: the post being edited plus the group choices.
#[derive(Debug, Serialize, Deserialize)]
pub struct EditContext {
    pub post: Post,
    pub groups: Vec<Group>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub post: Post,
    /// Total number of posts by this post's author.
    pub posts_count: u64,
    pub comments: Vec<Comment>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommentRequest {
    pub text: String,
}

// -- Follows --

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    /// Terminal state after the call: true after follow, false after
    /// unfollow. Repeated calls report the same state.
    pub following: bool,
}

// -- Media --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub image_id: Uuid,
    pub size: u64,
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use tracing::warn;
use uuid::Uuid;

use quill_db::models::CommentRow;
use quill_types::api::AddCommentRequest;
use quill_types::models::Comment;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::feeds::parse_created_at;
use crate::middleware::Claims;
use crate::posts::{parse_post_id, validate_text};

/// `POST /{username}/{post_id}/comment/` attaches a comment to a post.
pub async fn add_comment(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let post_id = parse_post_id(&post_id)?;
    validate_text(&req.text)?;

    let db = state.clone();
    let comment = blocking(move || {
        let row = db.db.get_post(post_id)?.ok_or(ApiError::NotFound("post"))?;
        if row.author_username != username {
            return Err(ApiError::NotFound("post"));
        }

        let id = db.db.insert_comment(post_id, &claims.sub.to_string(), &req.text)?;

        Ok(Comment {
            id,
            post_id,
            author_id: claims.sub,
            author_username: claims.username,
            text: req.text,
            created_at: chrono::Utc::now(),
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub(crate) fn comment_response(row: CommentRow) -> Comment {
    let author_id = row.author_id.parse().unwrap_or_else(|e| {
        warn!("Corrupt author_id '{}' on comment {}: {}", row.author_id, row.id, e);
        Uuid::default()
    });
    let created_at = parse_created_at(&row.created_at, row.id);

    Comment {
        id: row.id,
        post_id: row.post_id,
        author_id,
        author_username: row.author_username,
        text: row.text,
        created_at,
    }
}

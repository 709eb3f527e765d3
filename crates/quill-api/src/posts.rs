use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use quill_db::Database;
use quill_types::api::{ComposeContext, EditContext, EditPostRequest, NewPostRequest, PostDetailResponse};
use quill_types::models::Post;

use crate::auth::AppState;
use crate::comments::comment_response;
use crate::error::{ApiError, ApiResult, blocking};
use crate::feeds::{group_response, post_response};
use crate::middleware::Claims;

/// `GET /new/` returns compose context, the groups a post can be filed under.
pub async fn new_post_form(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<ComposeContext>> {
    let db = state.clone();
    let groups = blocking(move || Ok(db.db.list_groups()?)).await?;

    Ok(Json(ComposeContext {
        groups: groups.into_iter().map(group_response).collect(),
    }))
}

/// `POST /new/` publishes a post. Invalidates the feed cache.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewPostRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_text(&req.text)?;

    let db = state.clone();
    let author_id = claims.sub.to_string();
    let post = blocking(move || {
        check_references(&db.db, req.group_id, req.image_id.map(|u| u.to_string()))?;

        let id = db.db.insert_post(
            &author_id,
            &req.text,
            req.group_id,
            req.image_id.map(|u| u.to_string()).as_deref(),
        )?;
        fetch_post(&db.db, id)
    })
    .await?;

    state.cache.invalidate();
    Ok((StatusCode::CREATED, Json(post)))
}

/// `GET /{username}/{post_id}/` returns the post, its author's post count, and
/// its comment thread oldest-first.
pub async fn post_detail(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> ApiResult<Json<PostDetailResponse>> {
    let post_id = parse_post_id(&post_id)?;
    let db = state.clone();
    let resp = blocking(move || {
        let row = db.db.get_post(post_id)?.ok_or(ApiError::NotFound("post"))?;
        if row.author_username != username {
            return Err(ApiError::NotFound("post"));
        }

        let posts_count = db.db.count_posts_by_author(&row.author_id)?;
        let comments = db
            .db
            .list_comments(post_id)?
            .into_iter()
            .map(comment_response)
            .collect();

        Ok(PostDetailResponse {
            post: post_response(row),
            posts_count,
            comments,
        })
    })
    .await?;

    Ok(Json(resp))
}

/// `GET /{username}/{post_id}/edit/` returns edit context for the post's author.
pub async fn edit_post_form(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<EditContext>> {
    let post_id = parse_post_id(&post_id)?;
    let db = state.clone();
    let editor_id = claims.sub.to_string();
    let resp = blocking(move || {
        let row = owned_post(&db.db, &username, post_id, &editor_id)?;
        let groups = db.db.list_groups()?;

        Ok(EditContext {
            post: post_response(row),
            groups: groups.into_iter().map(group_response).collect(),
        })
    })
    .await?;

    Ok(Json(resp))
}

/// `POST /{username}/{post_id}/edit/` rewrites a post's mutable fields.
/// Author only; `created_at` never changes. Invalidates the feed cache.
pub async fn edit_post(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditPostRequest>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_post_id(&post_id)?;
    validate_text(&req.text)?;

    let db = state.clone();
    let editor_id = claims.sub.to_string();
    let post = blocking(move || {
        owned_post(&db.db, &username, post_id, &editor_id)?;
        check_references(&db.db, req.group_id, req.image_id.map(|u| u.to_string()))?;

        db.db.update_post(
            post_id,
            &req.text,
            req.group_id,
            req.image_id.map(|u| u.to_string()).as_deref(),
        )?;
        fetch_post(&db.db, post_id)
    })
    .await?;

    state.cache.invalidate();
    Ok(Json(post))
}

/// The `{post_id}` segment matches anything, so a non-numeric id means no
/// such post exists: 404, not a deserialization error.
pub(crate) fn parse_post_id(raw: &str) -> ApiResult<i64> {
    raw.parse().map_err(|_| ApiError::NotFound("post"))
}

pub(crate) fn validate_text(text: &str) -> ApiResult<()> {
    if text.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "text",
            message: "must not be empty",
        });
    }
    Ok(())
}

fn check_references(db: &Database, group_id: Option<i64>, image_id: Option<String>) -> ApiResult<()> {
    if let Some(gid) = group_id {
        if db.get_group_by_id(gid)?.is_none() {
            return Err(ApiError::Validation {
                field: "group_id",
                message: "unknown group",
            });
        }
    }
    if let Some(img) = image_id {
        if db.get_media(&img)?.is_none() {
            return Err(ApiError::Validation {
                field: "image_id",
                message: "unknown image",
            });
        }
    }
    Ok(())
}

/// Resolve a post under `/{username}/{post_id}/` and require the caller to
/// be its author. A wrong username is a 404, a wrong author a 403.
fn owned_post(
    db: &Database,
    username: &str,
    post_id: i64,
    editor_id: &str,
) -> ApiResult<quill_db::models::PostRow> {
    let row = db.get_post(post_id)?.ok_or(ApiError::NotFound("post"))?;
    if row.author_username != username {
        return Err(ApiError::NotFound("post"));
    }
    if row.author_id != editor_id {
        return Err(ApiError::Forbidden);
    }
    Ok(row)
}

fn fetch_post(db: &Database, id: i64) -> ApiResult<Post> {
    let row = db
        .get_post(id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post {id} vanished after write")))?;
    Ok(post_response(row))
}

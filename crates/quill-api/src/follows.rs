use axum::extract::{Path, State};
use axum::{Extension, Json};

use quill_types::api::FollowResponse;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::middleware::Claims;

/// `POST /{username}/follow/` starts following an author. Already
/// following and self-follow are silent no-ops; the response reports the
/// terminal state either way.
pub async fn follow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<FollowResponse>> {
    let db = state.clone();
    let viewer_id = claims.sub.to_string();
    let following = blocking(move || {
        let target = db
            .db
            .get_user_by_username(&username)?
            .ok_or(ApiError::NotFound("user"))?;

        db.db.follow(&viewer_id, &target.id)?;
        Ok(db.db.is_following(&viewer_id, &target.id)?)
    })
    .await?;

    Ok(Json(FollowResponse { following }))
}

/// `POST /{username}/unfollow/` stops following. Removing a missing edge
/// is a no-op; calling twice lands in the same state.
pub async fn unfollow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<FollowResponse>> {
    let db = state.clone();
    let viewer_id = claims.sub.to_string();
    let following = blocking(move || {
        let target = db
            .db
            .get_user_by_username(&username)?
            .ok_or(ApiError::NotFound("user"))?;

        db.db.unfollow(&viewer_id, &target.id)?;
        Ok(db.db.is_following(&viewer_id, &target.id)?)
    })
    .await?;

    Ok(Json(FollowResponse { following }))
}

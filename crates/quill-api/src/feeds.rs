use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use quill_db::models::{GroupRow, PostRow};
use quill_types::api::{FeedResponse, GroupFeedResponse, ProfileResponse};
use quill_types::models::{Group, Post};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::middleware::{Claims, MaybeViewer};
use crate::pagination::{self, PAGE_SIZE};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// `GET /` lists every post, newest first. The one listing that sits behind
/// the read-through cache.
pub async fn global_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Response> {
    if let Some(body) = state.cache.get("global", query.page) {
        return Ok(Json(body).into_response());
    }
    let generation = state.cache.generation();

    let db = state.clone();
    let requested = query.page;
    let resp = blocking(move || {
        let total = db.db.count_posts()?;
        let page = pagination::paginate(total, requested);
        let rows = db.db.list_posts(PAGE_SIZE, pagination::offset(&page))?;
        Ok(FeedResponse {
            items: rows.into_iter().map(post_response).collect(),
            page,
        })
    })
    .await?;

    let body = serde_json::to_value(&resp).map_err(|e| ApiError::Internal(e.into()))?;
    state.cache.put("global", query.page, generation, body.clone());
    Ok(Json(body).into_response())
}

/// `GET /group/{slug}` lists the group's posts, newest first.
pub async fn group_feed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<GroupFeedResponse>> {
    let db = state.clone();
    let requested = query.page;
    let resp = blocking(move || {
        let group = db
            .db
            .get_group_by_slug(&slug)?
            .ok_or(ApiError::NotFound("group"))?;

        let total = db.db.count_posts_by_group(group.id)?;
        let page = pagination::paginate(total, requested);
        let rows = db
            .db
            .list_posts_by_group(group.id, PAGE_SIZE, pagination::offset(&page))?;

        Ok(GroupFeedResponse {
            group: group_response(group),
            items: rows.into_iter().map(post_response).collect(),
            page,
        })
    })
    .await?;

    Ok(Json(resp))
}

/// `GET /{username}/` lists the author's posts, plus whether the viewer
/// follows them. Anonymous viewers (and the author themselves) get
/// `following: false`.
pub async fn profile_feed(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<FeedQuery>,
    Extension(MaybeViewer(viewer)): Extension<MaybeViewer>,
) -> ApiResult<Json<ProfileResponse>> {
    let db = state.clone();
    let requested = query.page;
    let resp = blocking(move || {
        let user = db
            .db
            .get_user_by_username(&username)?
            .ok_or(ApiError::NotFound("user"))?;

        let total = db.db.count_posts_by_author(&user.id)?;
        let page = pagination::paginate(total, requested);
        let rows = db
            .db
            .list_posts_by_author(&user.id, PAGE_SIZE, pagination::offset(&page))?;

        let following = match &viewer {
            Some(claims) if claims.sub.to_string() != user.id => {
                db.db.is_following(&claims.sub.to_string(), &user.id)?
            }
            _ => false,
        };

        Ok(ProfileResponse {
            username: user.username,
            following,
            items: rows.into_iter().map(post_response).collect(),
            page,
        })
    })
    .await?;

    Ok(Json(resp))
}

/// `GET /follow/` lists posts by everyone the viewer follows. Protected; the
/// auth middleware rejects anonymous callers before this runs.
pub async fn follow_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<FeedResponse>> {
    let db = state.clone();
    let requested = query.page;
    let viewer_id = claims.sub.to_string();
    let resp = blocking(move || {
        let total = db.db.count_posts_by_followed(&viewer_id)?;
        let page = pagination::paginate(total, requested);
        let rows = db
            .db
            .list_posts_by_followed(&viewer_id, PAGE_SIZE, pagination::offset(&page))?;

        Ok(FeedResponse {
            items: rows.into_iter().map(post_response).collect(),
            page,
        })
    })
    .await?;

    Ok(Json(resp))
}

pub(crate) fn group_response(row: GroupRow) -> Group {
    Group {
        id: row.id,
        title: row.title,
        slug: row.slug,
        description: row.description,
    }
}

pub(crate) fn post_response(row: PostRow) -> Post {
    let author_id = row.author_id.parse().unwrap_or_else(|e| {
        warn!("Corrupt author_id '{}' on post {}: {}", row.author_id, row.id, e);
        Uuid::default()
    });
    let created_at = parse_created_at(&row.created_at, row.id);
    let group = match (row.group_id, row.group_title, row.group_slug) {
        (Some(id), Some(title), Some(slug)) => Some(Group {
            id,
            title,
            slug,
            description: row.group_description,
        }),
        _ => None,
    };

    Post {
        id: row.id,
        author_id,
        author_username: row.author_username,
        group,
        text: row.text,
        image_id: row.image_id.as_deref().and_then(|s| s.parse().ok()),
        created_at,
    }
}

pub(crate) fn parse_created_at(raw: &str, row_id: i64) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on row {}: {}", raw, row_id, e);
            chrono::DateTime::default()
        })
}

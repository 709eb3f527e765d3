use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::{optional_auth, require_auth};
use crate::{comments, feeds, follows, media, posts};

/// Assemble the full route table. Static segments win over captures, so
/// `/new/` and `/follow/` shadow the `/{username}/` profile route.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(feeds::global_feed))
        .route("/group/{slug}", get(feeds::group_feed))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/login/", get(auth::login_page))
        .route("/media/{image_id}", get(media::download_image))
        .route("/{username}/", get(feeds::profile_feed))
        .route("/{username}/{post_id}/", get(posts::post_detail))
        .layer(middleware::from_fn(optional_auth))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/new/", get(posts::new_post_form).post(posts::create_post))
        .route("/follow/", get(feeds::follow_feed))
        // axum caps bodies at 2 MB by default. Let the full image size
        // through, plus one byte so an oversize upload still reaches the
        // handler's validation response instead of a bare 413.
        .route(
            "/media",
            post(media::upload_image).layer(DefaultBodyLimit::max(media::MAX_IMAGE_SIZE + 1)),
        )
        .route("/{username}/follow/", get(follows::follow).post(follows::follow))
        .route("/{username}/unfollow/", get(follows::unfollow).post(follows::unfollow))
        .route(
            "/{username}/{post_id}/edit/",
            get(posts::edit_post_form).post(posts::edit_post),
        )
        .route("/{username}/{post_id}/comment/", post(comments::add_comment))
        .route_layer(middleware::from_fn(require_auth))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}

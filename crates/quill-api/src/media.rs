use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use tracing::error;
use uuid::Uuid;

use quill_types::api::UploadResponse;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::middleware::Claims;

/// 5 MB upload limit for post images
pub(crate) const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// `POST /media` accepts raw image bytes (application/octet-stream),
/// saves to the media dir under a fresh uuid, inserts a DB row, returns
/// `{ image_id, size }`. Anything that doesn't sniff as JPEG/PNG/GIF is a
/// validation failure.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    bytes: Bytes,
) -> ApiResult<impl IntoResponse> {
    if bytes.is_empty() {
        return Err(ApiError::Validation {
            field: "image",
            message: "empty upload",
        });
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::Validation {
            field: "image",
            message: "larger than 5 MB",
        });
    }

    let content_type = sniff_image(&bytes).ok_or(ApiError::Validation {
        field: "image",
        message: "not a JPEG, PNG, or GIF",
    })?;

    let image_id = Uuid::new_v4();
    let size = bytes.len() as i64;

    tokio::fs::create_dir_all(&state.media_dir).await.map_err(|e| {
        error!("Failed to create media directory: {}", e);
        ApiError::Internal(e.into())
    })?;

    let path = state.media_dir.join(image_id.to_string());
    tokio::fs::write(&path, &bytes).await.map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;

    let db = state.clone();
    let owner_id = claims.sub.to_string();
    blocking(move || {
        db.db
            .insert_media(&image_id.to_string(), &owner_id, content_type, size)?;
        Ok(())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            image_id,
            size: size as u64,
        }),
    ))
}

/// `GET /media/{image_id}` serves the stored blob with its sniffed
/// content type.
pub async fn download_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let id = image_id.to_string();
    let row = blocking(move || Ok(db.db.get_media(&id)?))
        .await?
        .ok_or(ApiError::NotFound("image"))?;

    let path = state.media_dir.join(&row.id);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        error!("Failed to read {}: {}", path.display(), e);
        ApiError::NotFound("image")
    })?;

    Ok(([(header::CONTENT_TYPE, row.content_type)], bytes))
}

fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_supported_formats() {
        assert_eq!(sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), Some("image/jpeg"));
        assert_eq!(
            sniff_image(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00]),
            Some("image/png")
        );
        assert_eq!(sniff_image(b"GIF89a......"), Some("image/gif"));
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(sniff_image(b"plain text file"), None);
        assert_eq!(sniff_image(&[]), None);
        assert_eq!(sniff_image(&[0x89, b'P', b'N']), None);
    }
}

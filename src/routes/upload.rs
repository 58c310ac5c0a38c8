// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File upload routes backed by Appwrite Storage.
//!
//! All routes here sit behind the `require_auth` guard applied in
//! routes/mod.rs.

use crate::error::{AppError, Result};
use crate::routes::ApiResponse;
use crate::services::storage::{AppwriteFile, AppwriteStorage};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    routing::get,
    routing::post,
    Json, Router,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum number of files per multiple-upload request.
const MAX_FILES_PER_UPLOAD: usize = 10;
/// Avatar size ceiling: 5 MB.
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(upload_file))
        .route("/multiple", post(upload_multiple))
        .route("/avatar", post(upload_avatar))
        .route("/list/all", get(list_files))
        .route("/{file_id}", get(get_file).delete(delete_file))
}

// ─── Response Shapes ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub download_url: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarThumbnails {
    pub small: String,
    pub medium: String,
    pub large: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAvatar {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub url: String,
    pub thumbnails: AvatarThumbnails,
    pub created_at: String,
}

fn is_image_mime_type(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

fn format_file_response(storage: &AppwriteStorage, file: &AppwriteFile) -> UploadedFile {
    let preview_url = is_image_mime_type(&file.mime_type)
        .then(|| storage.file_preview_url(&file.id, Some(400), Some(400), Some(80)));

    UploadedFile {
        id: file.id.clone(),
        name: file.name.clone(),
        mime_type: file.mime_type.clone(),
        size: file.size_original,
        url: storage.file_view_url(&file.id),
        preview_url,
        download_url: storage.file_download_url(&file.id),
        created_at: file.created_at.clone(),
    }
}

/// Fresh opaque file id for the provider.
fn generate_file_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ─── Multipart Helpers ───────────────────────────────────────

/// One buffered multipart file part.
struct FilePart {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Buffer every file part carried under `field_name`.
/// Parts without a filename are not files and are skipped.
async fn collect_file_parts(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Vec<FilePart>> {
    let mut parts = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let Some(filename) = field.file_name().map(|f| f.to_string()) else {
            continue;
        };

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?
            .to_vec();

        parts.push(FilePart {
            filename,
            content_type,
            bytes,
        });
    }

    Ok(parts)
}

// ─── Routes ──────────────────────────────────────────────────

/// POST /api/upload - upload a single file (field `file`).
async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedFile>>> {
    let mut parts = collect_file_parts(&mut multipart, "file").await?;

    let Some(part) = parts.pop() else {
        return Err(AppError::BadRequest(
            "No file provided. Please upload a file with key 'file'".to_string(),
        ));
    };

    let uploaded = state
        .storage
        .create_file(
            &generate_file_id(),
            &part.filename,
            &part.content_type,
            part.bytes,
        )
        .await?;

    tracing::info!(file_id = %uploaded.id, size = uploaded.size_original, "File uploaded");

    Ok(Json(ApiResponse::message_data(
        "File uploaded successfully",
        format_file_response(&state.storage, &uploaded),
    )))
}

/// POST /api/upload/multiple - upload up to 10 files (field `files`).
///
/// Uploads run concurrently. On partial failure the files that did make it
/// are deleted again (best effort) and the provider error is surfaced, so
/// the response never drops successful identifiers silently.
async fn upload_multiple(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Vec<UploadedFile>>>> {
    let parts = collect_file_parts(&mut multipart, "files").await?;

    if parts.is_empty() {
        return Err(AppError::BadRequest(
            "No files provided. Please upload files with key 'files'".to_string(),
        ));
    }

    if parts.len() > MAX_FILES_PER_UPLOAD {
        return Err(AppError::BadRequest(format!(
            "Maximum {} files allowed per upload",
            MAX_FILES_PER_UPLOAD
        )));
    }

    let uploads = parts.into_iter().map(|part| {
        let storage = state.storage.clone();
        let file_id = generate_file_id();
        async move {
            storage
                .create_file(&file_id, &part.filename, &part.content_type, part.bytes)
                .await
        }
    });

    let results = join_all(uploads).await;

    let mut uploaded = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(file) => uploaded.push(file),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(_) => {}
        }
    }

    if let Some(error) = first_error {
        // Roll back the uploads that did succeed.
        tracing::warn!(
            succeeded = uploaded.len(),
            "Partial multi-upload failure; rolling back"
        );
        let deletions = uploaded
            .iter()
            .map(|file| state.storage.delete_file(&file.id));
        for (file, result) in uploaded.iter().zip(join_all(deletions).await) {
            if let Err(e) = result {
                tracing::error!(file_id = %file.id, error = %e, "Rollback delete failed");
            }
        }
        return Err(error);
    }

    let data: Vec<UploadedFile> = uploaded
        .iter()
        .map(|file| format_file_response(&state.storage, file))
        .collect();

    Ok(Json(ApiResponse::message_data(
        format!("{} file(s) uploaded successfully", data.len()),
        data,
    )))
}

/// POST /api/upload/avatar - upload an avatar image (field `avatar`).
///
/// Image MIME types only, 5 MB ceiling; both checked before any provider
/// call.
async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedAvatar>>> {
    let mut parts = collect_file_parts(&mut multipart, "avatar").await?;

    let Some(part) = parts.pop() else {
        return Err(AppError::BadRequest(
            "No avatar provided. Please upload an image with key 'avatar'".to_string(),
        ));
    };

    if !is_image_mime_type(&part.content_type) {
        return Err(AppError::BadRequest(
            "Only image files are allowed for avatars".to_string(),
        ));
    }

    if part.bytes.len() > MAX_AVATAR_BYTES {
        return Err(AppError::BadRequest(
            "Avatar must be less than 5MB".to_string(),
        ));
    }

    let uploaded = state
        .storage
        .create_file(
            &generate_file_id(),
            &part.filename,
            &part.content_type,
            part.bytes,
        )
        .await?;

    let storage = &state.storage;
    Ok(Json(ApiResponse::message_data(
        "Avatar uploaded successfully",
        UploadedAvatar {
            id: uploaded.id.clone(),
            name: uploaded.name.clone(),
            mime_type: uploaded.mime_type.clone(),
            size: uploaded.size_original,
            url: storage.file_view_url(&uploaded.id),
            thumbnails: AvatarThumbnails {
                small: storage.file_preview_url(&uploaded.id, Some(50), Some(50), Some(80)),
                medium: storage.file_preview_url(&uploaded.id, Some(150), Some(150), Some(80)),
                large: storage.file_preview_url(&uploaded.id, Some(400), Some(400), Some(80)),
            },
            created_at: uploaded.created_at.clone(),
        },
    )))
}

/// GET /api/upload/{file_id} - file metadata.
async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<ApiResponse<UploadedFile>>> {
    let file = state.storage.get_file(&file_id).await?;
    Ok(Json(ApiResponse::data(format_file_response(
        &state.storage,
        &file,
    ))))
}

/// DELETE /api/upload/{file_id}.
async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    state.storage.delete_file(&file_id).await?;
    Ok(Json(ApiResponse::message("File deleted successfully")))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    25
}

#[derive(Debug, Serialize)]
struct FileListing {
    files: Vec<UploadedFile>,
    total: u64,
    limit: u32,
    offset: u32,
}

/// GET /api/upload/list/all - list bucket files (paginated).
async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ApiResponse<FileListing>>> {
    let listing = state.storage.list_files(params.limit, params.offset).await?;

    let files = listing
        .files
        .iter()
        .map(|file| format_file_response(&state.storage, file))
        .collect();

    Ok(Json(ApiResponse::data(FileListing {
        files,
        total: listing.total,
        limit: params.limit,
        offset: params.offset,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_image_mime_detection() {
        assert!(is_image_mime_type("image/png"));
        assert!(is_image_mime_type("image/jpeg"));
        assert!(!is_image_mime_type("video/mp4"));
        assert!(!is_image_mime_type("application/octet-stream"));
    }

    #[test]
    fn test_format_file_response_preview_only_for_images() {
        let storage = AppwriteStorage::new_offline(&Config::test_default());
        let file = AppwriteFile {
            id: "f1".to_string(),
            name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            size_original: 1024,
            created_at: "2026-01-01T00:00:00.000+00:00".to_string(),
        };

        let response = format_file_response(&storage, &file);
        assert!(response.preview_url.is_some());
        assert!(response.url.contains("/files/f1/view"));
        assert!(response.download_url.contains("/files/f1/download"));

        let file = AppwriteFile {
            mime_type: "audio/mpeg".to_string(),
            ..file
        };
        assert!(format_file_response(&storage, &file).preview_url.is_none());
    }

    #[test]
    fn test_generated_file_ids_are_unique() {
        assert_ne!(generate_file_id(), generate_file_id());
    }
}

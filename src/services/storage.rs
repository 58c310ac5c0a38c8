// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Appwrite Storage REST client.
//!
//! Handles:
//! - File upload (multipart) under server-generated ids
//! - File metadata fetch / deletion
//! - Bucket listing with forwarded limit/offset
//! - View / preview / download URL construction

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;

/// Appwrite storage client.
///
/// Built once at startup and shared across requests. The offline
/// constructor is for tests: every network call fails with a storage
/// error without touching the wire.
#[derive(Clone)]
pub struct AppwriteStorage {
    http: Option<reqwest::Client>,
    endpoint: String,
    project_id: String,
    api_key: String,
    bucket_id: String,
}

impl AppwriteStorage {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            endpoint: config.appwrite_endpoint.clone(),
            project_id: config.appwrite_project_id.clone(),
            api_key: config.appwrite_api_key.clone(),
            bucket_id: config.appwrite_bucket_id.clone(),
        }
    }

    /// Offline client for tests; all provider calls return an error.
    pub fn new_offline(config: &Config) -> Self {
        Self {
            http: None,
            endpoint: config.appwrite_endpoint.clone(),
            project_id: config.appwrite_project_id.clone(),
            api_key: config.appwrite_api_key.clone(),
            bucket_id: config.appwrite_bucket_id.clone(),
        }
    }

    fn get_client(&self) -> Result<&reqwest::Client, AppError> {
        self.http
            .as_ref()
            .ok_or_else(|| AppError::Storage("Storage not connected (offline mode)".to_string()))
    }

    fn files_url(&self) -> String {
        format!(
            "{}/storage/buckets/{}/files",
            self.endpoint, self.bucket_id
        )
    }

    /// Upload a buffered file under the given id.
    pub async fn create_file(
        &self,
        file_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<AppwriteFile, AppError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::Storage(format!("Invalid MIME type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part);

        let response = self
            .get_client()?
            .post(self.files_url())
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        check_response_json(response).await
    }

    /// Get file metadata by id.
    pub async fn get_file(&self, file_id: &str) -> Result<AppwriteFile, AppError> {
        let url = format!("{}/{}", self.files_url(), file_id);
        let response = self
            .get_client()?
            .get(&url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        check_response_json(response).await
    }

    /// Delete a file by id.
    pub async fn delete_file(&self, file_id: &str) -> Result<(), AppError> {
        let url = format!("{}/{}", self.files_url(), file_id);
        let response = self
            .get_client()?
            .delete(&url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        check_response(response).await
    }

    /// List bucket files, forwarding pagination to the provider.
    pub async fn list_files(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<AppwriteFileList, AppError> {
        let response = self
            .get_client()?
            .get(self.files_url())
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
            .query(&[
                ("queries[]", format!("limit({})", limit)),
                ("queries[]", format!("offset({})", offset)),
            ])
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        check_response_json(response).await
    }

    // ─── URL Construction ────────────────────────────────────────

    /// Direct view URL for a stored file.
    pub fn file_view_url(&self, file_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/view?project={}",
            self.endpoint, self.bucket_id, file_id, self.project_id
        )
    }

    /// Preview URL (images only) with optional resize parameters.
    pub fn file_preview_url(
        &self,
        file_id: &str,
        width: Option<u32>,
        height: Option<u32>,
        quality: Option<u32>,
    ) -> String {
        let mut url = format!(
            "{}/storage/buckets/{}/files/{}/preview?project={}",
            self.endpoint, self.bucket_id, file_id, self.project_id
        );

        if let Some(width) = width {
            url.push_str(&format!("&width={}", width));
        }
        if let Some(height) = height {
            url.push_str(&format!("&height={}", height));
        }
        if let Some(quality) = quality {
            url.push_str(&format!("&quality={}", quality));
        }

        url
    }

    /// Forced-download URL for a stored file.
    pub fn file_download_url(&self, file_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/download?project={}",
            self.endpoint, self.bucket_id, file_id, self.project_id
        )
    }
}

/// Check response status, mapping provider errors.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(map_provider_error(status.as_u16(), &body))
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(map_provider_error(status.as_u16(), &body));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Storage(format!("JSON parse error: {}", e)))
}

/// Translate an Appwrite error response into an [`AppError`].
///
/// A 404 becomes the uniform "File not found"; anything else surfaces the
/// provider's message text.
fn map_provider_error(status: u16, body: &str) -> AppError {
    if status == 404 {
        return AppError::NotFound("File not found".to_string());
    }

    let message = serde_json::from_str::<AppwriteErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

    AppError::Storage(message)
}

#[derive(Debug, Deserialize)]
struct AppwriteErrorBody {
    message: String,
}

/// File metadata as returned by Appwrite.
#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteFile {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal")]
    pub size_original: u64,
    #[serde(rename = "$createdAt")]
    pub created_at: String,
}

/// Bucket listing as returned by Appwrite.
#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteFileList {
    pub total: u64,
    pub files: Vec<AppwriteFile>,
}

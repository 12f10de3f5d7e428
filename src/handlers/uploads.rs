use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::upload_service::StoredImage;
use crate::errors::AppError;
use crate::handlers::extract::AdminUser;
use crate::handlers::{run_blocking, Uploads};

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub filename: String,
    /// Path under which the image is served, e.g. `/uploads/<name>.png`.
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

impl From<StoredImage> for UploadResponse {
    fn from(s: StoredImage) -> Self {
        Self {
            filename: s.filename,
            url: s.url,
            size: s.size,
            content_type: s.content_type,
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("malformed multipart body: {e}"))
}

/// Reads one field into memory, failing as soon as it grows past `max_bytes`.
async fn read_limited(field: &mut Field, max_bytes: usize) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(AppError::BadRequest(format!(
                "file too large; maximum is {max_bytes} bytes"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// POST /uploads
///
/// Multipart upload of exactly one image file (JPEG, PNG, WebP or GIF).
#[utoipa::path(
    post,
    path = "/uploads",
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 400, description = "No file, several files, wrong type or too large"),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn upload_image(
    uploads: web::Data<Uploads>,
    _admin: AdminUser,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let max_bytes = uploads.max_bytes();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some();
        if !is_file {
            // Drain plain form fields.
            while field.try_next().await.map_err(multipart_error)?.is_some() {}
            continue;
        }
        if file.is_some() {
            return Err(AppError::BadRequest(
                "exactly one file must be uploaded".to_string(),
            ));
        }
        let content_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        let bytes = read_limited(&mut field, max_bytes).await?;
        file = Some((content_type, bytes));
    }

    let Some((content_type, bytes)) = file else {
        return Err(AppError::BadRequest("no file was uploaded".to_string()));
    };
    let stored = run_blocking(move || uploads.store(&content_type, &bytes)).await?;
    Ok(HttpResponse::Created().json(UploadResponse::from(stored)))
}

/// DELETE /uploads/{filename}
#[utoipa::path(
    delete,
    path = "/uploads/{filename}",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "File not found"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn delete_image(
    uploads: web::Data<Uploads>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let filename = path.into_inner();
    run_blocking(move || uploads.delete(&filename)).await?;
    Ok(HttpResponse::NoContent().finish())
}

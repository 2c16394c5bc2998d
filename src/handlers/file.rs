use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;

use crate::errors::AppError;
use crate::models::file::FileUploadResponse;
use crate::storage::ObjectStore;

const FILE_FIELD: &str = "file";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Upload settings fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct UploadSettings {
    pub max_bytes: usize,
    pub url_ttl: std::time::Duration,
}

struct UploadedFile {
    name: String,
    content_type: Option<String>,
    body: web::Bytes,
}

pub async fn upload_file(
    objects: web::Data<dyn ObjectStore>,
    settings: web::Data<UploadSettings>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|err| AppError::BadRequest(format!("Invalid multipart body: {}", err)))?;

        let disposition = field.content_disposition();
        let is_file = disposition.and_then(|d| d.get_name()) == Some(FILE_FIELD);
        let filename = disposition.and_then(|d| d.get_filename()).map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());

        if !is_file {
            // Drain fields we don't care about so the stream can advance.
            while let Some(chunk) = field.next().await {
                chunk.map_err(|err| AppError::BadRequest(format!("Invalid multipart body: {}", err)))?;
            }
            continue;
        }

        if upload.is_some() {
            return Err(AppError::BadRequest("Only one file may be uploaded per request".to_string()));
        }

        let name = filename
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

        let mut body = web::BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|err| AppError::BadRequest(format!("Invalid multipart body: {}", err)))?;
            if body.len() + chunk.len() > settings.max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "File exceeds the {} byte upload limit",
                    settings.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        upload = Some(UploadedFile {
            name,
            content_type,
            body: body.freeze(),
        });
    }

    let file = upload.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let content_type = file
        .content_type
        .or_else(|| infer::get(&file.body).map(|kind| kind.mime_type().to_string()))
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

    objects
        .put(&file.name, file.body, &content_type)
        .await
        .map_err(|err| AppError::upstream("Error uploading file", err))?;

    let url = objects
        .signed_url(&file.name, settings.url_ttl)
        .await
        .map_err(|err| AppError::upstream("Error uploading file", err))?;

    log::info!("Uploaded {} ({})", file.name, content_type);
    Ok(HttpResponse::Ok().json(FileUploadResponse {
        message: format!("Uploaded: {}", file.name),
        url,
    }))
}

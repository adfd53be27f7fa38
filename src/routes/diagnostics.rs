use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::documents::common::format_kib;
use crate::images::{decode_base64, magic_hex, normalize, validate, ImageError};
use crate::AppState;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestImageRequest {
    pub image_url: Option<String>,
    /// Base64 payload, `data:image/...;base64,` prefix allowed.
    pub image_data: Option<String>,
}

/// What the diagnostic endpoints report about an image.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageReport {
    pub success: bool,
    /// `PNG`, `JPEG`, `GIF` or `inconnu`.
    pub image_type: String,
    pub size: String,
    pub size_bytes: usize,
    pub magic_bytes: String,
    pub normalized_preview_possible: bool,
}

fn error(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": message.into() }))
}

async fn inspect(bytes: Vec<u8>) -> HttpResponse {
    let kind = match validate(&bytes) {
        Ok(kind) => kind,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let size_bytes = bytes.len();
    let magic_bytes = magic_hex(&bytes);
    let normalized_preview_possible = web::block(move || normalize(&bytes))
        .await
        .ok()
        .and_then(Result::ok)
        .map(|png| png.len() > 10)
        .unwrap_or(false);

    HttpResponse::Ok().json(ImageReport {
        success: true,
        image_type: kind.label().to_string(),
        size: format_kib(size_bytes),
        size_bytes,
        magic_bytes,
        normalized_preview_possible,
    })
}

#[utoipa::path(
    post,
    path = "/api/test-image",
    tag = "Diagnostics",
    request_body = TestImageRequest,
    responses(
        (status = 200, description = "Image details", body = ImageReport),
        (status = 400, description = "No image given, unreadable base64 or image too small"),
        (status = 500, description = "Image could not be fetched or decoded")
    )
)]
pub async fn test_image(
    state: web::Data<AppState>,
    req: web::Json<TestImageRequest>,
) -> impl Responder {
    let url = req.image_url.as_deref().filter(|v| !v.is_empty());
    let data = req.image_data.as_deref().filter(|v| !v.is_empty());

    let acquired: Result<Vec<u8>, ImageError> = match (url, data) {
        (Some(url), _) => state.images.fetch_url(url).await,
        (None, Some(data)) => decode_base64(data),
        (None, None) => {
            return error(
                StatusCode::BAD_REQUEST,
                "Fournir imageUrl ou imageData",
            )
        }
    };

    match acquired {
        Ok(bytes) => inspect(bytes).await,
        Err(e @ (ImageError::Base64(_) | ImageError::EmptyBase64)) => {
            error(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            log::error!("Test image acquisition failed: {}", e);
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/test-image/upload",
    tag = "Diagnostics",
    request_body(content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses(
        (status = 200, description = "Image details", body = ImageReport),
        (status = 400, description = "No file field or image too small"),
        (status = 413, description = "Upload too large")
    )
)]
pub async fn test_image_upload(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> impl Responder {
    let limit = state.config.image_max_bytes;

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
        };
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map_or(false, |name| name == UPLOAD_FIELD);

        let mut buffer = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
            };
            if !is_file {
                continue;
            }
            if buffer.len() + chunk.len() > limit {
                return error(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    ImageError::TooLarge { limit }.to_string(),
                );
            }
            buffer.extend_from_slice(&chunk);
        }

        if is_file {
            log::debug!("Received {} byte upload for inspection", buffer.len());
            return inspect(buffer).await;
        }
    }

    error(
        StatusCode::BAD_REQUEST,
        format!("Fournir un fichier dans le champ \"{}\"", UPLOAD_FIELD),
    )
}

//! HTTP routes.
//!
//! - `service` - index, health and echo
//! - `diagnostics` - image troubleshooting
//! - `report`, `offer`, `excel` - generate a document and email it
//! - `email` - plain and support emails

pub mod diagnostics;
pub mod email;
pub mod excel;
pub mod offer;
pub mod report;
pub mod service;

use actix_files::Files;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use std::path::PathBuf;

use crate::documents::{DocumentError, GeneratedDocument};
use crate::ErrorResponse;

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected JSON body: {}", err);
    let response = HttpResponse::BadRequest()
        .json(ErrorResponse::new("JSON invalide").with_details(err.to_string()));
    InternalError::from_response(err, response).into()
}

async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "error": "Route non trouvée",
        "path": req.path(),
    }))
}

/// Files under the assets directory, mounted at `/static`. Misses get the
/// same JSON 404 as unknown routes.
pub fn static_files(assets_dir: impl Into<PathBuf>) -> Files {
    Files::new("/static", assets_dir.into()).default_handler(web::to(not_found))
}

/// Run a synchronous generator on the blocking pool.
pub(crate) async fn render_blocking<F>(render: F) -> Result<GeneratedDocument, String>
where
    F: FnOnce() -> Result<GeneratedDocument, DocumentError> + Send + 'static,
{
    match web::block(render).await {
        Ok(Ok(document)) => Ok(document),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("rendering task failed: {}", e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig, body_limit: usize) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(body_limit)
            .error_handler(json_error_handler),
    )
    // raw-body extractors (echo) share the JSON limit
    .app_data(web::PayloadConfig::new(body_limit))
    .route("/", web::get().to(service::index))
    .route("/health", web::get().to(service::health))
    .service(
        web::scope("/api")
            .route("/echo", web::post().to(service::echo))
            .route("/test-image", web::post().to(diagnostics::test_image))
            .route(
                "/test-image/upload",
                web::post().to(diagnostics::test_image_upload),
            )
            .route("/generate-and-send", web::post().to(report::generate_and_send))
            .route(
                "/generate-offer-and-send",
                web::post().to(offer::generate_offer_and_send),
            )
            .route(
                "/generate-excel-and-send",
                web::post().to(excel::generate_excel_and_send),
            )
            .route("/send-email", web::post().to(email::send_email))
            .route("/support/send-email", web::post().to(email::send_support_email))
            .default_service(web::to(not_found)),
    )
    .default_service(web::to(not_found));
}

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::{AppState, ErrorResponse};

pub const SERVICE_NAME: &str = "PDF / Excel Report & Support API";

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    /// Seconds since startup.
    pub uptime: u64,
    pub service: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Service",
    responses(
        (status = 200, description = "Service name, version and endpoint map")
    )
)]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "GPT PDF / Excel Email & Support API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "GET /health",
            "echo": "POST /api/echo",
            "testImage": "POST /api/test-image",
            "testImageUpload": "POST /api/test-image/upload",
            "generateAndSendPdf": "POST /api/generate-and-send",
            "generateOfferAndSend": "POST /api/generate-offer-and-send",
            "generateExcelAndSend": "POST /api/generate-excel-and-send",
            "sendEmail": "POST /api/send-email",
            "sendSupportEmail": "POST /api/support/send-email",
            "static": "GET /static/<fichier>",
            "metrics": "GET /metrics",
            "docs": "GET /swagger-ui/",
        }
    }))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Service",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "OK".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.uptime_secs(),
        service: SERVICE_NAME.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/api/echo",
    tag = "Service",
    request_body(content_type = "application/json", description = "Any JSON body (optional)"),
    responses(
        (status = 200, description = "The request body, echoed back"),
        (status = 400, description = "Body is not JSON", body = ErrorResponse)
    )
)]
pub async fn echo(body: web::Bytes) -> impl Responder {
    let got: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return HttpResponse::BadRequest()
                    .json(ErrorResponse::new("JSON invalide").with_details(e.to_string()))
            }
        }
    };
    HttpResponse::Ok().json(json!({ "ok": true, "got": got }))
}

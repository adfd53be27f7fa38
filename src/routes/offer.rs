use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::render_blocking;
use crate::documents::{Generator, Offer, OfferGenerator};
use crate::mail::{templates, MailAttachment, OutgoingMail};
use crate::validation::{present, validate_recipients, ValidationError};
use crate::{AppState, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateOfferRequest {
    pub email: Option<String>,
    pub subject: Option<String>,
    #[schema(value_type = Option<Offer>)]
    pub offer: Option<Value>,
    pub cc: Option<String>,
}

/// Read the letterhead logo; a missing logo is not an error.
async fn read_logo(state: &AppState) -> Option<Vec<u8>> {
    let path = state.config.offer_logo_path();
    match tokio::fs::read(&path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("Logo not loaded from {}: {}", path.display(), e);
            None
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/generate-offer-and-send",
    tag = "Documents",
    request_body = GenerateOfferRequest,
    responses(
        (status = 200, description = "Offer generated and emailed"),
        (status = 400, description = "Missing fields or invalid address", body = ErrorResponse),
        (status = 500, description = "Generation or delivery failed", body = ErrorResponse)
    )
)]
pub async fn generate_offer_and_send(
    state: web::Data<AppState>,
    req: web::Json<GenerateOfferRequest>,
) -> impl Responder {
    let req = req.into_inner();

    let (email, subject, raw_offer) = match (
        present(&req.email),
        present(&req.subject),
        req.offer.as_ref().filter(|v| !v.is_null()),
    ) {
        (Some(email), Some(subject), Some(offer)) => (email, subject, offer),
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse::from(
                ValidationError::missing_fields("email, subject, offer"),
            ))
        }
    };
    let cc = present(&req.cc);

    if let Err(e) = validate_recipients(email, cc) {
        return HttpResponse::BadRequest().json(ErrorResponse::from(e));
    }

    let mut offer: Offer = match serde_json::from_value(raw_offer.clone()) {
        Ok(offer) => offer,
        Err(e) => {
            return HttpResponse::BadRequest()
                .json(ErrorResponse::new("Structure de l'offre invalide").with_details(e.to_string()))
        }
    };
    if present(&offer.subject).is_none() {
        offer.subject = Some(subject.to_string());
    }

    let generator = OfferGenerator {
        logo: read_logo(&state).await,
    };
    let document = match render_blocking(move || generator.generate(offer)).await {
        Ok(document) => document,
        Err(e) => {
            log::error!("Offer generation failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse::processing_failed(e));
        }
    };
    let filename = document.filename.clone();
    let pdf_size = document.size();

    let html = templates::offer_ready(subject, &state.config.from_name);
    let mail = OutgoingMail::html(email, subject, html)
        .with_cc(cc)
        .with_attachment(MailAttachment::pdf(document.filename, document.bytes));

    if let Err(e) = state.mailer.send(mail).await {
        log::error!("Failed to email offer to {}: {}", email, e);
        return HttpResponse::InternalServerError()
            .json(ErrorResponse::processing_failed(e.to_string()));
    }

    log::info!(
        "Offer {} sent to {}{}",
        filename,
        email,
        cc.map(|cc| format!(" (CC: {})", cc)).unwrap_or_default()
    );
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Offre générée et envoyée avec succès",
        "details": {
            "email": email,
            "cc": cc,
            "filename": filename,
            "pdfSize": pdf_size,
        }
    }))
}

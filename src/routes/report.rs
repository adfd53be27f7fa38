use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::render_blocking;
use crate::documents::{
    Generator, ReportContent, ReportGenerator, ReportJob, SectionImage, Validator,
};
use crate::mail::{templates, MailAttachment, OutgoingMail};
use crate::validation::{present, validate_recipients, ValidationError};
use crate::{AppState, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub email: Option<String>,
    pub subject: Option<String>,
    /// `{ title, introduction, sections: [..], conclusion }`
    #[schema(value_type = Option<ReportContent>)]
    pub report_content: Option<Value>,
}

fn invalid_structure(details: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest()
        .json(ErrorResponse::new("Structure du rapport invalide").with_details(details))
}

/// Fetch every section image up front; failures are kept so the renderer
/// can print a notice in place of the image.
async fn fetch_section_images(state: &AppState, content: &ReportContent) -> Vec<SectionImage> {
    let mut images = Vec::with_capacity(content.sections().len());
    for (index, section) in content.sections().iter().enumerate() {
        let image = match section.image_source() {
            None => SectionImage::None,
            Some(source) => match state.images.load(&source).await {
                Ok(bytes) => SectionImage::Loaded(bytes),
                Err(e) => {
                    log::warn!("Image for section {} not loaded: {}", index + 1, e);
                    SectionImage::Failed(e.to_string())
                }
            },
        };
        images.push(image);
    }
    images
}

#[utoipa::path(
    post,
    path = "/api/generate-and-send",
    tag = "Documents",
    request_body = GenerateReportRequest,
    responses(
        (status = 200, description = "Report generated and emailed"),
        (status = 400, description = "Missing fields, invalid email or invalid report", body = ErrorResponse),
        (status = 500, description = "Generation or delivery failed", body = ErrorResponse)
    )
)]
pub async fn generate_and_send(
    state: web::Data<AppState>,
    req: web::Json<GenerateReportRequest>,
) -> impl Responder {
    let req = req.into_inner();

    let (email, subject, raw_content) = match (
        present(&req.email),
        present(&req.subject),
        req.report_content.as_ref().filter(|v| !v.is_null()),
    ) {
        (Some(email), Some(subject), Some(content)) => (email, subject, content),
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse::from(
                ValidationError::missing_fields("email, subject, reportContent"),
            ))
        }
    };

    if let Err(e) = validate_recipients(email, None) {
        return HttpResponse::BadRequest().json(ErrorResponse::from(e));
    }

    let content: ReportContent = match serde_json::from_value(raw_content.clone()) {
        Ok(content) => content,
        Err(e) => return invalid_structure(e.to_string()),
    };
    if let Err(details) = content.validate() {
        return invalid_structure(details);
    }

    let images = fetch_section_images(&state, &content).await;
    let title = content.title.clone();
    let job = ReportJob { content, images };

    let document = match render_blocking(move || ReportGenerator.generate(job)).await {
        Ok(document) => document,
        Err(e) => {
            log::error!("Report generation failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse::processing_failed(e));
        }
    };
    let pdf_size = document.size();
    log::info!("Report {} rendered ({})", document.filename, pdf_size);

    let html = templates::report_ready(subject, &title, &state.config.from_name);
    let mail = OutgoingMail::html(email, format!("Rapport : {}", title), html)
        .with_attachment(MailAttachment::pdf(document.filename, document.bytes));

    if let Err(e) = state.mailer.send(mail).await {
        log::error!("Failed to email report to {}: {}", email, e);
        return HttpResponse::InternalServerError()
            .json(ErrorResponse::processing_failed(e.to_string()));
    }

    log::info!("Report sent to {}", email);
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Rapport généré et envoyé avec succès",
        "details": {
            "email": email,
            "pdfSize": pdf_size,
        }
    }))
}

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::render_blocking;
use crate::documents::{build_workbook, parse_sheets, workbook_filename, GeneratedDocument};
use crate::mail::{templates, MailAttachment, OutgoingMail};
use crate::validation::{present, validate_recipients, ValidationError};
use crate::{AppState, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateExcelRequest {
    pub email: Option<String>,
    pub subject: Option<String>,
    /// `[{ "name": "..", "data": [[..], ..] }, ..]` or `{ "<name>": [[..], ..] }`
    #[schema(value_type = Option<Object>)]
    pub sheets: Option<Value>,
    pub filename: Option<String>,
    pub cc: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/generate-excel-and-send",
    tag = "Documents",
    request_body = GenerateExcelRequest,
    responses(
        (status = 200, description = "Workbook generated and emailed"),
        (status = 400, description = "Missing fields, invalid address or invalid sheets", body = ErrorResponse),
        (status = 500, description = "Generation or delivery failed", body = ErrorResponse)
    )
)]
pub async fn generate_excel_and_send(
    state: web::Data<AppState>,
    req: web::Json<GenerateExcelRequest>,
) -> impl Responder {
    let req = req.into_inner();

    let (email, subject, raw_sheets) = match (
        present(&req.email),
        present(&req.subject),
        req.sheets.as_ref().filter(|v| !v.is_null()),
    ) {
        (Some(email), Some(subject), Some(sheets)) => (email, subject, sheets),
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse::from(
                ValidationError::missing_fields("email, subject, sheets (array ou objet)"),
            ))
        }
    };
    let cc = present(&req.cc);

    if let Err(e) = validate_recipients(email, cc) {
        return HttpResponse::BadRequest().json(ErrorResponse::from(e));
    }

    let sheets = match parse_sheets(raw_sheets) {
        Ok(sheets) => sheets,
        Err(e) => {
            let mut body = ErrorResponse::new(&e.to_string());
            body.details = e.details();
            if e.is_client_error() {
                return HttpResponse::BadRequest().json(body);
            }
            return HttpResponse::InternalServerError().json(body);
        }
    };
    let sheet_names: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();
    let filename = workbook_filename(present(&req.filename));

    let workbook_name = filename.clone();
    let document = match render_blocking(move || {
        Ok(GeneratedDocument {
            filename: workbook_name,
            bytes: build_workbook(&sheets)?,
        })
    })
    .await
    {
        Ok(document) => document,
        Err(e) => {
            log::error!("Workbook generation failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse::processing_failed(e));
        }
    };
    let file_size = document.size();

    let html = templates::workbook_ready(subject, &filename, &sheet_names, &state.config.from_name);
    let mail = OutgoingMail::html(email, subject, html)
        .with_cc(cc)
        .with_attachment(MailAttachment::xlsx(document.filename, document.bytes));

    if let Err(e) = state.mailer.send(mail).await {
        log::error!("Failed to email workbook to {}: {}", email, e);
        return HttpResponse::InternalServerError()
            .json(ErrorResponse::processing_failed(e.to_string()));
    }

    log::info!(
        "Workbook {} sent to {}{}",
        filename,
        email,
        cc.map(|cc| format!(" (CC: {})", cc)).unwrap_or_default()
    );
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Fichier Excel généré et envoyé avec succès",
        "details": {
            "email": email,
            "cc": cc,
            "filename": filename,
            "sheetCount": sheet_names.len(),
            "sheets": sheet_names,
            "fileSize": file_size,
        }
    }))
}

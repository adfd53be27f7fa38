use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::mail::{templates, OutgoingMail};
use crate::validation::{present, validate_recipients, ValidationError};
use crate::{AppState, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub email: Option<String>,
    pub subject: Option<String>,
    /// Plain text; wrapped in the default template when no HTML is given.
    pub message: Option<String>,
    /// Sent verbatim as the HTML body.
    pub message_html: Option<String>,
    pub cc: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SupportEmailRequest {
    pub username: Option<String>,
    pub comment: Option<String>,
    pub assistant_name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/send-email",
    tag = "Email",
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "Email sent"),
        (status = 400, description = "Missing fields or invalid address", body = ErrorResponse),
        (status = 500, description = "SMTP delivery failed", body = ErrorResponse)
    )
)]
pub async fn send_email(
    state: web::Data<AppState>,
    req: web::Json<SendEmailRequest>,
) -> impl Responder {
    let req = req.into_inner();
    let message = present(&req.message);
    let message_html = present(&req.message_html);

    let (email, subject) = match (present(&req.email), present(&req.subject)) {
        (Some(email), Some(subject)) if message.is_some() || message_html.is_some() => {
            (email, subject)
        }
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse::from(
                ValidationError::missing_fields("email, subject, et (message ou messageHtml)"),
            ))
        }
    };
    let cc = present(&req.cc);

    if let Err(e) = validate_recipients(email, cc) {
        return HttpResponse::BadRequest().json(ErrorResponse::from(e));
    }

    let html = match message_html {
        Some(html) => html.to_string(),
        None => templates::plain_message(subject, message.unwrap_or_default(), &state.config.from_name),
    };
    let mail = OutgoingMail::html(email, subject, html)
        .with_cc(cc)
        .with_text(message);

    if let Err(e) = state.mailer.send(mail).await {
        log::error!("Failed to send email to {}: {}", email, e);
        return HttpResponse::InternalServerError()
            .json(ErrorResponse::email_failed(e.to_string()).with_smtp(e.smtp_details()));
    }

    log::info!(
        "Email sent to {}{}",
        email,
        cc.map(|cc| format!(" (CC: {})", cc)).unwrap_or_default()
    );
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Email envoyé avec succès",
        "details": {
            "email": email,
            "cc": cc,
            "subject": subject,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }
    }))
}

#[utoipa::path(
    post,
    path = "/api/support/send-email",
    tag = "Email",
    request_body = SupportEmailRequest,
    responses(
        (status = 200, description = "Support notification sent"),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 500, description = "SMTP delivery failed", body = ErrorResponse)
    )
)]
pub async fn send_support_email(
    state: web::Data<AppState>,
    req: web::Json<SupportEmailRequest>,
) -> impl Responder {
    let req = req.into_inner();

    let (username, comment, assistant) = match (
        present(&req.username),
        present(&req.comment),
        present(&req.assistant_name),
    ) {
        (Some(username), Some(comment), Some(assistant)) => (username, comment, assistant),
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse::from(
                ValidationError::missing_fields("username, comment, assistant_name"),
            ))
        }
    };

    let support_email = state.config.support_email.as_str();
    let html = templates::support_ticket(username, assistant, comment, &state.config.from_name);
    let mail = OutgoingMail::html(
        support_email,
        templates::support_subject(assistant, username),
        html,
    );

    if let Err(e) = state.mailer.send(mail).await {
        log::error!("Failed to send support email: {}", e);
        return HttpResponse::InternalServerError().json(ErrorResponse::email_failed(e.to_string()));
    }

    log::info!("Support email sent to {}", support_email);
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Email de notification envoyé avec succès",
        "email_sent_to": support_email,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

//! Outgoing mail: message model, transport trait and HTML templates.

pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

pub use smtp::SmtpMailer;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file attached to an outgoing message.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl MailAttachment {
    pub fn pdf(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            content,
        }
    }

    pub fn xlsx(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: XLSX_CONTENT_TYPE.to_string(),
            content,
        }
    }
}

/// One HTML email. The sender is fixed by the transport.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    pub attachments: Vec<MailAttachment>,
}

impl OutgoingMail {
    pub fn html(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            cc: None,
            subject: subject.into(),
            html: html.into(),
            text: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_cc(mut self, cc: Option<&str>) -> Self {
        self.cc = cc.map(str::to_string);
        self
    }

    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.text = text.map(str::to_string);
        self
    }

    pub fn with_attachment(mut self, attachment: MailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// SMTP-level diagnostics surfaced to API callers on failure.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmtpDetails {
    pub code: Option<String>,
    pub response_code: Option<u16>,
    pub response: Option<String>,
    pub command: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("invalid content type '{0}'")]
    ContentType(String),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("failed to configure TLS: {0}")]
    Tls(#[source] lettre::transport::smtp::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[source] lettre::transport::smtp::Error),
    #[error("SMTP server refused the connection")]
    Unreachable,
}

impl MailError {
    /// SMTP diagnostics, when the failure came from the SMTP exchange.
    pub fn smtp_details(&self) -> Option<SmtpDetails> {
        let MailError::Smtp(err) = self else {
            return None;
        };

        let code = if err.is_permanent() {
            "EENVELOPE"
        } else if err.is_transient() {
            "ETRANSIENT"
        } else if err.is_timeout() {
            "ETIMEDOUT"
        } else {
            "ECONNECTION"
        };

        Some(SmtpDetails {
            code: Some(code.to_string()),
            response_code: err.status().and_then(|status| status.to_string().parse().ok()),
            response: Some(err.to_string()),
            command: None,
        })
    }
}

/// Delivers outgoing mail. Implemented by [`SmtpMailer`] in production and
/// by in-memory recorders in tests.
#[async_trait]
pub trait MailTransport {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;

    /// Checks that the relay accepts connections.
    async fn verify(&self) -> Result<(), MailError>;
}

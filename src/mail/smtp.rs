//! SMTP relay transport built on lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::client::{Tls, TlsParameters, TlsVersion};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use super::{MailError, MailTransport, OutgoingMail};
use crate::config::AppConfig;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends mail through an unauthenticated relay (e.g. an Exchange Online
/// connector) with opportunistic STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &AppConfig) -> Result<Self, MailError> {
        let tls = TlsParameters::builder(config.smtp_host.clone())
            .set_min_tls_version(TlsVersion::Tlsv12)
            .build_rustls()
            .map_err(MailError::Tls)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .tls(Tls::Opportunistic(tls))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        let from = Mailbox::new(
            Some(config.from_name.clone()),
            parse_address(&config.from_address)?,
        );

        Ok(Self { transport, from })
    }
}

fn parse_address(address: &str) -> Result<Address, MailError> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|source| MailError::Address {
            address: address.to_string(),
            source,
        })
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    Ok(Mailbox::new(None, parse_address(address)?))
}

/// Assemble the MIME message: HTML (or plain+HTML alternative), wrapped in
/// `multipart/mixed` when there are attachments.
pub fn build_message(from: &Mailbox, mail: OutgoingMail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .to(parse_mailbox(&mail.to)?)
        .subject(mail.subject);

    if let Some(cc) = mail.cc.as_deref() {
        builder = builder.cc(parse_mailbox(cc)?);
    }

    let mut mixed = match mail.text {
        Some(text) => {
            let body = MultiPart::alternative_plain_html(text, mail.html);
            if mail.attachments.is_empty() {
                return builder.multipart(body).map_err(MailError::from);
            }
            MultiPart::mixed().multipart(body)
        }
        None if mail.attachments.is_empty() => {
            return builder
                .header(ContentType::TEXT_HTML)
                .body(mail.html)
                .map_err(MailError::from);
        }
        None => MultiPart::mixed().singlepart(SinglePart::html(mail.html)),
    };

    for attachment in mail.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .map_err(|_| MailError::ContentType(attachment.content_type.clone()))?;
        mixed = mixed.singlepart(
            Attachment::new(attachment.filename).body(attachment.content, content_type),
        );
    }

    builder.multipart(mixed).map_err(MailError::from)
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to = mail.to.clone();
        let message = build_message(&self.from, mail)?;
        let response = self.transport.send(message).await.map_err(MailError::Smtp)?;
        log::debug!(
            "SMTP accepted message for {}: {}",
            to,
            response.message().collect::<Vec<_>>().join(" ")
        );
        Ok(())
    }

    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Unreachable),
            Err(e) => Err(MailError::Smtp(e)),
        }
    }
}

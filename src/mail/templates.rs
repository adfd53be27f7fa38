//! HTML bodies for the notification emails.
//!
//! Every value coming from a request is escaped with [`escape_html`] before
//! being interpolated.

use chrono::{Datelike, Local};

use crate::documents::common::{format_french_datetime, format_short_date};

/// Escape `& < > " '` for safe interpolation into HTML.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

fn footer(from_name: &str) -> String {
    format!(
        r#"<p style="color:#6b7280;font-size:12px;margin-top:16px;">© {} {}</p>"#,
        Local::now().year(),
        escape_html(from_name)
    )
}

/// "Report ready" notice sent with the report PDF.
pub fn report_ready(subject: &str, title: &str, from_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; line-height:1.6; color:#111827;">
    <h2 style="margin:0 0 8px 0;">📄 Votre rapport est prêt</h2>
    <div style="background:#e0e7ff;padding:12px;border-left:4px solid #667eea;border-radius:6px;margin:12px 0;">
      <strong>📊 Sujet :</strong> {subject}<br>
      <strong>📌 Titre :</strong> {title}<br>
      <strong>📅 Date :</strong> {date}
    </div>
    <p>Vous trouverez le rapport complet en pièce jointe au format PDF.</p>
    {footer}
  </body>
</html>"#,
        subject = escape_html(subject),
        title = escape_html(title),
        date = format_short_date(),
        footer = footer(from_name),
    )
}

/// "Offer ready" notice sent with the offer PDF.
pub fn offer_ready(subject: &str, from_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; line-height:1.6; color:#111827;">
    <h2 style="margin:0 0 8px 0;">📄 Votre offre est prête</h2>
    <div style="background:#e0e7ff;padding:12px;border-left:4px solid #667eea;border-radius:6px;margin:12px 0;">
      <strong>📧 Sujet :</strong> {subject}<br>
      <strong>📅 Date :</strong> {date}
    </div>
    <p>Vous trouverez l’offre commerciale en pièce jointe (PDF).</p>
    {footer}
  </body>
</html>"#,
        subject = escape_html(subject),
        date = format_short_date(),
        footer = footer(from_name),
    )
}

/// "Workbook ready" notice listing the sheets of the attached file.
pub fn workbook_ready(subject: &str, filename: &str, sheet_names: &[String], from_name: &str) -> String {
    let sheet_list = if sheet_names.is_empty() {
        String::new()
    } else {
        let items: String = sheet_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                format!(
                    "<li><strong>Sheet {}:</strong> {}</li>",
                    i + 1,
                    escape_html(name)
                )
            })
            .collect();
        format!(
            r#"<div style="background:#f0fdf4;padding:12px;border-left:4px solid #10b981;border-radius:6px;margin:12px 0;">
      <strong>📑 Feuilles incluses :</strong>
      <ul style="margin:8px 0 0 0;padding-left:20px;">{}</ul>
    </div>"#,
            items
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; line-height:1.6; color:#111827;">
    <h2 style="margin:0 0 8px 0;">📊 Votre fichier Excel est prêt</h2>
    <div style="background:#e0f2fe;padding:12px;border-left:4px solid #0ea5e9;border-radius:6px;margin:12px 0;">
      <strong>📧 Sujet :</strong> {subject}<br>
      <strong>📁 Fichier :</strong> {filename}<br>
      <strong>📋 Nombre de feuilles :</strong> {count}<br>
      <strong>📅 Date :</strong> {date}
    </div>
    {sheet_list}
    <p>Vous trouverez le fichier Excel complet en pièce jointe.</p>
    <div style="background:#fef3c7;padding:10px;border-radius:6px;margin:12px 0;font-size:13px;">
      <strong>💡 Astuce :</strong> Ouvrez le fichier avec Microsoft Excel, Google Sheets ou LibreOffice Calc.
    </div>
    {footer}
  </body>
</html>"#,
        subject = escape_html(subject),
        filename = escape_html(filename),
        count = sheet_names.len(),
        date = format_french_datetime(),
        sheet_list = sheet_list,
        footer = footer(from_name),
    )
}

/// Default body for `/api/send-email` when no HTML is supplied.
pub fn plain_message(subject: &str, message: &str, from_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; line-height:1.6; color:#111827;">
    <h2 style="margin:0 0 8px 0;">📩 {subject}</h2>
    <div style="background:#f9fafb;padding:12px;border:1px solid #e5e7eb;border-radius:6px;">
      <p style="white-space:pre-wrap;margin:0;">{message}</p>
    </div>
    {footer}
  </body>
</html>"#,
        subject = escape_html(subject),
        message = escape_html(message),
        footer = footer(from_name),
    )
}

/// Support ticket forwarded to the support mailbox.
pub fn support_ticket(username: &str, assistant_name: &str, comment: &str, from_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <style>
      body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #111827; max-width: 600px; margin: 0 auto; padding: 20px; }}
      .header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 20px; border-radius: 8px 8px 0 0; text-align: center; }}
      .header h1 {{ color: #ff0000; margin: 0; font-size: 48px; font-weight: 900; letter-spacing: 8px; }}
      .content {{ background: #f9fafb; padding: 20px; border: 1px solid #e5e7eb; border-top: none; }}
      .info-box {{ background: white; border-left: 4px solid #667eea; padding: 15px; margin: 15px 0; border-radius: 4px; }}
      .info-box strong {{ color: #667eea; display: inline-block; width: 150px; }}
      .comment-box {{ background: white; border: 2px solid #fbbf24; padding: 15px; margin: 15px 0; border-radius: 4px; }}
      .comment-box h3 {{ margin-top: 0; color: #f59e0b; }}
      .footer {{ text-align: center; margin-top: 20px; padding: 15px; background: #f3f4f6; border-radius: 0 0 8px 8px; font-size: 12px; color: #6b7280; }}
      .priority {{ display: inline-block; background: #ef4444; color: white; padding: 5px 10px; border-radius: 4px; font-size: 12px; font-weight: bold; }}
    </style>
  </head>
  <body>
    <div class="header"><h1>🆘</h1></div>
    <div class="content">
      <div style="text-align: center; margin-bottom: 20px;">
        <span class="priority">NOUVEAU TICKET</span>
      </div>
      <div class="info-box">
        <strong>👤 Utilisateur :</strong> {username}<br>
        <strong>🤖 Assistant :</strong> {assistant}<br>
        <strong>📅 Date :</strong> {date}
      </div>
      <div class="comment-box">
        <h3>💬 Commentaire / Problème :</h3>
        <p style="white-space: pre-wrap; margin: 0;">{comment}</p>
      </div>
      <div style="background: #e0e7ff; padding: 12px; border-radius: 4px; margin-top: 15px;">
        <strong>ℹ️ Action requise :</strong><br>
        Veuillez traiter cette demande de support dans les plus brefs délais.
      </div>
    </div>
    <div class="footer">
      <p>
        Email envoyé automatiquement par le système de support<br>
        <strong>{from_name}</strong><br>
        © {year} - Ne pas répondre à cet email
      </p>
    </div>
  </body>
</html>"#,
        username = escape_html(username),
        assistant = escape_html(assistant_name),
        date = escape_html(&format_french_datetime()),
        comment = escape_html(comment),
        from_name = escape_html(from_name),
        year = Local::now().year(),
    )
}

/// Subject line of a support ticket.
pub fn support_subject(assistant_name: &str, username: &str) -> String {
    format!("🆘 Support - {} - {}", assistant_name, username)
}

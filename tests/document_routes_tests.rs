mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use report_mail_server::mail::{PDF_CONTENT_TYPE, XLSX_CONTENT_TYPE};
use report_mail_server::routes;
use serde_json::{json, Value};

use common::{
    png_base64, png_bytes, test_context, test_context_with, ImageOrigin, RecordingMailer, BODY_LIMIT,
};

fn report_body(sections: Value) -> Value {
    json!({
        "email": "jane@example.com",
        "subject": "Bilan mensuel",
        "reportContent": {
            "title": "Bilan Q3",
            "introduction": "Synthèse du trimestre.",
            "sections": sections,
            "conclusion": "Objectifs atteints."
        }
    })
}

// Report

#[actix_web::test]
async fn test_report_requires_fields() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-and-send")
        .set_json(json!({"email": "jane@example.com", "subject": "x"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Données manquantes");
    assert_eq!(body["details"], "Envoyez email, subject, reportContent");
}

#[actix_web::test]
async fn test_report_rejects_incomplete_structure() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-and-send")
        .set_json(json!({
            "email": "jane@example.com",
            "subject": "x",
            "reportContent": {"title": "Sans sections", "introduction": "i"}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Structure du rapport invalide");
    assert_eq!(body["details"], "Champs requis: sections, conclusion");
    assert!(ctx.mailer.sent().await.is_empty());
}

#[actix_web::test]
async fn test_report_rejects_invalid_email() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let mut body = report_body(json!([]));
    body["email"] = json!("jane.example.com");
    let req = test::TestRequest::post()
        .uri("/api/generate-and-send")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Email invalide");
}

#[actix_web::test]
async fn test_report_generated_and_sent() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let image = format!("data:image/png;base64,{}", png_base64(40, 20));
    let req = test::TestRequest::post()
        .uri("/api/generate-and-send")
        .set_json(report_body(json!([
            {"title": "Ventes", "content": "Hausse de 12 %.", "image": image, "imageCaption": "Figure 1"},
            {"title": "Achats", "content": "Stable."}
        ])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Rapport généré et envoyé avec succès");
    assert_eq!(body["details"]["email"], "jane@example.com");
    assert!(body["details"]["pdfSize"].as_str().unwrap().ends_with(" KB"));

    let sent = ctx.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Rapport : Bilan Q3");
    assert_eq!(sent[0].attachments.len(), 1);

    let attachment = &sent[0].attachments[0];
    assert_eq!(attachment.content_type, PDF_CONTENT_TYPE);
    assert!(attachment.filename.starts_with("rapport_bilan_q3_"));
    assert!(attachment.filename.ends_with(".pdf"));
    assert!(attachment.content.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn test_report_survives_missing_image() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-and-send")
        .set_json(report_body(json!([
            {"title": "Photo", "content": "Voir ci-dessous.", "imagePath": "absent.png"},
            {"title": "Hors dossier", "imagePath": "../../etc/passwd"}
        ])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let sent = ctx.mailer.sent().await;
    assert!(sent[0].attachments[0].content.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn test_report_loads_image_from_assets() {
    let ctx = test_context().await;
    std::fs::write(ctx.assets.path().join("chart.png"), png_bytes(16, 16)).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-and-send")
        .set_json(report_body(json!([
            {"title": "Graphique", "imagePath": "chart.png"}
        ])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ctx.mailer.sent().await.len(), 1);
}

#[actix_web::test]
async fn test_report_downloads_section_images_once() {
    let origin = ImageOrigin::start().await;
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let url = origin.url("/img.png");
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/generate-and-send")
            .set_json(report_body(json!([
                {"title": "Carte", "imageUrl": url, "imageCaption": "Site"},
                {"title": "Redirigée", "imageUrl": origin.url("/redir")}
            ])))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // the redirect target shares the origin counter but not the cache key
    assert_eq!(origin.hits(), 2);
    let sent = ctx.mailer.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].attachments[0].content.starts_with(b"%PDF"));

    origin.stop().await;
}

#[actix_web::test]
async fn test_report_delivery_failure() {
    let ctx = test_context_with(RecordingMailer::failing()).await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-and-send")
        .set_json(report_body(json!([])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Erreur lors du traitement");
}

// Offer

fn offer_body() -> Value {
    json!({
        "email": "buyer@example.com",
        "subject": "Offre balais carbone",
        "cc": "sales@example.com",
        "offer": {
            "company": "Tunisia",
            "customerName": "ACME",
            "customerAddress": "1 rue de la Paix\n75002 Paris",
            "toPerson": "M. Dupont",
            "intro": "Suite à votre demande, voici notre proposition.",
            "sections": [
                {"title": "Prix", "content": "12,50 € l'unité."},
                {"title": "Délais", "content": "Quatre semaines."}
            ],
            "closing": "Cordialement,",
            "signatureName": "Jean Martin",
            "signatureTitle": "Responsable commercial"
        }
    })
}

#[actix_web::test]
async fn test_offer_requires_fields() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-offer-and-send")
        .set_json(json!({"email": "buyer@example.com", "subject": "x", "offer": null}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"], "Envoyez email, subject, offer");
}

#[actix_web::test]
async fn test_offer_rejects_invalid_cc() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let mut body = offer_body();
    body["cc"] = json!("sales");
    let req = test::TestRequest::post()
        .uri("/api/generate-offer-and-send")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Adresse email CC invalide");
}

#[actix_web::test]
async fn test_offer_rejects_malformed_offer() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-offer-and-send")
        .set_json(json!({"email": "buyer@example.com", "subject": "x", "offer": "texte"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Structure de l'offre invalide");
}

#[actix_web::test]
async fn test_offer_generated_with_logo_and_cc() {
    let ctx = test_context().await;
    std::fs::write(ctx.assets.path().join("logo_avocarbon.jpg"), png_bytes(60, 20)).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-offer-and-send")
        .set_json(offer_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Offre générée et envoyée avec succès");
    assert_eq!(body["details"]["cc"], "sales@example.com");
    let filename = body["details"]["filename"].as_str().unwrap().to_string();
    assert!(filename.starts_with("offre_"));
    assert!(filename.ends_with(".pdf"));

    let sent = ctx.mailer.sent().await;
    assert_eq!(sent[0].subject, "Offre balais carbone");
    assert_eq!(sent[0].cc.as_deref(), Some("sales@example.com"));
    assert_eq!(sent[0].attachments[0].filename, filename);
    assert!(sent[0].attachments[0].content.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn test_offer_without_logo_file() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let mut body = offer_body();
    body["offer"]["company"] = json!("atlantis");
    body["offer"]["appendixImageBase64"] = json!("pas-une-image");
    body["offer"]["appendixImageTitle"] = json!("Plan");
    let req = test::TestRequest::post()
        .uri("/api/generate-offer-and-send")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_offer_delivery_failure() {
    let ctx = test_context_with(RecordingMailer::failing()).await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-offer-and-send")
        .set_json(offer_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Erreur lors du traitement");
}

// Excel

#[actix_web::test]
async fn test_excel_from_array_form() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-excel-and-send")
        .set_json(json!({
            "email": "jane@example.com",
            "subject": "Export",
            "sheets": [
                {"name": "Ventes", "data": [["Produit", "Qté"], ["Balai", 12], ["Ressort", 3.5]]},
                {"data": [[true, null, "fin"]]}
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Fichier Excel généré et envoyé avec succès");
    assert_eq!(body["details"]["sheetCount"], 2);
    assert_eq!(body["details"]["sheets"], json!(["Ventes", "Sheet2"]));
    assert!(body["details"]["filename"].as_str().unwrap().starts_with("rapport_"));

    let sent = ctx.mailer.sent().await;
    let attachment = &sent[0].attachments[0];
    assert_eq!(attachment.content_type, XLSX_CONTENT_TYPE);
    assert!(attachment.content.starts_with(b"PK"));
}

#[actix_web::test]
async fn test_excel_from_object_form_keeps_order_and_sanitizes_name() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-excel-and-send")
        .set_json(json!({
            "email": "jane@example.com",
            "subject": "Export",
            "filename": "bilan 2024/Q3",
            "cc": "boss@example.com",
            "sheets": {"Zeta": [["z"]], "Alpha": [["a"]]}
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["details"]["sheets"], json!(["Zeta", "Alpha"]));
    assert_eq!(body["details"]["filename"], "bilan_2024_Q3.xlsx");
    assert_eq!(body["details"]["cc"], "boss@example.com");

    let sent = ctx.mailer.sent().await;
    assert_eq!(sent[0].attachments[0].filename, "bilan_2024_Q3.xlsx");
}

#[actix_web::test]
async fn test_excel_rejects_bad_sheets() {
    let ctx = test_context().await;
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(|cfg| routes::config(cfg, BODY_LIMIT)),
    )
    .await;

    let cases = [
        (json!([]), "Le tableau sheets est vide", Value::Null),
        (json!({}), "L'objet sheets est vide", Value::Null),
        (
            json!("Feuille1"),
            "Format sheets invalide",
            json!("sheets doit être un array ou un objet"),
        ),
        (
            json!({"Ventes": "pas un tableau"}),
            "Données de feuille invalides",
            json!("Les données du sheet \"Ventes\" doivent être un tableau"),
        ),
    ];

    for (sheets, error, details) in cases {
        let req = test::TestRequest::post()
            .uri("/api/generate-excel-and-send")
            .set_json(json!({"email": "jane@example.com", "subject": "Export", "sheets": sheets}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], error);
        assert_eq!(body["details"], details);
    }
    assert!(ctx.mailer.sent().await.is_empty());
}

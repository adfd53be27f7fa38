use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::middleware::{Compress, Logger};
use actix_web::{web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod documents;
pub mod images;
pub mod mail;
pub mod routes;
pub mod staging;
pub mod state;
pub mod validation;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

use crate::mail::SmtpDetails;
use crate::validation::ValidationError;

/// Failure envelope shared by every JSON endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpDetails>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            details: None,
            smtp: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_smtp(mut self, smtp: Option<SmtpDetails>) -> Self {
        self.smtp = smtp;
        self
    }

    /// Generation or delivery failed on a document route.
    pub fn processing_failed(details: impl Into<String>) -> Self {
        Self::new("Erreur lors du traitement").with_details(details)
    }

    /// Delivery failed on a mail-only route.
    pub fn email_failed(details: impl Into<String>) -> Self {
        Self::new("Erreur lors de l'envoi de l'email").with_details(details)
    }
}

impl From<ValidationError> for ErrorResponse {
    fn from(err: ValidationError) -> Self {
        Self {
            success: false,
            error: err.error,
            details: err.details,
            smtp: None,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::service::index,
        crate::routes::service::health,
        crate::routes::service::echo,
        crate::routes::diagnostics::test_image,
        crate::routes::diagnostics::test_image_upload,
        crate::routes::report::generate_and_send,
        crate::routes::offer::generate_offer_and_send,
        crate::routes::excel::generate_excel_and_send,
        crate::routes::email::send_email,
        crate::routes::email::send_support_email
    ),
    components(
        schemas(
            ErrorResponse,
            SmtpDetails,
            documents::ReportContent,
            documents::ReportSection,
            documents::Offer,
            documents::offer::OfferSection,
            routes::report::GenerateReportRequest,
            routes::offer::GenerateOfferRequest,
            routes::excel::GenerateExcelRequest,
            routes::email::SendEmailRequest,
            routes::email::SupportEmailRequest,
            routes::diagnostics::TestImageRequest,
            routes::diagnostics::ImageReport,
            routes::service::HealthResponse,
        )
    ),
    tags(
        (name = "Service", description = "Index, health and echo endpoints."),
        (name = "Documents", description = "Generate a document and email it."),
        (name = "Email", description = "Plain and support emails."),
        (name = "Diagnostics", description = "Image troubleshooting endpoints.")
    )
)]
pub struct ApiDoc;

fn cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_origin, _req| true)
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("openai-conversation-id"),
            HeaderName::from_static("openai-ephemeral-user-id"),
        ])
        .supports_credentials()
        .max_age(3600)
}

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let bind = (config.host.clone(), config.port);
    let assets_dir = config.assets_dir.clone();
    let body_limit = config.body_limit;

    let app_state = match AppState::new(config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise application state: {}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("report_mail_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create Prometheus middleware: {}", e))?;

    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors())
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .service(routes::static_files(assets_dir.clone()))
            .configure(|cfg| routes::config(cfg, body_limit))
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

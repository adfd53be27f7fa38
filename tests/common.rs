#![allow(dead_code)]

use actix_web::dev::ServerHandle;
use actix_web::http::header;
use actix_web::{web, App, HttpResponse, HttpServer};
use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use report_mail_server::mail::{MailError, MailTransport, OutgoingMail};
use report_mail_server::{AppConfig, AppState};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

pub const BODY_LIMIT: usize = 50 * 1024 * 1024;
pub const SUPPORT_EMAIL: &str = "support@example.com";

/// In-memory transport that records every message instead of sending it.
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A transport whose relay is always down.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Unreachable);
        }
        self.sent.lock().await.push(mail);
        Ok(())
    }

    async fn verify(&self) -> Result<(), MailError> {
        if self.fail {
            Err(MailError::Unreachable)
        } else {
            Ok(())
        }
    }
}

/// App state over temporary assets and staging directories. The
/// directories live as long as the context.
pub struct TestContext {
    pub state: web::Data<AppState>,
    pub mailer: Arc<RecordingMailer>,
    pub assets: TempDir,
    _staging: TempDir,
}

pub async fn test_context_with(mailer: RecordingMailer) -> TestContext {
    let assets = tempfile::tempdir().expect("assets dir");
    let staging = tempfile::tempdir().expect("staging dir");

    let config = AppConfig {
        assets_dir: assets.path().to_path_buf(),
        staging_dir: staging.path().to_path_buf(),
        support_email: SUPPORT_EMAIL.to_string(),
        ..AppConfig::default()
    };

    let mailer = Arc::new(mailer);
    let state = AppState::new_with_mailer(config, mailer.clone())
        .await
        .expect("Failed to create AppState");

    TestContext {
        state: web::Data::new(state),
        mailer,
        assets,
        _staging: staging,
    }
}

pub async fn test_context() -> TestContext {
    test_context_with(RecordingMailer::new()).await
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 64, 175])))
        .write_to(&mut out, ImageOutputFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn png_base64(width: u32, height: u32) -> String {
    base64::engine::general_purpose::STANDARD.encode(png_bytes(width, height))
}

struct OriginData {
    png: Vec<u8>,
    hits: Arc<AtomicUsize>,
}

async fn origin_png(origin: web::Data<OriginData>) -> HttpResponse {
    origin.hits.fetch_add(1, Ordering::SeqCst);
    HttpResponse::Ok()
        .content_type("image/png")
        .body(origin.png.clone())
}

async fn origin_redirect() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/img.png"))
        .finish()
}

async fn origin_loop() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/loop"))
        .finish()
}

async fn origin_gone() -> HttpResponse {
    HttpResponse::NotFound().body("gone")
}

async fn origin_big() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("image/png")
        .body(vec![0u8; ORIGIN_BIG_BYTES])
}

/// Same size as `/big` but streamed, so no Content-Length is sent.
async fn origin_big_chunked() -> HttpResponse {
    let chunks = (0..ORIGIN_BIG_BYTES / 1024)
        .map(|_| Ok::<_, std::io::Error>(web::Bytes::from(vec![0u8; 1024])));
    HttpResponse::Ok()
        .content_type("image/png")
        .streaming(futures_util::stream::iter(chunks))
}

pub const ORIGIN_BIG_BYTES: usize = 8 * 1024;

/// Local HTTP server standing in for a remote image host.
///
/// - `/img.png` serves `png` and counts hits
/// - `/redir` redirects to `/img.png`, `/loop` redirects to itself
/// - `/gone` answers 404
/// - `/big` and `/big-chunked` serve `ORIGIN_BIG_BYTES` zero bytes
pub struct ImageOrigin {
    pub png: Vec<u8>,
    base: String,
    hits: Arc<AtomicUsize>,
    handle: ServerHandle,
}

impl ImageOrigin {
    pub async fn start() -> Self {
        let png = png_bytes(24, 24);
        let hits = Arc::new(AtomicUsize::new(0));
        let data = web::Data::new(OriginData {
            png: png.clone(),
            hits: hits.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/img.png", web::get().to(origin_png))
                .route("/redir", web::get().to(origin_redirect))
                .route("/loop", web::get().to(origin_loop))
                .route("/gone", web::get().to(origin_gone))
                .route("/big", web::get().to(origin_big))
                .route("/big-chunked", web::get().to(origin_big_chunked))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind image origin");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            png,
            base: format!("http://{}", addr),
            hits,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Requests served by `/img.png` so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

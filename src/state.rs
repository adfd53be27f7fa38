//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::images::ImageLoader;
use crate::mail::{MailTransport, SmtpMailer};
use crate::staging::{spawn_sweeper, FileStager};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn MailTransport + Send + Sync>,
    pub images: ImageLoader,
    pub started_at: Instant,
}

impl AppState {
    /// Production state: SMTP relay from the configuration, connectivity
    /// check in the background.
    pub async fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let mailer: Arc<dyn MailTransport + Send + Sync> = Arc::new(SmtpMailer::new(&config)?);

        let checker = mailer.clone();
        let relay = format!("{}:{}", config.smtp_host, config.smtp_port);
        tokio::spawn(async move {
            match checker.verify().await {
                Ok(()) => log::info!("SMTP relay {} reachable", relay),
                Err(e) => log::error!("SMTP relay {} check failed: {}", relay, e),
            }
        });

        Self::new_with_mailer(config, mailer).await
    }

    /// State around any transport; tests pass an in-memory recorder.
    pub async fn new_with_mailer(
        config: AppConfig,
        mailer: Arc<dyn MailTransport + Send + Sync>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stager = Arc::new(FileStager::new(&config.staging_dir, config.staging_ttl).await?);
        spawn_sweeper(stager.clone(), config.staging_sweep_interval);

        let images = ImageLoader::new(&config, stager)?;

        Ok(AppState {
            config: Arc::new(config),
            mailer,
            images,
            started_at: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

use futures_util::StreamExt;
use moka::future::Cache;
use reqwest::redirect::Policy;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{decode_base64, validate, ImageError, ImageKind};
use crate::config::AppConfig;
use crate::staging::{FileStager, StagedFile};

const MAX_REDIRECTS: usize = 10;

/// Where an image comes from. When a request carries several, the URL wins,
/// then the path, then inline base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Path(String),
    Base64(String),
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ImageSource {
    pub fn pick(url: Option<&str>, path: Option<&str>, base64: Option<&str>) -> Option<Self> {
        if let Some(url) = non_empty(url) {
            Some(Self::Url(url.to_string()))
        } else if let Some(path) = non_empty(path) {
            Some(Self::Path(path.to_string()))
        } else {
            non_empty(base64).map(|data| Self::Base64(data.to_string()))
        }
    }
}

/// Fetches image bytes. Downloads are staged on disk and remembered per URL
/// until the staged copy expires.
#[derive(Clone)]
pub struct ImageLoader {
    client: reqwest::Client,
    stager: Arc<FileStager>,
    downloads: Cache<String, StagedFile>,
    assets_dir: PathBuf,
    max_bytes: usize,
}

impl ImageLoader {
    pub fn new(config: &AppConfig, stager: Arc<FileStager>) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(config.image_fetch_timeout)
            .user_agent(concat!("report-mail-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let downloads = Cache::builder()
            .time_to_live(stager.ttl())
            .max_capacity(256)
            .build();

        Ok(Self {
            client,
            stager,
            downloads,
            assets_dir: config.assets_dir.clone(),
            max_bytes: config.image_max_bytes,
        })
    }

    /// Load and validate the bytes behind `source`.
    pub async fn load(&self, source: &ImageSource) -> Result<Vec<u8>, ImageError> {
        let bytes = match source {
            ImageSource::Url(url) => self.fetch_url(url).await?,
            ImageSource::Path(path) => self.read_path(path).await?,
            ImageSource::Base64(data) => decode_base64(data)?,
        };
        validate(&bytes)?;
        Ok(bytes)
    }

    pub async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        if let Some(staged) = self.downloads.get(url).await {
            match self.stager.read(&staged).await {
                Ok(bytes) => {
                    log::debug!("Image cache hit for {}", url);
                    return Ok(bytes);
                }
                Err(e) => {
                    log::debug!("Dropping stale cached image for {}: {}", url, e);
                    self.downloads.invalidate(url).await;
                }
            }
        }

        log::info!("Downloading image from {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ImageError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(ImageError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > self.max_bytes {
                return Err(ImageError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        log::debug!("Downloaded {} bytes from {}", body.len(), url);

        let extension = ImageKind::detect(&body).extension();
        match self.stager.stage(&body, extension).await {
            Ok(staged) => self.downloads.insert(url.to_string(), staged).await,
            Err(e) => log::warn!("Could not stage image from {}: {}", url, e),
        }

        Ok(body)
    }

    async fn read_path(&self, raw: &str) -> Result<Vec<u8>, ImageError> {
        let path = self.resolve_path(raw).await?;
        log::debug!("Reading image from {}", path.display());
        Ok(tokio::fs::read(&path).await?)
    }

    /// Resolve `raw` against the assets directory, then the working
    /// directory. The result must live inside the assets directory.
    pub async fn resolve_path(&self, raw: &str) -> Result<PathBuf, ImageError> {
        let cwd = std::env::current_dir().unwrap_or_default();
        let not_found = || ImageError::NotFound {
            path: cwd.join(raw),
            cwd: cwd.clone(),
        };

        let root = match tokio::fs::canonicalize(&self.assets_dir).await {
            Ok(root) => root,
            Err(_) => return Err(not_found()),
        };

        for candidate in [self.assets_dir.join(raw), cwd.join(raw)] {
            if let Ok(real) = tokio::fs::canonicalize(&candidate).await {
                if !is_within(&real, &root) {
                    return Err(ImageError::OutsideAssets(real));
                }
                return Ok(real);
            }
        }

        Err(not_found())
    }
}

fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root) && path != root
}

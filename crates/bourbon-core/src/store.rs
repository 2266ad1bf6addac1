use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::sync::Mutex;

use crate::dataset::Dataset;
use crate::remote::{Credentials, DEFAULT_COMP_ID, DEFAULT_SOURCE_URL, RemoteSource};
use crate::telemetry;

pub const DATASET_FILE: &str = "bourbon.csv";
pub const AUTH_FILE: &str = "auth.json";
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Where the cached data lives and where it is refreshed from.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub source_url: String,
    pub comp_id: String,
    pub max_age: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            comp_id: DEFAULT_COMP_ID.to_string(),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl StoreConfig {
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(DATASET_FILE)
    }

    pub fn auth_path(&self) -> PathBuf {
        self.data_dir.join(AUTH_FILE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Missing,
    Stale(Duration),
    Fresh,
}

/// Outcome of a successful refresh.
#[derive(Clone, Debug)]
pub struct UpdateReport {
    pub path: PathBuf,
    pub rows: usize,
    pub updated_at: DateTime<Local>,
}

/// Owns the cached CSV and refreshes it from the remote source when it is
/// missing or older than the configured max age.
pub struct DataStore {
    config: StoreConfig,
    remote: RemoteSource,
    refresh_lock: Mutex<()>,
}

impl DataStore {
    pub fn new(config: StoreConfig) -> Self {
        let remote = RemoteSource::new(config.source_url.clone(), config.comp_id.clone());
        Self {
            config,
            remote,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub async fn cache_state(&self) -> Result<CacheState> {
        let path = self.config.dataset_path();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(CacheState::Missing),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to stat {}", path.display()));
            }
        };
        let modified = metadata
            .modified()
            .with_context(|| format!("failed to read mtime of {}", path.display()))?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        if age >= self.config.max_age {
            Ok(CacheState::Stale(age))
        } else {
            Ok(CacheState::Fresh)
        }
    }

    /// Refresh the cache if it is missing or stale. Returns the refresh
    /// report when a download happened.
    pub async fn ensure_fresh(&self) -> Result<Option<UpdateReport>> {
        match self.cache_state().await? {
            CacheState::Fresh => return Ok(None),
            CacheState::Missing => {
                tracing::info!(
                    path = %self.config.dataset_path().display(),
                    "dataset not found; downloading latest data"
                );
            }
            CacheState::Stale(age) => {
                tracing::warn!(
                    age_hours = age.as_secs() / 3600,
                    "dataset is out of date; refreshing"
                );
            }
        }
        self.refresh(false).await
    }

    /// Load the dataset, refreshing first if needed.
    pub async fn load(&self) -> Result<Dataset> {
        self.ensure_fresh().await?;
        self.read_cached().await
    }

    /// Parse the cache as it is on disk, without checking its age.
    pub async fn read_cached(&self) -> Result<Dataset> {
        let path = self.config.dataset_path();
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read dataset {}", path.display()))?;
        Dataset::from_csv(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Unconditionally download the latest data.
    pub async fn update(&self) -> Result<UpdateReport> {
        self.refresh(true)
            .await?
            .context("refresh finished without a report")
    }

    async fn refresh(&self, force: bool) -> Result<Option<UpdateReport>> {
        let _guard = self.refresh_lock.lock().await;
        // Another request may have refreshed while we waited.
        if !force && self.cache_state().await? == CacheState::Fresh {
            return Ok(None);
        }

        match self.download().await {
            Ok(report) => {
                telemetry::record_refresh("ok");
                tracing::info!(rows = report.rows, path = %report.path.display(), "dataset updated");
                Ok(Some(report))
            }
            Err(err) => {
                telemetry::record_refresh("error");
                Err(err)
            }
        }
    }

    async fn download(&self) -> Result<UpdateReport> {
        let credentials = Credentials::load(&self.config.auth_path())?;
        let csv_text = self.remote.fetch(&credentials).await?;
        let dataset =
            Dataset::from_csv(&csv_text).context("remote source returned an unusable dataset")?;

        let path = self.config.dataset_path();
        write_atomically(&path, csv_text.as_bytes()).await?;

        Ok(UpdateReport {
            path,
            rows: dataset.records().len(),
            updated_at: Local::now(),
        })
    }
}

async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create data directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("failed to move dataset into place {}", path.display()))
}

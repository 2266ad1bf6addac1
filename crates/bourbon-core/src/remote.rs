use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endpoint serving the published price table.
pub const DEFAULT_SOURCE_URL: &str = "https://wix-visual-data.appspot.com/api/file";
/// Component id of the price table on the publishing site.
pub const DEFAULT_COMP_ID: &str = "comp-l5cg5rmf";

/// Failures while fetching the remote dataset. All of them end the current
/// invocation; nothing is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(
        "{} not found; create it with your JWT_HEADER and JWT_PAYLOAD (or run `bourbon auth`)",
        .0.display()
    )]
    MissingCredentials(PathBuf),
    #[error("failed to read credentials from {}", .path.display())]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credentials in {} are malformed", .path.display())]
    ParseCredentials {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("JWT is expired or invalid; update it with `bourbon auth` (status 401: {0})")]
    Unauthorized(String),
    #[error("remote source returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request to remote source failed")]
    Request(#[from] reqwest::Error),
}

/// The two opaque JWT halves that authorize the fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "JWT_HEADER")]
    pub header: String,
    #[serde(rename = "JWT_PAYLOAD")]
    pub payload: String,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, FetchError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FetchError::MissingCredentials(path.to_path_buf()));
            }
            Err(source) => {
                return Err(FetchError::ReadCredentials {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| FetchError::ParseCredentials {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write credentials to {}", path.display()))
    }

    fn instance(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

#[derive(Deserialize)]
struct RemoteResponse {
    #[serde(rename = "csvData")]
    csv_data: String,
}

/// Client for the single GET endpoint that returns the raw CSV.
#[derive(Clone, Debug)]
pub struct RemoteSource {
    client: reqwest::Client,
    base_url: String,
    comp_id: String,
}

impl RemoteSource {
    pub fn new(base_url: impl Into<String>, comp_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            comp_id: comp_id.into(),
        }
    }

    /// Download the current CSV text.
    pub async fn fetch(&self, credentials: &Credentials) -> Result<String, FetchError> {
        tracing::info!(url = %self.base_url, "getting latest prices");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("instance", credentials.instance().as_str()),
                ("compId", self.comp_id.as_str()),
                ("isSite", "False"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Unauthorized(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: RemoteResponse = response.json().await?;
        Ok(body.csv_data)
    }
}

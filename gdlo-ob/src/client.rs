//! Game server client
//!
//! Requests are form-encoded POSTs. Every failure (transport, HTTP status,
//! undecodable payload) comes back as a page with a non-success status.

use crate::error::FetchError;
use crate::protocol::{decode_response, DecodedPage, FetchStatus};
use async_trait::async_trait;
use gdlo_common::config::ServerConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Listing type: recently awarded levels
const TYPE_AWARDED: &str = "11";
/// Listing type: levels by comma-separated id list
const TYPE_LIST: &str = "10";

/// Most ids a single list lookup may carry
pub const MAX_LIST_LENGTH: usize = 1000;

const USER_AGENT: &str = concat!("gdlo/", env!("CARGO_PKG_VERSION"));

/// Source of decoded listing pages
#[async_trait]
pub trait LevelSource: Send + Sync {
    /// One page of the recently awarded listing
    async fn fetch_awarded(&self, page: u32) -> DecodedPage;

    /// Look up levels by id (at most [`MAX_LIST_LENGTH`] are sent)
    async fn fetch_list(&self, ids: &[i64]) -> DecodedPage;
}

pub struct HttpLevelSource {
    http_client: reqwest::Client,
    config: ServerConfig,
}

impl HttpLevelSource {
    pub fn new(config: ServerConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Fixed request parameters plus the given ones
    fn form(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("secret", self.config.secret.clone()),
            ("gameVersion", self.config.game_version.to_string()),
            ("binaryVersion", self.config.binary_version.to_string()),
            ("gdw", "0".to_string()),
            ("star", "1".to_string()),
        ];
        form.extend(extra.iter().cloned());
        form
    }

    async fn post(&self, form: &[(&'static str, String)]) -> Result<String, FetchError> {
        let response = self
            .http_client
            .post(&self.config.url)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    async fn fetch(&self, extra: &[(&'static str, String)]) -> DecodedPage {
        match self.post(&self.form(extra)).await {
            Ok(raw) => decode_response(&raw),
            Err(e) => {
                warn!("Level request failed: {}", e);
                DecodedPage::empty(FetchStatus::Error)
            }
        }
    }
}

#[async_trait]
impl LevelSource for HttpLevelSource {
    async fn fetch_awarded(&self, page: u32) -> DecodedPage {
        debug!(page, "Requesting awarded levels");
        self.fetch(&[("type", TYPE_AWARDED.to_string()), ("page", page.to_string())])
            .await
    }

    async fn fetch_list(&self, ids: &[i64]) -> DecodedPage {
        if ids.is_empty() {
            return DecodedPage::empty(FetchStatus::Success);
        }
        debug!(count = ids.len(), "Requesting level list");
        self.fetch(&[("type", TYPE_LIST.to_string()), ("str", join_ids(ids))])
            .await
    }
}

/// Comma-joined id list, truncated to [`MAX_LIST_LENGTH`]
pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .take(MAX_LIST_LENGTH)
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

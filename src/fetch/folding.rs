//! Folding@home donor stats.
//!
//! Uses the public `GET /user/{name}` endpoint, which needs no token.

use super::{get_body, require_identity, FetchError, StatsFetcher};
use crate::models::{Platform, PlatformStats, PlatformSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.foldingathome.org";

/// Wire shape of the `/user/{name}` response.
#[derive(Debug, Deserialize)]
struct UserResponse {
    score: Option<u64>,
    wus: Option<u64>,
    rank: Option<u64>,
    users: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Fetcher for one Folding@home donor.
pub struct FoldingFetcher {
    client: reqwest::Client,
    base_url: String,
    username: String,
}

impl FoldingFetcher {
    pub fn new(client: reqwest::Client, base_url: &str, username: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            username: username.to_string(),
        }
    }

    fn user_url(&self, username: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Network(format!("invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push("user")
            .push(username);
        Ok(url)
    }
}

#[async_trait]
impl StatsFetcher for FoldingFetcher {
    fn platform(&self) -> Platform {
        Platform::FoldingAtHome
    }

    async fn fetch(&self) -> Result<PlatformStats, FetchError> {
        let username = require_identity(&self.username, "Folding@home username")?;
        let url = self.user_url(username)?;

        info!("Fetching Folding@home stats for: {}", username);
        debug!("GET {}", url);

        let body = get_body(self.client.get(url), "Folding@home user lookup").await?;
        let summary = parse_user(&body, Utc::now())?;

        Ok(PlatformStats {
            platform: Platform::FoldingAtHome,
            summary,
            projects: Vec::new(),
        })
    }
}

/// Convert a `/user/{name}` body into a summary.
fn parse_user(body: &str, fetched_at: DateTime<Utc>) -> Result<PlatformSummary, FetchError> {
    let user: UserResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    if let Some(error) = user.error {
        return Err(FetchError::NotFound(error));
    }

    let points = user
        .score
        .ok_or_else(|| FetchError::Parse("missing field `score`".to_string()))?;

    Ok(PlatformSummary {
        points,
        work_units: user.wus.unwrap_or(0),
        rank: user.rank,
        fetched_at,
        contributors: user.users,
        cpu_seconds: None,
    })
}

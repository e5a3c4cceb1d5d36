//! Upstream statistics fetchers.
//!
//! Each fetcher talks to one platform API and converts its response into
//! [`PlatformStats`] at the boundary. Nothing past this module sees raw
//! upstream JSON.

pub mod folding;
pub mod grid;

pub use folding::FoldingFetcher;
pub use grid::GridFetcher;

use crate::models::{Platform, PlatformStats};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Why a single platform could not be fetched.
///
/// None of these abort a run; the platform is rendered as unavailable.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure, timeout or an unexpected HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// Missing or rejected identifier/token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// The upstream does not know this user or member.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            classify_status(status, "")
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Produces normalized stats for one configured identity.
#[async_trait]
pub trait StatsFetcher: Send + Sync {
    /// The platform this fetcher reports on.
    fn platform(&self) -> Platform;

    /// Issue one request and normalize the response.
    async fn fetch(&self) -> Result<PlatformStats, FetchError>;
}

/// Build the shared HTTP client with a per-request timeout.
pub fn build_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("crunchstats/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Map a non-success HTTP status onto the error taxonomy.
pub(crate) fn classify_status(status: StatusCode, what: &str) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FetchError::Auth(format!("{} rejected credentials ({})", what, status))
        }
        StatusCode::NOT_FOUND => FetchError::NotFound(format!("{} ({})", what, status)),
        _ => FetchError::Network(format!("{} returned {}", what, status)),
    }
}

/// Reject blank identifiers before any request goes out.
pub(crate) fn require_identity<'a>(value: &'a str, field: &str) -> Result<&'a str, FetchError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FetchError::Auth(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

/// Send a prepared GET request and return the body of a 2xx response.
pub(crate) async fn get_body(
    request: reqwest::RequestBuilder,
    what: &str,
) -> Result<String, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status, what));
    }
    Ok(response.text().await?)
}

/// Run every fetcher concurrently and collect the outcomes.
///
/// Outcomes come back in fetcher order, but nothing downstream relies on it.
pub async fn fetch_all(
    fetchers: &[Box<dyn StatsFetcher>],
) -> Vec<(Platform, Result<PlatformStats, FetchError>)> {
    let futures = fetchers.iter().map(|fetcher| async move {
        let platform = fetcher.platform();
        let outcome = fetcher.fetch().await;
        match &outcome {
            Ok(stats) => tracing::info!(
                "{}: {} points, {} work units",
                platform,
                stats.summary.points,
                stats.summary.work_units
            ),
            Err(e) => tracing::warn!("{} unavailable: {}", platform, e),
        }
        (platform, outcome)
    });

    futures::future::join_all(futures).await
}

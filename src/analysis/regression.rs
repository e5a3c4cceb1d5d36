//! Credit regression detection against the previous run's snapshot.
//!
//! Credits should only ever grow. A drop usually means the upstream
//! returned a truncated result window, so it is reported but never acted on.

use crate::models::{AggregateSnapshot, Platform};
use std::path::Path;
use tracing::debug;

/// A project whose credits went down since the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditRegression {
    pub name: String,
    pub source: Platform,
    pub previous: u64,
    pub current: u64,
}

/// Load the previous JSON snapshot, if there is a readable one.
pub fn load_previous(path: &Path) -> Option<AggregateSnapshot> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            debug!("Ignoring unreadable previous snapshot {}: {}", path.display(), e);
            None
        }
    }
}

/// Projects present in both snapshots whose credits decreased.
pub fn credit_regressions(
    previous: &AggregateSnapshot,
    current: &AggregateSnapshot,
) -> Vec<CreditRegression> {
    current
        .projects()
        .iter()
        .filter_map(|now| {
            let before = previous
                .projects()
                .iter()
                .find(|p| p.name == now.name && p.source == now.source)?;
            (now.credits < before.credits).then(|| CreditRegression {
                name: now.name.clone(),
                source: now.source,
                previous: before.credits,
                current: now.credits,
            })
        })
        .collect()
}

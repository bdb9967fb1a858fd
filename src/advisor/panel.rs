//! Advisory state exposed to the presentation layer
//!
//! Idle → Loading → {Generated | Fallback} → Idle
//!
//! Every request takes a generation number. Only the newest generation may
//! publish, so a later request supersedes one still in flight.
//!
//! Requests also carry the store version they were read at. A request for an
//! older version than the panel has already seen is dropped, so tasks that
//! reach the panel out of order cannot publish tips for a stale history.

use super::{AdviceOutcome, SavingsAdvisor};
use crate::models::{SavingsTip, Transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryStatus {
    Idle,
    Loading,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TipSource {
    Generated,
    Fallback,
}

/// Point-in-time view of the panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorySnapshot {
    pub status: AdvisoryStatus,
    pub tips: Vec<SavingsTip>,
    pub source: Option<TipSource>,
    pub last_observed_count: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct PanelState {
    status: AdvisoryStatus,
    tips: Vec<SavingsTip>,
    source: Option<TipSource>,
    last_observed_count: usize,
    last_observed_version: u64,
    generation: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl PanelState {
    fn snapshot(&self) -> AdvisorySnapshot {
        AdvisorySnapshot {
            status: self.status,
            tips: self.tips.clone(),
            source: self.source,
            last_observed_count: self.last_observed_count,
            updated_at: self.updated_at,
        }
    }

    fn is_stale(&self, version: u64) -> bool {
        version < self.last_observed_version
    }

    fn begin(&mut self, version: u64, count: usize) -> u64 {
        self.generation += 1;
        self.status = AdvisoryStatus::Loading;
        self.last_observed_count = count;
        self.last_observed_version = version;
        self.generation
    }
}

pub struct AdvisoryPanel {
    advisor: Arc<SavingsAdvisor>,
    state: RwLock<PanelState>,
}

impl AdvisoryPanel {
    pub fn new(advisor: Arc<SavingsAdvisor>) -> Self {
        Self {
            advisor,
            state: RwLock::new(PanelState {
                status: AdvisoryStatus::Idle,
                tips: Vec::new(),
                source: None,
                last_observed_count: 0,
                last_observed_version: 0,
                generation: 0,
                updated_at: None,
            }),
        }
    }

    pub async fn snapshot(&self) -> AdvisorySnapshot {
        self.state.read().await.snapshot()
    }

    /// Explicit refresh of the history read at store `version`.
    ///
    /// A no-op on an empty history or when a newer version was already seen.
    pub async fn refresh(
        &self,
        version: u64,
        transactions: &[Transaction],
        currency_symbol: &str,
    ) -> AdvisorySnapshot {
        let generation = {
            let mut state = self.state.write().await;

            if transactions.is_empty() {
                debug!("Tip refresh skipped, no transactions");
                return state.snapshot();
            }
            if state.is_stale(version) {
                debug!(version, seen = state.last_observed_version, "Tip refresh skipped, history is stale");
                return state.snapshot();
            }

            state.begin(version, transactions.len())
        };

        self.run(generation, transactions, currency_symbol).await
    }

    /// React to the transaction sequence as read at store `version`.
    ///
    /// Refreshes when the count differs from the last observed one, or when
    /// nothing has been produced yet. Observations older than the newest one
    /// seen are ignored. Returns whether a refresh ran.
    pub async fn observe(&self, version: u64, transactions: &[Transaction], currency_symbol: &str) -> bool {
        let count = transactions.len();

        let generation = {
            let mut state = self.state.write().await;

            if state.is_stale(version) {
                debug!(version, seen = state.last_observed_version, "Ignoring stale observation");
                return false;
            }

            if count == 0 {
                // Invalidate anything in flight and forget stale tips
                state.generation += 1;
                state.status = AdvisoryStatus::Idle;
                state.tips.clear();
                state.source = None;
                state.last_observed_count = 0;
                state.last_observed_version = version;
                state.updated_at = Some(Utc::now());
                return false;
            }

            let changed = count != state.last_observed_count;
            let never_loaded = state.source.is_none() && state.status == AdvisoryStatus::Idle;
            if !changed && !never_loaded {
                state.last_observed_version = version;
                return false;
            }

            state.begin(version, count)
        };

        debug!(count, generation, "Transaction count changed, refreshing tips");
        self.run(generation, transactions, currency_symbol).await;
        true
    }

    async fn run(&self, generation: u64, transactions: &[Transaction], currency_symbol: &str) -> AdvisorySnapshot {
        let outcome = self.advisor.advise(transactions, currency_symbol).await;
        self.publish(generation, outcome).await
    }

    async fn publish(&self, generation: u64, outcome: AdviceOutcome) -> AdvisorySnapshot {
        let mut state = self.state.write().await;

        if generation != state.generation {
            debug!(
                generation,
                current = state.generation,
                "Discarding superseded tip result"
            );
            return state.snapshot();
        }

        state.source = Some(if outcome.is_fallback() {
            TipSource::Fallback
        } else {
            TipSource::Generated
        });
        state.tips = outcome.into_tips();
        state.status = AdvisoryStatus::Idle;
        state.updated_at = Some(Utc::now());

        info!(tip_count = state.tips.len(), source = ?state.source, "Advisory panel updated");
        state.snapshot()
    }
}

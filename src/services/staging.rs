//! Staging store - temporary keyed storage for pending registrations.
//!
//! The store is an injected capability so deployments can swap the in-process
//! backend for an external expiring key-value store. Inserts are
//! compare-and-set: two overlapping signups for the same email resolve to one
//! winner inside the store, never in handler code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::models::PendingRegistration;
use crate::services::ServiceError;

/// Outcome of a compare-and-set insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingInsert {
    Inserted,
    /// An unexpired entry already holds this email.
    Occupied,
}

#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Insert `record` iff no unexpired entry exists for its email. An
    /// expired leftover is reclaimed under the same entry lock.
    async fn insert_if_vacant(
        &self,
        record: PendingRegistration,
    ) -> Result<StagingInsert, ServiceError>;

    /// Current entry, expired or not. Callers re-check wall-clock expiry.
    async fn get(&self, email: &str) -> Result<Option<PendingRegistration>, ServiceError>;

    /// Swap in a fresh code hash and expiry, resetting the attempt counter.
    /// Returns false if no entry exists for the email.
    async fn replace_code(
        &self,
        email: &str,
        code_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError>;

    /// Increment the failed-attempt counter. Returns the new count, or None
    /// if no entry exists.
    async fn record_attempt(&self, email: &str) -> Result<Option<u32>, ServiceError>;

    /// Remove the entry unconditionally. Idempotent.
    async fn remove(&self, email: &str) -> Result<(), ServiceError>;
}

/// In-process staging store backed by a concurrent map. Entries do not
/// survive a restart; the flow's own TTL bounds the loss.
#[derive(Default)]
pub struct InMemoryStaging {
    entries: DashMap<String, PendingRegistration>,
}

impl InMemoryStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, rec| !rec.is_expired());
        before - self.entries.len()
    }

    /// Periodic cleanup of abandoned registrations. The gate re-checks
    /// wall-clock expiry on every read, so sweep cadence is not a
    /// correctness concern.
    pub fn spawn_sweeper(store: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired pending registrations");
                }
            }
        })
    }
}

#[async_trait]
impl StagingStore for InMemoryStaging {
    async fn insert_if_vacant(
        &self,
        record: PendingRegistration,
    ) -> Result<StagingInsert, ServiceError> {
        match self.entries.entry(record.email.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(record);
                    Ok(StagingInsert::Inserted)
                } else {
                    Ok(StagingInsert::Occupied)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(record);
                Ok(StagingInsert::Inserted)
            }
        }
    }

    async fn get(&self, email: &str) -> Result<Option<PendingRegistration>, ServiceError> {
        Ok(self.entries.get(email).map(|entry| entry.value().clone()))
    }

    async fn replace_code(
        &self,
        email: &str,
        code_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        match self.entries.get_mut(email) {
            Some(mut entry) => {
                let rec = entry.value_mut();
                rec.code_hash = code_hash;
                rec.expires_at = expires_at;
                rec.attempts = 0;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_attempt(&self, email: &str) -> Result<Option<u32>, ServiceError> {
        match self.entries.get_mut(email) {
            Some(mut entry) => {
                let rec = entry.value_mut();
                rec.attempts += 1;
                Ok(Some(rec.attempts))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, email: &str) -> Result<(), ServiceError> {
        self.entries.remove(email);
        Ok(())
    }
}

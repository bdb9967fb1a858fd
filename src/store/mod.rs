//! Transaction persistence layer
//!
//! The transaction sequence is kept as one JSON blob under a fixed key.
//! Backends only move strings around; the store owns the format.

use crate::error::SpendError;
use crate::models::{NewTransaction, Transaction};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub mod file;
pub mod postgres;

pub use file::FileBlobStore;
pub use postgres::PostgresBlobStore;

/// Key the transaction sequence is stored under
pub const STORAGE_KEY: &str = "smartspend_transactions";

/// Trait for key-value blob persistence
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory blob store for development and tests
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed a blob, e.g. to simulate data left by a previous session
    pub fn with_blob(key: &str, value: &str) -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(key.to_string(), value.to_string());
        Self {
            blobs: Arc::new(RwLock::new(blobs)),
        }
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(key);
        Ok(())
    }
}

/// Current sequence plus a counter bumped on every replacement
#[derive(Debug, Default)]
struct Sequence {
    version: u64,
    transactions: Arc<Vec<Transaction>>,
}

impl Sequence {
    fn replace(&mut self, next: Vec<Transaction>) {
        self.version += 1;
        self.transactions = Arc::new(next);
    }
}

/// Ordered transaction sequence (newest first) backed by a blob store
pub struct TransactionStore {
    backend: Box<dyn BlobStore>,
    key: String,
    sequence: RwLock<Sequence>,
}

impl TransactionStore {
    pub fn new(backend: Box<dyn BlobStore>) -> Self {
        Self::with_key(backend, STORAGE_KEY)
    }

    pub fn with_key(backend: Box<dyn BlobStore>, key: &str) -> Self {
        Self {
            backend,
            key: key.to_string(),
            sequence: RwLock::new(Sequence::default()),
        }
    }

    /// Build a store and load whatever the backend already holds
    pub async fn open(backend: Box<dyn BlobStore>) -> Result<Self> {
        let store = Self::new(backend);
        store.load().await?;
        Ok(store)
    }

    /// Reload the sequence from the backend.
    ///
    /// A missing key yields an empty sequence. A blob that fails to parse is
    /// logged and also treated as empty. Backend failures are returned.
    pub async fn load(&self) -> Result<usize> {
        let loaded = match self.backend.get(&self.key).await? {
            None => {
                debug!(key = %self.key, "No stored transactions");
                Vec::new()
            }
            Some(blob) => match serde_json::from_str::<Vec<Transaction>>(&blob) {
                Ok(transactions) => transactions,
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Stored transactions are malformed, starting empty");
                    Vec::new()
                }
            },
        };

        let count = loaded.len();
        self.sequence.write().await.replace(loaded);

        info!(count, "Transactions loaded");
        Ok(count)
    }

    /// Persist the current sequence
    pub async fn save(&self) -> Result<()> {
        let current = self.snapshot().await;
        self.persist(&current).await
    }

    /// Current sequence, newest first
    pub async fn snapshot(&self) -> Arc<Vec<Transaction>> {
        self.sequence.read().await.transactions.clone()
    }

    /// Current sequence with its version, read together.
    ///
    /// Versions only grow, so a larger version is always the newer sequence.
    pub async fn revision(&self) -> (u64, Arc<Vec<Transaction>>) {
        let sequence = self.sequence.read().await;
        (sequence.version, sequence.transactions.clone())
    }

    pub async fn len(&self) -> usize {
        self.sequence.read().await.transactions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Validate, prepend and persist a new transaction
    pub async fn add(&self, new: NewTransaction) -> Result<Transaction> {
        let transaction = Transaction::create(new)?;

        let mut guard = self.sequence.write().await;
        let mut next = Vec::with_capacity(guard.transactions.len() + 1);
        next.push(transaction.clone());
        next.extend(guard.transactions.iter().cloned());

        self.persist(&next).await?;
        guard.replace(next);

        info!(
            id = %transaction.id,
            kind = %transaction.kind,
            category = %transaction.category,
            "Transaction added"
        );
        Ok(transaction)
    }

    /// Remove a transaction by id; returns whether anything was removed
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let mut guard = self.sequence.write().await;

        if !guard.transactions.iter().any(|t| t.id == id) {
            debug!(id, "Remove requested for unknown transaction");
            return Ok(false);
        }

        let next: Vec<Transaction> = guard
            .transactions
            .iter()
            .filter(|t| t.id != id)
            .cloned()
            .collect();
        self.persist(&next).await?;
        guard.replace(next);

        info!(id, "Transaction removed");
        Ok(true)
    }

    /// Drop every transaction
    pub async fn clear(&self) -> Result<usize> {
        let mut guard = self.sequence.write().await;
        let removed = guard.transactions.len();

        self.backend.delete(&self.key).await.map_err(|e| {
            SpendError::Storage(format!("failed to clear transactions: {}", e))
        })?;
        guard.replace(Vec::new());

        info!(removed, "Transactions cleared");
        Ok(removed)
    }

    async fn persist(&self, transactions: &[Transaction]) -> Result<()> {
        let blob = serde_json::to_string(transactions)?;
        self.backend.put(&self.key, &blob).await.map_err(|e| {
            SpendError::Storage(format!("failed to save transactions: {}", e))
        })
    }
}

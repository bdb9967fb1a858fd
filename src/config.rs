//! Runtime configuration
//!
//! Read from the process environment (after `.env` is loaded by the binaries).

use crate::error::SpendError;
use crate::gemini::DEFAULT_MODEL;
use crate::store::{BlobStore, FileBlobStore, InMemoryBlobStore, PostgresBlobStore};
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORAGE_DIR: &str = "./data";
const DEFAULT_ADVISOR_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File(PathBuf),
    Postgres(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub advisor_timeout: Duration,
    pub storage: StorageBackend,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; used by `from_env` and tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .unwrap_or_default();

        let gemini_model = non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let advisor_timeout = match non_empty("ADVISOR_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    SpendError::Config(format!("ADVISOR_TIMEOUT_SECS must be an integer, got {:?}", raw))
                })?;
                if secs == 0 {
                    return Err(SpendError::Config(
                        "ADVISOR_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_ADVISOR_TIMEOUT_SECS),
        };

        let storage = match non_empty("STORAGE_BACKEND")
            .map(|v| v.trim().to_lowercase())
            .as_deref()
        {
            None | Some("file") => StorageBackend::File(
                non_empty("STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
            ),
            Some("memory") => StorageBackend::Memory,
            Some("postgres") => {
                let url = non_empty("DATABASE_URL").ok_or_else(|| {
                    SpendError::Config("DATABASE_URL is required for the postgres backend".to_string())
                })?;
                StorageBackend::Postgres(url)
            }
            Some(other) => {
                return Err(SpendError::Config(format!(
                    "unknown STORAGE_BACKEND {:?} (expected memory, file or postgres)",
                    other
                )))
            }
        };

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| SpendError::Config(format!("PORT must be a valid port, got {:?}", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            gemini_api_key,
            gemini_model,
            advisor_timeout,
            storage,
            port,
        })
    }

    /// Instantiate the configured blob store
    pub async fn open_blob_store(&self) -> Result<Box<dyn BlobStore>> {
        let backend: Box<dyn BlobStore> = match &self.storage {
            StorageBackend::Memory => {
                info!("Blob store backend: in-memory");
                Box::new(InMemoryBlobStore::new())
            }
            StorageBackend::File(dir) => {
                info!(dir = %dir.display(), "Blob store backend: file");
                Box::new(FileBlobStore::new(dir.clone()).await?)
            }
            StorageBackend::Postgres(url) => Box::new(PostgresBlobStore::connect_lazy(url)?),
        };
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.gemini_api_key, "");
        assert_eq!(cfg.gemini_model, DEFAULT_MODEL);
        assert_eq!(cfg.advisor_timeout, Duration::from_secs(30));
        assert_eq!(cfg.storage, StorageBackend::File(PathBuf::from("./data")));
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn test_api_key_aliases() {
        assert_eq!(config(&[("API_KEY", "abc")]).unwrap().gemini_api_key, "abc");
        assert_eq!(
            config(&[("API_KEY", "abc"), ("GEMINI_API_KEY", "xyz")]).unwrap().gemini_api_key,
            "xyz"
        );
    }

    #[test]
    fn test_storage_selection() {
        assert_eq!(
            config(&[("STORAGE_BACKEND", "memory")]).unwrap().storage,
            StorageBackend::Memory
        );
        assert_eq!(
            config(&[("STORAGE_BACKEND", "File"), ("STORAGE_DIR", "/tmp/spend")]).unwrap().storage,
            StorageBackend::File(PathBuf::from("/tmp/spend"))
        );
        assert_eq!(
            config(&[("STORAGE_BACKEND", "postgres"), ("DATABASE_URL", "postgres://x")])
                .unwrap()
                .storage,
            StorageBackend::Postgres("postgres://x".to_string())
        );
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for pairs in [
            vec![("STORAGE_BACKEND", "redis")],
            vec![("STORAGE_BACKEND", "postgres")],
            vec![("PORT", "eighty")],
            vec![("ADVISOR_TIMEOUT_SECS", "0")],
            vec![("ADVISOR_TIMEOUT_SECS", "soon")],
        ] {
            assert!(matches!(config(&pairs), Err(SpendError::Config(_))), "{:?}", pairs);
        }
    }

    #[test]
    fn test_port_alias() {
        assert_eq!(config(&[("API_PORT", "9000")]).unwrap().port, 9000);
    }
}

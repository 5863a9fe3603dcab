use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::debug;

use super::{LinkStore, Lookup, StoreError};
use crate::config::Config;
use crate::keys::key_for_url_text;
use crate::link::ResolvedLink;
use crate::resolver::LinkResolver;

const TEMP_STORE_PREFIX: &str = "link-store-";

/// On-disk document: the record plus its expiry.
#[derive(Serialize)]
struct StoredLinkRef<'a> {
    #[serde(flatten)]
    link: &'a ResolvedLink,
    #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct StoredLink {
    #[serde(flatten)]
    link: ResolvedLink,
    #[serde(rename = "expiresAt", default)]
    expires_at: Option<DateTime<Utc>>,
}

/// Stores each resolved link as a pretty-printed JSON file named after the
/// SHA-1 of the URL text its chain started from.
pub struct FileStore {
    dir: PathBuf,
    resolver: LinkResolver,
    config: Config,
    /// Held for temporary stores that clean up on close.
    temp_dir: Mutex<Option<TempDir>>,
}

impl FileStore {
    /// Open a store in `dir`, creating the directory when `create` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingDirectory`] if `dir` does not exist and
    /// `create` is false, or an I/O error if it cannot be created.
    pub async fn open(
        dir: impl Into<PathBuf>,
        create: bool,
        resolver: LinkResolver,
        config: Config,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !tokio::fs::try_exists(&dir).await? {
            if !create {
                return Err(StoreError::MissingDirectory(dir));
            }
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(Self {
            dir,
            resolver,
            config,
            temp_dir: Mutex::new(None),
        })
    }

    /// Open a store in a fresh temporary directory.
    ///
    /// With `remove_on_close` the directory and everything in it is deleted
    /// by [`LinkStore::close`] (or when the store is dropped).
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn temporary(
        remove_on_close: bool,
        resolver: LinkResolver,
        config: Config,
    ) -> Result<Self, StoreError> {
        let temp = tempfile::Builder::new().prefix(TEMP_STORE_PREFIX).tempdir()?;
        let (dir, temp_dir) = if remove_on_close {
            (temp.path().to_path_buf(), Some(temp))
        } else {
            (temp.keep(), None)
        };
        Ok(Self {
            dir,
            resolver,
            config,
            temp_dir: Mutex::new(temp_dir),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `url_text`.
    #[must_use]
    pub fn path_for(&self, url_text: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key_for_url_text(url_text)))
    }
}

#[async_trait]
impl LinkStore for FileStore {
    async fn resolve(&self, url_text: &str) -> ResolvedLink {
        self.resolver.resolve_with_config(url_text, &self.config).await
    }

    async fn find(&self, url_text: &str) -> Result<Lookup, StoreError> {
        let path = self.path_for(url_text);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Lookup::miss()),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredLink = serde_json::from_slice(&bytes)?;
        let expired = stored.expires_at.is_some_and(|at| at <= Utc::now());
        debug!(url = %url_text, path = %path.display(), expired, "Found stored link");
        Ok(Lookup::hit(stored.link, expired))
    }

    async fn save(&self, link: &ResolvedLink, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| Utc::now() + ttl);
        let document = StoredLinkRef { link, expires_at };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let path = self.path_for(&link.root().original_text);
        let partial = path.with_extension("json.partial");
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;
        debug!(url = %link.root().original_text, path = %path.display(), "Stored link");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        let temp = match self.temp_dir.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(temp) = temp {
            temp.close()?;
        }
        Ok(())
    }

    fn default_ttl(&self) -> Option<Duration> {
        self.config.store_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn store_in(dir: &Path) -> FileStore {
        let config = Config::default();
        let resolver = LinkResolver::from_config(&config).unwrap();
        FileStore {
            dir: dir.to_path_buf(),
            resolver,
            config,
            temp_dir: Mutex::new(None),
        }
    }

    fn sample(original: &str) -> ResolvedLink {
        let mut link = ResolvedLink::new(original);
        link.url_structure_valid = true;
        link.destination_valid = true;
        link.http_status_code = 200;
        link.finalized_url = Some(Url::parse("https://example.com/").unwrap());
        link
    }

    #[tokio::test]
    async fn test_save_then_find() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        let link = sample("https://short.example/a");

        store.save(&link, None).await.unwrap();
        let lookup = store.find("https://short.example/a").await.unwrap();

        assert!(lookup.found);
        assert!(!lookup.expired);
        assert_eq!(lookup.link.unwrap(), link);
    }

    #[tokio::test]
    async fn test_document_shape() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        store
            .save(&sample("https://short.example/a"), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let path = store.path_for("https://short.example/a");
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("{}.json", key_for_url_text("https://short.example/a"))
        );
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["origURLtext"], "https://short.example/a");
        assert_eq!(json["finalizedURL"], "https://example.com/");
        assert!(json["expiresAt"].is_string());
    }

    #[tokio::test]
    async fn test_expired_record() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        store
            .save(&sample("https://short.example/a"), Some(Duration::ZERO))
            .await
            .unwrap();

        let lookup = store.find("https://short.example/a").await.unwrap();
        assert!(lookup.found);
        assert!(lookup.expired);
        assert!(lookup.fresh().is_none());
    }

    #[tokio::test]
    async fn test_missing_record() {
        let dir = TempDir::new().unwrap();
        let lookup = store_in(dir.path()).find("https://nope.example/").await.unwrap();
        assert!(!lookup.found);
        assert!(lookup.link.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_json_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        std::fs::write(store.path_for("https://bad.example/"), b"{not json").unwrap();

        let err = store.find("https://bad.example/").await.unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[tokio::test]
    async fn test_chain_saved_under_root_text() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        let mut last = sample("https://example.com/");
        last.previous = Some(Box::new(sample("https://short.example/a")));

        store.save(&last, None).await.unwrap();
        let found = store.find("https://short.example/a").await.unwrap();
        assert_eq!(found.link.unwrap().original_text, "https://example.com/");
        assert!(!store.find("https://example.com/").await.unwrap().found);
    }
}

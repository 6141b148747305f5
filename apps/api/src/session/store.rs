//! Flat-file user store.
//!
//! Users live in a single JSON array on disk. Every read-modify-write runs under
//! one `tokio::sync::Mutex`, and every write goes through a temp file in the
//! same directory that is renamed over the existing file, so a crash never leaves a
//! half-written file behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    AlreadyExists,

    #[error("user store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("user store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("user store task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(alias = "password")]
    pub password_hash: String,
}

impl UserRecord {
    /// Builds a record with a fresh id and a hashed password.
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash: hash_password(password),
        }
    }

    pub fn password_matches(&self, password: &str) -> bool {
        self.password_hash == hash_password(password)
    }
}

/// SHA-256 hex digest of the password. Unsalted; kept for compatibility with
/// existing `users.json` files.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub struct UserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UserStore {
    /// Opens the store at `path`, creating it as `[]` if it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !tokio::fs::try_exists(&path).await? {
            write_atomic(path.clone(), b"[]".to_vec()).await?;
            info!(path = %path.display(), "Created empty user store");
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let email = normalize_email(email);
        let users = self.load().await?;
        Ok(users.into_iter().find(|u| normalize_email(&u.email) == email))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let users = self.load().await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    /// Appends `record`. Fails with `AlreadyExists` if the email is taken.
    pub async fn add(&self, record: UserRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut users = self.load().await?;
        let email = normalize_email(&record.email);
        if users.iter().any(|u| normalize_email(&u.email) == email) {
            return Err(StoreError::AlreadyExists);
        }
        users.push(record);
        let bytes = serde_json::to_vec_pretty(&users)?;
        write_atomic(self.path.clone(), bytes).await
    }

    /// Caller must hold `lock`. A missing file or unparseable content reads as
    /// an empty store.
    async fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(users) => Ok(users),
            Err(e) => {
                warn!(path = %self.path.display(), "User store is not valid JSON, treating as empty: {e}");
                Ok(Vec::new())
            }
        }
    }
}

async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> Result<(), StoreError> {
    tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| StoreError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn temp_store() -> (tempfile::TempDir, UserStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json")).await.unwrap();
        (dir, store)
    }

    #[test]
    fn test_hash_password_is_sha256_hex() {
        assert_eq!(
            hash_password("secret"),
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
    }

    #[tokio::test]
    async fn test_open_creates_empty_array() {
        let (_dir, store) = temp_store().await;
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "[]");
    }

    #[tokio::test]
    async fn test_add_and_find() {
        let (_dir, store) = temp_store().await;
        let record = UserRecord::new("Asha Rao", "Asha@Example.com", "secret1");
        store.add(record.clone()).await.unwrap();

        let by_email = store.find_by_email("asha@example.com").await.unwrap().unwrap();
        assert_eq!(by_email, record);
        let by_id = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Asha Rao");
        assert!(by_id.password_matches("secret1"));
        assert!(!by_id.password_matches("secret2"));
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (_dir, store) = temp_store().await;
        store.add(UserRecord::new("A", "a@example.com", "pw1234")).await.unwrap();
        let err = store
            .add(UserRecord::new("B", " A@EXAMPLE.COM ", "pw5678"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_invalid_json_reads_as_empty() {
        let (_dir, store) = temp_store().await;
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.find_by_email("a@example.com").await.unwrap().is_none());

        store.add(UserRecord::new("A", "a@example.com", "pw1234")).await.unwrap();
        assert!(store.find_by_email("a@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reads_legacy_password_key() {
        let (_dir, store) = temp_store().await;
        std::fs::write(
            store.path(),
            format!(
                r#"[{{"id":"1","name":"Old","email":"old@example.com","password":"{}"}}]"#,
                hash_password("legacy")
            ),
        )
        .unwrap();
        let user = store.find_by_id("1").await.unwrap().unwrap();
        assert!(user.password_matches("legacy"));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_all_persisted() {
        let (_dir, store) = temp_store().await;
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add(UserRecord::new("User", &format!("u{i}@example.com"), "pw1234"))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let users: Vec<UserRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(users.len(), 10);
    }
}

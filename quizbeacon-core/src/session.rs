//! Durable per-installation session identity
//!
//! Plays the role the `user_session_id` cookie played in the browser: one
//! opaque random identifier per profile, created lazily on first access and
//! kept until it expires (365 days by default). The record is a small TOML
//! file under the XDG data dir.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// On-disk session record
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    id: String,
    expires_at: DateTime<Utc>,
}

/// File-backed store for the session identifier
///
/// If the backing file cannot be read or written (missing permissions,
/// read-only filesystem), the store degrades to a process-lifetime in-memory
/// identifier: events still carry a stable id for this run, but identity is
/// not durable across restarts.
pub struct SessionStore {
    path: PathBuf,
    ttl: Duration,
    cached: Option<String>,
}

impl SessionStore {
    /// Create a store backed by `path`, with ids expiring after `ttl_days`
    pub fn open(path: PathBuf, ttl_days: u32) -> Self {
        Self {
            path,
            ttl: Duration::days(i64::from(ttl_days)),
            cached: None,
        }
    }

    /// Return the session id, generating and persisting a fresh one if none
    /// exists or the stored one has expired.
    ///
    /// Idempotent: every call within the expiry window returns the same id.
    pub fn session_id(&mut self) -> String {
        if let Some(id) = &self.cached {
            return id.clone();
        }

        if let Some(id) = self.read_valid() {
            self.cached = Some(id.clone());
            return id;
        }

        let id = Uuid::new_v4().to_string();
        self.persist(&id);
        self.cached = Some(id.clone());
        id
    }

    /// Read the stored record, returning the id only if it has not expired
    fn read_valid(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let record: SessionRecord = match toml::from_str(&content) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Corrupt session record, regenerating");
                return None;
            }
        };

        if record.expires_at <= Utc::now() {
            tracing::debug!(id = %record.id, "Stored session id expired");
            return None;
        }

        Some(record.id)
    }

    /// Write a fresh record; failures leave the id in-memory only
    fn persist(&self, id: &str) {
        let record = SessionRecord {
            id: id.to_string(),
            expires_at: Utc::now() + self.ttl,
        };

        let result = toml::to_string(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            .and_then(|content| {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&self.path, content)
            });

        if let Err(e) = result {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Could not persist session id; identity will not survive restart"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_id_stable_across_calls() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::open(dir.path().join("session.toml"), 365);

        let first = store.session_id();
        let second = store.session_id();
        assert_eq!(first, second);
    }

    #[test]
    fn test_session_id_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");

        let first = SessionStore::open(path.clone(), 365).session_id();
        let second = SessionStore::open(path, 365).session_id();
        assert_eq!(first, second);
    }

    #[test]
    fn test_expired_record_regenerates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");

        let record = SessionRecord {
            id: "stale-id".to_string(),
            expires_at: Utc::now() - Duration::days(1),
        };
        std::fs::write(&path, toml::to_string(&record).unwrap()).unwrap();

        let id = SessionStore::open(path, 365).session_id();
        assert_ne!(id, "stale-id");
    }

    #[test]
    fn test_corrupt_record_regenerates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "not valid toml {{{{").unwrap();

        let mut store = SessionStore::open(path, 365);
        let id = store.session_id();
        assert!(!id.is_empty());
        assert_eq!(id, store.session_id());
    }

    #[test]
    fn test_unwritable_path_falls_back_to_memory() {
        // /dev/null/... can never be created as a directory
        let path = PathBuf::from("/dev/null/quizbeacon/session.toml");
        let mut store = SessionStore::open(path, 365);

        let id = store.session_id();
        assert!(!id.is_empty());
        // Still stable for the life of the process
        assert_eq!(id, store.session_id());
    }

    #[test]
    fn test_ids_look_like_uuids() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::open(dir.path().join("session.toml"), 365);
        let id = store.session_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }
}

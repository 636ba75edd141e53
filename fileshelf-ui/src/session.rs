use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_FILENAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("session encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Holder of the current user identity. At most one identity is held at a
/// time; `store` overwrites, and only `clear` forgets it.
pub trait SessionStore {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn store(&mut self, user_id: &str) -> Result<(), SessionError>;
    fn clear(&mut self) -> Result<(), SessionError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    user_id: String,
}

/// Durable store backed by a JSON file in the app data directory, so a login
/// survives restarts until explicit logout.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILENAME),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str::<SessionRecord>(&contents) {
            Ok(record) => Ok(Some(record.user_id)),
            Err(_) => {
                // A file that no longer parses holds no usable identity;
                // drop it so the next store starts clean.
                let _ = fs::remove_file(&self.path);
                Ok(None)
            }
        }
    }

    fn store(&mut self, user_id: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let record = SessionRecord {
            user_id: user_id.to_string(),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&record)?)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store, injectable where a durable session is unwanted (tests,
/// one-shot CLI modes).
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    user_id: Option<String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.user_id.clone())
    }

    fn store(&mut self, user_id: &str) -> Result<(), SessionError> {
        self.user_id = Some(user_id.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        self.user_id = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_the_identity() {
        let dir = tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path());

        assert_eq!(store.load().unwrap(), None);
        store.store("u-1").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("u-1"));

        // A fresh handle over the same directory sees the persisted identity.
        let reopened = FileSessionStore::new(dir.path());
        assert_eq!(reopened.load().unwrap().as_deref(), Some("u-1"));
    }

    #[test]
    fn storing_twice_keeps_only_the_latest_identity() {
        let dir = tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path());

        store.store("u-1").unwrap();
        store.store("u-2").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("u-2"));
    }

    #[test]
    fn clear_removes_the_session_file() {
        let dir = tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path());

        store.store("u-1").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!dir.path().join(SESSION_FILENAME).exists());

        // Clearing an already-empty store is not an error.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_session_file_loads_as_absent_and_is_removed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILENAME), b"not json").unwrap();
        let mut store = FileSessionStore::new(dir.path());

        assert_eq!(store.load().unwrap(), None);
        assert!(!dir.path().join(SESSION_FILENAME).exists());

        // The store stays usable after discarding the stale file.
        store.store("u-1").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("u-1"));
    }

    #[test]
    fn memory_store_holds_one_identity() {
        let mut store = MemorySessionStore::new();
        store.store("u-1").unwrap();
        store.store("u-2").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("u-2"));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}

//! Filesystem storage for recorded and synthesized audio clips
//!
//! Clips live under `{base}/{session_id}/{kind}_{uuid}.wav`. The returned
//! key is the path relative to the base directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use uuid::Uuid;

use crate::PersistenceError;

/// Direction of a stored clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Input,
    Output,
}

impl AudioKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioStore {
    base: PathBuf,
}

impl AudioStore {
    /// Store rooted at `base`; the directory is created on first save
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// Write a clip and return its key
    pub async fn save(
        &self,
        session_id: &str,
        audio: &[u8],
        kind: AudioKind,
    ) -> Result<String, PersistenceError> {
        validate_session_id(session_id)?;

        let folder = self.base.join(session_id);
        tokio::fs::create_dir_all(&folder).await?;

        let filename = format!("{}_{}.wav", kind.as_str(), Uuid::new_v4());
        tokio::fs::write(folder.join(&filename), audio).await?;

        let key = format!("{}/{}", session_id, filename);
        tracing::debug!(key = %key, bytes = audio.len(), "Audio saved");
        Ok(key)
    }

    /// Clip bytes, `None` if the key does not exist
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a clip; `false` if it did not exist
    pub async fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every clip of a session
    pub async fn delete_session(&self, session_id: &str) -> Result<(), PersistenceError> {
        validate_session_id(session_id)?;
        match tokio::fs::remove_dir_all(self.base.join(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a session's clips last modified more than `max_age` ago
    ///
    /// Returns the number of files removed.
    pub async fn purge_older_than(
        &self,
        session_id: &str,
        max_age: Duration,
    ) -> Result<usize, PersistenceError> {
        validate_session_id(session_id)?;
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = match tokio::fs::read_dir(self.base.join(session_id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() && metadata.modified()? < cutoff {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(session_id = %session_id, removed, "Purged old audio clips");
        }
        Ok(removed)
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let path = Path::new(key);
        let relative = !key.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !relative {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.base.join(path))
    }
}

fn validate_session_id(session_id: &str) -> Result<(), PersistenceError> {
    if session_id.is_empty()
        || session_id == "."
        || session_id == ".."
        || session_id.contains(['/', '\\'])
    {
        return Err(PersistenceError::InvalidKey(session_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());

        let key = store.save("sess-1", b"RIFF", AudioKind::Input).await.unwrap();
        assert!(key.starts_with("sess-1/input_"));
        assert!(key.ends_with(".wav"));
        assert!(dir.path().join(&key).exists());

        assert_eq!(store.get(&key).await.unwrap(), Some(b"RIFF".to_vec()));
        assert!(store.delete(&key).await.unwrap());
        assert!(!store.delete(&key).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());

        for key in ["../secret.wav", "/etc/passwd", "a/../../b.wav", ""] {
            assert!(
                matches!(store.get(key).await, Err(PersistenceError::InvalidKey(_))),
                "key {key:?}"
            );
        }
        for session in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(
                store.save(session, b"x", AudioKind::Output).await,
                Err(PersistenceError::InvalidKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_delete_session_removes_all_clips() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());

        let input = store.save("s", b"in", AudioKind::Input).await.unwrap();
        let output = store.save("s", b"out", AudioKind::Output).await.unwrap();
        assert!(output.starts_with("s/output_"));

        store.delete_session("s").await.unwrap();
        assert_eq!(store.get(&input).await.unwrap(), None);
        assert_eq!(store.get(&output).await.unwrap(), None);
        // missing session is not an error
        store.delete_session("s").await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_keeps_recent_clips() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());

        let key = store.save("s", b"in", AudioKind::Input).await.unwrap();
        let removed = store
            .purge_older_than("s", Duration::from_secs(7 * 86400))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(store.get(&key).await.unwrap().is_some());

        let removed = store.purge_older_than("s", Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.purge_older_than("none", Duration::ZERO).await.unwrap(), 0);
    }
}

//! Session-backed per-browser storage.
//!
//! Each browser's cart, profile, order counter and checkout state live in a
//! single string map stored in its session, mirroring the key-value store a
//! browser would keep locally.

use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use tiffin_core::storage::KeyValueStore;

use crate::error::AppError;

/// Session keys.
pub mod keys {
    /// Key for the per-browser string map.
    pub const STORAGE: &str = "storage";
}

/// A browser's key-value map, loaded from and saved to its session.
///
/// Mutations are buffered; call [`BrowserStorage::save`] to persist them.
///
/// The whole map is read at extraction and written back whole on save, so
/// the last of two overlapping requests from one browser wins and the other's
/// edits are lost.
#[derive(Debug, Clone)]
pub struct BrowserStorage {
    session: Session,
    entries: HashMap<String, String>,
    dirty: bool,
}

impl BrowserStorage {
    /// Load the map from the session. A missing map is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(session: Session) -> Result<Self, AppError> {
        let entries = session
            .get::<HashMap<String, String>>(keys::STORAGE)
            .await?
            .unwrap_or_default();
        Ok(Self {
            session,
            entries,
            dirty: false,
        })
    }

    /// Write the map back if anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn save(&mut self) -> Result<(), AppError> {
        if self.dirty {
            self.session.insert(keys::STORAGE, &self.entries).await?;
            self.dirty = false;
        }
        Ok(())
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.dirty = true;
        }
    }
}

impl<S> FromRequestParts<S> for BrowserStorage
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;
        Self::load(session).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_round_trip_through_session() {
        let session = session();
        let mut storage = BrowserStorage::load(session.clone()).await.unwrap();
        assert_eq!(storage.get("cart"), None);

        storage.set("cart", "[]".to_string());
        storage.save().await.unwrap();

        let reloaded = BrowserStorage::load(session).await.unwrap();
        assert_eq!(reloaded.get("cart").as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_overlapping_saves_are_last_writer_wins() {
        let session = session();
        let mut first = BrowserStorage::load(session.clone()).await.unwrap();
        let mut second = BrowserStorage::load(session.clone()).await.unwrap();

        first.set("cart", "[1]".to_string());
        first.save().await.unwrap();
        second.set("tiffin_user", "{}".to_string());
        second.save().await.unwrap();

        let reloaded = BrowserStorage::load(session).await.unwrap();
        assert_eq!(reloaded.get("tiffin_user").as_deref(), Some("{}"));
        assert_eq!(reloaded.get("cart"), None);
    }

    #[tokio::test]
    async fn test_removing_missing_key_is_not_a_change() {
        let mut storage = BrowserStorage::load(session()).await.unwrap();
        storage.remove("nothing");
        assert!(!storage.dirty);
        storage.set("a", "1".to_string());
        storage.remove("a");
        assert!(storage.dirty);
    }
}

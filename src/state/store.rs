//! Persistence seam.
//!
//! Sessions are saved after every transition so a restarted process can
//! pick them back up. The in-memory session is always the authority for a
//! live match; a failed save is logged and the transition stands.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::game::GameSession;

/// Durable key-value storage for sessions, keyed by match ID.
pub trait SessionStore: Send + Sync {
    fn save(&self, session: &GameSession) -> Result<(), StoreError>;

    fn load(&self, match_id: &str) -> Result<Option<GameSession>, StoreError>;

    fn delete(&self, match_id: &str) -> Result<(), StoreError>;

    /// Every stored session, for rehydrating after a restart.
    fn load_all(&self) -> Result<Vec<GameSession>, StoreError>;
}

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to encode session: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Store keeping JSON records in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw JSON record for a match.
    pub fn record(&self, match_id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(match_id)
            .cloned()
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, session: &GameSession) -> Result<(), StoreError> {
        let record = serde_json::to_string(session)?;
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id().to_string(), record);
        Ok(())
    }

    fn load(&self, match_id: &str) -> Result<Option<GameSession>, StoreError> {
        match self.record(match_id) {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, match_id: &str) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(match_id);
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<GameSession>, StoreError> {
        let records: Vec<String> = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        records
            .iter()
            .map(|r| serde_json::from_str(r).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_save_load_delete() {
        let store = MemoryStore::new();
        let mut game = GameSession::with_first_player("m1", "alice");
        game.join("bob").unwrap();
        game.make_move("alice", 2, 2).unwrap();

        store.save(&game).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("m1").unwrap(), Some(game.clone()));
        assert_eq!(store.load("missing").unwrap(), None);

        store.delete("m1").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_overwrites() {
        let store = MemoryStore::new();
        let mut game = GameSession::with_first_player("m1", "alice");
        store.save(&game).unwrap();

        game.join("bob").unwrap();
        store.save(&game).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load("m1").unwrap().unwrap().player_count(), 2);
    }

    #[test]
    fn test_load_all() {
        let store = MemoryStore::new();
        store
            .save(&GameSession::with_first_player("m1", "alice"))
            .unwrap();
        store
            .save(&GameSession::with_first_player("m2", "carol"))
            .unwrap();

        let mut ids: Vec<String> = store
            .load_all()
            .unwrap()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["m1".to_string(), "m2".to_string()]);
    }
}

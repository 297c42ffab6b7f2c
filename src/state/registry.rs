//! Session registry.
//!
//! Process-wide table of live sessions keyed by match ID. Each session sits
//! behind its own mutex, so requests against different matches run in
//! parallel while requests against the same match are serialized.
//!
//! Lock order: never take the table lock while holding a session lock.
//! Methods here that touch sessions clone the handles out of the table
//! first and lock them afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use rand::Rng;

use super::board::{Board, BOARD_SIZE};
use super::config::DEFAULT_MATCH_ID_LENGTH;
use super::game::GameSession;

/// Characters used in match IDs.
pub const MATCH_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Attempts at drawing a free match ID before giving up.
pub const MAX_MATCH_ID_ATTEMPTS: usize = 64;

/// Shared, lockable session.
pub type SessionHandle = Arc<Mutex<GameSession>>;

/// Lock a session, recovering from poisoning.
///
/// Transitions validate before mutating, so a poisoned session still holds
/// consistent state.
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, GameSession> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Generate a random match ID.
pub fn generate_match_id<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| MATCH_ID_ALPHABET[rng.gen_range(0..MATCH_ID_ALPHABET.len())] as char)
        .collect()
}

/// Generate a match ID not present in `existing`, giving up after
/// [`MAX_MATCH_ID_ATTEMPTS`] collisions.
pub fn unique_match_id<R: Rng, V>(
    existing: &HashMap<String, V>,
    rng: &mut R,
    length: usize,
) -> Result<String, RegistryError> {
    for _ in 0..MAX_MATCH_ID_ATTEMPTS {
        let id = generate_match_id(rng, length);
        if !existing.contains_key(&id) {
            return Ok(id);
        }
        tracing::debug!(match_id = %id, "Match ID collision, retrying");
    }
    Err(RegistryError::IdsExhausted(MAX_MATCH_ID_ATTEMPTS))
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("No free match ID after {0} attempts")]
    IdsExhausted(usize),
}

/// Registry of live sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    board_size: usize,
    id_length: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(BOARD_SIZE, DEFAULT_MATCH_ID_LENGTH)
    }
}

impl SessionRegistry {
    pub fn new(board_size: usize, id_length: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            board_size,
            id_length,
        }
    }

    /// Create a session for `connection_id` under a fresh match ID.
    pub fn create(&self, connection_id: &str) -> Result<(String, SessionHandle), RegistryError> {
        self.create_with_rng(connection_id, &mut rand::thread_rng())
    }

    /// Create a session using the given RNG for the match ID.
    pub fn create_with_rng<R: Rng>(
        &self,
        connection_id: &str,
        rng: &mut R,
    ) -> Result<(String, SessionHandle), RegistryError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        let id = unique_match_id(&*sessions, rng, self.id_length)?;
        let session =
            GameSession::with_board(id.clone(), connection_id, Board::new(self.board_size));
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(id.clone(), Arc::clone(&handle));

        Ok((id, handle))
    }

    /// Insert an existing session, e.g. one reloaded from a store.
    /// Returns false if the ID is already live.
    pub fn insert(&self, session: GameSession) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(session.id()) {
            return false;
        }
        sessions.insert(session.id().to_string(), Arc::new(Mutex::new(session)));
        true
    }

    /// Get a session.
    pub fn find(&self, match_id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(match_id)
            .cloned()
    }

    /// Remove a session.
    pub fn remove(&self, match_id: &str) -> Option<SessionHandle> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(match_id)
    }

    /// Remove `match_id` only while it still maps to `handle`.
    pub fn remove_handle(&self, match_id: &str, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.get(match_id).is_some_and(|h| Arc::ptr_eq(h, handle)) {
            sessions.remove(match_id);
            return true;
        }
        false
    }

    fn handles(&self) -> Vec<(String, SessionHandle)> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, h)| (id.clone(), Arc::clone(h)))
            .collect()
    }

    /// Every session `connection_id` is seated in.
    pub fn find_all_containing(&self, connection_id: &str) -> Vec<(String, SessionHandle)> {
        self.handles()
            .into_iter()
            .filter(|(_, h)| lock_session(h).has_player(connection_id))
            .collect()
    }

    /// Remove finished sessions whose grace period has elapsed.
    /// Returns the removed match IDs.
    pub fn cleanup_finished(&self, grace: chrono::Duration) -> Vec<String> {
        let now = chrono::Utc::now();
        let expired: Vec<(String, SessionHandle)> = self
            .handles()
            .into_iter()
            .filter(|(_, h)| {
                let session = lock_session(h);
                session.status().is_terminal()
                    && session
                        .finished_at()
                        .and_then(|at| at.checked_add_signed(grace))
                        .is_some_and(|expires| expires <= now)
            })
            .collect();

        // An ID reused since the scan now belongs to a different session.
        expired
            .into_iter()
            .filter(|(id, h)| self.remove_handle(id, h))
            .map(|(id, _)| id)
            .collect()
    }

    /// Count active games.
    pub fn active_count(&self) -> usize {
        self.handles()
            .iter()
            .filter(|(_, h)| lock_session(h).status().is_active())
            .count()
    }

    /// Total session count.
    pub fn count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// All live match IDs.
    pub fn match_ids(&self) -> Vec<String> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

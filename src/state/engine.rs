//! Event engine.
//!
//! Maps inbound transport events onto registry and session transitions and
//! returns what the transport should deliver. Persistence happens after
//! each transition; failures there are logged and never undo the in-memory
//! state.

use super::config::{ConfigError, EngineConfig};
use super::events::{Dispatch, InboundEvent, OutboundEvent};
use super::game::{GameError, GameSession, LeaveOutcome, MoveOutcome};
use super::registry::{lock_session, RegistryError, SessionRegistry};
use super::store::{MemoryStore, SessionStore, StoreError};

/// Reason broadcast when a match is abandoned.
pub const ABANDONED_REASON: &str = "Opponent disconnected";

/// Session engine for one process.
#[derive(Debug)]
pub struct Engine<S: SessionStore = MemoryStore> {
    config: EngineConfig,
    registry: SessionRegistry,
    store: S,
}

impl Default for Engine<MemoryStore> {
    fn default() -> Self {
        Self::with_valid_config(EngineConfig::default(), MemoryStore::new())
    }
}

impl<S: SessionStore> Engine<S> {
    /// Build an engine, rejecting a config that fails
    /// [`EngineConfig::validate`].
    pub fn new(config: EngineConfig, store: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config, store))
    }

    fn with_valid_config(config: EngineConfig, store: S) -> Self {
        let registry = SessionRegistry::new(config.board_size, config.match_id_length);
        Self {
            config,
            registry,
            store,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one inbound event from `connection_id`.
    pub fn handle(&self, connection_id: &str, event: InboundEvent) -> Vec<Dispatch> {
        match event {
            InboundEvent::CreateMatch => self.create_match(connection_id),
            InboundEvent::JoinMatch { match_id } => self.join_match(connection_id, &match_id),
            InboundEvent::MakeMove { match_id, row, col } => {
                self.make_move(connection_id, &match_id, row, col)
            }
            InboundEvent::Disconnect => self.disconnect(connection_id),
        }
    }

    pub fn create_match(&self, connection_id: &str) -> Vec<Dispatch> {
        let (match_id, handle) = match self.registry.create(connection_id) {
            Ok(created) => created,
            Err(e) => return self.create_failed(connection_id, &e),
        };
        let turn = {
            let session = lock_session(&handle);
            self.persist(&session);
            session.turn().map(str::to_string)
        };

        tracing::info!(match_id = %match_id, connection_id, "Match created");

        let mut out = vec![
            Dispatch::Subscribe {
                match_id: match_id.clone(),
            },
            Dispatch::ToCaller(OutboundEvent::MatchCreated {
                match_id: match_id.clone(),
            }),
        ];
        if let Some(connection_id) = turn {
            out.push(Dispatch::to_match(
                &match_id,
                OutboundEvent::TurnChanged { connection_id },
            ));
        }
        out
    }

    fn create_failed(&self, connection_id: &str, error: &RegistryError) -> Vec<Dispatch> {
        tracing::warn!(connection_id, error = %error, "Match creation failed");
        vec![Dispatch::ToCaller(OutboundEvent::Error {
            reason: error.to_string(),
        })]
    }

    pub fn join_match(&self, connection_id: &str, match_id: &str) -> Vec<Dispatch> {
        let Some(handle) = self.registry.find(match_id) else {
            return self.join_failed(connection_id, match_id, &GameError::NotFound);
        };

        let mut session = lock_session(&handle);
        let joined = match session.join(connection_id) {
            Ok(joined) => joined,
            Err(e) => {
                drop(session);
                return self.join_failed(connection_id, match_id, &e);
            }
        };
        self.persist(&session);

        tracing::info!(match_id, connection_id, mark = joined.mark.as_str(), "Player joined");

        let mut out = vec![
            Dispatch::Subscribe {
                match_id: match_id.to_string(),
            },
            Dispatch::ToCaller(OutboundEvent::MatchJoined {
                match_id: match_id.to_string(),
            }),
            Dispatch::to_match(
                match_id,
                OutboundEvent::PlayersUpdated {
                    players: session.players().to_vec(),
                },
            ),
            Dispatch::to_match(
                match_id,
                OutboundEvent::BoardUpdated {
                    board: session.board().clone(),
                },
            ),
        ];
        if joined.opening_move.is_some() {
            if let Some(turn) = session.turn() {
                out.push(Dispatch::to_match(
                    match_id,
                    OutboundEvent::TurnChanged {
                        connection_id: turn.to_string(),
                    },
                ));
            }
        }
        out
    }

    fn join_failed(&self, connection_id: &str, match_id: &str, error: &GameError) -> Vec<Dispatch> {
        tracing::debug!(match_id, connection_id, error = %error, "Join rejected");
        vec![Dispatch::ToCaller(OutboundEvent::JoinFailed {
            reason: error.to_string(),
        })]
    }

    pub fn make_move(&self, connection_id: &str, match_id: &str, row: i64, col: i64) -> Vec<Dispatch> {
        let Some(handle) = self.registry.find(match_id) else {
            return self.rejected(connection_id, match_id, &GameError::NotFound);
        };

        let mut session = lock_session(&handle);
        let outcome = match session.make_move(connection_id, row, col) {
            Ok(outcome) => outcome,
            Err(e) => {
                drop(session);
                return self.rejected(connection_id, match_id, &e);
            }
        };
        self.persist(&session);

        match outcome {
            MoveOutcome::Continue { next_turn } => {
                tracing::debug!(match_id, connection_id, row, col, "Move accepted");
                vec![
                    Dispatch::to_match(
                        match_id,
                        OutboundEvent::BoardUpdated {
                            board: session.board().clone(),
                        },
                    ),
                    Dispatch::to_match(
                        match_id,
                        OutboundEvent::TurnChanged {
                            connection_id: next_turn,
                        },
                    ),
                ]
            }
            MoveOutcome::Won { winner, line } => {
                tracing::info!(match_id, winner = %winner, cells = line.len(), "Match won");
                let board = session.board().clone();
                vec![
                    Dispatch::to_match(
                        match_id,
                        OutboundEvent::BoardUpdated {
                            board: board.clone(),
                        },
                    ),
                    Dispatch::to_match(match_id, OutboundEvent::GameOver { winner, board }),
                ]
            }
            MoveOutcome::Queued { position } => {
                tracing::debug!(match_id, connection_id, row, col, "Opening move queued");
                vec![Dispatch::ToCaller(OutboundEvent::MoveQueued { position })]
            }
        }
    }

    fn rejected(&self, connection_id: &str, match_id: &str, error: &GameError) -> Vec<Dispatch> {
        if error.is_defect() {
            tracing::warn!(match_id, connection_id, error = %error, "Session inconsistent");
        } else {
            tracing::debug!(match_id, connection_id, error = %error, "Move rejected");
        }
        vec![Dispatch::ToCaller(OutboundEvent::Error {
            reason: error.to_string(),
        })]
    }

    /// Remove `connection_id` from every match it sits in.
    pub fn disconnect(&self, connection_id: &str) -> Vec<Dispatch> {
        let mut out = Vec::new();

        for (match_id, handle) in self.registry.find_all_containing(connection_id) {
            // Session lock is released before the registry is touched.
            let outcome = lock_session(&handle).leave(connection_id);

            match outcome {
                Ok(LeaveOutcome::Abandoned) => {
                    self.registry.remove_handle(&match_id, &handle);
                    if let Err(e) = self.store.delete(&match_id) {
                        tracing::warn!(match_id = %match_id, error = %e, "Failed to delete session");
                    }
                    tracing::info!(match_id = %match_id, connection_id, "Match abandoned");
                    out.push(Dispatch::to_match(
                        &match_id,
                        OutboundEvent::GameEnded {
                            reason: ABANDONED_REASON.to_string(),
                        },
                    ));
                }
                Ok(LeaveOutcome::StillActive { players }) => {
                    self.persist(&lock_session(&handle));
                    out.push(Dispatch::to_match(
                        &match_id,
                        OutboundEvent::PlayersUpdated { players },
                    ));
                }
                // Closed by a concurrent request; it already resolved.
                Err(GameError::NotFound) => {}
                Err(e) => {
                    tracing::warn!(match_id = %match_id, connection_id, error = %e, "Leave failed");
                }
            }
        }

        tracing::debug!(connection_id, "Disconnected");
        out
    }

    /// Drop finished matches past their grace period.
    pub fn cleanup(&self) -> Vec<String> {
        let removed = self.registry.cleanup_finished(self.config.finished_grace());
        for match_id in &removed {
            if let Err(e) = self.store.delete(match_id) {
                tracing::warn!(match_id = %match_id, error = %e, "Failed to delete session");
            }
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "Cleaned up finished matches");
        }
        removed
    }

    /// Reload stored sessions into the registry. Returns how many were added.
    pub fn restore(&self) -> Result<usize, StoreError> {
        let mut restored = 0;
        for session in self.store.load_all()? {
            if session.is_closed() {
                continue;
            }
            if self.registry.insert(session) {
                restored += 1;
            }
        }
        tracing::info!(restored, "Sessions restored");
        Ok(restored)
    }

    fn persist(&self, session: &GameSession) {
        if let Err(e) = self.store.save(session) {
            tracing::warn!(match_id = %session.id(), error = %e, "Failed to persist session");
        }
    }
}

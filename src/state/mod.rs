//! State management for five-in-a-row matches.
//!
//! - `board` - Grid of cells and placement rules
//! - `win` - Winning line detection
//! - `game` - Per-match state machine (join, move, leave)
//! - `registry` - Live sessions keyed by match ID
//! - `events` - Inbound and outbound transport events
//! - `store` - Persistence seam
//! - `config` - Engine tunables
//! - `engine` - Maps events onto the above
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Engine                               │
//! │                                                                  │
//! │  InboundEvent ──▶ handle() ──▶ Vec<Dispatch> (to caller / match) │
//! │                      │                                           │
//! │        ┌─────────────┴──────────────┐      ┌─────────────────┐   │
//! │        │      SessionRegistry       │      │  SessionStore   │   │
//! │        │                            │      │                 │   │
//! │        │ match_id →                 │─────▶│ match_id →      │   │
//! │        │   Arc<Mutex<GameSession>>  │ save │   record        │   │
//! │        └─────────────┬──────────────┘      └─────────────────┘   │
//! │                      │                                           │
//! │        ┌─────────────┴──────────────┐                            │
//! │        │ GameSession                │                            │
//! │        │   Board ──▶ check_win      │                            │
//! │        │   players, turn, status    │                            │
//! │        └────────────────────────────┘                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod board;
pub mod config;
pub mod engine;
pub mod events;
pub mod game;
pub mod registry;
pub mod store;
pub mod win;

// Re-export commonly used types
pub use board::{Board, Cell, InvalidMove, Mark, Position, BOARD_SIZE};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, ABANDONED_REASON};
pub use events::{Dispatch, InboundEvent, OutboundEvent};
pub use game::{
    GameError, GameSession, GameStatus, JoinOutcome, LeaveOutcome, MoveOutcome, Player,
    MAX_PLAYERS,
};
pub use registry::{lock_session, RegistryError, SessionHandle, SessionRegistry};
pub use store::{MemoryStore, SessionStore, StoreError};
pub use win::{check_win, Axis};

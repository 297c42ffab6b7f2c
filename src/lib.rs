//! Gomoku State Library
//!
//! This crate provides the session engine for real-time five-in-a-row
//! matches on a 24x24 board.
//!
//! # Overview
//!
//! - **Board** - Fixed-size grid; marks are written once and never erased.
//!
//! - **Win Detection** - Scans the four axes through the last move and
//!   returns the winning line as a value.
//!
//! - **Game Sessions** - Two seats, a turn holder and a status
//!   (waiting, active, finished) with validated transitions.
//!
//! - **Session Registry** - Live matches keyed by a short random ID, one
//!   lock per match.
//!
//! - **Engine** - Turns inbound events (create, join, move, disconnect) into
//!   outbound events for the caller or the match channel.
//!
//! # Design Principles
//!
//! 1. **The server owns the board** - Every move is checked against the
//!    in-memory session before it is applied.
//!
//! 2. **Failures are values** - Bad requests come back as named errors and
//!    never end the session or the process.
//!
//! 3. **No networking** - This crate is pure state, no WebSocket or HTTP.
//!
//! 4. **Serialization-ready** - Sessions persist as JSON and events render
//!    to JSON for clients.
//!
//! # Example
//!
//! ```rust
//! use gomoku_state::{Dispatch, Engine, InboundEvent, OutboundEvent};
//!
//! let engine: Engine = Engine::default();
//!
//! let out = engine.handle("alice", InboundEvent::CreateMatch);
//! let match_id = match &out[0] {
//!     Dispatch::Subscribe { match_id } => match_id.clone(),
//!     _ => unreachable!(),
//! };
//!
//! engine.handle("bob", InboundEvent::JoinMatch { match_id: match_id.clone() });
//!
//! let out = engine.handle("alice", InboundEvent::MakeMove { match_id, row: 12, col: 12 });
//! assert!(matches!(
//!     out[1].event(),
//!     Some(OutboundEvent::TurnChanged { connection_id }) if connection_id == "bob"
//! ));
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;

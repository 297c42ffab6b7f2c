//! Transport events.
//!
//! Inbound events arrive from a connection; outbound events are delivered
//! either back to that connection or to everyone subscribed to a match.

use serde::{Deserialize, Serialize};

use super::board::{Board, Position};
use super::game::Player;

/// Event received from a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum InboundEvent {
    CreateMatch,
    JoinMatch { match_id: String },
    MakeMove { match_id: String, row: i64, col: i64 },
    Disconnect,
}

impl InboundEvent {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMatch => "create-match",
            Self::JoinMatch { .. } => "join-match",
            Self::MakeMove { .. } => "make-move",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Event sent to connections.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    MatchCreated { match_id: String },
    TurnChanged { connection_id: String },
    MatchJoined { match_id: String },
    JoinFailed { reason: String },
    PlayersUpdated { players: Vec<Player> },
    BoardUpdated { board: Board },
    GameOver { winner: String, board: Board },
    GameEnded { reason: String },
    MoveQueued { position: Position },
    Error { reason: String },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MatchCreated { .. } => "match-created",
            Self::TurnChanged { .. } => "turn-changed",
            Self::MatchJoined { .. } => "match-joined",
            Self::JoinFailed { .. } => "join-failed",
            Self::PlayersUpdated { .. } => "players-updated",
            Self::BoardUpdated { .. } => "board-updated",
            Self::GameOver { .. } => "game-over",
            Self::GameEnded { .. } => "game-ended",
            Self::MoveQueued { .. } => "move-queued",
            Self::Error { .. } => "error",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::MatchCreated { match_id } | Self::MatchJoined { match_id } => {
                serde_json::json!({"match_id": match_id})
            }
            Self::TurnChanged { connection_id } => {
                serde_json::json!({"connection_id": connection_id})
            }
            Self::JoinFailed { reason } | Self::GameEnded { reason } | Self::Error { reason } => {
                serde_json::json!({"reason": reason})
            }
            Self::PlayersUpdated { players } => {
                let players: Vec<serde_json::Value> = players.iter().map(|p| p.to_json()).collect();
                serde_json::json!({"players": players})
            }
            Self::BoardUpdated { board } => serde_json::json!({"board": board.to_json()}),
            Self::GameOver { winner, board } => serde_json::json!({
                "winner": winner,
                "board": board.to_json()
            }),
            Self::MoveQueued { position } => position.to_json(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "event": self.name(),
            "payload": self.payload()
        })
    }
}

/// Instruction for the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Subscribe the calling connection to the match channel.
    Subscribe { match_id: String },
    /// Send to the calling connection only.
    ToCaller(OutboundEvent),
    /// Send to every connection subscribed to the match.
    ToMatch {
        match_id: String,
        event: OutboundEvent,
    },
}

impl Dispatch {
    pub fn to_match(match_id: &str, event: OutboundEvent) -> Self {
        Self::ToMatch {
            match_id: match_id.to_string(),
            event,
        }
    }

    /// The event carried, if any.
    pub fn event(&self) -> Option<&OutboundEvent> {
        match self {
            Self::Subscribe { .. } => None,
            Self::ToCaller(event) | Self::ToMatch { event, .. } => Some(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::board::Mark;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inbound_parse() {
        assert_eq!(
            InboundEvent::from_json(r#"{"event": "create-match"}"#).unwrap(),
            InboundEvent::CreateMatch
        );
        assert_eq!(
            InboundEvent::from_json(r#"{"event": "make-move", "match_id": "abc", "row": 3, "col": -1}"#)
                .unwrap(),
            InboundEvent::MakeMove {
                match_id: "abc".to_string(),
                row: 3,
                col: -1
            }
        );
        assert!(InboundEvent::from_json(r#"{"event": "join-match"}"#).is_err());
        assert!(InboundEvent::from_json(r#"{"event": "spectate"}"#).is_err());
    }

    #[test]
    fn test_outbound_json() {
        let event = OutboundEvent::PlayersUpdated {
            players: vec![Player::new("alice", Mark::X)],
        };
        assert_eq!(
            event.to_json(),
            serde_json::json!({
                "event": "players-updated",
                "payload": {"players": [{"connection_id": "alice", "mark": "X"}]}
            })
        );

        let error = OutboundEvent::Error {
            reason: "Not your turn".to_string(),
        };
        assert_eq!(error.to_json()["payload"]["reason"], "Not your turn");
    }

    #[test]
    fn test_game_over_carries_board() {
        let event = OutboundEvent::GameOver {
            winner: "alice".to_string(),
            board: Board::new(5),
        };
        let json = event.to_json();
        assert_eq!(json["event"], "game-over");
        assert_eq!(json["payload"]["board"].as_array().unwrap().len(), 5);
    }
}

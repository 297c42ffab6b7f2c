//! Game session state machine.
//!
//! One session per match: the board, up to two seated players, the turn
//! holder and the match status.
//!
//! ```text
//! ┌─────────┐  join   ┌────────┐  winning move  ┌──────────┐
//! │ Waiting │────────▶│ Active │───────────────▶│ Finished │
//! └─────────┘         └────────┘                └──────────┘
//! ```
//!
//! A player leaving closes the session (abandonment) in any status and moves
//! it to `Finished` with no winner. A closed session rejects every further
//! request with [`GameError::NotFound`].

use serde::{Deserialize, Serialize};

use super::board::{Board, InvalidMove, Mark, Position};
use super::win::check_win;

/// Players per match.
pub const MAX_PLAYERS: usize = 2;

/// Match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Created, waiting for the second player
    #[default]
    Waiting,
    /// Both players seated, game in progress
    Active,
    /// A winning line has been recorded
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Transport connection identity
    pub connection_id: String,
    pub mark: Mark,
}

impl Player {
    pub fn new(connection_id: impl Into<String>, mark: Mark) -> Self {
        Self {
            connection_id: connection_id.into(),
            mark,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "connection_id": self.connection_id,
            "mark": self.mark.as_str()
        })
    }
}

/// Result of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Mark placed, turn passed on.
    Continue { next_turn: String },
    /// Mark placed and it completed a winning line.
    Won {
        winner: String,
        line: Vec<Position>,
    },
    /// Creator moved before an opponent joined. The stone is placed when
    /// the second player arrives.
    Queued { position: Position },
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub mark: Mark,
    /// Queued opening move that was placed as part of the join
    pub opening_move: Option<Position>,
}

/// Result of a player leaving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Fewer than two players remain; the session is closed and must be
    /// destroyed by the caller.
    Abandoned,
    /// The match continues with these players.
    StillActive { players: Vec<Player> },
}

/// Game errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Game not found")]
    NotFound,
    #[error("Game is full")]
    Full,
    #[error("Already seated in this game")]
    AlreadySeated,
    #[error("Not your turn")]
    NotYourTurn,
    #[error(transparent)]
    InvalidMove(#[from] InvalidMove),
    /// A connection expected to be seated is missing.
    #[error("Player not found")]
    PlayerNotFound,
    /// The turn holder has no opponent to pass the turn to.
    #[error("Opponent not found")]
    OpponentNotFound,
}

impl GameError {
    /// Internal consistency failures, as opposed to bad requests.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::PlayerNotFound | Self::OpponentNotFound)
    }
}

/// State of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Unique match ID
    id: String,

    board: Board,

    /// Seated players in join order
    players: Vec<Player>,

    /// Connection allowed to move next
    turn: Option<String>,

    status: GameStatus,

    /// Creator's move made before the opponent joined
    #[serde(default)]
    pending_move: Option<Position>,

    #[serde(default)]
    winner: Option<String>,

    /// Set once the session has been abandoned
    #[serde(default)]
    closed: bool,

    created_at: chrono::DateTime<chrono::Utc>,

    #[serde(default)]
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl GameSession {
    /// Create a session with the creator seated as `X` on a default board.
    pub fn with_first_player(id: impl Into<String>, connection_id: impl Into<String>) -> Self {
        Self::with_board(id, connection_id, Board::default())
    }

    /// Create a session with the creator seated as `X` on the given board.
    ///
    /// The creator holds the turn straight away, before anyone joins.
    pub fn with_board(
        id: impl Into<String>,
        connection_id: impl Into<String>,
        board: Board,
    ) -> Self {
        let connection_id = connection_id.into();
        Self {
            id: id.into(),
            board,
            players: vec![Player::new(connection_id.clone(), Mark::X)],
            turn: Some(connection_id),
            status: GameStatus::Waiting,
            pending_move: None,
            winner: None,
            closed: false,
            created_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn turn(&self) -> Option<&str> {
        self.turn.as_deref()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn pending_move(&self) -> Option<Position> {
        self.pending_move
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.finished_at
    }

    /// Check if a connection is seated here.
    pub fn has_player(&self, connection_id: &str) -> bool {
        self.players.iter().any(|p| p.connection_id == connection_id)
    }

    /// Mark held by a seated connection.
    pub fn mark_of(&self, connection_id: &str) -> Option<Mark> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection_id)
            .map(|p| p.mark)
    }

    /// The other seated connection.
    pub fn opponent_of(&self, connection_id: &str) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.connection_id != connection_id)
            .map(|p| p.connection_id.as_str())
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    /// Seat a second player as `O` and start the match.
    pub fn join(&mut self, connection_id: &str) -> Result<JoinOutcome, GameError> {
        if self.closed {
            return Err(GameError::NotFound);
        }
        if self.is_full() {
            return Err(GameError::Full);
        }
        if self.has_player(connection_id) {
            return Err(GameError::AlreadySeated);
        }

        let mark = self
            .players
            .first()
            .map(|p| p.mark.opponent())
            .unwrap_or(Mark::X);

        // Place the queued opening stone before seating, so a failure
        // leaves the session as it was.
        let opening_move = self.pending_move;
        if let Some(pos) = opening_move {
            let opener = self.turn.as_deref().ok_or(GameError::PlayerNotFound)?;
            let opener_mark = self.mark_of(opener).ok_or(GameError::PlayerNotFound)?;
            self.board.place(pos, opener_mark)?;
            self.pending_move = None;
            self.turn = Some(connection_id.to_string());
        }

        self.players.push(Player::new(connection_id, mark));
        if self.is_full() {
            self.status = GameStatus::Active;
        }

        Ok(JoinOutcome { mark, opening_move })
    }

    /// Apply a move by `connection_id` at `(row, col)`.
    ///
    /// Nothing is mutated unless the move is accepted.
    pub fn make_move(
        &mut self,
        connection_id: &str,
        row: i64,
        col: i64,
    ) -> Result<MoveOutcome, GameError> {
        if self.closed {
            return Err(GameError::NotFound);
        }
        if self.turn.as_deref() != Some(connection_id) {
            return Err(GameError::NotYourTurn);
        }
        let mark = self
            .mark_of(connection_id)
            .ok_or(GameError::PlayerNotFound)?;
        let pos = self
            .board
            .position(row, col)
            .ok_or(InvalidMove::OutOfBounds)?;

        if self.status == GameStatus::Waiting {
            if self.pending_move.is_some() {
                return Err(GameError::NotYourTurn);
            }
            self.board.check_placeable(pos)?;
            self.pending_move = Some(pos);
            return Ok(MoveOutcome::Queued { position: pos });
        }

        let opponent = self
            .opponent_of(connection_id)
            .map(str::to_string)
            .ok_or(GameError::OpponentNotFound)?;

        self.board.place(pos, mark)?;

        if let Some(line) = check_win(&self.board, pos) {
            self.board.mark_winning_line(&line);
            self.status = GameStatus::Finished;
            self.turn = None;
            self.winner = Some(connection_id.to_string());
            self.finished_at = Some(chrono::Utc::now());
            return Ok(MoveOutcome::Won {
                winner: connection_id.to_string(),
                line,
            });
        }

        self.turn = Some(opponent.clone());
        Ok(MoveOutcome::Continue { next_turn: opponent })
    }

    /// Remove a player.
    ///
    /// A connection that is not seated changes nothing. Removing a seated
    /// player always abandons the match and closes the session.
    pub fn leave(&mut self, connection_id: &str) -> Result<LeaveOutcome, GameError> {
        if self.closed {
            return Err(GameError::NotFound);
        }

        let before = self.players.len();
        self.players.retain(|p| p.connection_id != connection_id);
        if self.players.len() == before {
            return Ok(LeaveOutcome::StillActive {
                players: self.players.clone(),
            });
        }

        if self.players.len() < MAX_PLAYERS {
            self.closed = true;
            self.pending_move = None;
            self.turn = None;
            self.status = GameStatus::Finished;
            self.finished_at.get_or_insert_with(chrono::Utc::now);
            return Ok(LeaveOutcome::Abandoned);
        }

        Ok(LeaveOutcome::StillActive {
            players: self.players.clone(),
        })
    }

    /// Seated players for clients.
    pub fn players_to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.players.iter().map(|p| p.to_json()).collect())
    }

    /// Full snapshot for clients.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "match_id": self.id,
            "status": self.status.as_str(),
            "board": self.board.to_json(),
            "players": self.players_to_json(),
            "turn": self.turn,
            "winner": self.winner
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn active_game() -> GameSession {
        let mut game = GameSession::with_first_player("abc1234", "alice");
        game.join("bob").unwrap();
        game
    }

    #[test]
    fn test_new_session() {
        let game = GameSession::with_first_player("abc1234", "alice");
        assert_eq!(game.status(), GameStatus::Waiting);
        assert_eq!(game.players(), &[Player::new("alice", Mark::X)]);
        // Creator holds the turn before anyone joins
        assert_eq!(game.turn(), Some("alice"));
        assert_eq!(game.board().filled_count(), 0);
    }

    #[test]
    fn test_join() {
        let mut game = GameSession::with_first_player("abc1234", "alice");
        let outcome = game.join("bob").unwrap();

        assert_eq!(
            outcome,
            JoinOutcome {
                mark: Mark::O,
                opening_move: None
            }
        );
        assert_eq!(game.status(), GameStatus::Active);
        assert_eq!(game.turn(), Some("alice"));
        assert_eq!(game.mark_of("bob"), Some(Mark::O));
    }

    #[test]
    fn test_join_full() {
        let mut game = active_game();
        let before = game.players().to_vec();

        assert_eq!(game.join("carol"), Err(GameError::Full));
        assert_eq!(game.join("carol"), Err(GameError::Full));
        assert_eq!(game.players(), before.as_slice());
    }

    #[test]
    fn test_join_own_game() {
        let mut game = GameSession::with_first_player("abc1234", "alice");
        assert_eq!(game.join("alice"), Err(GameError::AlreadySeated));
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn test_turns_alternate() {
        let mut game = active_game();

        let outcome = game.make_move("alice", 10, 10).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Continue {
                next_turn: "bob".to_string()
            }
        );
        assert_eq!(game.turn(), Some("bob"));

        game.make_move("bob", 11, 11).unwrap();
        assert_eq!(game.turn(), Some("alice"));

        game.make_move("alice", 12, 10).unwrap();
        assert_eq!(game.turn(), Some("bob"));
    }

    #[test]
    fn test_out_of_turn_move() {
        let mut game = active_game();
        let before = game.clone();

        assert_eq!(game.make_move("bob", 0, 0), Err(GameError::NotYourTurn));
        assert_eq!(game.make_move("mallory", 0, 0), Err(GameError::NotYourTurn));
        assert_eq!(game, before);
    }

    #[test]
    fn test_invalid_moves_keep_turn() {
        let mut game = active_game();
        game.make_move("alice", 3, 3).unwrap();

        assert_eq!(
            game.make_move("bob", 3, 3),
            Err(GameError::InvalidMove(InvalidMove::CellOccupied))
        );
        assert_eq!(
            game.make_move("bob", 24, 0),
            Err(GameError::InvalidMove(InvalidMove::OutOfBounds))
        );
        assert_eq!(
            game.make_move("bob", -1, 5),
            Err(GameError::InvalidMove(InvalidMove::OutOfBounds))
        );
        assert_eq!(game.turn(), Some("bob"));
        assert_eq!(game.board().filled_count(), 1);
    }

    #[test]
    fn test_horizontal_five_scenario() {
        let mut game = active_game();

        // X builds (0,1)..(0,5) with O sitting on (0,6); (0,0) stays empty
        let moves = [
            ("alice", 0, 1),
            ("bob", 0, 6),
            ("alice", 0, 2),
            ("bob", 5, 0),
            ("alice", 0, 3),
            ("bob", 7, 0),
            ("alice", 0, 5),
            ("bob", 9, 0),
        ];
        for (who, row, col) in moves {
            let outcome = game.make_move(who, row, col).unwrap();
            assert!(matches!(outcome, MoveOutcome::Continue { .. }));
        }

        let outcome = game.make_move("alice", 0, 4).unwrap();
        let expected: Vec<Position> = (1..6).map(|c| Position::new(0, c)).collect();
        assert_eq!(
            outcome,
            MoveOutcome::Won {
                winner: "alice".to_string(),
                line: expected.clone()
            }
        );
        assert_eq!(game.board().winning_cells(), expected);
        assert_eq!(game.status(), GameStatus::Finished);
        assert_eq!(game.turn(), None);
        assert_eq!(game.winner(), Some("alice"));
        assert!(game.finished_at().is_some());
    }

    #[test]
    fn test_no_moves_after_finish() {
        let mut game = active_game();
        for (a, b) in [(0, 10), (1, 12), (2, 14)] {
            game.make_move("alice", 5, a).unwrap();
            game.make_move("bob", 15, b).unwrap();
        }
        // Open four wins
        assert!(matches!(
            game.make_move("alice", 5, 3),
            Ok(MoveOutcome::Won { .. })
        ));
        let board = game.board().clone();

        assert_eq!(game.make_move("alice", 20, 20), Err(GameError::NotYourTurn));
        assert_eq!(game.make_move("bob", 20, 20), Err(GameError::NotYourTurn));
        assert_eq!(game.board(), &board);
    }

    #[test]
    fn test_move_before_opponent_joins_is_queued() {
        let mut game = GameSession::with_first_player("abc1234", "alice");

        let outcome = game.make_move("alice", 7, 7).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Queued {
                position: Position::new(7, 7)
            }
        );
        assert_eq!(game.board().filled_count(), 0);
        assert_eq!(game.status(), GameStatus::Waiting);

        // Only one move can be queued
        assert_eq!(game.make_move("alice", 8, 8), Err(GameError::NotYourTurn));

        let joined = game.join("bob").unwrap();
        assert_eq!(joined.opening_move, Some(Position::new(7, 7)));
        assert_eq!(game.board().mark_at(Position::new(7, 7)), Some(Mark::X));
        assert_eq!(game.turn(), Some("bob"));
        assert_eq!(game.pending_move(), None);
        assert_eq!(game.status(), GameStatus::Active);
    }

    #[test]
    fn test_queued_move_still_validated() {
        let mut game = GameSession::with_first_player("abc1234", "alice");
        assert_eq!(
            game.make_move("alice", 30, 0),
            Err(GameError::InvalidMove(InvalidMove::OutOfBounds))
        );
        assert_eq!(game.pending_move(), None);
        assert_eq!(game.make_move("bob", 0, 0), Err(GameError::NotYourTurn));
    }

    #[test]
    fn test_leave_abandons() {
        let mut game = active_game();
        assert_eq!(game.leave("bob"), Ok(LeaveOutcome::Abandoned));
        assert!(game.is_closed());
        assert_eq!(game.player_count(), 1);
        assert_eq!(game.status(), GameStatus::Finished);
        assert_eq!(game.turn(), None);
        assert_eq!(game.winner(), None);
        assert!(game.finished_at().is_some());

        // Closed sessions reject everything
        assert_eq!(game.leave("alice"), Err(GameError::NotFound));
        assert_eq!(game.make_move("alice", 0, 0), Err(GameError::NotFound));
        assert_eq!(game.join("carol"), Err(GameError::NotFound));
    }

    #[test]
    fn test_leave_waiting_session() {
        let mut game = GameSession::with_first_player("abc1234", "alice");
        assert_eq!(game.leave("alice"), Ok(LeaveOutcome::Abandoned));
        assert_eq!(game.player_count(), 0);
        assert_eq!(game.status(), GameStatus::Finished);
    }

    #[test]
    fn test_leave_by_stranger_keeps_players() {
        let mut game = active_game();
        let outcome = game.leave("mallory").unwrap();

        assert_eq!(
            outcome,
            LeaveOutcome::StillActive {
                players: vec![Player::new("alice", Mark::X), Player::new("bob", Mark::O)]
            }
        );
        assert_eq!(game.status(), GameStatus::Active);
        assert!(!game.is_closed());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut game = active_game();
        game.make_move("alice", 4, 4).unwrap();

        let json = serde_json::to_string(&game).unwrap();
        let restored: GameSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, game);
    }

    #[test]
    fn test_snapshot_json() {
        let game = active_game();
        let json = game.to_json();
        assert_eq!(json["match_id"], "abc1234");
        assert_eq!(json["status"], "active");
        assert_eq!(json["turn"], "alice");
        assert_eq!(json["players"][1]["mark"], "O");
    }
}

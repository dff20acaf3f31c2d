use super::{Board, Player, COLS, ROWS};
use crate::error::MoveError;

/// Score base used when the winner is scored as `base - moves`.
pub const DEFAULT_WIN_SCORE_BASE: i64 = 50;

/// Fixed parameters of a game: board size, who opens, how wins are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub rows: usize,
    pub cols: usize,
    pub starting_player: Player,
    pub win_score_base: i64,
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules {
            rows: ROWS,
            cols: COLS,
            starting_player: Player::Red,
            win_score_base: DEFAULT_WIN_SCORE_BASE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Won(Player),
    Draw,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}

/// One game as the player sees it. Every transition returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    board: Board,
    current_player: Player,
    status: GameStatus,
    moves: u32,
    score: i64,
}

impl GameSession {
    /// Create initial game state
    pub fn new(rules: &GameRules) -> Self {
        GameSession {
            board: Board::empty(rules.rows, rules.cols),
            current_player: rules.starting_player,
            status: GameStatus::InProgress,
            moves: 0,
            score: 0,
        }
    }

    /// Reassemble a session from stored parts.
    pub fn from_parts(
        board: Board,
        current_player: Player,
        status: GameStatus,
        moves: u32,
        score: i64,
    ) -> Self {
        GameSession {
            board,
            current_player,
            status,
            moves,
            score,
        }
    }

    /// Get current player
    pub fn current_player(&self) -> Player {
        self.current_player
    }

    /// Get reference to board
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Check if game is over
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a move and return new state (immutable).
    ///
    /// The winner keeps the turn marker; otherwise the turn passes to the
    /// other player unless the board filled up.
    pub fn apply_move(&self, column: usize, rules: &GameRules) -> Result<GameSession, MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }

        let mover = self.current_player;
        let (board, _row) = self.board.drop_piece(column, mover)?;
        let moves = self.moves.saturating_add(1);

        let (status, current_player, score) = if board.has_four(mover) {
            // Can go negative for long games.
            let score = rules.win_score_base - i64::from(moves);
            (GameStatus::Won(mover), mover, score)
        } else if board.is_full() {
            (GameStatus::Draw, mover, self.score)
        } else {
            (GameStatus::InProgress, mover.other(), self.score)
        };

        Ok(GameSession {
            board,
            current_player,
            status,
            moves,
            score,
        })
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(&GameRules::default())
    }
}

//! Conversion between a [`GameSession`] and its stored document.
//!
//! Rows are stored as `board.row_<i>` arrays because the document store has no
//! list-of-lists type. Two older document shapes are still read:
//!
//! - `{board, player, winner, moves, score}` where `player` is the next player
//!   and `winner` is set once someone has won;
//! - `{board, currentPlayer, gameOver}` where the winner is `currentPlayer`
//!   when `gameOver` is true.

use serde_json::{Map, Value};

use crate::error::PersistenceError;
use crate::game::{Board, Cell, GameRules, GameSession, GameStatus, Player};
use crate::store::Document;

pub const FIELD_BOARD: &str = "board";
pub const FIELD_CURRENT_PLAYER: &str = "currentPlayer";
pub const FIELD_LEGACY_PLAYER: &str = "player";
pub const FIELD_WINNER: &str = "winner";
pub const FIELD_GAME_OVER: &str = "gameOver";
pub const FIELD_MOVES: &str = "moves";
pub const FIELD_SCORE: &str = "score";

/// Field name holding row `index` inside the board object.
pub fn row_key(index: usize) -> String {
    format!("row_{index}")
}

/// Serialize a session into the canonical document shape.
pub fn encode(session: &GameSession) -> Document {
    let board = session.board();
    let mut rows = Map::new();
    for index in 0..board.rows() {
        let cells = board.row(index).iter().map(|&cell| cell_value(cell)).collect();
        rows.insert(row_key(index), Value::Array(cells));
    }

    let winner = match session.status() {
        GameStatus::Won(player) => Value::from(player.token()),
        GameStatus::InProgress | GameStatus::Draw => Value::Null,
    };

    let mut document = Document::new();
    document.insert(FIELD_BOARD.into(), Value::Object(rows));
    document.insert(
        FIELD_CURRENT_PLAYER.into(),
        Value::from(session.current_player().token()),
    );
    document.insert(FIELD_WINNER.into(), winner);
    document.insert(FIELD_GAME_OVER.into(), Value::Bool(session.is_terminal()));
    document.insert(FIELD_MOVES.into(), Value::from(session.moves()));
    document.insert(FIELD_SCORE.into(), Value::from(session.score()));
    document
}

/// Rebuild a session from a stored document.
///
/// Missing or malformed rows, unknown tokens and absent scalar fields fall
/// back to defaults. Only fields holding the wrong JSON type fail.
pub fn decode(
    key: &str,
    document: &Document,
    rules: &GameRules,
) -> Result<GameSession, PersistenceError> {
    let mut repairs = Vec::new();
    let invalid = |reason: String| PersistenceError::Decode {
        key: key.to_string(),
        reason,
    };

    let board = match document.get(FIELD_BOARD) {
        None | Some(Value::Null) => {
            repairs.push("missing board".to_string());
            Board::empty(rules.rows, rules.cols)
        }
        Some(Value::Object(rows)) => decode_board(rows, rules, &mut repairs),
        Some(other) => return Err(invalid(format!("board is not an object: {other}"))),
    };

    let player_field = document
        .get(FIELD_CURRENT_PLAYER)
        .filter(|v| !v.is_null())
        .or_else(|| document.get(FIELD_LEGACY_PLAYER));
    let mut current_player = match player_field {
        None | Some(Value::Null) => rules.starting_player,
        Some(Value::String(token)) => Player::from_token(token).unwrap_or_else(|| {
            repairs.push(format!("unknown player token '{token}'"));
            rules.starting_player
        }),
        Some(other) => return Err(invalid(format!("player is not a string: {other}"))),
    };

    let winner = match document.get(FIELD_WINNER) {
        Some(Value::String(token)) => {
            let winner = Player::from_token(token);
            if winner.is_none() {
                repairs.push(format!("unknown winner token '{token}'"));
            }
            winner
        }
        Some(Value::Null) => None,
        Some(other) => return Err(invalid(format!("winner is not a string: {other}"))),
        None => match document.get(FIELD_GAME_OVER) {
            Some(Value::Bool(true)) => Some(current_player),
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(other) => return Err(invalid(format!("gameOver is not a bool: {other}"))),
        },
    };

    let status = match winner {
        Some(player) => {
            // Older documents recorded the next player even after a win.
            current_player = player;
            GameStatus::Won(player)
        }
        None if board.is_full() => GameStatus::Draw,
        None => GameStatus::InProgress,
    };

    let mut moves = match document.get(FIELD_MOVES) {
        None | Some(Value::Null) => 0,
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid(format!("moves is not a move count: {value}")))?,
    };
    let capacity = board.rows() * board.cols();
    if usize::try_from(moves).map_or(true, |n| n > capacity) {
        let counted = u32::try_from(board.piece_count()).unwrap_or(u32::MAX);
        repairs.push(format!("moves {moves} exceeds board capacity, counted {counted}"));
        moves = counted;
    }

    let score = match document.get(FIELD_SCORE) {
        None | Some(Value::Null) => 0,
        Some(value) => value
            .as_i64()
            .ok_or_else(|| invalid(format!("score is not an integer: {value}")))?,
    };

    if !board.is_settled() {
        repairs.push("pieces float above empty cells".to_string());
    }
    if !repairs.is_empty() {
        tracing::warn!("Document '{}' loaded with repairs: {}", key, repairs.join("; "));
    }

    Ok(GameSession::from_parts(
        board,
        current_player,
        status,
        moves,
        score,
    ))
}

fn decode_board(rows: &Map<String, Value>, rules: &GameRules, repairs: &mut Vec<String>) -> Board {
    if rules.rows == 0 || rules.cols == 0 {
        return Board::empty(rules.rows, rules.cols);
    }

    let mut grid = Vec::with_capacity(rules.rows);
    for index in 0..rules.rows {
        let key = row_key(index);
        let mut row = match rows.get(&key) {
            Some(Value::Array(cells)) => {
                if cells.len() != rules.cols {
                    repairs.push(format!("{key} has {} cells", cells.len()));
                }
                cells
                    .iter()
                    .take(rules.cols)
                    .map(|value| decode_cell(value, &key, repairs))
                    .collect()
            }
            Some(_) => {
                repairs.push(format!("{key} is not an array"));
                Vec::new()
            }
            None => {
                repairs.push(format!("{key} missing"));
                Vec::new()
            }
        };
        row.resize(rules.cols, Cell::Empty);
        grid.push(row);
    }
    Board::from_rows(grid)
}

fn decode_cell(value: &Value, row_key: &str, repairs: &mut Vec<String>) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::String(token) if token.is_empty() => Cell::Empty,
        Value::String(token) => match Player::from_token(token) {
            Some(player) => Cell::Filled(player),
            None => {
                repairs.push(format!("{row_key} has unknown cell '{token}'"));
                Cell::Empty
            }
        },
        other => {
            repairs.push(format!("{row_key} has non-string cell {other}"));
            Cell::Empty
        }
    }
}

fn cell_value(cell: Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Filled(player) => Value::from(player.token()),
    }
}

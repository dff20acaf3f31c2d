//! Core Connect Four game logic: board representation, player types, and game
//! session state with immutable transitions.

mod board;
mod player;
mod state;

pub use board::{Board, Cell, WinningLine, COLS, CONNECT, ROWS};
pub use player::Player;
pub use state::{GameRules, GameSession, GameStatus, DEFAULT_WIN_SCORE_BASE};

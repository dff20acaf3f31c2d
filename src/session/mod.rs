//! Game session controller: applies moves through the board engine and keeps
//! the stored game document in step with the session shown to the player.

pub mod codec;
mod controller;
mod writer;

pub use controller::{GameController, MoveNotice, Turn, COLUMN_FULL_NOTICE};
pub use writer::WriteQueue;

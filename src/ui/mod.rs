//! Terminal UI for playing a persisted game of Connect Four.

mod app;
mod game_view;

pub use app::App;

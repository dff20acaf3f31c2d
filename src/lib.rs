//! # Connect Four
//!
//! A two-player Connect Four game whose state is saved to a document store
//! after every move, so a game can be picked up again later.
//!
//! ## Modules
//!
//! - [`game`] — Board engine, players, and the immutable game session
//! - [`session`] — Controller mediating between moves and the stored document
//! - [`store`] — Document store trait with in-memory and JSON-file backends
//! - [`ui`] — Terminal UI
//! - [`config`] — TOML configuration loading and validation
//! - [`error`] — Structured error types

pub mod config;
pub mod error;
pub mod game;
pub mod session;
pub mod store;
pub mod ui;

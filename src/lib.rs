//! Golib: the core of a Go game record editor.
//!
//! This crate reads and writes games in SGF, keeps a single line of play as
//! an editable record, and checks every change against the rules of Go with
//! an engine that buffers changes until they are confirmed.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions and SGF tags
//! - [`config`] - Immutable game configuration
//! - [`error`] - Error types of every layer
//! - [`board`] - Colors, points and the stone grid
//! - [`moves`] - Moves and their coordinate frames
//! - [`sgf`] - SGF parser and writer
//! - [`kifu`] - Game record
//! - [`rules`] - Rules engine with capture, ko and suicide checks
//! - [`controller`] - Headless driver tying the record to the engine
//! - [`playout`] - Random game generation
//! - [`shell`] - Line-oriented command shell
//!
//! ## Example
//!
//! ```
//! use golib_rust::config::GoConfig;
//! use golib_rust::controller::Controller;
//!
//! let mut game = Controller::new(GoConfig::default());
//! game.play((15, 3)).unwrap();
//! game.play((3, 15)).unwrap();
//!
//! // The record can be written out as SGF at any time
//! let sgf = game.kifu().to_string();
//! assert!(sgf.contains(";B[pd]"));
//! ```

pub mod board;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod kifu;
pub mod moves;
pub mod playout;
pub mod rules;
pub mod sgf;
pub mod shell;

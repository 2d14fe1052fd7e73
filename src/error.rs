//! Error types for every layer of the crate.
//!
//! Rule violations and protocol violations are recoverable: the engine has
//! already rolled its buffer back when one of them is returned.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::board::Point;
use crate::sgf::ScanState;

/// Failure to build a [`Move`](crate::moves::Move) from coordinates or text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("unrecognized coordinate type: \"{0}\"")]
    UnknownFrame(String),
    #[error("malformed move token: \"{0}\"")]
    Malformed(String),
    #[error("unknown color: \"{0}\"")]
    Color(String),
    #[error("coordinates ({0}, {1}) are off a {2}x{2} board")]
    OffBoard(usize, usize, usize),
}

/// Failure to read SGF text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SgfError {
    /// A character not allowed by the scanner state.
    #[error("unexpected {ch:?} at offset {offset} while in state {state:?}")]
    Unexpected {
        ch: char,
        state: ScanState,
        offset: usize,
    },
    /// The input ended before the last game tree was closed.
    #[error("input ended in state {state:?}")]
    Truncated { state: ScanState },
    /// An interpreted property carries a value it cannot hold.
    #[error("invalid value for {tag}: {value:?}")]
    Value { tag: String, value: String },
    #[error("no game tree found")]
    Empty,
}

/// Rule and protocol violations reported by the rules engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Error Illegal move: point not EMPTY")]
    Occupied,
    #[error("Error Illegal move: suicide")]
    Suicide,
    #[error("Error Illegal move: retakes ko")]
    Ko,
    #[error("Error Illegal move: {0:?} is off the board")]
    OffBoard(Point),
    #[error("Empty")]
    Empty,
    #[error("Wrong Color")]
    WrongColor,
    #[error("Confirmation Denied")]
    ConfirmationDenied,
    #[error("move is not numbered")]
    Unnumbered,
    #[error("move {number} is out of sequence ({len} moves recorded)")]
    OutOfSequence { number: usize, len: usize },
    #[error("move {number} does not match the recorded move")]
    HistoryMismatch { number: usize },
}

impl RuleError {
    /// Whether this is a misuse of the put/remove/confirm protocol rather
    /// than an illegal move.
    pub fn is_protocol(&self) -> bool {
        !matches!(
            self,
            RuleError::Occupied | RuleError::Suicide | RuleError::Ko | RuleError::OffBoard(_)
        )
    }
}

/// Failure of a game record operation.
#[derive(Debug, Error)]
pub enum KifuError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Sgf(#[from] SgfError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error("no file defined, can't save")]
    NoFile,
    #[error("no move numbered {0}")]
    NoSuchMove(usize),
    #[error("no stone recorded at {0:?}")]
    NoStoneAt(Point),
}

/// Failure of a controller action.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Kifu(#[from] KifuError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error("variations not allowed yet, insert the move with an explicit color instead")]
    Variation,
    #[error("cannot insert move at {at}: {source} at move {number}")]
    Conflict {
        at: usize,
        number: usize,
        #[source]
        source: RuleError,
    },
    #[error("nothing recorded at {0:?}")]
    NothingAt(Point),
}

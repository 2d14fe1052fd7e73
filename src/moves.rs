//! Moves and the coordinate frames they can be read from or written to.
//!
//! Four conventions are in use around a game record:
//!
//! - [`Frame::Tk`] - internal numeric (row, col), the one used by [`Grid`](crate::board::Grid)
//! - [`Frame::Sgf`] - one lowercase letter per axis, as stored in SGF files
//! - [`Frame::Np`] - numeric (col, row), the transposed matrix view
//! - [`Frame::Kgs`] - display labels, a letter skipping `I` and a line number
//!
//! Conversions are pure, and a move written in a frame reads back identically.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::board::{Color, Point};
use crate::constants::{KGS_LETTERS, KGS_SKIPPED, SGF_BASE};
use crate::error::MoveError;

/// A coordinate convention.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Tk,
    Sgf,
    Np,
    Kgs,
}

impl FromStr for Frame {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tk" => Ok(Frame::Tk),
            "sgf" => Ok(Frame::Sgf),
            "np" => Ok(Frame::Np),
            "kgs" => Ok(Frame::Kgs),
            _ => Err(MoveError::UnknownFrame(s.to_string())),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frame::Tk => "tk",
            Frame::Sgf => "sgf",
            Frame::Np => "np",
            Frame::Kgs => "kgs",
        };
        f.write_str(name)
    }
}

/// One ply: a stone (or a pass) of a given color, with its move number.
///
/// Two moves are equal when they put the same color on the same point; the
/// number is left out so that a renumbered move keeps its identity.
#[derive(Copy, Clone, Debug)]
pub struct Move {
    pub color: Color,
    /// `None` for a pass.
    pub point: Option<Point>,
    /// 1-based position in the game, 0 if not numbered yet.
    pub number: usize,
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.color == other.color && self.point == other.point
    }
}

impl Eq for Move {}

impl Hash for Move {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.color.hash(state);
        self.point.hash(state);
    }
}

impl Move {
    pub fn new(color: Color, point: Point, number: usize) -> Self {
        Self {
            color,
            point: Some(point),
            number,
        }
    }

    pub fn pass(color: Color, number: usize) -> Self {
        Self {
            color,
            point: None,
            number,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.point.is_none()
    }

    /// Same stone, another number.
    pub fn with_number(self, number: usize) -> Self {
        Self { number, ..self }
    }

    /// Build a move from a pair of coordinates expressed in `frame`.
    ///
    /// `a` and `b` are the frame's two components as text, e.g. `("3", "15")`
    /// in [`Frame::Tk`] or `("D", "4")` in [`Frame::Kgs`]. Two empty components,
    /// or `a == "pass"`, make a pass.
    pub fn from_coords(
        frame: Frame,
        color: Color,
        a: &str,
        b: &str,
        size: usize,
        number: usize,
    ) -> Result<Self, MoveError> {
        if (a.is_empty() && b.is_empty()) || a.eq_ignore_ascii_case("pass") {
            return Ok(Self::pass(color, number));
        }
        let malformed = || MoveError::Malformed(format!("{a}{b}"));
        let (row, col) = match frame {
            Frame::Tk => (
                a.parse().map_err(|_| malformed())?,
                b.parse().map_err(|_| malformed())?,
            ),
            Frame::Np => (
                b.parse().map_err(|_| malformed())?,
                a.parse().map_err(|_| malformed())?,
            ),
            Frame::Sgf => (
                sgf_axis(a).ok_or_else(malformed)?,
                sgf_axis(b).ok_or_else(malformed)?,
            ),
            Frame::Kgs => {
                let row = kgs_axis(a).ok_or_else(malformed)?;
                let line: usize = b.parse().map_err(|_| malformed())?;
                if line == 0 || line > size {
                    return Err(MoveError::OffBoard(row, line, size));
                }
                (row, size - line)
            }
        };
        if row >= size || col >= size {
            return Err(MoveError::OffBoard(row, col, size));
        }
        Ok(Self::new(color, (row, col), number))
    }

    /// Read a move written as `C[xy]`, the inverse of [`Move::repr`].
    ///
    /// `C` is the color letter and `xy` the coordinates in `frame`: `dd` for
    /// SGF, `D16` for KGS, `3,15` for the numeric frames. An empty value or
    /// `pass` reads as a pass.
    pub fn parse(frame: Frame, raw: &str, size: usize) -> Result<Self, MoveError> {
        let malformed = || MoveError::Malformed(raw.to_string());
        let mut chars = raw.chars();
        let color = chars
            .next()
            .and_then(Color::from_char)
            .ok_or_else(malformed)?;
        let value = chars
            .as_str()
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(malformed)?;
        if value.is_empty() || value.eq_ignore_ascii_case("pass") {
            return Ok(Self::pass(color, 0));
        }
        let (a, b) = match frame {
            Frame::Tk | Frame::Np => value.split_once(',').ok_or_else(malformed)?,
            Frame::Sgf => {
                if value.len() != 2 || !value.is_ascii() {
                    return Err(malformed());
                }
                value.split_at(1)
            }
            Frame::Kgs => {
                if !(2..=3).contains(&value.len()) || !value.is_ascii() {
                    return Err(malformed());
                }
                value.split_at(1)
            }
        };
        Self::from_coords(frame, color, a, b, size, 0)
    }

    /// The coordinates of this move in `frame`.
    ///
    /// `None` for a pass, or for a point that does not fit a `size` board.
    pub fn coords(&self, frame: Frame, size: usize) -> Option<(String, String)> {
        let (row, col) = self.point?;
        if row >= size || col >= size || (frame == Frame::Kgs && row >= KGS_LETTERS) {
            return None;
        }
        Some(match frame {
            Frame::Tk => (row.to_string(), col.to_string()),
            Frame::Np => (col.to_string(), row.to_string()),
            Frame::Sgf => (sgf_letter(row).to_string(), sgf_letter(col).to_string()),
            Frame::Kgs => (kgs_letter(row).to_string(), (size - col).to_string()),
        })
    }

    /// The SGF property value of this move: `"dd"`, or `""` for a pass.
    pub fn sgf_value(&self) -> String {
        match self.point {
            Some((row, col)) => [sgf_letter(row), sgf_letter(col)].iter().collect(),
            None => String::new(),
        }
    }

    /// Display label such as `D16`, or `pass`.
    ///
    /// A point off the board is shown with its SGF letters.
    pub fn kgs(&self, size: usize) -> String {
        match self.coords(Frame::Kgs, size) {
            Some((a, b)) => format!("{a}{b}"),
            None if self.is_pass() => "pass".into(),
            None => self.sgf_value(),
        }
    }

    /// Represent this move in `frame`, e.g. `B[dd]` or `W[D16]`.
    pub fn repr(&self, frame: Frame, size: usize) -> String {
        let value = match self.coords(frame, size) {
            None if self.is_pass() => "pass".to_string(),
            None => self.sgf_value(),
            Some((a, b)) => match frame {
                Frame::Tk | Frame::Np => format!("{a},{b}"),
                Frame::Sgf | Frame::Kgs => format!("{a}{b}"),
            },
        };
        format!("{}[{value}]", self.color.sgf_tag())
    }

    /// Integer key of this move.
    ///
    /// With g2 = size * size: black stones are in `[0, g2)`, white stones in
    /// `[g2, 2*g2)`, and passes are `2*g2` (black) or `2*g2 + 1` (white).
    pub fn key(&self, size: usize) -> usize {
        let g2 = size * size;
        match self.point {
            Some((row, col)) => {
                let base = match self.color {
                    Color::Black => 0,
                    Color::White => g2,
                };
                base + row + size * col
            }
            None => 2 * g2 + usize::from(self.color == Color::White),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]#{}",
            self.color.sgf_tag(),
            self.sgf_value(),
            self.number
        )
    }
}

/// Read an SGF move value: two lowercase letters, or empty for a pass.
///
/// The board size is not checked.
pub fn sgf_point(value: &str) -> Result<Option<Point>, MoveError> {
    if value.is_empty() {
        return Ok(None);
    }
    let bytes = value.as_bytes();
    if bytes.len() != 2 {
        return Err(MoveError::Malformed(value.to_string()));
    }
    let axis = |b: u8| b.is_ascii_lowercase().then(|| (b - SGF_BASE) as usize);
    match (axis(bytes[0]), axis(bytes[1])) {
        (Some(row), Some(col)) => Ok(Some((row, col))),
        _ => Err(MoveError::Malformed(value.to_string())),
    }
}

fn sgf_axis(s: &str) -> Option<usize> {
    match s.as_bytes() {
        [b] if b.is_ascii_lowercase() => Some((b - SGF_BASE) as usize),
        _ => None,
    }
}

fn sgf_letter(i: usize) -> char {
    (SGF_BASE + i as u8) as char
}

/// Column letter to index, skipping 'I' (Go convention to avoid confusion with 'J').
fn kgs_axis(s: &str) -> Option<usize> {
    match s.as_bytes() {
        [b] => {
            let c = b.to_ascii_uppercase();
            if !c.is_ascii_uppercase() || c == KGS_SKIPPED {
                return None;
            }
            let i = (c - b'A') as usize;
            Some(if c > KGS_SKIPPED { i - 1 } else { i })
        }
        _ => None,
    }
}

fn kgs_letter(i: usize) -> char {
    let skip = usize::from(i >= (KGS_SKIPPED - b'A') as usize);
    (b'A' + (i + skip) as u8) as char
}

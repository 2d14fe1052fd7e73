//! Board occupancy grid and group/liberty analysis.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use crate::constants::DELTA;
use crate::error::MoveError;

/// Stone color. An empty intersection is `None` in a [`Grid`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// The SGF property tag of a move of this color.
    pub fn sgf_tag(self) -> &'static str {
        match self {
            Color::Black => "B",
            Color::White => "W",
        }
    }

    pub fn from_char(c: char) -> Option<Color> {
        match c.to_ascii_uppercase() {
            'B' => Some(Color::Black),
            'W' => Some(Color::White),
            _ => None,
        }
    }
}

impl FromStr for Color {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "black" => Ok(Color::Black),
            "w" | "white" => Ok(Color::White),
            _ => Err(MoveError::Color(s.to_string())),
        }
    }
}

/// An intersection, as (row, col).
pub type Point = (usize, usize);

/// A maximal set of same-color, orthogonally connected stones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub stones: Vec<Point>,
    /// Number of distinct empty intersections adjacent to the group.
    pub liberties: usize,
}

/// NxN matrix of intersections, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<Color>>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn idx(&self, (row, col): Point) -> usize {
        row * self.size + col
    }

    pub fn contains(&self, (row, col): Point) -> bool {
        row < self.size && col < self.size
    }

    /// The stone at `pt`, `None` if empty or off the board.
    pub fn get(&self, pt: Point) -> Option<Color> {
        if !self.contains(pt) {
            return None;
        }
        self.cells[self.idx(pt)]
    }

    /// Set or clear an intersection. Off-board points are ignored.
    pub fn set(&mut self, pt: Point, stone: Option<Color>) {
        if self.contains(pt) {
            let i = self.idx(pt);
            self.cells[i] = stone;
        }
    }

    /// Number of stones on the board.
    pub fn count(&self) -> usize {
        self.stones().count()
    }

    /// Iterate over occupied intersections.
    pub fn stones(&self) -> impl Iterator<Item = (Point, Color)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| ((i / self.size, i % self.size), c)))
    }

    /// The (up to) 4 intersections orthogonally connected to `pt`.
    pub fn neighbors(&self, (row, col): Point) -> impl Iterator<Item = Point> + use<> {
        let size = self.size;
        DELTA.into_iter().filter_map(move |(dr, dc)| {
            let r = row.checked_add_signed(dr)?;
            let c = col.checked_add_signed(dc)?;
            (r < size && c < size).then_some((r, c))
        })
    }

    /// Flood-fill the group containing `start`.
    ///
    /// Returns `None` when `start` is empty.
    pub fn group(&self, start: Point) -> Option<Group> {
        let color = self.get(start)?;
        let mut stack = vec![start];
        let mut visited = vec![false; self.cells.len()];
        let mut liberty_seen = vec![false; self.cells.len()];
        let mut stones = Vec::new();
        let mut liberties = 0;

        visited[self.idx(start)] = true;
        while let Some(pt) = stack.pop() {
            stones.push(pt);
            for n in self.neighbors(pt) {
                let ni = self.idx(n);
                match self.cells[ni] {
                    None => {
                        if !liberty_seen[ni] {
                            liberty_seen[ni] = true;
                            liberties += 1;
                        }
                    }
                    Some(c) if c == color && !visited[ni] => {
                        visited[ni] = true;
                        stack.push(n);
                    }
                    _ => {}
                }
            }
        }
        Some(Group { stones, liberties })
    }
}

impl Index<usize> for Grid {
    type Output = [Option<Color>];

    /// Row access: `grid[row][col]`.
    fn index(&self, row: usize) -> &Self::Output {
        let start = row * self.size;
        &self.cells[start..start + self.size]
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.size {
            for col in 0..self.size {
                let ch = match self.get((row, col)) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{}", self.size, self.size)?;
        fmt::Display::fmt(self, f)
    }
}

//! Game record: the main line of play of an SGF game, as a list of nodes.
//!
//! Only one line of play is supported. The first node is a context node
//! (board size, comment) and every other node usually plays one move.
//! Move numbers are kept in the `MN` property of each node and are
//! renumbered on insertion and deletion.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::board::{Color, Point};
use crate::config::GoConfig;
use crate::constants::MAX_SIZE;
use crate::error::{KifuError, SgfError};
use crate::moves::Move;
use crate::sgf::{self, Node, Property};

/// A recorded game.
#[derive(Clone, Debug)]
pub struct Kifu {
    nodes: Vec<Node>,
    size: usize,
    path: Option<PathBuf>,
    modified: bool,
}

impl Kifu {
    /// A new game holding only its context node.
    pub fn new(config: &GoConfig) -> Self {
        let mut context = Node::new();
        context.set(Property::Size(config.size));
        context.set(Property::Comment(format!(
            "Recorded with {}.",
            config.app_name
        )));
        context.assign_number(None, None);
        Self {
            nodes: vec![context],
            size: config.size,
            path: None,
            modified: false,
        }
    }

    /// Read a game from SGF text.
    ///
    /// The first game tree of the collection is used, and only its main line.
    /// The board size comes from the root `SZ` property, or `config`. A move
    /// played outside that board is an error.
    pub fn from_sgf(text: &str, config: &GoConfig) -> Result<Self, KifuError> {
        let collection = sgf::parse(text)?;
        if collection.trees.len() > 1 {
            warn!(
                "{} game trees found, only the first one is used",
                collection.trees.len()
            );
        }
        let tree = collection.trees.first().ok_or(SgfError::Empty)?;
        let (nodes, dropped) = tree.principal_line();
        if dropped > 0 {
            warn!("{dropped} variation(s) dropped, only the main line is supported");
        }
        let size = nodes.first().and_then(Node::size).unwrap_or(config.size);
        if !(1..=MAX_SIZE).contains(&size) {
            return Err(SgfError::Value {
                tag: "SZ".into(),
                value: size.to_string(),
            }
            .into());
        }
        if let Some(mv) = nodes
            .iter()
            .filter_map(Node::to_move)
            .find(|mv| mv.point.is_some_and(|(row, col)| row >= size || col >= size))
        {
            return Err(SgfError::Value {
                tag: mv.color.sgf_tag().into(),
                value: mv.sgf_value(),
            }
            .into());
        }
        Ok(Self {
            nodes,
            size,
            path: None,
            modified: false,
        })
    }

    /// Load a game from an SGF file.
    pub fn load(path: impl AsRef<Path>, config: &GoConfig) -> Result<Self, KifuError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| KifuError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut kifu = Self::from_sgf(&text, config)?;
        kifu.path = Some(path.to_path_buf());
        info!("Opened '{}'", path.display());
        Ok(kifu)
    }

    /// Load a game if a path is given, falling back to a new game.
    ///
    /// A load failure is not fatal: it is handed to `err` and a new game is
    /// returned instead.
    pub fn open<F>(path: Option<&Path>, config: &GoConfig, mut err: F) -> Self
    where
        F: FnMut(&KifuError),
    {
        if let Some(path) = path {
            match Self::load(path, config) {
                Ok(kifu) => return kifu,
                Err(e) => err(&e),
            }
        }
        info!("Opened new game");
        Self::new(config)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the game changed since it was loaded or saved.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A node for `mv`, numbered after the last node unless `mv` is numbered.
    fn prepare(&self, mv: &Move) -> Node {
        let mut node = Node::new();
        node.set(Property::Play(mv.color, mv.point));
        let previous = self.nodes.last().and_then(Node::number);
        node.assign_number(previous, (mv.number > 0).then_some(mv.number));
        node
    }

    /// Append the move at the end of the game.
    pub fn append(&mut self, mv: &Move) {
        let node = self.prepare(mv);
        self.nodes.push(node);
        self.modified = true;
    }

    /// Insert the move so that it becomes move number `position`.
    ///
    /// Every node numbered `position` or more is shifted by one. Inserting
    /// right after the last move appends.
    pub fn insert(&mut self, mv: &Move, position: usize) -> Result<(), KifuError> {
        let last = self.last_move().map_or(0, |m| m.number);
        if position == 0 || position > last + 1 {
            return Err(KifuError::NoSuchMove(position));
        }
        let mut node = self.prepare(mv);
        node.set_number(position);

        let at = self.nodes.iter().position(|n| {
            n.play().is_some() && n.number().is_some_and(|nb| nb >= position)
        });
        for n in &mut self.nodes {
            if let Some(nb) = n.number().filter(|&nb| nb >= position) {
                n.set_number(nb + 1);
            }
        }
        match at {
            Some(i) => self.nodes.insert(i, node),
            None => self.nodes.push(node),
        }
        self.modified = true;
        Ok(())
    }

    /// Delete the move carrying the same number as `mv`, and shift the numbers
    /// of all subsequent nodes down by one.
    pub fn delete(&mut self, mv: &Move) -> Result<(), KifuError> {
        let at = self
            .nodes
            .iter()
            .position(|n| n.to_move().is_some_and(|m| m.number == mv.number))
            .ok_or(KifuError::NoSuchMove(mv.number))?;
        self.nodes.remove(at);
        for n in &mut self.nodes[at..] {
            if let Some(nb) = n.number() {
                n.set_number(nb.saturating_sub(1));
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Move the stone played by `origin` to `dest`'s point. The move number is
    /// not changed. An unnumbered `origin` stands for the most recent stone at
    /// its point.
    pub fn relocate(&mut self, origin: &Move, dest: &Move) -> Result<(), KifuError> {
        let point = origin.point.ok_or(KifuError::NoSuchMove(origin.number))?;
        let at = self
            .locate_index(point, (origin.number > 0).then_some(origin.number))
            .ok_or(KifuError::NoStoneAt(point))?;
        self.nodes[at].set(Property::Play(origin.color, dest.point));
        self.modified = true;
        Ok(())
    }

    /// Rewrite the most recent node at `mv`'s point with `mv`'s color, and its
    /// number when `mv` is numbered.
    pub fn update(&mut self, mv: &Move) -> Result<(), KifuError> {
        let point = mv.point.ok_or(KifuError::NoSuchMove(mv.number))?;
        let at = self
            .locate_index(point, None)
            .ok_or(KifuError::NoStoneAt(point))?;
        let node = &mut self.nodes[at];
        node.set(Property::Play(mv.color, mv.point));
        if mv.number > 0 {
            node.set_number(mv.number);
        }
        self.modified = true;
        Ok(())
    }

    fn locate_index(&self, point: Point, upper_bound: Option<usize>) -> Option<usize> {
        self.nodes.iter().enumerate().rev().find_map(|(i, n)| {
            let mv = n.to_move()?;
            let in_range = upper_bound.is_none_or(|bound| mv.number <= bound);
            (in_range && mv.point == Some(point)).then_some(i)
        })
    }

    /// The node describing the stone at `point`.
    ///
    /// The search goes from the most recent move (or move number `upper_bound`)
    /// backwards, so that the stone currently on that location is found when
    /// the point has been played several times.
    pub fn locate(&self, point: Point, upper_bound: Option<usize>) -> Option<&Node> {
        self.locate_index(point, upper_bound).map(|i| &self.nodes[i])
    }

    /// Moves numbered `first..=last`, in order. Non-move nodes are skipped.
    pub fn sequence(&self, first: usize, last: usize) -> Vec<Move> {
        self.moves()
            .filter(|m| (first..=last).contains(&m.number))
            .collect()
    }

    /// All moves of the game, in order.
    pub fn moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.nodes.iter().filter_map(Node::to_move)
    }

    pub fn move_at(&self, number: usize) -> Option<Move> {
        self.moves().find(|m| m.number == number)
    }

    pub fn last_move(&self) -> Option<Move> {
        self.nodes.iter().rev().find_map(Node::to_move)
    }

    /// Number of the first move at `point` among moves numbered `from` or more.
    pub fn contains_point(&self, point: Point, from: usize) -> Option<usize> {
        self.moves()
            .find(|m| m.number >= from && m.point == Some(point))
            .map(|m| m.number)
    }

    /// Color of the next move to append, assuming black/white alternation.
    pub fn next_color(&self) -> Color {
        self.last_move()
            .map_or(Color::Black, |m| m.color.opponent())
    }

    /// Save to the file the game was loaded from or last saved to.
    pub fn save(&mut self) -> Result<(), KifuError> {
        let path = self.path.clone().ok_or(KifuError::NoFile)?;
        fs::write(&path, self.to_string()).map_err(|source| KifuError::Io {
            path: path.clone(),
            source,
        })?;
        self.modified = false;
        info!("Game saved to: {}", path.display());
        Ok(())
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), KifuError> {
        self.path = Some(path.into());
        self.save()
    }
}

impl fmt::Display for Kifu {
    /// The game as SGF text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        writeln!(f, ")")
    }
}

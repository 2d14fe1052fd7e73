//! Headless driver tying a game record to a rules engine.
//!
//! The engine always holds the moves `1..=current` of the record: navigation
//! puts and removes record moves, while editing actions change both.

use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::board::{Color, Grid, Point};
use crate::config::GoConfig;
use crate::error::{ControlError, KifuError};
use crate::kifu::Kifu;
use crate::moves::Move;
use crate::rules::{GridListener, Rules};
use crate::sgf::Node;

pub struct Controller {
    config: GoConfig,
    kifu: Kifu,
    rules: Rules,
    current: usize,
    selected: Option<Point>,
}

impl Controller {
    pub fn new(config: GoConfig) -> Self {
        let kifu = Kifu::new(&config);
        let rules = Rules::new(&config);
        Self {
            config,
            kifu,
            rules,
            current: 0,
            selected: None,
        }
    }

    /// Start on the game stored at `path`, or on a new game if it can't be
    /// read. The read error, if any, is passed to `err`.
    pub fn open<F>(config: GoConfig, path: Option<&Path>, err: F) -> Self
    where
        F: FnMut(&KifuError),
    {
        let mut controller = Self::new(config);
        let kifu = Kifu::open(path, &controller.config, err);
        controller.start(kifu);
        controller
    }

    pub fn set_listener(&self, listener: Box<dyn GridListener>) {
        self.rules.set_listener(Some(listener));
    }

    pub fn kifu(&self) -> &Kifu {
        &self.kifu
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Number of the move last played on the board, 0 before the first one.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn selected(&self) -> Option<Point> {
        self.selected
    }

    pub fn grid(&self) -> Grid {
        self.rules.grid()
    }

    /// Number of the last move of the record.
    pub fn last_number(&self) -> usize {
        self.kifu.last_move().map_or(0, |m| m.number)
    }

    pub fn at_last_move(&self) -> bool {
        self.current == self.last_number()
    }

    /// Position in the game, as "Move 12 / 40".
    pub fn status(&self) -> String {
        match self.kifu.move_at(self.current) {
            Some(mv) if mv.is_pass() => format!("{:?} pass", mv.color),
            _ => format!("Move {} / {}", self.current, self.last_number()),
        }
    }

    /// Play a stone of the expected color after the last move.
    pub fn play(&mut self, point: Point) -> Result<Move, ControlError> {
        let mv = Move::new(self.kifu.next_color(), point, self.current + 1);
        self.append(mv)
    }

    pub fn pass(&mut self) -> Result<Move, ControlError> {
        let mv = Move::pass(self.kifu.next_color(), self.current + 1);
        self.append(mv)
    }

    fn append(&mut self, mv: Move) -> Result<Move, ControlError> {
        if !self.at_last_move() {
            return Err(ControlError::Variation);
        }
        {
            let _guard = self.rules.lock();
            self.rules.put(&mv, true)?;
            self.kifu.append(&mv);
            self.rules.confirm()?;
        }
        self.current += 1;
        self.selected = mv.point;
        debug!("{}", self.status());
        Ok(mv)
    }

    /// Insert a stone of the given color right after the current move.
    ///
    /// Later moves are shifted by one. The insertion is refused if it would
    /// make one of them illegal.
    pub fn insert(&mut self, color: Color, point: Point) -> Result<Move, ControlError> {
        let mv = Move::new(color, point, self.current + 1);
        self.check_sequence(&mv, false)?;
        {
            let _guard = self.rules.lock();
            self.rules.put(&mv, true)?;
            if let Err(e) = self.kifu.insert(&mv, mv.number) {
                self.rules.reset();
                return Err(e.into());
            }
            self.rules.confirm()?;
        }
        self.current += 1;
        self.selected = Some(point);
        info!("Inserted {mv}");
        Ok(mv)
    }

    /// Delete from the game the most recent move played at `point`.
    pub fn delete(&mut self, point: Point) -> Result<Move, ControlError> {
        let mv = self
            .kifu
            .locate(point, Some(self.current))
            .and_then(Node::to_move)
            .ok_or(ControlError::NothingAt(point))?;
        {
            let _guard = self.rules.lock();
            self.rules.remove(&mv, true)?;
            if let Err(e) = self.kifu.delete(&mv) {
                self.rules.reset();
                return Err(e.into());
            }
            self.rules.confirm()?;
        }
        self.current -= 1;

        // Chain deletions from the head of the game.
        self.selected = match self.kifu.last_move() {
            Some(last) if last.number + 1 == mv.number => last.point,
            _ => None,
        };
        info!("Deleted {mv}");
        Ok(mv)
    }

    /// Move the stone at `from` to `to`, keeping its move number.
    pub fn relocate(&mut self, from: Point, to: Point) -> Result<(Move, Move), ControlError> {
        if self.rules.stone(from).is_none() {
            return Err(ControlError::NothingAt(from));
        }
        let origin = self
            .kifu
            .locate(from, Some(self.current))
            .and_then(Node::to_move)
            .ok_or(ControlError::NothingAt(from))?;
        let dest = Move::new(origin.color, to, origin.number);
        self.check_sequence(&dest, true)?;
        {
            let _guard = self.rules.lock();
            self.rules.remove(&origin, true)?;
            self.rules.put(&dest, false)?;
            if let Err(e) = self.kifu.relocate(&origin, &dest) {
                self.rules.reset();
                return Err(e.into());
            }
            self.rules.confirm()?;
        }
        self.selected = Some(to);
        info!("Moved {origin} to {}", dest.sgf_value());
        Ok((origin, dest))
    }

    /// Check that `mv` can take its number in the game without making any
    /// later move illegal. With `replace`, `mv` takes the place of the move
    /// carrying the same number instead of shifting it.
    fn check_sequence(&self, mv: &Move, replace: bool) -> Result<(), ControlError> {
        let Some(point) = mv.point else {
            return Ok(());
        };
        let at = mv.number;
        // A later stone at the same point is the only possible conflict.
        if self.kifu.contains_point(point, at).is_none() {
            return Ok(());
        }

        let config = GoConfig {
            size: self.kifu.size(),
            ..self.config.clone()
        };
        let lookahead = Rules::new(&config);
        let before = self.kifu.moves().filter(|m| m.number < at);
        let after = self
            .kifu
            .moves()
            .filter(|m| if replace { m.number > at } else { m.number >= at });
        for (i, m) in before.chain(Some(*mv)).chain(after).enumerate() {
            if let Err(source) = lookahead.put(&m.with_number(i + 1), false) {
                let err = ControlError::Conflict {
                    at,
                    number: m.number,
                    source,
                };
                error!("{err}");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Show the next move of the game.
    pub fn forward(&mut self) -> Result<Option<Move>, ControlError> {
        if self.at_last_move() {
            return Ok(None);
        }
        let Some(mv) = self.kifu.move_at(self.current + 1) else {
            return Ok(None);
        };
        {
            let _guard = self.rules.lock();
            self.rules.put(&mv, true)?;
            self.rules.confirm()?;
        }
        self.current += 1;
        debug!("{}", self.status());
        Ok(Some(mv))
    }

    /// Take back the current move. It stays in the game.
    pub fn backward(&mut self) -> Result<Option<Move>, ControlError> {
        if self.current == 0 {
            return Ok(None);
        }
        let Some(mv) = self.kifu.move_at(self.current) else {
            return Ok(None);
        };
        {
            let _guard = self.rules.lock();
            self.rules.remove(&mv, true)?;
            self.rules.confirm()?;
        }
        self.current -= 1;
        debug!("{}", self.status());
        Ok(Some(mv))
    }

    /// Jump to move `number`, clamped to the game. The board is only
    /// confirmed once, at the destination.
    pub fn goto(&mut self, number: usize) -> Result<usize, ControlError> {
        let bound = number.min(self.last_number());
        let mut current = self.current;
        {
            let _guard = self.rules.lock();
            self.rules.reset();
            while current < bound {
                let mv = self
                    .kifu
                    .move_at(current + 1)
                    .ok_or(KifuError::NoSuchMove(current + 1))?;
                self.rules.put(&mv, false)?;
                current += 1;
            }
            while bound < current {
                let mv = self
                    .kifu
                    .move_at(current)
                    .ok_or(KifuError::NoSuchMove(current))?;
                self.rules.remove(&mv, false)?;
                current -= 1;
            }
            self.rules.confirm()?;
        }
        self.current = current;
        debug!("{}", self.status());
        Ok(current)
    }

    pub fn new_game(&mut self) {
        let kifu = Kifu::new(&self.config);
        self.start(kifu);
        info!("New game");
    }

    /// Replace the game with the one stored at `path`.
    ///
    /// On failure the controller moves on to a new game and the error is
    /// returned.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), ControlError> {
        match Kifu::load(path, &self.config) {
            Ok(kifu) => {
                self.start(kifu);
                Ok(())
            }
            Err(e) => {
                self.new_game();
                Err(e.into())
            }
        }
    }

    pub fn save(&mut self) -> Result<(), ControlError> {
        Ok(self.kifu.save()?)
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), ControlError> {
        Ok(self.kifu.save_as(path)?)
    }

    /// Empty the board and point at the start of `kifu`. The engine is
    /// rebuilt when the board size changes.
    fn start(&mut self, kifu: Kifu) {
        if kifu.size() != self.rules.size() {
            let config = GoConfig {
                size: kifu.size(),
                ..self.config.clone()
            };
            let listener = self.rules.take_listener();
            self.rules = Rules::new(&config);
            self.rules.set_listener(listener);
        } else {
            self.rules.clear();
        }
        self.kifu = kifu;
        self.current = 0;
        self.selected = None;
    }
}

//! Rules engine: board state, captures, and legality of moves.
//!
//! The engine keeps two copies of its state:
//! - the **committed** state, which only changes on [`Rules::confirm`]
//! - the **buffer**, where [`Rules::put`] and [`Rules::remove`] apply their
//!   changes
//!
//! A move that violates a rule (occupied point, suicide, ko) or the protocol
//! (removing a stone that is not there, confirming nothing) rolls the buffer
//! back to the committed state, so that a failed call is equivalent to no
//! call at all.
//!
//! Moves can be put or removed in the middle of the sequence: the buffer is
//! rewound down to the affected move, the history is spliced, and the
//! following moves are replayed.
//!
//! ## Threads
//!
//! `put`, `remove` and `confirm` each hold a re-entrant lock for their own
//! duration. A `put` followed by a `confirm` is not atomic with respect to
//! another thread's `put`: hold [`Rules::lock`] around both when that matters.
//!
//! ```
//! use golib_rust::board::Color;
//! use golib_rust::config::GoConfig;
//! use golib_rust::moves::Move;
//! use golib_rust::rules::Rules;
//!
//! let rules = Rules::new(&GoConfig::default());
//! {
//!     let _guard = rules.lock();
//!     rules.put(&Move::new(Color::Black, (3, 3), 1), true).unwrap();
//!     rules.confirm().unwrap();
//! }
//! assert_eq!(rules.grid()[3][3], Some(Color::Black));
//! ```

use std::cell::RefCell;
use std::fmt;

use log::{debug, error};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::board::{Color, Grid, Point};
use crate::config::GoConfig;
use crate::error::RuleError;
use crate::moves::Move;

/// Receives the board after every confirmed change.
pub trait GridListener: Send {
    fn grid_changed(&self, grid: &Grid);
}

impl<F> GridListener for F
where
    F: Fn(&Grid) + Send,
{
    fn grid_changed(&self, grid: &Grid) {
        self(grid)
    }
}

/// Board, captures and history, as of some move.
#[derive(Clone, Debug, PartialEq, Eq)]
struct State {
    grid: Grid,
    /// Stones removed by each move, indexed by move number - 1.
    captures: Vec<Vec<Move>>,
    /// The moves that led to this state.
    history: Vec<Move>,
}

impl State {
    fn new(size: usize) -> Self {
        Self {
            grid: Grid::new(size),
            captures: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Place a stone, remove the enemy groups it kills, and check ko and
    /// suicide. On error the state is left half-updated: the caller resets.
    fn place(&mut self, mv: &Move) -> Result<(), RuleError> {
        let Some(pt) = mv.point else {
            self.captures.push(Vec::new());
            return Ok(());
        };
        if !self.grid.contains(pt) {
            return Err(RuleError::OffBoard(pt));
        }
        if self.grid.get(pt).is_some() {
            return Err(RuleError::Occupied);
        }

        let enemy = mv.color.opponent();
        self.grid.set(pt, Some(mv.color));
        let mut captured = Vec::new();
        for n in self.grid.neighbors(pt) {
            if self.grid.get(n) != Some(enemy) {
                continue;
            }
            if let Some(group) = self.grid.group(n) {
                if group.liberties == 0 {
                    for s in group.stones {
                        self.grid.set(s, None);
                        captured.push(Move::new(enemy, s, 0));
                    }
                }
            }
        }
        let safe = !captured.is_empty();
        self.captures.push(captured);

        // Immediate one-for-one retake of the stone just captured.
        let n = self.captures.len();
        if n > 3 {
            let (last, previous) = (&self.captures[n - 1], &self.captures[n - 2]);
            if last.len() == 1 && previous.len() == 1 && previous[0] == *mv {
                return Err(RuleError::Ko);
            }
        }

        if !safe && self.grid.group(pt).map_or(0, |g| g.liberties) == 0 {
            return Err(RuleError::Suicide);
        }
        Ok(())
    }

    /// Take a stone back and restore the stones it captured.
    fn lift(&mut self, mv: &Move) -> Result<(), RuleError> {
        let Some(pt) = mv.point else {
            self.captures.pop();
            return Ok(());
        };
        match self.grid.get(pt) {
            Some(c) if c == mv.color => {}
            Some(_) => return Err(RuleError::WrongColor),
            None => return Err(RuleError::Empty),
        }
        self.grid.set(pt, None);
        for stone in self.captures.pop().unwrap_or_default() {
            if let Some(p) = stone.point {
                self.grid.set(p, Some(stone.color));
            }
        }
        Ok(())
    }

    /// Lift moves from the tail until move `number` is undone.
    fn rewind(&mut self, number: usize) -> Result<(), RuleError> {
        while self.captures.len() >= number {
            let mv = self.history[self.captures.len() - 1];
            self.lift(&mv)?;
        }
        Ok(())
    }

    /// Replay the history from index `from` to the end.
    fn forward(&mut self, from: usize) -> Result<(), RuleError> {
        for i in from..self.history.len() {
            let mv = self.history[i];
            self.place(&mv)?;
        }
        Ok(())
    }

    fn put(&mut self, mv: &Move) -> Result<(), RuleError> {
        let number = mv.number;
        let len = self.history.len();
        if number == 0 {
            return Err(RuleError::Unnumbered);
        }
        if number == len + 1 {
            self.place(mv)?;
            self.history.push(*mv);
        } else if number <= len {
            debug!("inserting {mv}, replaying {} move(s)", len + 1 - number);
            self.rewind(number)?;
            self.history.insert(number - 1, *mv);
            for m in &mut self.history[number..] {
                m.number += 1;
            }
            self.forward(number - 1)?;
        } else {
            return Err(RuleError::OutOfSequence { number, len });
        }
        Ok(())
    }

    fn remove(&mut self, mv: &Move) -> Result<(), RuleError> {
        let number = mv.number;
        let len = self.history.len();
        if number == 0 {
            return Err(RuleError::Unnumbered);
        }
        if number > len {
            return Err(RuleError::OutOfSequence { number, len });
        }
        if number == len {
            self.lift(mv)?;
            if self.history.pop().as_ref() != Some(mv) {
                return Err(RuleError::HistoryMismatch { number });
            }
        } else {
            if self.history[number - 1] != *mv {
                return Err(RuleError::HistoryMismatch { number });
            }
            debug!("removing {mv}, replaying {} move(s)", len - number);
            self.rewind(number)?;
            self.history.remove(number - 1);
            for m in &mut self.history[number - 1..] {
                m.number -= 1;
            }
            self.forward(number - 1)?;
        }
        Ok(())
    }
}

struct Inner {
    committed: State,
    buffer: Option<State>,
    listener: Option<Box<dyn GridListener>>,
}

impl Inner {
    fn reset(&mut self) {
        self.buffer = Some(self.committed.clone());
    }

    /// Run `op` on the buffer. Any error resets the buffer.
    fn stage<F>(&mut self, mv: &Move, reset: bool, op: F) -> Result<(), RuleError>
    where
        F: FnOnce(&mut State, &Move) -> Result<(), RuleError>,
    {
        if reset {
            self.reset();
        }
        let committed = &self.committed;
        let buffer = self.buffer.get_or_insert_with(|| committed.clone());
        let result = op(buffer, mv);
        if let Err(e) = &result {
            if e.is_protocol() {
                error!("{mv}: {e}");
            } else {
                debug!("{mv} rejected: {e}");
            }
            self.reset();
        }
        result
    }
}

/// Scoped hold on the engine's lock, see [`Rules::lock`].
pub struct RulesGuard<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<Inner>>,
}

/// Holds the state of a game and checks every change made to it.
pub struct Rules {
    size: usize,
    inner: ReentrantMutex<RefCell<Inner>>,
}

impl Rules {
    pub fn new(config: &GoConfig) -> Self {
        Self {
            size: config.size,
            inner: ReentrantMutex::new(RefCell::new(Inner {
                committed: State::new(config.size),
                buffer: None,
                listener: None,
            })),
        }
    }

    pub fn with_listener(config: &GoConfig, listener: Box<dyn GridListener>) -> Self {
        let rules = Self::new(config);
        rules.set_listener(Some(listener));
        rules
    }

    pub fn set_listener(&self, listener: Option<Box<dyn GridListener>>) {
        let guard = self.inner.lock();
        guard.borrow_mut().listener = listener;
    }

    pub fn take_listener(&self) -> Option<Box<dyn GridListener>> {
        let guard = self.inner.lock();
        guard.borrow_mut().listener.take()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Hold the engine's lock until the guard is dropped.
    ///
    /// The lock is re-entrant: the holder can still call every method, while
    /// other threads wait. Use it to make a `put` and its `confirm` atomic.
    pub fn lock(&self) -> RulesGuard<'_> {
        RulesGuard {
            _guard: self.inner.lock(),
        }
    }

    /// Check that `mv` can be played, in the buffer only.
    ///
    /// Nothing changes from the point of view of the committed state until
    /// [`confirm`](Self::confirm). With `reset`, the buffer first drops any
    /// change not confirmed yet.
    pub fn put(&self, mv: &Move, reset: bool) -> Result<(), RuleError> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        inner.stage(mv, reset, State::put)
    }

    /// Check that `mv` can be taken back, in the buffer only.
    pub fn remove(&self, mv: &Move, reset: bool) -> Result<(), RuleError> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        inner.stage(mv, reset, State::remove)
    }

    /// Persist the buffer, and notify the listener.
    pub fn confirm(&self) -> Result<(), RuleError> {
        let guard = self.inner.lock();
        let (grid, listener) = {
            let mut inner = guard.borrow_mut();
            let Some(buffer) = inner.buffer.take() else {
                error!("confirm() called without a preceding put() or remove()");
                return Err(RuleError::ConfirmationDenied);
            };
            inner.committed = buffer;
            (inner.committed.grid.clone(), inner.listener.take())
        };
        // Released borrow: the listener may read the engine.
        if let Some(listener) = listener {
            listener.grid_changed(&grid);
            let mut inner = guard.borrow_mut();
            if inner.listener.is_none() {
                inner.listener = Some(listener);
            }
        }
        Ok(())
    }

    /// Roll the buffer back to the last confirmed state.
    pub fn reset(&self) {
        let guard = self.inner.lock();
        guard.borrow_mut().reset();
    }

    /// Empty the board and forget the game. The listener is kept.
    pub fn clear(&self) {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        inner.committed = State::new(self.size);
        inner.buffer = None;
    }

    /// Whether the buffer holds changes not confirmed yet.
    pub fn is_dirty(&self) -> bool {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner.buffer.as_ref().is_some_and(|b| *b != inner.committed)
    }

    /// Copy of the committed board.
    pub fn grid(&self) -> Grid {
        self.inner.lock().borrow().committed.grid.clone()
    }

    pub fn stone(&self, pt: Point) -> Option<Color> {
        self.inner.lock().borrow().committed.grid.get(pt)
    }

    /// Committed moves, in order.
    pub fn history(&self) -> Vec<Move> {
        self.inner.lock().borrow().committed.history.clone()
    }

    /// Committed capture log, one entry per move.
    pub fn captures(&self) -> Vec<Vec<Move>> {
        self.inner.lock().borrow().committed.captures.clone()
    }
}

impl fmt::Display for Rules {
    /// Committed and buffered grids side by side.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        let committed = &inner.committed.grid;
        let buffer = inner.buffer.as_ref().map_or(committed, |b| &b.grid);
        let cell = |c: Option<Color>| match c {
            Some(Color::Black) => 'B',
            Some(Color::White) => 'W',
            None => '~',
        };
        writeln!(
            f,
            "{:<width$}  ||  Buffer",
            "Confirmed",
            width = 2 * self.size
        )?;
        for row in 0..self.size {
            for col in 0..self.size {
                write!(f, "{} ", cell(committed[row][col]))?;
            }
            f.write_str("  ||  ")?;
            for col in 0..self.size {
                write!(f, "{} ", cell(buffer[row][col]))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use super::*;

    fn rules() -> Rules {
        Rules::new(&GoConfig::default())
    }

    /// Put and confirm each move, numbering them 1, 2, ...
    fn play(rules: &Rules, moves: &[(Color, Point)]) {
        for (color, pt) in moves {
            let number = rules.history().len() + 1;
            let mv = Move::new(*color, *pt, number);
            rules.put(&mv, true).unwrap();
            rules.confirm().unwrap();
        }
    }

    fn next(rules: &Rules, color: Color, pt: Point) -> Move {
        Move::new(color, pt, rules.history().len() + 1)
    }

    use Color::{Black as B, White as W};

    #[test]
    fn test_four_stones_no_capture() {
        let rules = rules();
        play(&rules, &[(B, (3, 3)), (W, (3, 4)), (B, (3, 5)), (W, (4, 4))]);
        let grid = rules.grid();
        assert_eq!(grid.count(), 4);
        assert_eq!(grid[3][3], Some(B));
        assert_eq!(grid[3][4], Some(W));
        assert_eq!(grid[3][5], Some(B));
        assert_eq!(grid[4][4], Some(W));
        let captures = rules.captures();
        assert_eq!(captures.len(), 4);
        assert!(captures.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_corner_capture() {
        let rules = rules();
        play(&rules, &[(B, (1, 0)), (W, (0, 0)), (B, (0, 1))]);
        assert_eq!(rules.stone((0, 0)), None);
        assert_eq!(rules.captures()[2], vec![Move::new(W, (0, 0), 0)]);
    }

    #[test]
    fn test_put_does_not_touch_committed_state() {
        let rules = rules();
        rules.put(&Move::new(B, (3, 3), 1), true).unwrap();
        assert_eq!(rules.stone((3, 3)), None);
        assert!(rules.is_dirty());
        rules.confirm().unwrap();
        assert_eq!(rules.stone((3, 3)), Some(B));
        assert!(!rules.is_dirty());
    }

    #[test]
    fn test_occupied() {
        let rules = rules();
        play(&rules, &[(B, (3, 3))]);
        let before = rules.grid();
        let err = rules.put(&next(&rules, W, (3, 3)), true).unwrap_err();
        assert_eq!(err, RuleError::Occupied);
        assert_eq!(rules.grid(), before);
        assert!(!rules.is_dirty());
    }

    #[test]
    fn test_off_board() {
        let rules = rules();
        assert_eq!(
            rules.put(&Move::new(B, (19, 0), 1), true),
            Err(RuleError::OffBoard((19, 0)))
        );
    }

    #[test]
    fn test_capture_then_remove_restores() {
        let rules = rules();
        // White group of two at (4,4),(4,5), surrounded by black.
        play(
            &rules,
            &[
                (B, (3, 4)),
                (W, (4, 4)),
                (B, (3, 5)),
                (W, (4, 5)),
                (B, (4, 3)),
                (W, (10, 10)),
                (B, (4, 6)),
                (W, (10, 12)),
                (B, (5, 4)),
                (W, (12, 10)),
            ],
        );
        let before = rules.grid();
        let log_len = rules.captures().len();

        let capture = next(&rules, B, (5, 5));
        rules.put(&capture, true).unwrap();
        rules.confirm().unwrap();
        assert_eq!(rules.stone((4, 4)), None);
        assert_eq!(rules.stone((4, 5)), None);
        assert_eq!(rules.captures().last().map(Vec::len), Some(2));

        rules.remove(&capture, true).unwrap();
        rules.confirm().unwrap();
        assert_eq!(rules.grid(), before);
        assert_eq!(rules.captures().len(), log_len);
    }

    /// Classic ko shape around (1, 1) / (1, 2).
    fn ko_position(rules: &Rules) {
        play(
            rules,
            &[
                (B, (0, 1)),
                (W, (0, 2)),
                (B, (1, 0)),
                (W, (1, 1)),
                (B, (2, 1)),
                (W, (2, 2)),
                (B, (10, 10)),
                (W, (1, 3)),
                (B, (1, 2)), // captures (1, 1)
            ],
        );
        assert_eq!(rules.stone((1, 1)), None);
    }

    #[test]
    fn test_ko_immediate_retake_fails() {
        let rules = rules();
        ko_position(&rules);
        let before = rules.grid();
        let err = rules.put(&next(&rules, W, (1, 1)), true).unwrap_err();
        assert_eq!(err, RuleError::Ko);
        assert_eq!(rules.grid(), before);
    }

    #[test]
    fn test_ko_retake_after_exchange_succeeds() {
        let rules = rules();
        ko_position(&rules);
        play(&rules, &[(W, (15, 15)), (B, (16, 16))]);
        rules.put(&next(&rules, W, (1, 1)), true).unwrap();
        rules.confirm().unwrap();
        assert_eq!(rules.stone((1, 1)), Some(W));
        assert_eq!(rules.stone((1, 2)), None);
    }

    #[test]
    fn test_suicide() {
        let rules = rules();
        play(
            &rules,
            &[
                (B, (4, 5)),
                (W, (0, 0)),
                (B, (6, 5)),
                (W, (0, 2)),
                (B, (5, 4)),
                (W, (0, 4)),
                (B, (5, 6)),
            ],
        );
        let before = rules.grid();
        let err = rules.put(&next(&rules, W, (5, 5)), true).unwrap_err();
        assert_eq!(err, RuleError::Suicide);
        assert_eq!(rules.grid(), before);
    }

    #[test]
    fn test_pass_takes_a_number() {
        let rules = rules();
        play(&rules, &[(B, (3, 3))]);
        rules.put(&Move::pass(W, 2), true).unwrap();
        rules.confirm().unwrap();
        play(&rules, &[(B, (4, 4))]);
        assert_eq!(rules.history().len(), 3);
        assert_eq!(rules.captures().len(), 3);
        assert_eq!(rules.grid().count(), 2);

        rules.remove(&Move::new(B, (4, 4), 3), true).unwrap();
        rules.remove(&Move::pass(W, 2), false).unwrap();
        rules.confirm().unwrap();
        assert_eq!(rules.history().len(), 1);
    }

    #[test]
    fn test_confirm_denied() {
        let rules = rules();
        assert_eq!(rules.confirm(), Err(RuleError::ConfirmationDenied));
        rules.put(&Move::new(B, (3, 3), 1), true).unwrap();
        rules.confirm().unwrap();
        assert_eq!(rules.confirm(), Err(RuleError::ConfirmationDenied));
    }

    #[test]
    fn test_remove_errors() {
        let rules = rules();
        play(&rules, &[(B, (3, 3)), (W, (4, 4))]);
        assert_eq!(
            rules.remove(&Move::new(W, (9, 9), 2), true),
            Err(RuleError::Empty)
        );
        assert_eq!(
            rules.remove(&Move::new(B, (4, 4), 2), true),
            Err(RuleError::WrongColor)
        );
        assert_eq!(
            rules.remove(&Move::new(W, (9, 9), 1), true),
            Err(RuleError::HistoryMismatch { number: 1 })
        );
        assert_eq!(
            rules.remove(&Move::new(W, (4, 4), 3), true),
            Err(RuleError::OutOfSequence { number: 3, len: 2 })
        );
        assert_eq!(
            rules.put(&Move::new(W, (4, 4), 0), true),
            Err(RuleError::Unnumbered)
        );
        assert_eq!(rules.grid().count(), 2);
    }

    #[test]
    fn test_insert_in_the_middle() {
        let rules = rules();
        play(&rules, &[(B, (3, 3)), (W, (4, 4)), (B, (5, 5))]);
        rules.put(&Move::new(W, (9, 9), 2), true).unwrap();
        rules.confirm().unwrap();

        let history = rules.history();
        let numbers: Vec<usize> = history.iter().map(|m| m.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(history[1], Move::new(W, (9, 9), 0));
        assert_eq!(history[2], Move::new(W, (4, 4), 0));
        assert_eq!(rules.grid().count(), 4);
    }

    #[test]
    fn test_remove_in_the_middle_replays_captures() {
        let rules = rules();
        // Move 2 is the white stone captured by move 5; removing move 3 keeps
        // that capture intact after replay.
        play(
            &rules,
            &[(B, (1, 0)), (W, (0, 0)), (B, (9, 9)), (W, (8, 8)), (B, (0, 1))],
        );
        assert_eq!(rules.stone((0, 0)), None);
        rules.remove(&Move::new(B, (9, 9), 3), true).unwrap();
        rules.confirm().unwrap();

        let numbers: Vec<usize> = rules.history().iter().map(|m| m.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(rules.stone((9, 9)), None);
        assert_eq!(rules.stone((0, 0)), None);
        assert_eq!(rules.captures()[3], vec![Move::new(W, (0, 0), 0)]);
    }

    #[test]
    fn test_failed_replay_resets_buffer() {
        let rules = rules();
        play(&rules, &[(B, (3, 3)), (W, (4, 4))]);
        let before = rules.grid();
        // Inserting a stone at (4, 4) before move 2 makes move 2 occupied.
        let err = rules.put(&Move::new(B, (4, 4), 2), true).unwrap_err();
        assert_eq!(err, RuleError::Occupied);
        assert_eq!(rules.grid(), before);
        assert!(!rules.is_dirty());
        assert_eq!(rules.history().len(), 2);
    }

    #[test]
    fn test_staged_chain_without_reset() {
        let rules = rules();
        rules.put(&Move::new(B, (3, 3), 1), false).unwrap();
        rules.put(&Move::new(W, (4, 4), 2), false).unwrap();
        rules.confirm().unwrap();
        assert_eq!(rules.history().len(), 2);

        rules.put(&Move::new(B, (5, 5), 3), true).unwrap();
        rules.reset();
        assert!(!rules.is_dirty());
        assert_eq!(rules.grid().count(), 2);
    }

    #[test]
    fn test_clear() {
        let rules = rules();
        play(&rules, &[(B, (3, 3))]);
        rules.clear();
        assert_eq!(rules.grid().count(), 0);
        assert!(rules.history().is_empty());
        assert_eq!(rules.confirm(), Err(RuleError::ConfirmationDenied));
    }

    #[test]
    fn test_listener_notified_on_confirm() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let rules = Rules::with_listener(
            &GoConfig::default(),
            Box::new(move |grid: &Grid| sink.lock().unwrap().push(grid.count())),
        );
        rules.put(&Move::new(B, (3, 3), 1), true).unwrap();
        assert!(seen.lock().unwrap().is_empty());
        rules.confirm().unwrap();
        play(&rules, &[(W, (4, 4))]);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_concurrent_put_confirm_pairs() {
        let rules = Arc::new(rules());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let rules = Arc::clone(&rules);
                thread::spawn(move || {
                    for i in 0..10 {
                        let _guard = rules.lock();
                        let mv = Move::new(
                            if t % 2 == 0 { B } else { W },
                            (t * 4, i),
                            rules.history().len() + 1,
                        );
                        rules.put(&mv, true).unwrap();
                        rules.confirm().unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let history = rules.history();
        assert_eq!(history.len(), 40);
        assert!(history.iter().enumerate().all(|(i, m)| m.number == i + 1));
        assert_eq!(rules.grid().count(), 40);
    }

    #[test]
    fn test_display_shows_both_grids() {
        let rules = Rules::new(&GoConfig::new(5).unwrap());
        rules.put(&Move::new(B, (0, 0), 1), true).unwrap();
        let text = rules.to_string();
        let first_row = text.lines().nth(1).unwrap();
        assert_eq!(first_row, "~ ~ ~ ~ ~   ||  B ~ ~ ~ ~ ");
    }
}

//! Random game generation.
//!
//! A playout plays random legal moves until two consecutive passes or the
//! requested game length. Games are recorded in a [`Kifu`], and every move
//! goes through a private [`Rules`] instance so that the record only holds
//! legal play.

use log::debug;

use crate::board::{Color, Grid, Point};
use crate::config::GoConfig;
use crate::kifu::Kifu;
use crate::moves::Move;
use crate::rules::Rules;

/// Play a random game of at most `moves` moves.
pub fn random_game(config: &GoConfig, moves: usize, rng: &mut fastrand::Rng) -> Kifu {
    let mut kifu = Kifu::new(config);
    let rules = Rules::new(config);
    let mut passes = 0;

    for number in 1..=moves {
        let color = kifu.next_color();
        let mv = match choose_random_move(&rules, color, number, rng) {
            Some(mv) => {
                passes = 0;
                mv
            }
            None => {
                passes += 1;
                let mv = Move::pass(color, number);
                if rules.put(&mv, true).is_err() {
                    break;
                }
                mv
            }
        };
        // The buffer still holds the move found legal above.
        if rules.confirm().is_err() {
            break;
        }
        kifu.append(&mv);
        if passes == 2 {
            break;
        }
    }
    debug!("random game of {} move(s)", rules.history().len());
    kifu
}

/// Put a random legal move that does not fill one of `color`'s own eyes.
/// The move is left in the engine's buffer.
fn choose_random_move(
    rules: &Rules,
    color: Color,
    number: usize,
    rng: &mut fastrand::Rng,
) -> Option<Move> {
    let grid = rules.grid();
    let mut candidates: Vec<Point> = (0..grid.size())
        .flat_map(|row| (0..grid.size()).map(move |col| (row, col)))
        .filter(|&pt| grid.get(pt).is_none() && !is_eye(&grid, pt, color))
        .collect();

    // Shuffle and try moves until a legal one is found
    let n = candidates.len();
    for i in 0..n {
        let j = rng.usize(i..n);
        candidates.swap(i, j);
        let mv = Move::new(color, candidates[i], number);
        if rules.put(&mv, true).is_ok() {
            return Some(mv);
        }
    }
    None
}

/// An empty point whose neighbors are all `color` stones.
pub fn is_eye(grid: &Grid, pt: Point, color: Color) -> bool {
    grid.get(pt).is_none() && grid.neighbors(pt).all(|n| grid.get(n) == Some(color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sgf;

    #[test]
    fn test_random_game_is_legal_and_numbered() {
        let config = GoConfig::new(9).unwrap();
        let mut rng = fastrand::Rng::with_seed(7);
        let kifu = random_game(&config, 60, &mut rng);
        let moves: Vec<Move> = kifu.moves().collect();
        assert!(!moves.is_empty());
        assert!(moves.len() <= 60);
        assert!(moves.iter().enumerate().all(|(i, m)| m.number == i + 1));

        // Replaying the record through a fresh engine succeeds.
        let rules = Rules::new(&config);
        for mv in &moves {
            rules.put(mv, true).unwrap();
            rules.confirm().unwrap();
        }
    }

    #[test]
    fn test_same_seed_same_game() {
        let config = GoConfig::new(7).unwrap();
        let a = random_game(&config, 30, &mut fastrand::Rng::with_seed(42));
        let b = random_game(&config, 30, &mut fastrand::Rng::with_seed(42));
        assert_eq!(a.to_string(), b.to_string());
        assert!(sgf::parse(&a.to_string()).is_ok());
    }

    #[test]
    fn test_tiny_board_ends_with_passes() {
        let config = GoConfig::new(1).unwrap();
        let kifu = random_game(&config, 10, &mut fastrand::Rng::with_seed(1));
        let moves: Vec<Move> = kifu.moves().collect();
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().all(Move::is_pass));
    }

    #[test]
    fn test_is_eye() {
        let mut grid = Grid::new(5);
        for pt in [(0, 1), (1, 0)] {
            grid.set(pt, Some(Color::Black));
        }
        assert!(is_eye(&grid, (0, 0), Color::Black));
        assert!(!is_eye(&grid, (0, 0), Color::White));
        assert!(!is_eye(&grid, (2, 2), Color::Black));
    }
}

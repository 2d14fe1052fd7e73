//! Constants for board geometry, SGF tags and application defaults.
//!
//! Nothing in here is mutable: the board size actually used by a game is
//! carried by [`GoConfig`](crate::config::GoConfig) and handed to every
//! constructor that needs it.

// =============================================================================
// Board Geometry
// =============================================================================

/// Default board size (NxN). Standard Go sizes are 9, 13, or 19.
pub const DEFAULT_SIZE: usize = 19;

/// Largest supported board, bounded by the letters of the KGS frame.
pub const MAX_SIZE: usize = KGS_LETTERS;

/// Orthogonal neighbor offsets as (row, col) deltas.
/// Order: North, South, East, West
pub const DELTA: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

// =============================================================================
// Application
// =============================================================================

/// Display name written into the root comment of new records.
pub const APP_NAME: &str = "Golib";

// =============================================================================
// SGF Property Tags
// =============================================================================

/// Black move.
pub const TAG_BLACK: &str = "B";

/// White move.
pub const TAG_WHITE: &str = "W";

/// Move number. Not part of the SGF standard, maintained on every node.
pub const TAG_NUMBER: &str = "MN";

/// Board size (root node).
pub const TAG_SIZE: &str = "SZ";

/// Free-text comment.
pub const TAG_COMMENT: &str = "C";

/// Setup properties. Kept verbatim but never interpreted.
pub const SETUP_TAGS: [&str; 3] = ["AB", "AW", "AE"];

// =============================================================================
// Coordinate Frames
// =============================================================================

/// Lowercase letter of index 0 in the SGF frame.
pub const SGF_BASE: u8 = b'a';

/// The letter skipped by the KGS display frame (avoids confusion with `J`).
pub const KGS_SKIPPED: u8 = b'I';

/// Number of row letters in the KGS frame: `A..=Z` without the skipped one.
pub const KGS_LETTERS: usize = 25;

//! Immutable game configuration.

use crate::constants::{APP_NAME, DEFAULT_SIZE, MAX_SIZE};

/// Settings fixed at the creation of a record or an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoConfig {
    /// Number of lines on the board.
    pub size: usize,
    /// Name written into the root comment of new records.
    pub app_name: String,
}

impl Default for GoConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            app_name: APP_NAME.to_string(),
        }
    }
}

impl GoConfig {
    /// Create a configuration for an NxN board.
    ///
    /// Returns `None` when `size` cannot be written with one letter per axis
    /// in every coordinate frame.
    pub fn new(size: usize) -> Option<Self> {
        if (1..=MAX_SIZE).contains(&size) {
            Some(Self {
                size,
                ..Self::default()
            })
        } else {
            None
        }
    }

    /// Same configuration, different board size.
    pub fn with_size(&self, size: usize) -> Option<Self> {
        Self::new(size).map(|c| Self {
            app_name: self.app_name.clone(),
            ..c
        })
    }
}

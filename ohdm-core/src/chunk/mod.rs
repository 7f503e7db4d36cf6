//! Primary-key windows over a staging table.
//!
//! Both the in-process scanner and the distribution planner walk a table in
//! the same sequence of half-open windows `(lower, upper]`. The first window
//! starts at `min - 1`, every window is at most `chunk_size` wide, and the last
//! one is clipped to `max`, so the sequence covers `(min - 1, max]` exactly
//! once.
//!
//! Bounds are `i128` so `min - 1` and `upper + chunk_size` never overflow for
//! 64-bit staging keys.

use std::{fmt, num::NonZeroU64};

mod planner;

pub use planner::{ChunkPlanner, DEFAULT_SEQUENTIAL_TAIL, PlanOptions, WorkItem, WorkTarget};

/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: NonZeroU64 = match NonZeroU64::new(1000) {
    Some(size) => size,
    None => NonZeroU64::MIN,
};

/// Row count and key bounds probed from one staging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    /// Number of rows in the table.
    pub count: u64,
    /// Smallest primary key.
    pub min: i128,
    /// Largest primary key.
    pub max: i128,
}

impl KeyRange {
    /// Range reported for a table without rows.
    pub const EMPTY: Self = Self {
        count: 0,
        min: 1,
        max: 0,
    };

    /// Build a range from probe results.
    #[must_use]
    pub const fn new(count: u64, min: i128, max: i128) -> Self {
        Self { count, min, max }
    }

    /// Whether the range contains no keys.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Windows of at most `chunk_size` keys covering the range.
    #[must_use]
    pub fn windows(&self, chunk_size: NonZeroU64) -> Windows {
        Windows::new(self.min, self.max, chunk_size)
    }
}

/// A half-open primary-key window `(lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    /// Exclusive lower bound.
    pub lower: i128,
    /// Inclusive upper bound.
    pub upper: i128,
    /// Whether a worker may run this window concurrently with its neighbours.
    pub parallel: bool,
}

impl ChunkWindow {
    /// A sequential window.
    #[must_use]
    pub const fn new(lower: i128, upper: i128) -> Self {
        Self {
            lower,
            upper,
            parallel: false,
        }
    }

    /// Window spanning the inclusive key range `first..=last`.
    #[must_use]
    pub const fn inclusive(first: i128, last: i128) -> Self {
        Self::new(first.saturating_sub(1), last)
    }

    /// First key inside the window.
    #[must_use]
    pub const fn first_key(&self) -> i128 {
        self.lower.saturating_add(1)
    }

    /// Last key inside the window.
    #[must_use]
    pub const fn last_key(&self) -> i128 {
        self.upper
    }

    /// Whether `key` falls inside the window.
    #[must_use]
    pub const fn contains(&self, key: i128) -> bool {
        key > self.lower && key <= self.upper
    }
}

impl fmt::Display for ChunkWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}]", self.lower, self.upper)
    }
}

/// Iterator over the sequential windows covering `(min - 1, max]`.
///
/// # Examples
/// ```
/// use std::num::NonZeroU64;
/// use ohdm_core::KeyRange;
///
/// let size = NonZeroU64::new(5).expect("non-zero");
/// let bounds: Vec<(i128, i128)> = KeyRange::new(19, 5, 23)
///     .windows(size)
///     .map(|window| (window.lower, window.upper))
///     .collect();
/// assert_eq!(bounds, [(4, 9), (9, 14), (14, 19), (19, 23)]);
/// ```
#[derive(Debug, Clone)]
pub struct Windows {
    next_lower: i128,
    max: i128,
    width: i128,
}

impl Windows {
    fn new(min: i128, max: i128, chunk_size: NonZeroU64) -> Self {
        Self {
            next_lower: min.saturating_sub(1),
            max,
            width: i128::from(chunk_size.get()),
        }
    }
}

impl Iterator for Windows {
    type Item = ChunkWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_lower >= self.max {
            return None;
        }
        let upper = self.next_lower.saturating_add(self.width).min(self.max);
        let window = ChunkWindow::new(self.next_lower, upper);
        self.next_lower = upper;
        Some(window)
    }
}

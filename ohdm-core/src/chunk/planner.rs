//! Work distribution across independent worker processes.
//!
//! The planner turns probed key ranges into [`WorkItem`]s. It performs no I/O
//! and launches nothing; callers decide how items are executed.

use std::num::NonZeroU64;

use super::{ChunkWindow, DEFAULT_CHUNK_SIZE, KeyRange};
use crate::EntityKind;

/// Default tail factor: windows closer than this many chunks to `max` run
/// sequentially.
pub const DEFAULT_SEQUENTIAL_TAIL: u64 = 5;

/// Tunables for [`ChunkPlanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Maximum window width.
    pub chunk_size: NonZeroU64,
    /// Consecutive windows allowed to run in parallel before a sequential
    /// barrier. Zero disables parallel execution.
    pub parallelism: u32,
    /// Tail factor `T`; the last `T × chunk_size` keys run sequentially.
    pub sequential_tail: u64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallelism: 0,
            sequential_tail: DEFAULT_SEQUENTIAL_TAIL,
        }
    }
}

/// Locators and process settings shared by every item of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkTarget {
    /// Staging store locator.
    pub source: String,
    /// Destination store locator.
    pub destination: String,
    /// Prefix for per-run log files; `_log` and `_err` are appended.
    pub log_prefix: String,
    /// Run workers at reduced priority.
    pub nice: bool,
}

/// One planned unit of work for a worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WorkItem {
    /// Staging store locator.
    pub source: String,
    /// Destination store locator.
    pub destination: String,
    /// Set on the first item of a run only.
    pub reset: bool,
    /// First key to process (inclusive).
    pub from: i128,
    /// Last key to process (inclusive).
    pub to: i128,
    /// Table the window belongs to.
    pub kind: EntityKind,
    /// Standard output log target.
    pub log_target: String,
    /// Error log target.
    pub error_log_target: String,
    /// Whether the item may run concurrently with its neighbours.
    pub parallel: bool,
    /// Run at reduced priority.
    pub nice: bool,
}

/// Splits key ranges into windows and schedules them.
///
/// # Examples
/// ```
/// use std::num::NonZeroU64;
/// use ohdm_core::{ChunkPlanner, EntityKind, KeyRange, PlanOptions};
///
/// let planner = ChunkPlanner::new(PlanOptions {
///     chunk_size: NonZeroU64::new(5).expect("non-zero"),
///     ..PlanOptions::default()
/// });
/// let windows = planner.plan_kind(EntityKind::Node, &KeyRange::new(19, 5, 23));
/// assert_eq!(windows.len(), 4);
/// assert!(windows.iter().all(|window| !window.parallel));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkPlanner {
    options: PlanOptions,
}

impl ChunkPlanner {
    /// Create a planner.
    #[must_use]
    pub const fn new(options: PlanOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    #[must_use]
    pub const fn options(&self) -> &PlanOptions {
        &self.options
    }

    /// Windows for one kind with their parallel flags assigned.
    #[must_use]
    pub fn plan_kind(&self, kind: EntityKind, range: &KeyRange) -> Vec<ChunkWindow> {
        let PlanOptions {
            chunk_size,
            parallelism,
            sequential_tail,
        } = self.options;
        let tail = i128::from(sequential_tail).saturating_mul(i128::from(chunk_size.get()));
        let mut counter = parallelism;

        range
            .windows(chunk_size)
            .enumerate()
            .map(|(index, mut window)| {
                let forced_sequential = index == 0
                    || kind == EntityKind::Relation
                    || range.max.saturating_sub(window.upper) < tail;
                if !forced_sequential {
                    if counter > 0 {
                        window.parallel = true;
                        counter -= 1;
                    } else {
                        counter = parallelism;
                    }
                }
                window
            })
            .collect()
    }

    /// Work items for every kind, in the order given.
    ///
    /// Only the first item of the whole run carries `reset`.
    #[must_use]
    pub fn plan(&self, ranges: &[(EntityKind, KeyRange)], target: &WorkTarget) -> Vec<WorkItem> {
        let log_target = format!("{}_log", target.log_prefix);
        let error_log_target = format!("{}_err", target.log_prefix);
        let mut items = Vec::new();
        for (kind, range) in ranges {
            for window in self.plan_kind(*kind, range) {
                items.push(WorkItem {
                    source: target.source.clone(),
                    destination: target.destination.clone(),
                    reset: items.is_empty(),
                    from: window.first_key(),
                    to: window.last_key(),
                    kind: *kind,
                    log_target: log_target.clone(),
                    error_log_target: error_log_target.clone(),
                    parallel: window.parallel,
                    nice: target.nice,
                });
            }
        }
        items
    }
}

//! Migration counters and progress cadence.
//!
//! The tracker is plain state owned by the caller and threaded through every
//! scan, so several scans can accumulate into one summary. All reporting
//! decisions are pure functions of the counters; only the elapsed time in a
//! snapshot depends on the clock.

use std::{
    fmt,
    num::NonZeroU64,
    time::{Duration, Instant},
};

use crate::EntityKind;

/// One value per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerKind<T> {
    /// Value for nodes.
    pub nodes: T,
    /// Value for ways.
    pub ways: T,
    /// Value for relations.
    pub relations: T,
}

impl<T> PerKind<T> {
    /// Value for `kind`.
    #[must_use]
    pub const fn get(&self, kind: EntityKind) -> &T {
        match kind {
            EntityKind::Node => &self.nodes,
            EntityKind::Way => &self.ways,
            EntityKind::Relation => &self.relations,
        }
    }

    /// Mutable value for `kind`.
    pub const fn get_mut(&mut self, kind: EntityKind) -> &mut T {
        match kind {
            EntityKind::Node => &mut self.nodes,
            EntityKind::Way => &mut self.ways,
            EntityKind::Relation => &mut self.relations,
        }
    }
}

impl PerKind<u64> {
    /// Sum across kinds.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.nodes
            .saturating_add(self.ways)
            .saturating_add(self.relations)
    }
}

/// How often progress is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCadence {
    /// Rows between compact progress markers.
    pub marker_every: NonZeroU64,
    /// Markers per output line.
    pub markers_per_line: NonZeroU64,
    /// Lines between full statistics dumps.
    pub lines_per_dump: NonZeroU64,
    /// Rows between era dumps; the era restarts with every kind.
    pub era_length: NonZeroU64,
}

const fn non_zero(value: u64) -> NonZeroU64 {
    match NonZeroU64::new(value) {
        Some(value) => value,
        None => NonZeroU64::MIN,
    }
}

impl Default for ProgressCadence {
    fn default() -> Self {
        Self {
            marker_every: non_zero(100),
            markers_per_line: non_zero(50),
            lines_per_dump: non_zero(10),
            era_length: non_zero(10_000),
        }
    }
}

/// Reporting due after one processed row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Emit a compact progress marker.
    pub marker: bool,
    /// End the current line of markers.
    pub line_break: bool,
    /// Report the milestone row count with a full statistics dump.
    pub milestone: bool,
    /// The era is complete; dump full statistics.
    pub era_dump: bool,
}

impl Progress {
    /// Whether nothing needs reporting.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        !(self.marker || self.line_break || self.milestone || self.era_dump)
    }
}

/// Counters for one migration run.
#[derive(Debug, Clone)]
pub struct StatsTracker {
    cadence: ProgressCadence,
    chunk_size: NonZeroU64,
    started: Instant,
    rows_read: u64,
    era_rows: u64,
    table_sizes: PerKind<Option<u64>>,
    checked: PerKind<u64>,
    imported: PerKind<u64>,
    historic: u64,
}

impl StatsTracker {
    /// Start tracking with the default cadence.
    #[must_use]
    pub fn new(chunk_size: NonZeroU64) -> Self {
        Self::with_cadence(chunk_size, ProgressCadence::default())
    }

    /// Start tracking with a custom cadence.
    #[must_use]
    pub fn with_cadence(chunk_size: NonZeroU64, cadence: ProgressCadence) -> Self {
        Self {
            cadence,
            chunk_size,
            started: Instant::now(),
            rows_read: 0,
            era_rows: 0,
            table_sizes: PerKind::default(),
            checked: PerKind::default(),
            imported: PerKind::default(),
            historic: 0,
        }
    }

    /// Note the start of a kind: record its table size and restart the era.
    pub const fn begin_kind(&mut self, kind: EntityKind, table_size: u64) {
        *self.table_sizes.get_mut(kind) = Some(table_size);
        self.era_rows = 0;
    }

    /// Count one row read and report what progress output is due.
    pub fn record_processed(&mut self) -> Progress {
        self.rows_read = self.rows_read.saturating_add(1);
        self.era_rows = self.era_rows.saturating_add(1);

        let ProgressCadence {
            marker_every,
            markers_per_line,
            lines_per_dump,
            era_length,
        } = self.cadence;
        let line = marker_every.saturating_mul(markers_per_line);
        let dump = line.saturating_mul(lines_per_dump);

        let era_dump = self.era_rows >= era_length.get();
        if era_dump {
            self.era_rows = 0;
        }
        Progress {
            marker: self.rows_read.is_multiple_of(marker_every.get()),
            line_break: self.rows_read.is_multiple_of(line.get()),
            milestone: self.rows_read.is_multiple_of(dump.get()),
            era_dump,
        }
    }

    /// Count an entity that reached the consistency check.
    pub const fn record_checked(&mut self, kind: EntityKind) {
        let slot = self.checked.get_mut(kind);
        *slot = slot.saturating_add(1);
    }

    /// Count an entity the importer accepted.
    pub const fn record_imported(&mut self, kind: EntityKind) {
        let slot = self.imported.get_mut(kind);
        *slot = slot.saturating_add(1);
    }

    /// Count an entity whose post-processing found historic information.
    pub const fn record_historic(&mut self) {
        self.historic = self.historic.saturating_add(1);
    }

    /// Rows read so far across all kinds.
    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Current summary.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            table_sizes: self.table_sizes,
            rows_read: self.rows_read,
            checked: self.checked,
            imported: self.imported,
            historic: self.historic,
            chunk_size: self.chunk_size.get(),
            elapsed: self.started.elapsed(),
        }
    }
}

/// Point-in-time summary of a [`StatsTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Probed table sizes; `None` for kinds not yet started.
    pub table_sizes: PerKind<Option<u64>>,
    /// Rows read across all kinds.
    pub rows_read: u64,
    /// Entities that reached the consistency check.
    pub checked: PerKind<u64>,
    /// Entities the importer accepted.
    pub imported: PerKind<u64>,
    /// Entities with historic information.
    pub historic: u64,
    /// Window width used for reads.
    pub chunk_size: u64,
    /// Time since tracking started.
    pub elapsed: Duration,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = |value: Option<u64>| value.map_or_else(|| "-".to_owned(), group_digits);
        writeln!(
            f,
            "tablesize: n:{},w:{},r:{}",
            size(self.table_sizes.nodes),
            size(self.table_sizes.ways),
            size(self.table_sizes.relations)
        )?;
        writeln!(
            f,
            "linesread:{} | read steps: {}",
            group_digits(self.rows_read),
            group_digits(self.chunk_size)
        )?;
        writeln!(f, "checked:  {}", Breakdown(&self.checked))?;
        write!(
            f,
            "imported: {} historic: {} | elapsed: {}",
            Breakdown(&self.imported),
            group_digits(self.historic),
            format_elapsed(self.elapsed)
        )
    }
}

struct Breakdown<'a>(&'a PerKind<u64>);

impl fmt::Display for Breakdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (n:{},w:{},r:{})",
            group_digits(self.0.total()),
            group_digits(self.0.nodes),
            group_digits(self.0.ways),
            group_digits(self.0.relations)
        )
    }
}

/// Render `value` with `.` between groups of three digits.
///
/// # Examples
/// ```
/// assert_eq!(ohdm_core::group_digits(1_234_567), "1.234.567");
/// assert_eq!(ohdm_core::group_digits(999), "999");
/// ```
#[must_use]
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let lead = digits.len().rem_euclid(3);
    let mut out = String::with_capacity(digits.len().saturating_add(digits.len().div_euclid(3)));
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && index >= lead && (index - lead).rem_euclid(3) == 0 {
            out.push('.');
        }
        out.push(digit);
    }
    out
}

fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let hours = seconds.div_euclid(3600);
    let minutes = seconds.rem_euclid(3600).div_euclid(60);
    let rest = seconds.rem_euclid(60);
    format!("{hours}:{minutes:02}:{rest:02}")
}

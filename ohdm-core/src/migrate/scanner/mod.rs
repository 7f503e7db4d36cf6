//! Windowed table scans driving assembly, resolution and import.

use std::num::NonZeroU64;

use log::{debug, error, info, trace, warn};

use crate::{
    ChunkWindow, DEFAULT_CHUNK_SIZE, Entity, EntityKind, Importer, KeyRange, Node, Progress,
    Relation, RowFilter, StagingRow, StagingStore, StatsSnapshot, StatsTracker, Way, group_digits,
};

use super::{RowError, ScanError, assemble, assemble_node, resolve};

/// Settings for a [`BatchScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Keys fetched per window.
    pub chunk_size: NonZeroU64,
    /// Row filter applied to every window.
    pub filter: RowFilter,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            filter: RowFilter::default(),
        }
    }
}

impl ScanOptions {
    /// Whether only named entities are migrated.
    #[must_use]
    pub const fn named_only(&self) -> bool {
        self.filter.named_only
    }
}

/// Result of scanning one kind during [`BatchScanner::migrate`].
#[derive(Debug)]
pub struct KindOutcome {
    /// Kind scanned.
    pub kind: EntityKind,
    /// Statistics after the kind finished, or the failure that aborted it.
    pub result: Result<StatsSnapshot, ScanError>,
}

/// Walks staging tables window by window and feeds an [`Importer`].
///
/// The scanner owns its store connection and importer. Statistics live in a
/// caller-owned [`StatsTracker`] so one tracker can span several scans.
#[derive(Debug)]
pub struct BatchScanner<S, I> {
    store: S,
    importer: I,
    options: ScanOptions,
}

impl<S, I> BatchScanner<S, I>
where
    S: StagingStore,
    I: Importer,
{
    /// Create a scanner.
    pub const fn new(store: S, importer: I, options: ScanOptions) -> Self {
        Self {
            store,
            importer,
            options,
        }
    }

    /// Options in use.
    pub const fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Staging store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Importer.
    pub const fn importer(&self) -> &I {
        &self.importer
    }

    /// Release the store and importer.
    pub fn into_parts(self) -> (S, I) {
        (self.store, self.importer)
    }

    /// Scan every typed row of `kind`.
    ///
    /// # Errors
    /// Returns [`ScanError`] when the table cannot be probed or a window
    /// cannot be read. Row failures are logged and skipped.
    pub fn scan(
        &mut self,
        kind: EntityKind,
        stats: &mut StatsTracker,
    ) -> Result<StatsSnapshot, ScanError> {
        let range = self.probe(kind)?;
        self.run(kind, range, range, stats)
    }

    /// Scan the rows of `kind` with keys in `from..=to`.
    ///
    /// The table is still probed so the range is clamped to existing keys and
    /// the table size is reported.
    ///
    /// # Errors
    /// Returns [`ScanError`] when the table cannot be probed or a window
    /// cannot be read.
    pub fn scan_range(
        &mut self,
        kind: EntityKind,
        from: i128,
        to: i128,
        stats: &mut StatsTracker,
    ) -> Result<StatsSnapshot, ScanError> {
        let table = self.probe(kind)?;
        let requested = KeyRange::new(table.count, from.max(table.min), to.min(table.max));
        self.run(kind, table, requested, stats)
    }

    /// Scan `kinds` in order.
    ///
    /// A failed kind is recorded in its outcome. With `keep_going` the
    /// remaining kinds still run; otherwise the run stops after the failure.
    pub fn migrate(
        &mut self,
        kinds: &[EntityKind],
        keep_going: bool,
        stats: &mut StatsTracker,
    ) -> Vec<KindOutcome> {
        let mut outcomes = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let result = self.scan(kind, stats);
            let failed = result.is_err();
            if let Err(err) = &result {
                error!("aborting {} migration: {err}", kind.plural());
            }
            outcomes.push(KindOutcome { kind, result });
            if failed && !keep_going {
                break;
            }
        }
        outcomes
    }

    fn probe(&mut self, kind: EntityKind) -> Result<KeyRange, ScanError> {
        self.store
            .probe(kind)
            .map_err(|source| ScanError::Probe { kind, source })
    }

    fn run(
        &mut self,
        kind: EntityKind,
        table: KeyRange,
        requested: KeyRange,
        stats: &mut StatsTracker,
    ) -> Result<StatsSnapshot, ScanError> {
        stats.begin_kind(kind, table.count);
        info!("start importing {}\n{}", kind.plural(), stats.snapshot());
        for window in requested.windows(self.options.chunk_size) {
            self.scan_window(kind, &window, stats)?;
        }
        let snapshot = stats.snapshot();
        info!("finished importing {}\n{snapshot}", kind.plural());
        Ok(snapshot)
    }

    fn scan_window(
        &mut self,
        kind: EntityKind,
        window: &ChunkWindow,
        stats: &mut StatsTracker,
    ) -> Result<(), ScanError> {
        let rows = self
            .store
            .fetch_window(kind, window, &self.options.filter)
            .map_err(|source| ScanError::Fetch {
                kind,
                window: *window,
                source,
            })?;
        trace!("{kind} window {window}: {} rows", rows.len());
        for row in rows {
            report(stats.record_processed(), stats);
            self.process_row(kind, &row, window, stats);
        }
        Ok(())
    }

    fn process_row(
        &mut self,
        kind: EntityKind,
        row: &StagingRow,
        window: &ChunkWindow,
        stats: &mut StatsTracker,
    ) {
        let entity = match assemble(row, kind) {
            Ok(entity) => entity,
            Err(err) => {
                error!(
                    "failed to process {kind} with osm_id unknown (key {} in window {window}): {err}",
                    row.key
                );
                return;
            }
        };
        let osm_id = entity.osm_id().clone();
        if let Err(err) = self.dispatch(entity, stats) {
            error!(
                "failed to process {kind} with osm_id {osm_id} (key {} in window {window}): {err}",
                row.key
            );
        }
    }

    fn dispatch(&mut self, entity: Entity, stats: &mut StatsTracker) -> Result<(), RowError> {
        match entity {
            Entity::Node(node) => self.process_node(node, stats),
            Entity::Way(way) => self.process_way(way, stats),
            Entity::Relation(relation) => self.process_relation(relation, stats),
        }
    }

    fn process_node(&mut self, node: Node, stats: &mut StatsTracker) -> Result<(), RowError> {
        stats.record_checked(EntityKind::Node);
        if !node.is_consistent() {
            warn!("node not consistent: {}", Entity::Node(node));
            return Ok(());
        }
        let named_only = self.options.named_only();
        if self
            .importer
            .import_node(&node, named_only)
            .map_err(RowError::import("import_node"))?
        {
            stats.record_imported(EntityKind::Node);
        }
        self.post_process(&Entity::Node(node), stats)
    }

    fn process_way(&mut self, mut way: Way, stats: &mut StatsTracker) -> Result<(), RowError> {
        for row in self.store.way_nodes(way.header().osm_id())? {
            way.push_node(assemble_node(&row)?);
        }
        stats.record_checked(EntityKind::Way);
        if !way.is_consistent() {
            warn!("way not consistent: {}", Entity::Way(way));
            return Ok(());
        }
        let named_only = self.options.named_only();
        if self
            .importer
            .import_way(&way, named_only)
            .map_err(RowError::import("import_way"))?
        {
            stats.record_imported(EntityKind::Way);
        }
        self.post_process(&Entity::Way(way), stats)
    }

    fn process_relation(
        &mut self,
        relation: Relation,
        stats: &mut StatsTracker,
    ) -> Result<(), RowError> {
        let resolution = resolve(&mut self.store, relation)?;
        stats.record_checked(EntityKind::Relation);
        let relation = resolution.relation;
        if !relation.is_consistent() {
            warn!("relation not consistent: {}", Entity::Relation(relation));
            return Ok(());
        }
        if !resolution.complete {
            debug!(
                "relation {} has missing members; not imported",
                relation.header().osm_id()
            );
            return Ok(());
        }
        let named_only = self.options.named_only();
        if self
            .importer
            .import_relation(&relation, named_only)
            .map_err(RowError::import("import_relation"))?
        {
            stats.record_imported(EntityKind::Relation);
            self.post_process(&Entity::Relation(relation), stats)?;
        }
        Ok(())
    }

    fn post_process(&mut self, entity: &Entity, stats: &mut StatsTracker) -> Result<(), RowError> {
        if self
            .importer
            .import_post_processing(entity, self.options.named_only())
            .map_err(RowError::import("import_post_processing"))?
        {
            stats.record_historic();
        }
        Ok(())
    }
}

fn report(progress: Progress, stats: &StatsTracker) {
    if progress.is_quiet() {
        return;
    }
    let rows = stats.rows_read();
    if progress.marker {
        trace!("{} rows read", group_digits(rows));
    }
    if progress.line_break {
        debug!("{} rows read", group_digits(rows));
    }
    if progress.milestone {
        info!("{} lines read\n{}", group_digits(rows), stats.snapshot());
    } else if progress.era_dump {
        info!("{}", stats.snapshot());
    }
}

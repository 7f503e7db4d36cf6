//! `scan` command: run the scan pipeline with a dry-run importer.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::trace;
use ohdm_core::{
    BatchScanner, Entity, EntityKind, ImportError, Importer, Node, Relation, RowFilter,
    ScanOptions, StagingStore, StatsSnapshot, StatsTracker, Way,
};
use ohdm_staging::SqliteStagingStore;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CHUNK_SIZE, ARG_FROM, ARG_KEEP_GOING, ARG_KIND, ARG_NAMED_ONLY, ARG_STAGING_DB, ARG_TO,
    CliError, ENV_SCAN_STAGING_DB, chunk_size, require_existing,
};

/// CLI arguments for the `scan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Walk the staging tables window by window, assemble and \
                 check every typed row and count the entities that would be \
                 imported. Nothing is written to the destination. Restrict \
                 the scan to one kind, and optionally a key range, to replay \
                 a planned work item.",
    about = "Dry-run the migration pipeline over a staging database"
)]
#[ortho_config(prefix = "OHDM")]
pub(crate) struct ScanArgs {
    /// Path to the SQLite staging database.
    #[arg(long = ARG_STAGING_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) staging_db: Option<Utf8PathBuf>,
    /// Scan only this kind (node, way or relation).
    #[arg(long = ARG_KIND, value_name = "kind")]
    #[serde(default)]
    pub(crate) kind: Option<EntityKind>,
    /// First primary key to scan (inclusive).
    #[arg(long = ARG_FROM, value_name = "key", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) from: Option<i64>,
    /// Last primary key to scan (inclusive).
    #[arg(long = ARG_TO, value_name = "key", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) to: Option<i64>,
    /// Only migrate entities carrying a name tag.
    #[arg(long = ARG_NAMED_ONLY, num_args = 0..=1, default_missing_value = "true")]
    #[serde(default)]
    pub(crate) named_only: Option<bool>,
    /// Rows per window (default 1000).
    #[arg(long = ARG_CHUNK_SIZE, value_name = "rows")]
    #[serde(default)]
    pub(crate) chunk_size: Option<u64>,
    /// Continue with the next kind after a kind fails.
    #[arg(long = ARG_KEEP_GOING, num_args = 0..=1, default_missing_value = "true")]
    #[serde(default)]
    pub(crate) keep_going: Option<bool>,
}

impl ScanArgs {
    pub(crate) fn into_config(self) -> Result<ScanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ScanConfig::try_from(merged)
    }
}

/// Which part of the staging data a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanSelection {
    /// Nodes, ways and relations in order.
    All,
    /// One whole table.
    Kind(EntityKind),
    /// An inclusive key range of one table.
    Range {
        kind: EntityKind,
        from: i64,
        to: i64,
    },
}

/// Resolved `scan` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanConfig {
    pub(crate) staging_db: Utf8PathBuf,
    pub(crate) selection: ScanSelection,
    pub(crate) options: ScanOptions,
    pub(crate) keep_going: bool,
}

impl ScanConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.staging_db, ARG_STAGING_DB)
    }
}

impl TryFrom<ScanArgs> for ScanConfig {
    type Error = CliError;

    fn try_from(args: ScanArgs) -> Result<Self, Self::Error> {
        let staging_db = args.staging_db.ok_or(CliError::MissingArgument {
            field: ARG_STAGING_DB,
            env: ENV_SCAN_STAGING_DB,
        })?;
        let selection = match (args.kind, args.from, args.to) {
            (None, None, None) => ScanSelection::All,
            (None, _, _) => {
                return Err(CliError::InvalidArgument {
                    field: ARG_KIND,
                    reason: "a key range needs a single kind",
                });
            }
            (Some(kind), None, None) => ScanSelection::Kind(kind),
            (Some(kind), from, to) => {
                let first = from.unwrap_or(i64::MIN);
                let last = to.unwrap_or(i64::MAX);
                if first > last {
                    return Err(CliError::InvalidArgument {
                        field: ARG_FROM,
                        reason: "must not exceed --to",
                    });
                }
                ScanSelection::Range {
                    kind,
                    from: first,
                    to: last,
                }
            }
        };
        let options = ScanOptions {
            chunk_size: chunk_size(args.chunk_size)?,
            filter: RowFilter {
                named_only: args.named_only.unwrap_or(false),
                ..RowFilter::default()
            },
        };
        Ok(Self {
            staging_db,
            selection,
            options,
            keep_going: args.keep_going.unwrap_or(false),
        })
    }
}

/// [`Importer`] that accepts every entity and writes nothing.
///
/// Statistics from a dry run show how many entities pass every check.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunImporter;

impl Importer for DryRunImporter {
    fn import_node(&mut self, node: &Node, _named_only: bool) -> Result<bool, ImportError> {
        trace!("dry run: node {}", node.header().osm_id());
        Ok(true)
    }

    fn import_way(&mut self, way: &Way, _named_only: bool) -> Result<bool, ImportError> {
        trace!("dry run: way {}", way.header().osm_id());
        Ok(true)
    }

    fn import_relation(
        &mut self,
        relation: &Relation,
        _named_only: bool,
    ) -> Result<bool, ImportError> {
        trace!("dry run: relation {}", relation.header().osm_id());
        Ok(true)
    }

    fn import_post_processing(
        &mut self,
        _entity: &Entity,
        _named_only: bool,
    ) -> Result<bool, ImportError> {
        Ok(false)
    }
}

pub(crate) fn run_scan_with(args: ScanArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let store = SqliteStagingStore::open(config.staging_db.as_std_path())?;
    let (snapshot, failure) = execute_scan(store, &config);
    writeln!(writer, "{snapshot}").map_err(CliError::WriteOutput)?;
    writer.flush().map_err(CliError::WriteOutput)?;
    failure.map_or(Ok(()), Err)
}

/// Run the selected scan and return the final statistics with the first
/// failure, if any.
pub(crate) fn execute_scan<S: StagingStore>(
    store: S,
    config: &ScanConfig,
) -> (StatsSnapshot, Option<CliError>) {
    let mut stats = StatsTracker::new(config.options.chunk_size);
    let mut scanner = BatchScanner::new(store, DryRunImporter, config.options.clone());
    let failure = match config.selection {
        ScanSelection::All => scanner
            .migrate(&EntityKind::ALL, config.keep_going, &mut stats)
            .into_iter()
            .find_map(|outcome| outcome.result.err()),
        ScanSelection::Kind(kind) => scanner.scan(kind, &mut stats).err(),
        ScanSelection::Range { kind, from, to } => scanner
            .scan_range(kind, i128::from(from), i128::from(to), &mut stats)
            .err(),
    };
    (stats.snapshot(), failure.map(CliError::from))
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ScanConfig, CliError> {
    let merged = ScanArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ScanConfig::try_from(merged)
}

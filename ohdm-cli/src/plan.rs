//! `plan` command: probe the staging tables and emit work items.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ohdm_core::{
    ChunkPlanner, DEFAULT_SEQUENTIAL_TAIL, EntityKind, KeyRange, PlanOptions, StagingStore,
    WorkItem, WorkTarget,
};
use ohdm_staging::SqliteStagingStore;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CHUNK_SIZE, ARG_DESTINATION, ARG_LOG_PREFIX, ARG_NICE, ARG_OUTPUT, ARG_PARALLELISM,
    ARG_SEQUENTIAL_TAIL, ARG_STAGING_DB, CliError, ENV_PLAN_STAGING_DB, chunk_size,
    require_existing,
};

const DEFAULT_DESTINATION: &str = "ohdm";
const DEFAULT_LOG_PREFIX: &str = "import";

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Probe the node, way and relation staging tables and print \
                 one JSON work item per key window. The first item carries \
                 reset=true; relation windows and the final windows of each \
                 table are always sequential.",
    about = "Split the staging tables into work items"
)]
#[ortho_config(prefix = "OHDM")]
pub(crate) struct PlanArgs {
    /// Path to the SQLite staging database.
    #[arg(long = ARG_STAGING_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) staging_db: Option<Utf8PathBuf>,
    /// Destination locator copied into every work item.
    #[arg(long = ARG_DESTINATION, value_name = "locator")]
    #[serde(default)]
    pub(crate) destination: Option<String>,
    /// Rows per window (default 1000).
    #[arg(long = ARG_CHUNK_SIZE, value_name = "rows")]
    #[serde(default)]
    pub(crate) chunk_size: Option<u64>,
    /// Parallel windows between two sequential ones (default 0).
    #[arg(long = ARG_PARALLELISM, value_name = "windows")]
    #[serde(default)]
    pub(crate) parallelism: Option<u32>,
    /// Chunks at the end of each table that always run sequentially.
    #[arg(long = ARG_SEQUENTIAL_TAIL, value_name = "chunks")]
    #[serde(default)]
    pub(crate) sequential_tail: Option<u64>,
    /// Prefix for the worker log and error-log targets.
    #[arg(long = ARG_LOG_PREFIX, value_name = "prefix")]
    #[serde(default)]
    pub(crate) log_prefix: Option<String>,
    /// Ask workers to run at reduced priority.
    #[arg(long = ARG_NICE, num_args = 0..=1, default_missing_value = "true")]
    #[serde(default)]
    pub(crate) nice: Option<bool>,
    /// Write the work items to a file instead of stdout.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl PlanArgs {
    pub(crate) fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Resolved `plan` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlanConfig {
    pub(crate) staging_db: Utf8PathBuf,
    pub(crate) options: PlanOptions,
    pub(crate) target: WorkTarget,
    pub(crate) output: Option<Utf8PathBuf>,
}

impl PlanConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.staging_db, ARG_STAGING_DB)
    }
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let staging_db = args.staging_db.ok_or(CliError::MissingArgument {
            field: ARG_STAGING_DB,
            env: ENV_PLAN_STAGING_DB,
        })?;
        let options = PlanOptions {
            chunk_size: chunk_size(args.chunk_size)?,
            parallelism: args.parallelism.unwrap_or_default(),
            sequential_tail: args.sequential_tail.unwrap_or(DEFAULT_SEQUENTIAL_TAIL),
        };
        let target = WorkTarget {
            source: staging_db.to_string(),
            destination: args
                .destination
                .unwrap_or_else(|| DEFAULT_DESTINATION.to_owned()),
            log_prefix: args
                .log_prefix
                .unwrap_or_else(|| DEFAULT_LOG_PREFIX.to_owned()),
            nice: args.nice.unwrap_or(false),
        };
        Ok(Self {
            staging_db,
            options,
            target,
            output: args.output,
        })
    }
}

pub(crate) fn run_plan_with(args: PlanArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let mut store = SqliteStagingStore::open(config.staging_db.as_std_path())?;
    let items = plan_work(&mut store, &config)?;
    info!("planned {} work items", items.len());
    match &config.output {
        Some(path) => {
            let mut file =
                ohdm_fs::create_utf8_file(path).map_err(|source| CliError::CreateOutput {
                    path: path.clone(),
                    source,
                })?;
            write_items(&mut file, &items)
        }
        None => write_items(writer, &items),
    }
}

/// Probe every kind and plan its windows.
pub(crate) fn plan_work<S: StagingStore>(
    store: &mut S,
    config: &PlanConfig,
) -> Result<Vec<WorkItem>, CliError> {
    let ranges = EntityKind::ALL
        .into_iter()
        .map(|kind| {
            store
                .probe(kind)
                .map(|range| (kind, range))
                .map_err(|source| CliError::Probe { kind, source })
        })
        .collect::<Result<Vec<(EntityKind, KeyRange)>, _>>()?;
    Ok(ChunkPlanner::new(config.options).plan(&ranges, &config.target))
}

fn write_items(writer: &mut dyn Write, items: &[WorkItem]) -> Result<(), CliError> {
    for item in items {
        let line = serde_json::to_string(item).map_err(CliError::SerializeWorkItem)?;
        writeln!(writer, "{line}").map_err(CliError::WriteOutput)?;
    }
    writer.flush().map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<PlanConfig, CliError> {
    let merged = PlanArgs::merge_from_layers(layers).map_err(CliError::from)?;
    PlanConfig::try_from(merged)
}

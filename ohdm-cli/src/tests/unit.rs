//! Focused unit tests covering CLI configuration and command execution.

use super::helpers::{StagingDatabase, run_capturing};
use super::*;
use crate::{
    plan::{PlanArgs, PlanConfig, plan_work},
    scan::{ScanArgs, ScanConfig, ScanSelection, execute_scan},
};
use camino::Utf8PathBuf;
use ohdm_core::{EntityKind, NAME_MARKER};
use ohdm_staging::SqliteStagingStore;
use rstest::rstest;

fn plan_args(database: &StagingDatabase) -> PlanArgs {
    PlanArgs {
        staging_db: Some(database.path().to_path_buf()),
        ..PlanArgs::default()
    }
}

fn scan_args(database: &StagingDatabase) -> ScanArgs {
    ScanArgs {
        staging_db: Some(database.path().to_path_buf()),
        ..ScanArgs::default()
    }
}

#[rstest]
fn plan_without_staging_db_errors() {
    let err = PlanConfig::try_from(PlanArgs::default()).expect_err("missing database");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_STAGING_DB);
            assert_eq!(env, ENV_PLAN_STAGING_DB);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn plan_defaults_follow_core_defaults() {
    let database = StagingDatabase::empty();
    let config = PlanConfig::try_from(plan_args(&database)).expect("config should build");
    assert_eq!(config.options.chunk_size, DEFAULT_CHUNK_SIZE);
    assert_eq!(config.options.parallelism, 0);
    assert_eq!(config.target.destination, "ohdm");
    assert_eq!(config.target.log_prefix, "import");
    assert_eq!(config.target.source, database.path().as_str());
    assert!(!config.target.nice);
}

#[rstest]
fn zero_chunk_size_is_rejected() {
    let database = StagingDatabase::empty();
    let args = ScanArgs {
        chunk_size: Some(0),
        ..scan_args(&database)
    };
    let err = ScanConfig::try_from(args).expect_err("zero chunk size");
    assert!(matches!(
        err,
        CliError::InvalidArgument {
            field: ARG_CHUNK_SIZE,
            ..
        }
    ));
}

#[rstest]
#[case(None, Some(5), None, ARG_KIND)]
#[case(Some(EntityKind::Node), Some(9), Some(3), ARG_FROM)]
fn inconsistent_scan_bounds_are_rejected(
    #[case] kind: Option<EntityKind>,
    #[case] from: Option<i64>,
    #[case] to: Option<i64>,
    #[case] expected: &'static str,
) {
    let database = StagingDatabase::empty();
    let args = ScanArgs {
        kind,
        from,
        to,
        ..scan_args(&database)
    };
    match ScanConfig::try_from(args) {
        Err(CliError::InvalidArgument { field, .. }) => assert_eq!(field, expected),
        other => panic!("expected InvalidArgument, found {other:?}"),
    }
}

#[rstest]
#[case(None, None, None, ScanSelection::All)]
#[case(Some(EntityKind::Way), None, None, ScanSelection::Kind(EntityKind::Way))]
#[case(
    Some(EntityKind::Node),
    Some(4),
    None,
    ScanSelection::Range { kind: EntityKind::Node, from: 4, to: i64::MAX }
)]
fn scan_selection_follows_flags(
    #[case] kind: Option<EntityKind>,
    #[case] from: Option<i64>,
    #[case] to: Option<i64>,
    #[case] expected: ScanSelection,
) {
    let database = StagingDatabase::empty();
    let args = ScanArgs {
        kind,
        from,
        to,
        ..scan_args(&database)
    };
    let config = ScanConfig::try_from(args).expect("config should build");
    assert_eq!(config.selection, expected);
    assert!(!config.keep_going);
    assert_eq!(config.options.filter.name_marker, NAME_MARKER);
}

#[rstest]
fn validate_sources_reports_missing_and_directory_paths() {
    let database = StagingDatabase::empty();
    let missing = PlanConfig {
        staging_db: database.root().join("missing.db"),
        ..PlanConfig::try_from(plan_args(&database)).expect("config should build")
    };
    match missing.validate_sources() {
        Err(CliError::MissingSourceFile { field, .. }) => assert_eq!(field, ARG_STAGING_DB),
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }

    let directory = ScanConfig {
        staging_db: database.root().to_path_buf(),
        ..ScanConfig::try_from(scan_args(&database)).expect("config should build")
    };
    match directory.validate_sources() {
        Err(CliError::SourcePathNotFile { path, .. }) => assert_eq!(path, database.root().to_path_buf()),
        other => panic!("expected SourcePathNotFile, found {other:?}"),
    }
}

#[rstest]
fn plan_work_probes_every_kind() {
    let database = StagingDatabase::populated(12, 2, 1);
    let args = PlanArgs {
        chunk_size: Some(5),
        parallelism: Some(2),
        sequential_tail: Some(0),
        ..plan_args(&database)
    };
    let config = PlanConfig::try_from(args).expect("config should build");
    let mut store = SqliteStagingStore::open(database.path()).expect("open staging database");

    let items = plan_work(&mut store, &config).expect("plan work");
    let bounds: Vec<_> = items.iter().map(|item| (item.kind, item.from, item.to)).collect();
    assert_eq!(
        bounds,
        [
            (EntityKind::Node, 1, 5),
            (EntityKind::Node, 6, 10),
            (EntityKind::Node, 11, 12),
            (EntityKind::Way, 1, 2),
            (EntityKind::Relation, 1, 1),
        ]
    );
    let parallel: Vec<_> = items.iter().map(|item| item.parallel).collect();
    assert_eq!(parallel, [false, true, true, false, false]);
}

#[rstest]
fn execute_scan_counts_dry_run_imports() {
    let database = StagingDatabase::populated(12, 2, 1);
    let config = ScanConfig::try_from(scan_args(&database)).expect("config should build");
    let store = SqliteStagingStore::open(database.path()).expect("open staging database");

    let (snapshot, failure) = execute_scan(store, &config);
    assert!(failure.is_none(), "unexpected failure {failure:?}");
    assert_eq!(snapshot.checked.total(), 15);
    assert_eq!(snapshot.imported.nodes, 12);
    assert_eq!(snapshot.imported.ways, 2);
    assert_eq!(snapshot.imported.relations, 1);
}

#[rstest]
fn execute_scan_replays_a_key_range() {
    let database = StagingDatabase::populated(12, 0, 0);
    let args = ScanArgs {
        kind: Some(EntityKind::Node),
        from: Some(4),
        to: Some(8),
        named_only: Some(false),
        ..scan_args(&database)
    };
    let config = ScanConfig::try_from(args).expect("config should build");
    let store = SqliteStagingStore::open(database.path()).expect("open staging database");

    let (snapshot, failure) = execute_scan(store, &config);
    assert!(failure.is_none());
    assert_eq!(snapshot.rows_read, 5);
    assert_eq!(snapshot.table_sizes.nodes, Some(12));
}

#[rstest]
fn plan_command_writes_to_output_file() {
    let database = StagingDatabase::populated(3, 0, 0);
    let output = database.root().join("plans/work.jsonl");
    let (result, stdout) = run_capturing(&[
        "plan",
        "--staging-db",
        database.path().as_str(),
        "--output",
        output.as_str(),
    ]);
    result.expect("plan succeeds");
    assert!(stdout.is_empty());
    let written = std::fs::read_to_string(&output).expect("read plan file");
    assert_eq!(written.lines().count(), 1);
}

#[rstest]
fn unknown_kind_is_rejected_by_clap() {
    let (result, _) = run_capturing(&["scan", "--staging-db", "staging.db", "--kind", "area"]);
    assert!(matches!(result, Err(CliError::ArgumentParsing(_))));
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "chunk_size": "lots" }));

    let err = crate::scan::config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let database = StagingDatabase::empty();
    let env_path = Utf8PathBuf::from("/from/env/staging.db");
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "staging_db": "/from/file/staging.db",
            "chunk_size": 250,
            "named_only": true,
        }),
        None,
    );
    composer.push_environment(json!({
        "staging_db": env_path.as_str(),
        "chunk_size": 500,
    }));
    composer.push_cli(json!({
        "staging_db": database.path().as_str(),
        "kind": "way",
    }));

    let config = crate::scan::config_from_layers_for_test(composer.layers())
        .expect("merged config should build");
    assert_eq!(config.staging_db, database.path().to_path_buf());
    assert_eq!(config.selection, ScanSelection::Kind(EntityKind::Way));
    assert_eq!(config.options.chunk_size.get(), 500);
    assert!(config.options.filter.named_only);
}

#[rstest]
fn plan_layers_fill_worker_settings() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "staging_db": "/srv/staging.db",
            "destination": "postgres://ohdm",
            "parallelism": 4,
            "nice": true,
        }),
        None,
    );
    composer.push_cli(json!({ "log_prefix": "berlin" }));

    let config = crate::plan::config_from_layers_for_test(composer.layers())
        .expect("merged config should build");
    assert_eq!(config.staging_db, Utf8PathBuf::from("/srv/staging.db"));
    assert_eq!(config.target.destination, "postgres://ohdm");
    assert_eq!(config.target.log_prefix, "berlin");
    assert_eq!(config.options.parallelism, 4);
    assert!(config.target.nice);
}

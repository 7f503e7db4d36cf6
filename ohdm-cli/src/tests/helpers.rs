//! Test helpers for building staging databases on disk.

use camino::{Utf8Path, Utf8PathBuf};
use ohdm_staging::initialise_schema;
use rusqlite::Connection;
use tempfile::TempDir;

/// A staging database inside a temporary directory.
#[derive(Debug)]
pub(super) struct StagingDatabase {
    _dir: TempDir,
    root: Utf8PathBuf,
    path: Utf8PathBuf,
}

impl StagingDatabase {
    /// An empty staging schema.
    pub(super) fn empty() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let path = root.join("staging.db");
        let mut connection = Connection::open(&path).expect("create staging database");
        initialise_schema(&mut connection).expect("create staging schema");
        Self {
            _dir: dir,
            root,
            path,
        }
    }

    /// `nodes` consistent nodes (the first two named), `ways` two-node ways
    /// and `relations` relations referencing the first node and way.
    pub(super) fn populated(nodes: u32, ways: u32, relations: u32) -> Self {
        let database = Self::empty();
        let connection = database.connect();
        for index in 1..=nodes {
            let tags = if index <= 2 { "004name0004Mitte" } else { "003ref0002A1" };
            connection
                .execute(
                    "INSERT INTO nodes (id, osm_id, classcode, serializedtags, valid, longitude, latitude)
                     VALUES (?1, ?2, 1, ?3, 1, '13.40', '52.50')",
                    (index, (100 + index).to_string(), tags),
                )
                .expect("insert node");
        }
        for index in 1..=ways {
            let way_id = (200 + index).to_string();
            connection
                .execute(
                    "INSERT INTO ways (id, osm_id, classcode, serializedtags, valid)
                     VALUES (?1, ?2, 2, '', 1)",
                    (index, &way_id),
                )
                .expect("insert way");
            for node in [2 * index - 1, 2 * index] {
                connection
                    .execute(
                        "INSERT INTO waynodes (way_id, node_id) VALUES (?1, ?2)",
                        (&way_id, (100 + node).to_string()),
                    )
                    .expect("insert way node");
            }
        }
        for index in 1..=relations {
            let relation_id = (300 + index).to_string();
            connection
                .execute(
                    "INSERT INTO relations (id, osm_id, classcode, serializedtags, valid)
                     VALUES (?1, ?2, 3, '', 1)",
                    (index, &relation_id),
                )
                .expect("insert relation");
            connection
                .execute(
                    "INSERT INTO relationmember (relation_id, role, node_id, way_id, member_rel_id)
                     VALUES (?1, '', '101', NULL, NULL), (?1, 'outer', NULL, '201', NULL)",
                    [&relation_id],
                )
                .expect("insert relation members");
        }
        database
    }

    pub(super) fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn connect(&self) -> Connection {
        Connection::open(&self.path).expect("open staging database")
    }
}

/// Run the CLI and capture stdout.
pub(super) fn run_capturing(args: &[&str]) -> (Result<(), super::CliError>, String) {
    let mut output = Vec::new();
    let invocation = std::iter::once("ohdm").chain(args.iter().copied());
    let result = super::run_from(invocation, &mut output);
    (result, String::from_utf8(output).expect("utf-8 output"))
}

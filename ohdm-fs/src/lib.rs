//! Filesystem helpers for the migration tools, built on `cap-std` and
//! `camino`.
//!
//! Paths supplied on the command line are resolved against an ambient base
//! directory (the filesystem root for absolute paths, the working directory
//! otherwise) and every further access goes through a capability handle.
#![forbid(unsafe_code)]

use std::{io, path::Component};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Report whether `path` names an existing regular file.
///
/// # Errors
/// Returns the underlying IO error, including [`io::ErrorKind::NotFound`]
/// when the parent directory or the file itself is missing.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_parent(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Create the directories leading up to `path`.
///
/// # Errors
/// Returns the underlying IO error when a directory cannot be created.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Create or truncate `path` for writing, creating missing parent
/// directories first.
///
/// # Errors
/// Returns the underlying IO error when the directories or the file cannot
/// be created.
pub fn create_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_parent(path)?;
    dir.create(name.as_str())
}

fn open_parent(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_owned();
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Split `path` into an ambient base directory and the path relative to it.
///
/// # Errors
/// Returns an IO error when the base directory cannot be opened or the
/// remainder is not UTF-8.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let (base, relative) = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR_STR);
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR_STR);
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative =
        Utf8PathBuf::from_path_buf(relative).map_err(|_| io::Error::other("non-UTF-8 path"))?;
    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::Write;
    use tempfile::TempDir;

    #[fixture]
    fn root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        (dir, root)
    }

    #[rstest]
    fn file_is_file_distinguishes_files_and_directories(root: (TempDir, Utf8PathBuf)) {
        let (_dir, path) = root;
        let database = path.join("staging.db");
        std::fs::write(&database, b"").expect("write file");

        assert!(file_is_file(&database).expect("inspect file"));
        assert!(!file_is_file(&path).expect("inspect directory"));
        let missing = file_is_file(&path.join("missing.db")).expect_err("missing file");
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }

    #[rstest]
    fn create_utf8_file_builds_missing_directories(root: (TempDir, Utf8PathBuf)) {
        let (_dir, path) = root;
        let target = path.join("plans/2026/work.jsonl");
        let mut file = create_utf8_file(&target).expect("create plan file");
        file.write_all(b"{}\n").expect("write plan");

        assert_eq!(
            std::fs::read_to_string(&target).expect("read plan"),
            "{}\n"
        );
    }

    #[rstest]
    fn base_dir_splits_absolute_paths(root: (TempDir, Utf8PathBuf)) {
        let (_dir, path) = root;
        let (_base, relative) = base_dir_and_relative(&path).expect("split path");
        assert!(!relative.is_absolute());
        assert!(path.as_str().ends_with(relative.as_str()));
    }
}

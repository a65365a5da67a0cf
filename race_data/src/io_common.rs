// Helpers shared by everything that touches the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use snafu::prelude::*;

use crate::errors::*;

/// Derives the directory name used on disk for a season or race display name.
pub fn name_to_dir(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

/// Rejects display names that cannot be turned into a single directory level.
pub(crate) fn check_name(kind: &str, name: &str) -> Result<()> {
    let bad = name.trim().is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name == ".";
    ensure!(!bad, InvalidNameSnafu { kind, name });
    Ok(())
}

pub(crate) fn parse_number(field: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .context(InvalidNumberSnafu { field, value })
}

/// A sibling of `path` used to stage content before it replaces `path`.
pub(crate) fn scratch_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

pub(crate) fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(IoSnafu { path: parent })?;
        }
    }
    fs::write(path, contents).context(IoSnafu { path })
}

pub(crate) fn move_into_place(scratch: &Path, path: &Path) -> Result<()> {
    debug!("move {} -> {}", scratch.display(), path.display());
    fs::rename(scratch, path).context(IoSnafu { path })
}

/// Replaces the content of `path` so that readers see either the old or the
/// new bytes, never a mix.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let scratch = scratch_path(path, ".tmp");
    write_file(&scratch, contents)?;
    move_into_place(&scratch, path)
}

pub(crate) fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove scratch file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_names() {
        assert_eq!(name_to_dir("Season 2024"), "season_2024");
        assert_eq!(name_to_dir("GT3 Sprint Cup"), "gt3_sprint_cup");
    }

    #[test]
    fn names_must_be_a_single_level() {
        assert!(check_name("season", "2024").is_ok());
        assert!(check_name("season", "  ").is_err());
        assert!(check_name("race", "a/b").is_err());
        assert!(check_name("race", "..").is_err());
        assert!(check_name("season", ".").is_err());
        assert!(check_name("race", "Round 1.5").is_ok());
    }

    #[test]
    fn scratch_is_a_sibling() {
        let p = scratch_path(Path::new("data/2024/entry_list.csv"), ".upload");
        assert_eq!(p, PathBuf::from("data/2024/entry_list.csv.upload"));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let p = dir.path().join("a.csv");
        write_atomic(&p, b"one").unwrap();
        write_atomic(&p, b"two").unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "two");
        assert!(!scratch_path(&p, ".tmp").exists());
    }
}

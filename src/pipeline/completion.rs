//! Filesystem-as-state completion checks.
//!
//! An output directory counts as done once it holds [`REQUIRED_VIEWS`] PNG
//! files. Contents are not validated; an interrupted run leaves fewer files
//! behind and the uid is rendered again.

use std::{fs, io, path::Path};

use crate::pipeline::poses::VIEW_COUNT;

pub const REQUIRED_VIEWS: usize = VIEW_COUNT;

/// Number of `*.png` entries directly inside `dir`; 0 if it does not exist.
pub fn count_views(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .count()
}

pub fn is_complete(dir: &Path) -> bool {
    dir.is_dir() && count_views(dir) >= REQUIRED_VIEWS
}

/// Sorted names of every subdirectory of `root`.
pub fn list_uid_dirs(root: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Sorted names of the complete subdirectories of `root`.
pub fn scan_complete(root: &Path) -> io::Result<Vec<String>> {
    Ok(list_uid_dirs(root)?
        .into_iter()
        .filter(|name| is_complete(&root.join(name)))
        .collect())
}

//! # Manifests and dataset indexes
//!
//! The input manifest is a JSON object mapping uid to asset path. It is kept
//! in a `BTreeMap` so iteration order, and therefore batch slicing, is the
//! sorted uid order.
//!
//! The two output indexes are written from a scan of the output root:
//!
//! - the annotation file `{"all": [uid, ...]}` listing complete uids
//! - a plain sorted JSON array of every uid directory

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    entries: BTreeMap<String, PathBuf>,
}

impl AssetManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn insert(&mut self, uid: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(uid.into(), path.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted uid order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(uid, path)| (uid.as_str(), path.as_path()))
    }
}

impl FromIterator<(String, PathBuf)> for AssetManifest {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Annotation<'a> {
    all: &'a [String],
}

/// Writes `{"all": uids}` pretty-printed.
pub fn write_annotation(path: &Path, uids: &[String]) -> Result<(), ManifestError> {
    write_json(path, &Annotation { all: uids })
}

/// Writes `uids` as a JSON array.
pub fn write_uid_list(path: &Path, uids: &[String]) -> Result<(), ManifestError> {
    write_json(path, &uids)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ManifestError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

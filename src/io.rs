//! File helpers: profile text exports and JSON reports.
//!
//! - `parse_profile_text`: whitespace-separated rows, last column is the sample.
//! - `read_profile_file`: parse one export from disk.
//! - `TextDirSource`: a directory of exports as a [`ProfileSource`].
//! - `write_json_file`: pretty-print a serializable value to disk.
use crate::error::ProfileError;
use crate::source::ProfileSource;
use crate::types::RowProfile;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File name suffix of the profile exports.
pub const DEFAULT_PROFILE_SUFFIX: &str = "Profile.txt";

/// Parse a profile export.
///
/// Every non-empty line that does not start with `#` holds one or more
/// numeric columns (`y` or `x y`); the last column is the sample.
pub fn parse_profile_text(id: &str, text: &str) -> Result<RowProfile, ProfileError> {
    let mut samples = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let last = line.split_whitespace().last().unwrap_or(line);
        let value: f64 = last.parse().map_err(|e| ProfileError::Source {
            id: id.to_string(),
            reason: format!("line {}: cannot parse '{last}': {e}", lineno + 1),
        })?;
        samples.push(value);
    }
    RowProfile::new(id, samples)
}

pub fn read_profile_file(path: &Path) -> Result<RowProfile, ProfileError> {
    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let text = fs::read_to_string(path).map_err(|e| ProfileError::Source {
        id: id.clone(),
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    parse_profile_text(&id, &text)
}

/// Directory of profile exports; ids are file names, sorted.
#[derive(Clone, Debug)]
pub struct TextDirSource {
    dir: PathBuf,
    suffix: String,
}

impl TextDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            suffix: DEFAULT_PROFILE_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

impl ProfileSource for TextDirSource {
    fn ids(&self) -> Result<Vec<String>, ProfileError> {
        let source_err = |reason: String| ProfileError::Source {
            id: self.dir.display().to_string(),
            reason,
        };
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| source_err(format!("failed to list directory: {e}")))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| source_err(format!("failed to read entry: {e}")))?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(&self.suffix) {
                ids.push(name);
            }
        }
        ids.sort();
        debug!(
            "TextDirSource: {} profiles matching '*{}' in {}",
            ids.len(),
            self.suffix,
            self.dir.display()
        );
        Ok(ids)
    }

    fn load(&self, id: &str) -> Result<RowProfile, ProfileError> {
        read_profile_file(&self.dir.join(id))
    }
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

//! Durable per-group read offsets.
//!
//! The table is a plain text file, one `<group> <offset>` line per group.
//! Loading never fails: a missing or unreadable file starts the harvester
//! fresh from the configured start position. Saving replaces the file
//! through a temporary sibling and a rename; failures are logged and the
//! in-memory table stays authoritative.

use harvester_core::{ConfigErrorCode, Error, Offset, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use telemetry::metrics;
use tracing::{debug, info, warn};

/// Group name to read offset.
pub type OffsetTable = BTreeMap<String, Offset>;

/// File name prefix for derived offset file locations.
pub const SINCEDB_PREFIX: &str = ".sincedb_";

/// Sub-path under the data directory holding derived offset files.
const DATA_DIR_SUBPATH: [&str; 3] = ["plugins", "inputs", "log_harvester"];

/// Environment consulted when no explicit location or data directory is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationEnv {
    /// `SINCEDB_DIR`
    pub sincedb_dir: Option<PathBuf>,
    /// `HOME`
    pub home: Option<PathBuf>,
}

impl LocationEnv {
    /// Reads `SINCEDB_DIR` and `HOME` from the process environment.
    pub fn from_process() -> Self {
        let var = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            sincedb_dir: var("SINCEDB_DIR"),
            home: var("HOME"),
        }
    }
}

/// Derived offset file name for a set of configured groups.
pub fn sincedb_file_name(groups: &[String]) -> String {
    let digest = Sha256::digest(groups.join(",").as_bytes());
    format!("{}{}", SINCEDB_PREFIX, hex::encode(digest))
}

/// Resolves the offset file location.
///
/// Precedence: explicit path, then `<data_dir>/plugins/inputs/log_harvester/`,
/// then `SINCEDB_DIR`, then `HOME`.
pub fn resolve_location(
    explicit: Option<&Path>,
    data_dir: Option<&Path>,
    env: &LocationEnv,
    groups: &[String],
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let file_name = sincedb_file_name(groups);

    if let Some(dir) = data_dir {
        let mut path = dir.to_path_buf();
        path.extend(DATA_DIR_SUBPATH);
        path.push(file_name);
        return Ok(path);
    }

    match env.sincedb_dir.as_ref().or(env.home.as_ref()) {
        Some(dir) => {
            let path = dir.join(file_name);
            info!(
                sincedb_path = %path.display(),
                log_groups = %groups.join(","),
                "No sincedb_path set, generating one based on the log groups"
            );
            Ok(path)
        }
        None => Err(Error::config(
            ConfigErrorCode::NoOffsetLocation,
            "no SINCEDB_DIR or HOME environment variable set and no sincedb_path or data_dir \
             configured; cannot decide where to keep read offsets",
        )),
    }
}

/// Parses the offset file format.
///
/// Each non-blank line is split on its first space only.
pub fn parse_table(text: &str) -> std::result::Result<OffsetTable, String> {
    let mut table = OffsetTable::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (group, offset) = line
            .split_once(' ')
            .ok_or_else(|| format!("line {}: missing offset", idx + 1))?;
        if group.is_empty() {
            return Err(format!("line {}: empty group name", idx + 1));
        }
        let offset: Offset = offset
            .trim()
            .parse()
            .map_err(|e| format!("line {}: bad offset '{}': {}", idx + 1, offset.trim(), e))?;
        table.insert(group.to_string(), offset);
    }

    Ok(table)
}

/// Renders the table in the offset file format.
pub fn serialize_table(table: &OffsetTable) -> String {
    table
        .iter()
        .map(|(group, offset)| format!("{} {}\n", group, offset))
        .collect()
}

/// Offset table persisted to a single file.
#[derive(Debug, Clone)]
pub struct OffsetStore {
    path: PathBuf,
}

impl OffsetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted table, or an empty one when there is nothing usable.
    pub fn load(&self) -> OffsetTable {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                debug!(
                    sincedb_path = %self.path.display(),
                    error = %e,
                    "No existing offsets to load"
                );
                return OffsetTable::new();
            }
        };

        match parse_table(&text) {
            Ok(table) => {
                debug!(
                    sincedb_path = %self.path.display(),
                    groups = table.len(),
                    "Loaded offsets"
                );
                table
            }
            Err(e) => {
                warn!(
                    sincedb_path = %self.path.display(),
                    error = %e,
                    "Offset file is corrupt, starting fresh"
                );
                OffsetTable::new()
            }
        }
    }

    /// Replaces the persisted table.
    pub fn try_save(&self, table: &OffsetTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, serialize_table(table))?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Replaces the persisted table, logging instead of failing.
    ///
    /// Returns whether the write succeeded.
    pub fn save(&self, table: &OffsetTable) -> bool {
        match self.try_save(table) {
            Ok(()) => {
                metrics().offset_writes.inc();
                true
            }
            Err(e) => {
                metrics().offset_write_errors.inc();
                warn!(
                    sincedb_path = %self.path.display(),
                    error = %e,
                    "Failed to write offsets, will retry on next save"
                );
                false
            }
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("sincedb"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

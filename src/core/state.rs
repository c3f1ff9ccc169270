//! DF-013: State store: resource record and compatibility snapshot.
//!
//! Writes are whole-document atomic overwrites (temp file + rename). Every
//! failure is logged and downgraded: `save*` return `false`, `load` returns
//! `None`. Nothing in here may abort a lifecycle run.

use super::error::DropformError;
use super::types::*;
use crate::tripwire::hasher;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

pub const SNAPSHOT_VERSION: u32 = 4;
pub const SNAPSHOT_TOOL_VERSION: &str = "1.0.0";
pub const SNAPSHOT_PROVIDER: &str =
    "provider[\"registry.terraform.io/digitalocean/digitalocean\"]";

/// Locations of the two persisted documents.
#[derive(Debug, Clone)]
pub struct StateStore {
    record_path: PathBuf,
    snapshot_path: PathBuf,
}

impl StateStore {
    pub fn new(record_path: impl Into<PathBuf>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            record_path: record_path.into(),
            snapshot_path: snapshot_path.into(),
        }
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Persist the resource record. Returns false (and logs) on failure.
    pub fn save(&self, record: &ResourceRecord) -> bool {
        match write_json(&self.record_path, record) {
            Ok(()) => {
                debug!(path = %self.record_path.display(), id = record.id, "resource record saved");
                true
            }
            Err(e) => {
                error!(id = record.id, "failed to save resource record: {}", e);
                false
            }
        }
    }

    /// Persist the snapshot derived from `record`. Returns false on failure.
    pub fn save_snapshot(&self, record: &ResourceRecord) -> bool {
        match write_json(&self.snapshot_path, &snapshot_from_record(record)) {
            Ok(()) => {
                debug!(path = %self.snapshot_path.display(), "state snapshot saved");
                true
            }
            Err(e) => {
                error!(id = record.id, "failed to save state snapshot: {}", e);
                false
            }
        }
    }

    /// Load the resource record. Missing, unreadable, or corrupt → None.
    pub fn load(&self) -> Option<ResourceRecord> {
        let path = &self.record_path;
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("invalid resource record {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Delete both documents. Missing files are not an error.
    /// Returns the paths actually removed.
    pub fn remove(&self) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for path in [&self.record_path, &self.snapshot_path] {
            match std::fs::remove_file(path) {
                Ok(()) => removed.push(path.clone()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("cannot remove {}: {}", path.display(), e),
            }
        }
        removed
    }
}

/// Build the compatibility snapshot from a record.
pub fn snapshot_from_record(record: &ResourceRecord) -> StateSnapshot {
    StateSnapshot {
        version: SNAPSHOT_VERSION,
        terraform_version: SNAPSHOT_TOOL_VERSION.to_string(),
        serial: 1,
        lineage: hasher::lineage(record),
        outputs: IndexMap::new(),
        resources: vec![SnapshotResource {
            mode: "managed".to_string(),
            resource_type: SUPPORTED_RESOURCE.to_string(),
            name: record.name.clone(),
            provider: SNAPSHOT_PROVIDER.to_string(),
            instances: vec![SnapshotInstance {
                schema_version: 1,
                attributes: SnapshotAttributes {
                    id: record.id.to_string(),
                    name: record.name.clone(),
                    region: record.region.clone(),
                    size: record.size.clone(),
                    image: record.image.clone(),
                    ipv4_address: record.ip.clone(),
                    status: "active".to_string(),
                    created_at: record.created_at.clone(),
                    tags: record.tags.clone(),
                },
            }],
        }],
    }
}

/// Serialize and write atomically.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DropformError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DropformError::Persistence(format!("cannot create dir {}: {}", parent.display(), e))
        })?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| DropformError::Persistence(format!("serialize error: {}", e)))?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json).map_err(|e| {
        DropformError::Persistence(format!("cannot write {}: {}", tmp_path.display(), e))
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        DropformError::Persistence(format!(
            "cannot rename {} → {}: {}",
            tmp_path.display(),
            path.display(),
            e
        ))
    })?;

    Ok(())
}

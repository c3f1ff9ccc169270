//! DF-001: Domain types.
//!
//! Configuration extracted from the DSL, the persisted resource record and
//! its compatibility snapshot, plans, outcomes, and provenance events.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The only provider identifier accepted in `provider "<name>"` blocks.
pub const SUPPORTED_PROVIDER: &str = "digitalocean";

/// The only resource kind collected from `resource "<kind>" "<name>"` blocks.
pub const SUPPORTED_RESOURCE: &str = "digitalocean_droplet";

/// Attributes a droplet resource must carry before `apply`.
pub const REQUIRED_ATTRIBUTES: [&str; 4] = ["name", "region", "size", "image"];

// ============================================================================
// Extracted configuration
// ============================================================================

/// Flat attribute map of the droplet resource, in document order.
pub type ResourceConfig = IndexMap<String, String>;

/// The provider token after reference resolution.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedToken(String);

impl ResolvedToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResolvedToken(***)")
    }
}

/// Lifecycle action selected once per invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Action {
    #[default]
    Apply,
    Destroy,
    Plan,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::Destroy => write!(f, "destroy"),
            Self::Plan => write!(f, "plan"),
        }
    }
}

// ============================================================================
// Remote API payloads
// ============================================================================

/// Body of `POST /droplets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropletSpec {
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ssh_keys: Vec<String>,
    pub backups: bool,
    pub ipv6: bool,
    pub user_data: Option<String>,
    pub private_networking: Option<bool>,
    pub volumes: Option<Vec<String>>,
    pub tags: Vec<String>,
}

impl DropletSpec {
    /// Build a create request from the four required attributes; the
    /// optional fields carry fixed empty defaults.
    pub fn from_config(config: &ResourceConfig) -> Result<Self, String> {
        let get = |key: &str| config.get(key).cloned().ok_or_else(|| key.to_string());
        Ok(Self {
            name: get("name")?,
            region: get("region")?,
            size: get("size")?,
            image: get("image")?,
            ssh_keys: vec![],
            backups: false,
            ipv6: false,
            user_data: None,
            private_networking: None,
            volumes: None,
            tags: vec![],
        })
    }
}

/// A droplet as returned by the API (only the fields we read).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Droplet {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub networks: Networks,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Networks {
    #[serde(default)]
    pub v4: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkInterface {
    pub ip_address: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Droplet {
    /// First IPv4 address on an interface of kind "public".
    pub fn public_ip(&self) -> Option<&str> {
        self.networks
            .v4
            .iter()
            .find(|n| n.kind == "public" && !n.ip_address.is_empty())
            .map(|n| n.ip_address.as_str())
    }
}

// ============================================================================
// Persisted documents
// ============================================================================

/// Authoritative record of a created droplet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: u64,
    pub ip: String,
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub created_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Compatibility snapshot in the external automation tool's on-disk format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u32,
    pub terraform_version: String,
    pub serial: u32,
    pub lineage: String,
    pub outputs: IndexMap<String, serde_json::Value>,
    pub resources: Vec<SnapshotResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResource {
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    pub instances: Vec<SnapshotInstance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInstance {
    pub schema_version: u32,
    pub attributes: SnapshotAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotAttributes {
    pub id: String,
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ipv4_address: String,
    pub status: String,
    pub created_at: String,
    pub tags: Vec<String>,
}

// ============================================================================
// Plan / outcome
// ============================================================================

/// What `apply` would do with the current configuration.
#[derive(Debug, Clone)]
pub struct DropletPlan {
    /// Label of the (last) droplet resource block
    pub label: String,

    /// Attributes that would be sent, in document order
    pub attributes: ResourceConfig,

    /// BLAKE3 fingerprint of the desired attributes
    pub fingerprint: String,

    /// Required attributes absent from the block
    pub missing: Vec<String>,

    /// Whether a resource record already exists (apply would create another)
    pub existing: Option<ResourceRecord>,
}

/// Result of one lifecycle run.
#[derive(Debug, Clone)]
pub enum Outcome {
    Planned {
        plan: DropletPlan,
        automation_ok: Option<bool>,
    },
    Applied {
        record: ResourceRecord,
        record_saved: bool,
        snapshot_saved: bool,
        automation_ok: Option<bool>,
    },
    Destroyed {
        id: u64,
        /// True only when the API accepted the delete
        deleted: bool,
        /// HTTP status of the delete; `None` on a transport failure
        status: Option<u16>,
        removed: Vec<String>,
    },
    NothingToDestroy,
}

// ============================================================================
// Provenance events
// ============================================================================

/// Provenance event for the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvenanceEvent {
    RunStarted {
        action: String,
        run_id: String,
        dropform_version: String,
    },
    DropletCreated {
        id: u64,
        name: String,
    },
    DropletReady {
        id: u64,
        ip: String,
        polls: u32,
    },
    StatePersisted {
        id: u64,
        record: bool,
        snapshot: bool,
    },
    DropletDeleted {
        id: u64,
        accepted: bool,
    },
    AutomationFinished {
        success: bool,
    },
    RunCompleted {
        action: String,
        run_id: String,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: ProvenanceEvent,
}

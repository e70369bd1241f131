//! Velero resource types
//!
//! Typed structs for the Velero resources this client touches: the Backup it
//! creates, and the VolumeSnapshotLocation and Schedule objects it looks up.
//! These implement `HasApiResource` for consistent API version handling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::duration::KubeDuration;
use crate::kube_utils::{HasApiResource, ObjectMeta};
use crate::selector::LabelSelector;

/// Default namespace Velero is installed into
pub const VELERO_NAMESPACE: &str = "velero";

/// Label Velero puts on backups created from a schedule
pub const SCHEDULE_NAME_LABEL: &str = "velero.io/schedule-name";

const VELERO_API_VERSION: &str = "velero.io/v1";

// =============================================================================
// Backup
// =============================================================================

/// Velero Backup resource
///
/// One of these is built per invocation and handed to the server; it is
/// never mutated after construction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// API version
    #[serde(default = "Backup::default_api_version")]
    pub api_version: String,
    /// Resource kind
    #[serde(default = "Backup::default_kind")]
    pub kind: String,
    /// Resource metadata
    pub metadata: ObjectMeta,
    /// Backup specification
    pub spec: BackupSpec,
}

impl HasApiResource for Backup {
    const API_VERSION: &'static str = VELERO_API_VERSION;
    const KIND: &'static str = "Backup";
}

impl Backup {
    fn default_api_version() -> String {
        <Self as HasApiResource>::API_VERSION.to_string()
    }
    fn default_kind() -> String {
        <Self as HasApiResource>::KIND.to_string()
    }

    /// Create a new Backup
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, spec: BackupSpec) -> Self {
        Self {
            api_version: Self::default_api_version(),
            kind: Self::default_kind(),
            metadata: ObjectMeta::new(name, namespace),
            spec,
        }
    }

    /// Backup name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Namespace the Backup is created in
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }
}

/// Backup spec
///
/// Also used as the template inside a Schedule. Every optional field is
/// omitted from the wire form when unset so the server applies its own
/// default; `Some(false)` is sent as an explicit `false`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// Included namespaces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespaces: Vec<String>,
    /// Excluded namespaces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_namespaces: Vec<String>,
    /// Included resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_resources: Vec<String>,
    /// Excluded resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_resources: Vec<String>,
    /// Label selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
    /// Snapshot volumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_volumes: Option<bool>,
    /// TTL before the backup is eligible for expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<KubeDuration>,
    /// Include cluster-scoped resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_cluster_resources: Option<bool>,
    /// Storage location name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    /// Volume snapshot location names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_snapshot_locations: Vec<String>,
    /// Default volumes to file-system backup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_volumes_to_fs_backup: Option<bool>,
    /// Per-kind resource order override (kind -> "ns/name,ns/name")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ordered_resources: BTreeMap<String, String>,
}

// =============================================================================
// VolumeSnapshotLocation
// =============================================================================

/// Velero VolumeSnapshotLocation resource
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotLocation {
    /// API version
    #[serde(default = "VolumeSnapshotLocation::default_api_version")]
    pub api_version: String,
    /// Resource kind
    #[serde(default = "VolumeSnapshotLocation::default_kind")]
    pub kind: String,
    /// Resource metadata
    pub metadata: ObjectMeta,
    /// Location specification
    #[serde(default)]
    pub spec: VolumeSnapshotLocationSpec,
}

impl HasApiResource for VolumeSnapshotLocation {
    const API_VERSION: &'static str = VELERO_API_VERSION;
    const KIND: &'static str = "VolumeSnapshotLocation";
}

impl VolumeSnapshotLocation {
    fn default_api_version() -> String {
        <Self as HasApiResource>::API_VERSION.to_string()
    }
    fn default_kind() -> String {
        <Self as HasApiResource>::KIND.to_string()
    }

    /// Create a new VolumeSnapshotLocation
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        spec: VolumeSnapshotLocationSpec,
    ) -> Self {
        Self {
            api_version: Self::default_api_version(),
            kind: Self::default_kind(),
            metadata: ObjectMeta::new(name, namespace),
            spec,
        }
    }
}

/// VolumeSnapshotLocation spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotLocationSpec {
    /// Snapshot provider (aws, gcp, azure, csi)
    #[serde(default)]
    pub provider: String,
    /// Provider-specific configuration
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

// =============================================================================
// Schedule
// =============================================================================

/// Velero Schedule resource
///
/// Only read here, as the source of a backup template.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// API version
    #[serde(default = "Schedule::default_api_version")]
    pub api_version: String,
    /// Resource kind
    #[serde(default = "Schedule::default_kind")]
    pub kind: String,
    /// Resource metadata
    pub metadata: ObjectMeta,
    /// Schedule specification
    pub spec: ScheduleSpec,
}

impl HasApiResource for Schedule {
    const API_VERSION: &'static str = VELERO_API_VERSION;
    const KIND: &'static str = "Schedule";
}

impl Schedule {
    fn default_api_version() -> String {
        <Self as HasApiResource>::API_VERSION.to_string()
    }
    fn default_kind() -> String {
        <Self as HasApiResource>::KIND.to_string()
    }

    /// Create a new Schedule
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, spec: ScheduleSpec) -> Self {
        Self {
            api_version: Self::default_api_version(),
            kind: Self::default_kind(),
            metadata: ObjectMeta::new(name, namespace),
            spec,
        }
    }
}

/// Schedule spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    /// Cron schedule expression
    pub schedule: String,
    /// Whether the schedule is paused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    /// Backup template
    #[serde(default)]
    pub template: BackupSpec,
}

// =============================================================================
// Tests
// =============================================================================

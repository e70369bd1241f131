//! Backup request construction
//!
//! Turns caller options into an immutable [`Backup`]. Construction is pure:
//! no remote calls, no validation of names against the cluster, and no
//! syntax checks (those happen before options are assembled).

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::duration::KubeDuration;
use crate::selector::LabelSelector;
use crate::velero::{Backup, BackupSpec, Schedule, SCHEDULE_NAME_LABEL, VELERO_NAMESPACE};

/// Default backup TTL (30 days)
pub const DEFAULT_BACKUP_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Namespace pattern meaning "every namespace"
pub const ALL_NAMESPACES: &str = "*";

/// Caller-supplied options for a single backup request.
///
/// Tri-state fields use `Option<bool>`: `None` leaves the field out of the
/// request so the server default applies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackupOptions {
    /// Backup name; a timestamp-derived name is used when unset
    pub name: Option<String>,
    /// Time to live; the configured default is used when unset
    pub ttl: Option<Duration>,
    /// Namespaces to include; `["*"]` when empty
    pub include_namespaces: Vec<String>,
    /// Namespaces to exclude
    pub exclude_namespaces: Vec<String>,
    /// Resource types to include
    pub include_resources: Vec<String>,
    /// Resource types to exclude
    pub exclude_resources: Vec<String>,
    /// Labels placed on the Backup object itself
    pub labels: BTreeMap<String, String>,
    /// Selector override; replaces the default selector whole
    pub selector: Option<LabelSelector>,
    /// Snapshot volumes
    pub snapshot_volumes: Option<bool>,
    /// Include cluster-scoped resources
    pub include_cluster_resources: Option<bool>,
    /// Back up all pod volumes with the file-system backup engine
    pub default_volumes_to_fs_backup: Option<bool>,
    /// Backup storage location name
    pub storage_location: Option<String>,
    /// Volume snapshot location names
    pub snapshot_locations: Vec<String>,
    /// Schedule whose template the backup is created from
    pub from_schedule: Option<String>,
    /// Resource order override (kind -> "ns/name,ns/name")
    pub ordered_resources: BTreeMap<String, String>,
}

/// Defaults applied where options leave a field unset.
///
/// The default selector is configuration, not a constant, so the managing
/// system's identity labels come from whoever constructs this.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDefaults {
    /// Namespace the Backup is created in
    pub namespace: String,
    /// TTL used when the options carry none
    pub ttl: Duration,
    /// Selector used when the options carry none
    pub selector: Option<LabelSelector>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            namespace: VELERO_NAMESPACE.to_string(),
            ttl: DEFAULT_BACKUP_TTL,
            selector: None,
        }
    }
}

impl RequestDefaults {
    /// Defaults targeting the given namespace
    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Set the default selector
    pub fn with_selector(mut self, selector: LabelSelector) -> Self {
        self.selector = Some(selector);
        self
    }
}

/// Timestamp-derived backup name: unix seconds as a decimal string.
pub fn generate_backup_name(now: DateTime<Utc>) -> String {
    now.timestamp().to_string()
}

impl BackupOptions {
    /// Build the Backup from these options.
    pub fn build(&self, defaults: &RequestDefaults) -> Backup {
        let include_namespaces = if self.include_namespaces.is_empty() {
            vec![ALL_NAMESPACES.to_string()]
        } else {
            self.include_namespaces.clone()
        };

        // Override replaces the default whole; the two are never merged.
        let label_selector = self
            .selector
            .clone()
            .or_else(|| defaults.selector.clone());

        let spec = BackupSpec {
            included_namespaces: include_namespaces,
            excluded_namespaces: self.exclude_namespaces.clone(),
            included_resources: self.include_resources.clone(),
            excluded_resources: self.exclude_resources.clone(),
            label_selector,
            snapshot_volumes: self.snapshot_volumes,
            ttl: Some(KubeDuration(self.ttl.unwrap_or(defaults.ttl))),
            include_cluster_resources: self.include_cluster_resources,
            storage_location: self.storage_location.clone().filter(|s| !s.is_empty()),
            volume_snapshot_locations: self.snapshot_locations.clone(),
            default_volumes_to_fs_backup: self.default_volumes_to_fs_backup,
            ordered_resources: self.ordered_resources.clone(),
        };

        let mut backup = Backup::new(self.resolved_name(), defaults.namespace.clone(), spec);
        backup.metadata = backup.metadata.with_labels(self.labels.clone());
        backup
    }

    /// Build the Backup from a Schedule's template.
    ///
    /// The spec is the template verbatim and the filter options are ignored.
    /// Labels are the schedule's, plus the schedule-name label, plus the
    /// caller's labels on top.
    pub fn build_from_schedule(&self, schedule: &Schedule, defaults: &RequestDefaults) -> Backup {
        let mut backup = Backup::new(
            self.resolved_name(),
            defaults.namespace.clone(),
            schedule.spec.template.clone(),
        );
        backup.metadata = backup
            .metadata
            .with_labels(schedule.metadata.labels.clone())
            .with_labels([(SCHEDULE_NAME_LABEL, schedule.metadata.name.as_str())])
            .with_labels(self.labels.clone());
        backup
    }

    fn resolved_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => generate_backup_name(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::velero::ScheduleSpec;
    use chrono::TimeZone;

    fn managed_selector() -> LabelSelector {
        LabelSelector::from_match_labels([
            ("app.example.dev/managed-by", "backup-tool"),
            ("app.example.dev/appid", "1234"),
            ("app.example.dev/name", "vb"),
        ])
    }

    fn defaults() -> RequestDefaults {
        RequestDefaults::default().with_selector(managed_selector())
    }

    #[test]
    fn include_namespaces_defaults_to_all() {
        let backup = BackupOptions::default().build(&defaults());
        assert_eq!(backup.spec.included_namespaces, vec!["*"]);
    }

    #[test]
    fn explicit_include_namespaces_are_kept_in_order() {
        let opts = BackupOptions {
            include_namespaces: vec!["b".into(), "a".into()],
            ..Default::default()
        };
        let backup = opts.build(&defaults());
        assert_eq!(backup.spec.included_namespaces, vec!["b", "a"]);
    }

    #[test]
    fn unset_tri_state_fields_stay_absent() {
        let backup = BackupOptions::default().build(&defaults());
        assert_eq!(backup.spec.snapshot_volumes, None);
        assert_eq!(backup.spec.include_cluster_resources, None);
        assert_eq!(backup.spec.default_volumes_to_fs_backup, None);

        let json = serde_json::to_value(&backup).unwrap();
        assert!(json["spec"].get("snapshotVolumes").is_none());
        assert!(json["spec"].get("includeClusterResources").is_none());
        assert!(json["spec"].get("defaultVolumesToFsBackup").is_none());
    }

    #[test]
    fn explicit_false_is_preserved() {
        let opts = BackupOptions {
            snapshot_volumes: Some(false),
            include_cluster_resources: Some(false),
            default_volumes_to_fs_backup: Some(true),
            ..Default::default()
        };
        let backup = opts.build(&defaults());
        assert_eq!(backup.spec.snapshot_volumes, Some(false));
        assert_eq!(backup.spec.include_cluster_resources, Some(false));
        assert_eq!(backup.spec.default_volumes_to_fs_backup, Some(true));

        let json = serde_json::to_value(&backup).unwrap();
        assert_eq!(json["spec"]["snapshotVolumes"], false);
        assert_eq!(json["spec"]["includeClusterResources"], false);
    }

    #[test]
    fn default_selector_used_when_no_override() {
        let backup = BackupOptions::default().build(&defaults());
        assert_eq!(backup.spec.label_selector, Some(managed_selector()));
    }

    #[test]
    fn override_selector_replaces_defaults_whole() {
        let override_sel = LabelSelector::parse("app=web").unwrap();
        let opts = BackupOptions {
            selector: Some(override_sel.clone()),
            ..Default::default()
        };
        let backup = opts.build(&defaults());
        let sel = backup.spec.label_selector.unwrap();
        assert_eq!(sel, override_sel);
        assert!(!sel.match_labels.contains_key("app.example.dev/managed-by"));
        assert_eq!(sel.match_labels.len(), 1);
    }

    #[test]
    fn no_selector_anywhere_leaves_field_absent() {
        let backup = BackupOptions::default().build(&RequestDefaults::default());
        assert_eq!(backup.spec.label_selector, None);
    }

    #[test]
    fn ttl_falls_back_to_thirty_days() {
        let backup = BackupOptions::default().build(&RequestDefaults::default());
        assert_eq!(backup.spec.ttl, Some(KubeDuration(DEFAULT_BACKUP_TTL)));
        assert_eq!(backup.spec.ttl.unwrap().to_string(), "720h0m0s");
    }

    #[test]
    fn generated_name_is_unix_seconds() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        assert_eq!(generate_backup_name(ts), ts.timestamp().to_string());

        let backup = BackupOptions::default().build(&defaults());
        assert!(!backup.name().is_empty());
        assert!(backup.name().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn labels_are_merged_onto_metadata() {
        let opts = BackupOptions {
            name: Some("b1".into()),
            labels: [("team".to_string(), "platform".to_string())].into(),
            ..Default::default()
        };
        let backup = opts.build(&defaults());
        assert_eq!(backup.metadata.labels["team"], "platform");
        assert_eq!(backup.metadata.labels.len(), 1);
    }

    #[test]
    fn empty_storage_location_is_dropped() {
        let opts = BackupOptions {
            storage_location: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(opts.build(&defaults()).spec.storage_location, None);
    }

    #[test]
    fn nightly_request_matches_inputs() {
        let opts = BackupOptions {
            name: Some("nightly-1".into()),
            ttl: Some(Duration::from_secs(24 * 3600)),
            include_namespaces: vec!["prod".into()],
            storage_location: Some("default".into()),
            ordered_resources: [("pods".to_string(), "prod/a,prod/b".to_string())].into(),
            ..Default::default()
        };
        let backup = opts.build(&RequestDefaults::for_namespace("backups"));

        assert_eq!(backup.name(), "nightly-1");
        assert_eq!(backup.namespace(), "backups");
        assert_eq!(backup.spec.ttl, Some(KubeDuration::from_hours(24)));
        assert_eq!(backup.spec.included_namespaces, vec!["prod"]);
        assert!(backup.spec.volume_snapshot_locations.is_empty());
        assert_eq!(backup.spec.storage_location.as_deref(), Some("default"));
        assert_eq!(backup.spec.ordered_resources["pods"], "prod/a,prod/b");
    }

    #[test]
    fn build_from_schedule_uses_template_and_labels() {
        let mut schedule = Schedule::new(
            "daily",
            "velero",
            ScheduleSpec {
                schedule: "0 2 * * *".into(),
                paused: None,
                template: BackupSpec {
                    included_namespaces: vec!["prod".into()],
                    ttl: Some(KubeDuration::from_hours(168)),
                    ..Default::default()
                },
            },
        );
        schedule
            .metadata
            .labels
            .insert("team".into(), "platform".into());

        let opts = BackupOptions {
            name: Some("daily-manual".into()),
            include_namespaces: vec!["ignored".into()],
            labels: [("team".to_string(), "sre".to_string())].into(),
            from_schedule: Some("daily".into()),
            ..Default::default()
        };
        let backup = opts.build_from_schedule(&schedule, &defaults());

        assert_eq!(backup.name(), "daily-manual");
        assert_eq!(backup.spec, schedule.spec.template);
        assert_eq!(backup.metadata.labels[SCHEDULE_NAME_LABEL], "daily");
        assert_eq!(backup.metadata.labels["team"], "sre");
    }
}

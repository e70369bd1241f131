//! `vb backup` — submit an on-demand Velero backup request.
//!
//! The command builds a Backup from flags, checks that referenced snapshot
//! locations exist, and creates it. It does not wait for the backup to run.

use std::collections::BTreeMap;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use vb_backup::duration::parse_duration;
use vb_backup::{BackupOptions, BackupSubmitter, LabelSelector, RequestDefaults, VeleroClientImpl};

use super::output::{self, OutputFormat};
use crate::config::load_config;
use crate::{Error, Result};

/// Submit a backup request
#[derive(Args, Debug, Default)]
pub struct BackupArgs {
    /// Backup name (default: current unix timestamp)
    #[arg(long)]
    pub name: Option<String>,

    /// How long before the backup can be garbage collected [default: 720h]
    #[arg(long)]
    pub ttl: Option<String>,

    /// Namespaces to include in the backup [default: *]
    #[arg(long, value_delimiter = ',')]
    pub include_namespaces: Vec<String>,

    /// Namespaces to exclude from the backup
    #[arg(long, value_delimiter = ',')]
    pub exclude_namespaces: Vec<String>,

    /// Resources to include in the backup, formatted as resource.group
    #[arg(long, value_delimiter = ',')]
    pub include_resources: Vec<String>,

    /// Resources to exclude from the backup, formatted as resource.group
    #[arg(long, value_delimiter = ',')]
    pub exclude_resources: Vec<String>,

    /// Labels to apply to the backup (key=value,...)
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Only back up resources matching this label selector
    #[arg(long, short = 'l')]
    pub selector: Option<String>,

    /// Take snapshots of PersistentVolumes (unset: server default)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub snapshot_volumes: Option<bool>,

    /// Include cluster-scoped resources (unset: server default)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub include_cluster_resources: Option<bool>,

    /// Back up all pod volumes with the file-system backup engine (unset: server default)
    #[arg(
        long = "default-volumes-to-backup-engine",
        alias = "default-volumes-to-fs-backup",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub default_volumes_to_fs_backup: Option<bool>,

    /// Backup storage location to write the backup to
    #[arg(long)]
    pub storage_location: Option<String>,

    /// Volume snapshot locations to use (must already exist)
    #[arg(long, value_delimiter = ',')]
    pub snapshot_locations: Vec<String>,

    /// Create the backup from this schedule's template
    #[arg(long)]
    pub from_schedule: Option<String>,

    /// Resource order override, e.g. "pods=ns1/a,ns1/b;persistentvolumes=pv1"
    #[arg(long)]
    pub ordered_resources: Option<String>,

    /// Namespace Velero runs in (default: from config, else "velero")
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Path to kubeconfig file (overrides resolution chain)
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Print the backup in this format instead of submitting it
    #[arg(long, short = 'o', value_enum)]
    pub output: Option<OutputFormat>,
}

impl BackupArgs {
    /// Turn raw flags into builder options.
    ///
    /// This is where every syntax error is caught; the builder accepts its
    /// input as-is.
    pub fn to_options(&self) -> Result<BackupOptions> {
        let ttl = self
            .ttl
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|e| Error::validation(e.to_string()))?;
        let selector = self
            .selector
            .as_deref()
            .map(LabelSelector::parse)
            .transpose()
            .map_err(|e| Error::validation(e.to_string()))?;
        let ordered_resources = match self.ordered_resources.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_ordered_resources(raw)?,
            _ => BTreeMap::new(),
        };

        Ok(BackupOptions {
            name: self.name.clone(),
            ttl,
            include_namespaces: non_empty(&self.include_namespaces),
            exclude_namespaces: non_empty(&self.exclude_namespaces),
            include_resources: non_empty(&self.include_resources),
            exclude_resources: non_empty(&self.exclude_resources),
            labels: parse_labels(&self.labels)?,
            selector,
            snapshot_volumes: self.snapshot_volumes,
            include_cluster_resources: self.include_cluster_resources,
            default_volumes_to_fs_backup: self.default_volumes_to_fs_backup,
            storage_location: self.storage_location.clone(),
            snapshot_locations: non_empty(&self.snapshot_locations),
            from_schedule: self.from_schedule.clone(),
            ordered_resources,
        })
    }
}

/// Run the backup command.
pub async fn run(args: BackupArgs) -> Result<()> {
    let config = load_config()?;
    let options = args.to_options()?;
    let defaults = config.request_defaults(args.namespace.as_deref());

    let client = super::resolve_kube_client(
        args.kubeconfig.as_deref(),
        args.context.as_deref(),
        &config,
    )
    .await?;
    let submitter = BackupSubmitter::new(Arc::new(VeleroClientImpl::new(client)));

    let text = execute(&submitter, &options, &defaults, args.output).await?;
    println!("{}", text);
    Ok(())
}

/// Build, validate, then print or submit. Returns the text for stdout.
pub async fn execute(
    submitter: &BackupSubmitter,
    options: &BackupOptions,
    defaults: &RequestDefaults,
    format: Option<OutputFormat>,
) -> Result<String> {
    let backup = submitter.prepare(options, defaults).await?;
    submitter.validate_snapshot_locations(&backup).await?;

    if let Some(format) = format {
        return output::render(&backup, format);
    }

    info!(
        backup = %backup.name(),
        namespace = %backup.namespace(),
        "Submitting backup request"
    );
    let handle = submitter.submit(&backup).await?;
    Ok(output::confirmation(&handle.name))
}

/// Parse `key=value` label pairs.
fn parse_labels(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut labels = BTreeMap::new();
    for pair in pairs.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        let mut parts = pair.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) if !key.trim().is_empty() => {
                labels.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                return Err(Error::validation(format!(
                    "invalid label {:?}, expected key=value",
                    pair
                )))
            }
        }
    }
    Ok(labels)
}

/// Parse `kind=ns/name,ns/name;kind2=...` into a kind -> names map.
fn parse_ordered_resources(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut ordered = BTreeMap::new();
    for entry in raw.split(';') {
        let mut parts = entry.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(order), None) if !kind.trim().is_empty() => {
                ordered.insert(kind.trim().to_string(), order.trim().to_string());
            }
            _ => {
                return Err(Error::validation(format!(
                    "invalid ordered resources entry {:?}, expected kind=ns/name,...",
                    entry
                )))
            }
        }
    }
    Ok(ordered)
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

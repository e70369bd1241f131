//! Backup submission
//!
//! Checks remote preconditions and creates the Backup. One attempt per
//! invocation, no retry, and no waiting for the backup to run: the call
//! returns as soon as the server has accepted the object.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::client::VeleroClient;
use crate::kube_utils::HasApiResource;
use crate::request::{BackupOptions, RequestDefaults};
use crate::velero::{Backup, Schedule, VolumeSnapshotLocation};
use crate::{Error, Result};

/// Identifier of a Backup accepted by the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupHandle {
    /// Backup name
    pub name: String,
    /// Namespace the Backup lives in
    pub namespace: String,
}

impl fmt::Display for BackupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Thin facade over the Velero API for submitting backup requests
#[derive(Clone)]
pub struct BackupSubmitter {
    client: Arc<dyn VeleroClient>,
}

impl BackupSubmitter {
    /// Create a submitter on top of a Velero client
    pub fn new(client: Arc<dyn VeleroClient>) -> Self {
        Self { client }
    }

    /// Build the Backup for these options.
    ///
    /// With `from_schedule` set, the named Schedule is fetched from the
    /// target namespace first and its template becomes the spec.
    pub async fn prepare(
        &self,
        options: &BackupOptions,
        defaults: &RequestDefaults,
    ) -> Result<Backup> {
        match options.from_schedule.as_deref() {
            Some(schedule_name) if !schedule_name.is_empty() => {
                let schedule = self.fetch_schedule(&defaults.namespace, schedule_name).await?;
                Ok(options.build_from_schedule(&schedule, defaults))
            }
            _ => Ok(options.build(defaults)),
        }
    }

    /// Check that every referenced VolumeSnapshotLocation exists.
    ///
    /// Lookups run in order and stop at the first missing location.
    pub async fn validate_snapshot_locations(&self, backup: &Backup) -> Result<()> {
        let namespace = backup.namespace();
        for location in &backup.spec.volume_snapshot_locations {
            debug!(location = %location, namespace = %namespace, "checking snapshot location");
            if self
                .client
                .get_snapshot_location(namespace, location)
                .await?
                .is_none()
            {
                return Err(Error::reference_not_found(
                    VolumeSnapshotLocation::KIND,
                    location.as_str(),
                    namespace,
                ));
            }
        }
        Ok(())
    }

    /// Create the Backup and return the identifier the server assigned.
    pub async fn submit(&self, backup: &Backup) -> Result<BackupHandle> {
        let created = self
            .client
            .create_backup(backup)
            .await
            .map_err(|e| Error::submission(backup.name(), e))?;

        let handle = BackupHandle {
            name: non_empty_or(&created.metadata.name, backup.name()),
            namespace: non_empty_or(&created.metadata.namespace, backup.namespace()),
        };
        info!(backup = %handle.name, namespace = %handle.namespace, "Backup request submitted");
        Ok(handle)
    }

    /// Validate references, then submit. Nothing is created if validation fails.
    pub async fn validate_and_submit(&self, backup: &Backup) -> Result<BackupHandle> {
        self.validate_snapshot_locations(backup).await?;
        self.submit(backup).await
    }

    async fn fetch_schedule(&self, namespace: &str, name: &str) -> Result<Schedule> {
        self.client
            .get_schedule(namespace, name)
            .await?
            .ok_or_else(|| Error::reference_not_found(Schedule::KIND, name, namespace))
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use kube::core::ErrorResponse;
    use mockall::predicate::eq;

    use super::*;
    use crate::client::MockVeleroClient;
    use crate::duration::KubeDuration;
    use crate::velero::{BackupSpec, ScheduleSpec, VolumeSnapshotLocationSpec};

    fn submitter(mock: MockVeleroClient) -> BackupSubmitter {
        BackupSubmitter::new(Arc::new(mock))
    }

    fn backup_with_locations(locations: &[&str]) -> Backup {
        Backup::new(
            "nightly-1",
            "velero",
            BackupSpec {
                volume_snapshot_locations: locations.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        )
    }

    fn vsl(name: &str) -> VolumeSnapshotLocation {
        VolumeSnapshotLocation::new(name, "velero", VolumeSnapshotLocationSpec::default())
    }

    fn conflict() -> Error {
        Error::Kube {
            source: kube::Error::Api(ErrorResponse {
                status: "Failure".into(),
                message: "backups.velero.io \"nightly-1\" already exists".into(),
                reason: "AlreadyExists".into(),
                code: 409,
            }),
        }
    }

    #[tokio::test]
    async fn no_snapshot_locations_makes_no_remote_calls() {
        let mut mock = MockVeleroClient::new();
        mock.expect_get_snapshot_location().never();

        let result = submitter(mock)
            .validate_snapshot_locations(&backup_with_locations(&[]))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn all_locations_present_passes() {
        let mut mock = MockVeleroClient::new();
        mock.expect_get_snapshot_location()
            .times(2)
            .returning(|_, name| Ok(Some(vsl(name))));

        let result = submitter(mock)
            .validate_snapshot_locations(&backup_with_locations(&["aws-east", "aws-west"]))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn stops_at_first_missing_location() {
        let mut mock = MockVeleroClient::new();
        mock.expect_get_snapshot_location()
            .with(eq("velero"), eq("aws-east"))
            .times(1)
            .returning(|_, _| Ok(None));
        mock.expect_get_snapshot_location()
            .with(eq("velero"), eq("aws-west"))
            .never();

        let err = submitter(mock)
            .validate_snapshot_locations(&backup_with_locations(&["aws-east", "aws-west"]))
            .await
            .unwrap_err();

        match err {
            Error::ReferenceNotFound {
                kind,
                name,
                namespace,
            } => {
                assert_eq!(kind, "VolumeSnapshotLocation");
                assert_eq!(name, "aws-east");
                assert_eq!(namespace, "velero");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_location_prevents_submission() {
        let mut mock = MockVeleroClient::new();
        mock.expect_get_snapshot_location()
            .returning(|_, _| Ok(None));
        mock.expect_create_backup().never();

        let err = submitter(mock)
            .validate_and_submit(&backup_with_locations(&["gone"]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("\"gone\""));
    }

    #[tokio::test]
    async fn lookup_failure_is_not_reported_as_missing() {
        let mut mock = MockVeleroClient::new();
        mock.expect_get_snapshot_location()
            .returning(|_, _| Err(Error::serialization("connection reset")));
        mock.expect_create_backup().never();

        let err = submitter(mock)
            .validate_and_submit(&backup_with_locations(&["aws-east"]))
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn submit_returns_server_identifier() {
        let mut mock = MockVeleroClient::new();
        mock.expect_create_backup()
            .times(1)
            .returning(|b| Ok(b.clone()));

        let opts = BackupOptions {
            name: Some("nightly-1".into()),
            ttl: Some(Duration::from_secs(24 * 3600)),
            include_namespaces: vec!["prod".into()],
            ..Default::default()
        };
        let defaults = RequestDefaults::for_namespace("velero");
        let submitter = submitter(mock);
        let backup = submitter.prepare(&opts, &defaults).await.unwrap();

        assert_eq!(backup.name(), "nightly-1");
        assert_eq!(backup.spec.ttl, Some(KubeDuration::from_hours(24)));
        assert_eq!(backup.spec.included_namespaces, vec!["prod"]);

        let handle = submitter.validate_and_submit(&backup).await.unwrap();
        assert_eq!(
            handle,
            BackupHandle {
                name: "nightly-1".into(),
                namespace: "velero".into(),
            }
        );
        assert_eq!(handle.to_string(), "velero/nightly-1");
    }

    #[tokio::test]
    async fn submit_wraps_remote_error() {
        let mut mock = MockVeleroClient::new();
        mock.expect_create_backup()
            .times(1)
            .returning(|_| Err(conflict()));

        let err = submitter(mock)
            .submit(&backup_with_locations(&[]))
            .await
            .unwrap_err();

        match &err {
            Error::Submission { name, source } => {
                assert_eq!(name, "nightly-1");
                assert!(matches!(**source, Error::Kube { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn prepare_from_schedule_fetches_template() {
        let mut mock = MockVeleroClient::new();
        mock.expect_get_schedule()
            .with(eq("velero"), eq("daily"))
            .times(1)
            .returning(|ns, name| {
                Ok(Some(Schedule::new(
                    name,
                    ns,
                    ScheduleSpec {
                        schedule: "0 2 * * *".into(),
                        paused: None,
                        template: BackupSpec {
                            included_namespaces: vec!["prod".into()],
                            ..Default::default()
                        },
                    },
                )))
            });

        let opts = BackupOptions {
            name: Some("manual".into()),
            from_schedule: Some("daily".into()),
            ..Default::default()
        };
        let backup = submitter(mock)
            .prepare(&opts, &RequestDefaults::default())
            .await
            .unwrap();
        assert_eq!(backup.spec.included_namespaces, vec!["prod"]);
        assert_eq!(
            backup.metadata.labels[crate::velero::SCHEDULE_NAME_LABEL],
            "daily"
        );
    }

    #[tokio::test]
    async fn prepare_from_missing_schedule_fails() {
        let mut mock = MockVeleroClient::new();
        mock.expect_get_schedule().returning(|_, _| Ok(None));

        let opts = BackupOptions {
            from_schedule: Some("weekly".into()),
            ..Default::default()
        };
        let err = submitter(mock)
            .prepare(&opts, &RequestDefaults::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schedule \"weekly\" not found in namespace \"velero\""
        );
    }

    #[tokio::test]
    async fn prepare_without_schedule_makes_no_remote_calls() {
        let mut mock = MockVeleroClient::new();
        mock.expect_get_schedule().never();

        let backup = submitter(mock)
            .prepare(&BackupOptions::default(), &RequestDefaults::default())
            .await
            .unwrap();
        assert_eq!(backup.spec.included_namespaces, vec!["*"]);
    }
}

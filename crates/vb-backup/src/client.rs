//! Velero API client
//!
//! Provides a trait-based abstraction over the two remote operations this
//! crate needs (lookup and create), allowing tests to mock Kubernetes
//! interactions while production code uses real API calls.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, PostParams};
use kube::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::kube_utils::HasApiResource;
use crate::velero::{Backup, Schedule, VolumeSnapshotLocation};
use crate::{Error, Result};

/// Trait abstracting Velero resource operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VeleroClient: Send + Sync {
    /// Look up a VolumeSnapshotLocation; `Ok(None)` when it does not exist
    async fn get_snapshot_location(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<VolumeSnapshotLocation>>;

    /// Look up a Schedule; `Ok(None)` when it does not exist
    async fn get_schedule(&self, namespace: &str, name: &str) -> Result<Option<Schedule>>;

    /// Create a Backup and return the object the server stored
    ///
    /// A plain create, so an existing Backup with the same name is a conflict
    /// rather than an update.
    async fn create_backup(&self, backup: &Backup) -> Result<Backup>;
}

/// Real Velero client implementation using DynamicObject for the CRDs
pub struct VeleroClientImpl {
    client: Client,
}

impl VeleroClientImpl {
    /// Create a new VeleroClientImpl
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<T: HasApiResource>(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &T::api_resource())
    }

    async fn get_typed<T>(&self, namespace: &str, name: &str) -> Result<Option<T>>
    where
        T: HasApiResource + DeserializeOwned,
    {
        match self.api::<T>(namespace).get(name).await {
            Ok(obj) => from_dynamic::<T>(obj).map(Some),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(kind = T::KIND, name = %name, namespace = %namespace, "not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl VeleroClient for VeleroClientImpl {
    async fn get_snapshot_location(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<VolumeSnapshotLocation>> {
        self.get_typed(namespace, name).await
    }

    async fn get_schedule(&self, namespace: &str, name: &str) -> Result<Option<Schedule>> {
        self.get_typed(namespace, name).await
    }

    async fn create_backup(&self, backup: &Backup) -> Result<Backup> {
        let obj = to_dynamic(backup)?;
        let created = self
            .api::<Backup>(backup.namespace())
            .create(&PostParams::default(), &obj)
            .await?;
        from_dynamic(created)
    }
}

/// Convert a typed Velero resource into a DynamicObject
pub(crate) fn to_dynamic<T>(resource: &T) -> Result<DynamicObject>
where
    T: serde::Serialize + HasApiResource,
{
    let value = serde_json::to_value(resource).map_err(|e| {
        Error::serialization_for(T::KIND, format!("failed to serialize: {}", e))
    })?;
    serde_json::from_value(value)
        .map_err(|e| Error::serialization_for(T::KIND, format!("invalid object: {}", e)))
}

/// Convert a DynamicObject returned by the server into a typed Velero resource
pub(crate) fn from_dynamic<T>(obj: DynamicObject) -> Result<T>
where
    T: DeserializeOwned + HasApiResource,
{
    let value = serde_json::to_value(obj).map_err(|e| {
        Error::serialization_for(T::KIND, format!("failed to read response: {}", e))
    })?;
    serde_json::from_value(value)
        .map_err(|e| Error::serialization_for(T::KIND, format!("unexpected shape: {}", e)))
}

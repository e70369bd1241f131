//! Kubernetes helpers shared by the Velero resource types and the client
//!
//! Velero types are not compiled into k8s-openapi, so they are addressed
//! through `DynamicObject` with an `ApiResource` derived from constants on
//! each type.

use std::collections::BTreeMap;

use kube::api::ApiResource;

// =============================================================================
// ObjectMeta
// =============================================================================

/// Minimal Kubernetes metadata for the Velero resources this crate writes.
///
/// Unlike `k8s_openapi`'s `ObjectMeta`, name and namespace are required, so a
/// built request cannot be missing either.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,
    /// Resource namespace
    #[serde(default)]
    pub namespace: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Create metadata with no labels or annotations
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// Merge labels onto the metadata; later values win on key collisions
    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

// =============================================================================
// HasApiResource Trait
// =============================================================================

/// Trait for types that have a known API group, version, and kind.
///
/// # Example
/// ```ignore
/// impl HasApiResource for Backup {
///     const API_VERSION: &'static str = "velero.io/v1";
///     const KIND: &'static str = "Backup";
/// }
///
/// let ar = Backup::api_resource();
/// ```
pub trait HasApiResource {
    /// Full API version (e.g., "velero.io/v1")
    const API_VERSION: &'static str;
    /// Resource kind (e.g., "Backup")
    const KIND: &'static str;

    /// Build an ApiResource from the type's constants.
    fn api_resource() -> ApiResource {
        build_api_resource(Self::API_VERSION, Self::KIND)
    }
}

/// Build an ApiResource from a known apiVersion and kind.
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Split an apiVersion into (group, version). Core types have an empty group.
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Lowercase plural resource name for a kind.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_version_grouped() {
        assert_eq!(
            parse_api_version("velero.io/v1"),
            ("velero.io".to_string(), "v1".to_string())
        );
    }

    #[test]
    fn test_parse_api_version_core() {
        assert_eq!(
            parse_api_version("v1"),
            (String::new(), "v1".to_string())
        );
    }

    #[test]
    fn test_pluralize_velero_kinds() {
        assert_eq!(pluralize_kind("Backup"), "backups");
        assert_eq!(pluralize_kind("Schedule"), "schedules");
        assert_eq!(
            pluralize_kind("VolumeSnapshotLocation"),
            "volumesnapshotlocations"
        );
        assert_eq!(pluralize_kind("NetworkPolicy"), "networkpolicies");
        assert_eq!(pluralize_kind("Gateway"), "gateways");
    }

    #[test]
    fn test_build_api_resource() {
        let ar = build_api_resource("velero.io/v1", "Backup");
        assert_eq!(ar.group, "velero.io");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.api_version, "velero.io/v1");
        assert_eq!(ar.plural, "backups");
    }

    #[test]
    fn test_with_labels_later_values_win() {
        let meta = ObjectMeta::new("b", "velero")
            .with_labels([("team", "a"), ("env", "prod")])
            .with_labels([("team", "b")]);
        assert_eq!(meta.labels.get("team").map(String::as_str), Some("b"));
        assert_eq!(meta.labels.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_empty_labels_not_serialized() {
        let json = serde_json::to_string(&ObjectMeta::new("b", "velero")).unwrap();
        assert!(!json.contains("labels"));
        assert!(!json.contains("annotations"));
    }
}

//! Application Custom Resource Definition
//!
//! An `Application` in `ops.csas.cz` is the tenant-facing request for an Argo
//! CD Application. Tenants declare what to deploy; the operator decides where
//! the Argo CD object lives and which project and destination it uses.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    ApplicationSource, Condition, Info, ObjectReference, ResourceIgnoreDifferences, SyncPolicy,
};

/// Specification for an Application
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ops.csas.cz",
    version = "v1alpha1",
    kind = "Application",
    plural = "applications",
    status = "ApplicationStatus",
    derive = "PartialEq",
    namespaced,
    printcolumn = r#"{"name":"Available","type":"string","jsonPath":".status.conditions[?(@.type==\"Available\")].status"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.conditions[?(@.type==\"Available\")].reason"}"#,
    printcolumn = r#"{"name":"Repo","type":"string","jsonPath":".spec.source.repoURL"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Where the manifests come from
    pub source: ApplicationSource,

    /// Sync behaviour passed through to Argo CD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_policy: Option<SyncPolicy>,

    /// Resource fields Argo CD should ignore when diffing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_differences: Vec<ResourceIgnoreDifferences>,

    /// Extra information shown in the Argo CD UI
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<Info>,
}

/// Status for an Application
///
/// Both lists are always serialized. Status is written with a merge patch,
/// and an omitted list would leave the previous value in place.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    /// Conditions representing the application state
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Objects created on behalf of this application
    #[serde(default)]
    pub references: Vec<ObjectReference>,
}

impl ApplicationStatus {
    /// Find a condition by type
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}

impl Application {
    /// Returns true once the API server has marked this object for deletion
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Returns true if the given finalizer is present
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == finalizer))
    }
}

//! Argo CD Application resource
//!
//! Only the `spec` subset this operator writes is modelled. Argo CD owns the
//! object's `status` and `operation` fields; they are not part of this type
//! and are never sent back to the API server.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    ApplicationDestination, ApplicationSource, Info, ResourceIgnoreDifferences, SyncPolicy,
};

/// Argo CD Application spec as written by the operator
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "argoproj.io",
    version = "v1alpha1",
    kind = "Application",
    root = "ArgoApplication",
    derive = "PartialEq",
    plural = "applications",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ArgoApplicationSpec {
    /// Where the manifests come from
    pub source: ApplicationSource,

    /// Cluster and namespace to deploy into
    pub destination: ApplicationDestination,

    /// Argo CD project the application belongs to
    #[serde(default)]
    pub project: String,

    /// Sync behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_policy: Option<SyncPolicy>,

    /// Resource fields ignored when diffing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_differences: Vec<ResourceIgnoreDifferences>,

    /// Extra information shown in the Argo CD UI
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<Info>,

    /// Number of deployed revisions Argo CD keeps in history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_history_limit: Option<i64>,
}

/// apiVersion written into status references for Argo CD Applications
pub const ARGO_API_VERSION: &str = "argoproj.io/v1alpha1";

/// Kind written into status references for Argo CD Applications
pub const ARGO_KIND: &str = "Application";

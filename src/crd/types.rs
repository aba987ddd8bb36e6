//! Supporting types shared by the owner and Argo CD Application CRDs
//!
//! The deployment-source descriptor, sync policy, diff-ignore rules and info
//! entries mirror Argo CD's `v1alpha1` shapes. The operator copies them
//! verbatim from owner to target and never interprets them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Schema for free-form nested objects (helm values, kustomize options, ...)
///
/// Kubernetes structural schemas reject an untyped `{}` schema, so opaque
/// payloads are declared as objects that preserve unknown fields.
pub(crate) fn preserve_unknown_fields(
    _gen: &mut schemars::gen::SchemaGenerator,
) -> schemars::schema::Schema {
    let mut extensions = schemars::Map::new();
    extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    schemars::schema::Schema::Object(schemars::schema::SchemaObject {
        instance_type: Some(schemars::schema::InstanceType::Object.into()),
        extensions,
        ..Default::default()
    })
}

/// Location of the manifests to deploy (git or helm repository)
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSource {
    /// Repository URL (git or helm)
    #[serde(rename = "repoURL")]
    pub repo_url: String,

    /// Directory path within the repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Revision to sync to (branch, tag, commit or chart version)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_revision: Option<String>,

    /// Helm chart name, for helm repositories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,

    /// Helm-specific options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub helm: Option<serde_json::Value>,

    /// Kustomize-specific options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub kustomize: Option<serde_json::Value>,

    /// Plain directory options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub directory: Option<serde_json::Value>,

    /// Config management plugin options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub plugin: Option<serde_json::Value>,
}

/// When and how Argo CD performs a sync
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncPolicy {
    /// Automated sync settings; manual sync when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automated: Option<SyncPolicyAutomated>,

    /// Sync options such as `CreateNamespace=true`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_options: Vec<String>,

    /// Retry strategy for failed syncs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub retry: Option<serde_json::Value>,
}

/// Automated sync behaviour
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncPolicyAutomated {
    /// Delete resources that are no longer defined in git
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub prune: bool,

    /// Revert live changes made outside of git
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub self_heal: bool,

    /// Allow syncing an application down to zero resources
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_empty: bool,
}

/// Resource fields Argo CD ignores when computing diffs
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIgnoreDifferences {
    /// API group of the matched resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Kind of the matched resources
    pub kind: String,

    /// Name of a single matched resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Namespace of the matched resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// JSON pointers to ignore
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub json_pointers: Vec<String>,

    /// jq path expressions to ignore
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jq_path_expressions: Vec<String>,
}

/// Informational key/value entry shown in the Argo CD UI
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Info {
    /// Entry label
    pub name: String,
    /// Entry value (URL, email address or plain text)
    pub value: String,
}

/// Cluster and namespace an Argo CD Application deploys into
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ApplicationDestination {
    /// Kubernetes API server URL of the destination cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Namespace the manifests are deployed into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., Available)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// True if both conditions say the same thing, ignoring the timestamp
    pub fn same_state(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Lightweight pointer to an object the operator created
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// API version of the referenced object
    pub api_version: String,
    /// Kind of the referenced object
    pub kind: String,
    /// Name of the referenced object
    pub name: String,
    /// Namespace of the referenced object
    pub namespace: String,
}

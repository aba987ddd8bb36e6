//! Ownership labels linking an Argo CD Application to its owner
//!
//! The owner's identity is written into five labels on the target. A target
//! belongs to an owner exactly when all five match. These keys are a wire
//! contract: existing clusters carry them, so they must never change.

use std::collections::BTreeMap;

use kube::{Resource, ResourceExt};

use crate::crd::{Application, ArgoApplication};

/// Label carrying the owner's API group
pub const LABEL_OWNER_API_GROUP: &str = "application.ops.csas.cz/owner-apiGroup";
/// Label carrying the owner's API version
pub const LABEL_OWNER_API_VERSION: &str = "application.ops.csas.cz/owner-apiVersion";
/// Label carrying the owner's kind
pub const LABEL_OWNER_KIND: &str = "application.ops.csas.cz/owner-kind";
/// Label carrying the owner's namespace
pub const LABEL_OWNER_NAMESPACE: &str = "application.ops.csas.cz/owner-namespace";
/// Label carrying the owner's name
pub const LABEL_OWNER_NAME: &str = "application.ops.csas.cz/owner-name";
/// Standard label naming the managing operator
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Labels that must match for a target to count as owned
pub const OWNERSHIP_LABELS: [&str; 5] = [
    LABEL_OWNER_API_GROUP,
    LABEL_OWNER_API_VERSION,
    LABEL_OWNER_KIND,
    LABEL_OWNER_NAMESPACE,
    LABEL_OWNER_NAME,
];

/// Labels identifying `owner` on the objects created for it
///
/// `managed-by` is only added when an operator name is configured.
pub fn labels_for(owner: &Application, operator_name: Option<&str>) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::from([
        (
            LABEL_OWNER_API_GROUP.to_string(),
            Application::group(&()).to_string(),
        ),
        (
            LABEL_OWNER_API_VERSION.to_string(),
            Application::version(&()).to_string(),
        ),
        (
            LABEL_OWNER_KIND.to_string(),
            Application::kind(&()).to_string(),
        ),
        (
            LABEL_OWNER_NAMESPACE.to_string(),
            owner.namespace().unwrap_or_default(),
        ),
        (LABEL_OWNER_NAME.to_string(), owner.name_any()),
    ]);

    if let Some(name) = operator_name.filter(|n| !n.is_empty()) {
        labels.insert(LABEL_MANAGED_BY.to_string(), name.to_string());
    }

    labels
}

/// Whether `target` carries the ownership labels of `owner`
pub fn is_owned_by(target: &ArgoApplication, owner: &Application) -> bool {
    let expected = labels_for(owner, None);
    let actual = target.labels();
    OWNERSHIP_LABELS
        .iter()
        .all(|key| actual.get(*key) == expected.get(*key))
}

/// Decode the owner identity `(namespace, name)` from a target's labels
///
/// Returns `None` unless group, version and kind name this operator's owner
/// type and both namespace and name are present.
pub fn owner_key_from_labels(labels: &BTreeMap<String, String>) -> Option<(String, String)> {
    let matches = |key: &str, want: &str| labels.get(key).is_some_and(|v| v == want);
    if !matches(LABEL_OWNER_API_GROUP, &Application::group(&()))
        || !matches(LABEL_OWNER_API_VERSION, &Application::version(&()))
        || !matches(LABEL_OWNER_KIND, &Application::kind(&()))
    {
        return None;
    }

    let namespace = labels.get(LABEL_OWNER_NAMESPACE).filter(|v| !v.is_empty())?;
    let name = labels.get(LABEL_OWNER_NAME).filter(|v| !v.is_empty())?;
    Some((namespace.clone(), name.clone()))
}

//! Derive the desired Argo CD Application from an owner
//!
//! Projection is pure: the same owner and configuration always produce the
//! same target. Tenants control the source and sync behaviour; destination
//! and project are fixed by the owner's namespace so a tenant cannot deploy
//! outside it.

use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::config::OperatorConfig;
use crate::crd::{
    Application, ApplicationDestination, ArgoApplication, ArgoApplicationSpec, ObjectReference,
    ARGO_API_VERSION, ARGO_KIND,
};
use crate::ownership::labels_for;

/// Name of the Argo CD Application derived for `owner`
///
/// `{namespace}-{name}`, unless the owner name already starts with that
/// prefix, so the namespace is never repeated.
pub fn target_name(owner: &Application) -> String {
    let namespace = owner.namespace().unwrap_or_default();
    let name = owner.name_any();
    let prefix = format!("{namespace}-");
    if name.starts_with(&prefix) {
        name
    } else {
        format!("{prefix}{name}")
    }
}

/// Reference to the Argo CD Application derived for `owner`
pub fn target_ref(owner: &Application, config: &OperatorConfig) -> ObjectReference {
    ObjectReference {
        api_version: ARGO_API_VERSION.to_string(),
        kind: ARGO_KIND.to_string(),
        name: target_name(owner),
        namespace: config.target_namespace.clone(),
    }
}

/// Build the desired Argo CD Application for `owner`
pub fn project(owner: &Application, config: &OperatorConfig) -> ArgoApplication {
    let owner_namespace = owner.namespace().unwrap_or_default();

    ArgoApplication {
        metadata: ObjectMeta {
            name: Some(target_name(owner)),
            namespace: Some(config.target_namespace.clone()),
            labels: Some(labels_for(owner, config.operator_name.as_deref())),
            ..Default::default()
        },
        spec: ArgoApplicationSpec {
            source: owner.spec.source.clone(),
            destination: ApplicationDestination {
                server: Some(config.destination_server.clone()),
                namespace: Some(owner_namespace.clone()),
            },
            project: owner_namespace,
            sync_policy: owner.spec.sync_policy.clone(),
            ignore_differences: owner.spec.ignore_differences.clone(),
            info: owner.spec.info.clone(),
            revision_history_limit: None,
        },
    }
}

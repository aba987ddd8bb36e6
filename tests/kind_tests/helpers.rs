//! Shared setup for the kind integration tests

use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use application_operator::config::OperatorConfig;
use application_operator::crd::{Application, ArgoApplication};

/// Namespace the operator creates Argo CD Applications in during tests
pub const TARGET_NAMESPACE: &str = "argocd-it";

/// Tenant namespace owners are created in during tests
pub const TENANT_NAMESPACE: &str = "team-it";

const FIELD_MANAGER: &str = "application-operator-tests";

/// Connect to the current cluster and install CRDs and namespaces
pub async fn ensure_test_cluster() -> Result<Client, String> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let client = Client::try_default()
        .await
        .map_err(|e| format!("failed to create client: {e}"))?;

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    for crd in [Application::crd(), ArgoApplication::crd()] {
        let name = crd.metadata.name.clone().unwrap_or_default();
        crds.patch(&name, &params, &Patch::Apply(&crd))
            .await
            .map_err(|e| format!("failed to install CRD {name}: {e}"))?;
        wait_established(&crds, &name).await?;
    }

    let namespaces: Api<Namespace> = Api::all(client.clone());
    for ns in [TARGET_NAMESPACE, TENANT_NAMESPACE] {
        let body = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": ns }
        });
        namespaces
            .patch(ns, &params, &Patch::Apply(&body))
            .await
            .map_err(|e| format!("failed to create namespace {ns}: {e}"))?;
    }

    Ok(client)
}

async fn wait_established(api: &Api<CustomResourceDefinition>, name: &str) -> Result<(), String> {
    for _ in 0..60 {
        let established = api
            .get(name)
            .await
            .ok()
            .and_then(|crd| crd.status)
            .and_then(|s| s.conditions)
            .is_some_and(|conds| {
                conds
                    .iter()
                    .any(|c| c.type_ == "Established" && c.status == "True")
            });
        if established {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    Err(format!("CRD {name} not established after 30s"))
}

/// Operator configuration pointing at the test namespaces
pub fn test_config() -> OperatorConfig {
    OperatorConfig::new(
        Some(TARGET_NAMESPACE.to_string()),
        None,
        Some("application-operator".to_string()),
        None,
    )
    .expect("valid test config")
}

/// Remove an owner and its Argo CD Application, ignoring errors
///
/// The owner's finalizer is stripped first so deletion never hangs.
pub async fn cleanup(client: &Client, owner: &str, target: &str) {
    let owners: Api<Application> = Api::namespaced(client.clone(), TENANT_NAMESPACE);
    let strip = serde_json::json!({ "metadata": { "finalizers": null } });
    let _ = owners
        .patch(owner, &PatchParams::default(), &Patch::Merge(&strip))
        .await;
    let _ = owners.delete(owner, &DeleteParams::default()).await;

    let targets: Api<ArgoApplication> = Api::namespaced(client.clone(), TARGET_NAMESPACE);
    let _ = targets.delete(target, &DeleteParams::default()).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
}

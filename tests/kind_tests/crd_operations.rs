//! Integration tests for owner CRD operations
//!
//! These tests tell the story of how tenants interact with Application
//! resources through the Kubernetes API, before any controller is involved.

use kube::api::{Api, Patch, PatchParams, PostParams};

use application_operator::crd::{
    Application, ApplicationSource, ApplicationSpec, ApplicationStatus, Condition,
    ConditionStatus, SyncPolicy, SyncPolicyAutomated,
};

use super::helpers::{cleanup, ensure_test_cluster, TENANT_NAMESPACE};

fn sample_owner(name: &str) -> Application {
    let mut owner = Application::new(
        name,
        ApplicationSpec {
            source: ApplicationSource {
                repo_url: "https://github.com/argoproj/argocd-example-apps.git".to_string(),
                path: Some("guestbook".to_string()),
                target_revision: Some("HEAD".to_string()),
                helm: Some(serde_json::json!({"parameters": [{"name": "replicas", "value": "2"}]})),
                ..Default::default()
            },
            sync_policy: Some(SyncPolicy {
                automated: Some(SyncPolicyAutomated {
                    prune: true,
                    self_heal: true,
                    allow_empty: false,
                }),
                sync_options: vec!["CreateNamespace=true".to_string()],
                retry: None,
            }),
            ignore_differences: vec![],
            info: vec![],
        },
    );
    owner.metadata.namespace = Some(TENANT_NAMESPACE.to_string());
    owner
}

/// Story: a tenant declares an Application and reads it back unchanged
///
/// Free-form helm options survive the API server's structural schema pruning.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_tenant_creates_application() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<Application> = Api::namespaced(client.clone(), TENANT_NAMESPACE);
    let name = "crd-create";
    cleanup(&client, name, "team-it-crd-create").await;

    let owner = sample_owner(name);
    api.create(&PostParams::default(), &owner)
        .await
        .expect("create owner");

    let stored = api.get(name).await.expect("read owner");
    assert_eq!(stored.spec, owner.spec);
    assert!(stored.status.is_none());

    cleanup(&client, name, "team-it-crd-create").await;
}

/// Story: status is a subresource and can be cleared to empty lists
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_status_subresource_round_trip() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<Application> = Api::namespaced(client.clone(), TENANT_NAMESPACE);
    let name = "crd-status";
    cleanup(&client, name, "team-it-crd-status").await;

    api.create(&PostParams::default(), &sample_owner(name))
        .await
        .expect("create owner");

    let status = ApplicationStatus {
        conditions: vec![Condition::new(
            "Available",
            ConditionStatus::True,
            "Created",
            "",
        )],
        references: vec![],
    };
    api.patch_status(
        name,
        &PatchParams::default(),
        &Patch::Merge(&serde_json::json!({ "status": status })),
    )
    .await
    .expect("patch status");

    let stored = api.get_status(name).await.expect("read status");
    let stored_status = stored.status.expect("status present");
    assert_eq!(
        stored_status
            .condition("Available")
            .map(|c| c.reason.as_str()),
        Some("Created")
    );
    assert!(stored_status.references.is_empty());

    cleanup(&client, name, "team-it-crd-status").await;
}

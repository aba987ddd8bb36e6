//! Integration tests for the Application lifecycle
//!
//! These tests drive the reconciler directly against a real API server and
//! verify the Argo CD Applications it leaves behind. No Argo CD installation
//! is needed; only its CRD.

use std::sync::Arc;
use std::time::Duration;

use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};

use application_operator::controller::{reconcile, Context, FINALIZER};
use application_operator::crd::{
    Application, ApplicationSource, ApplicationSpec, ArgoApplication, ConditionStatus,
};
use application_operator::ownership::{is_owned_by, LABEL_MANAGED_BY};
use application_operator::projection::project;

use super::helpers::{cleanup, ensure_test_cluster, test_config, TARGET_NAMESPACE, TENANT_NAMESPACE};

fn sample_owner(name: &str) -> Application {
    let mut owner = Application::new(
        name,
        ApplicationSpec {
            source: ApplicationSource {
                repo_url: "https://github.com/argoproj/argocd-example-apps.git".to_string(),
                path: Some("guestbook".to_string()),
                target_revision: Some("HEAD".to_string()),
                ..Default::default()
            },
            sync_policy: None,
            ignore_differences: vec![],
            info: vec![],
        },
    );
    owner.metadata.namespace = Some(TENANT_NAMESPACE.to_string());
    owner
}

fn context(client: &Client) -> Arc<Context> {
    Arc::new(Context::new(client.clone(), test_config()))
}

async fn reconcile_once(client: &Client, owners: &Api<Application>, name: &str) -> Action {
    let owner = owners.get(name).await.expect("read owner");
    reconcile(Arc::new(owner), context(client))
        .await
        .expect("reconcile succeeds")
}

/// Story: a tenant's Application becomes an Argo CD Application
///
/// Expected behavior:
/// - The owner receives the operator's finalizer
/// - An Argo CD Application named `{namespace}-{name}` appears in the target
///   namespace, labelled with the owner's identity
/// - The owner reports Available=True with a reference to it
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_owner_gets_argo_application() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let owners: Api<Application> = Api::namespaced(client.clone(), TENANT_NAMESPACE);
    let targets: Api<ArgoApplication> = Api::namespaced(client.clone(), TARGET_NAMESPACE);
    let name = "lifecycle-create";
    let target_name = format!("{TENANT_NAMESPACE}-{name}");
    cleanup(&client, name, &target_name).await;

    owners
        .create(&PostParams::default(), &sample_owner(name))
        .await
        .expect("create owner");

    reconcile_once(&client, &owners, name).await;

    let owner = owners.get(name).await.expect("read owner");
    assert!(owner.finalizers().iter().any(|f| f == FINALIZER));

    let target = targets.get(&target_name).await.expect("target exists");
    assert!(is_owned_by(&target, &owner));
    assert_eq!(target.spec.project, TENANT_NAMESPACE);
    assert_eq!(
        target.labels().get(LABEL_MANAGED_BY).map(String::as_str),
        Some("application-operator")
    );

    let status = owner.status.expect("status written");
    let available = status.condition("Available").expect("Available condition");
    assert_eq!(available.status, ConditionStatus::True);
    assert_eq!(status.references.len(), 1);
    assert_eq!(status.references[0].name, target_name);

    cleanup(&client, name, &target_name).await;
}

/// Story: the tenant bumps the revision and the Argo CD Application follows
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_source_change_propagates() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let owners: Api<Application> = Api::namespaced(client.clone(), TENANT_NAMESPACE);
    let targets: Api<ArgoApplication> = Api::namespaced(client.clone(), TARGET_NAMESPACE);
    let name = "lifecycle-update";
    let target_name = format!("{TENANT_NAMESPACE}-{name}");
    cleanup(&client, name, &target_name).await;

    owners
        .create(&PostParams::default(), &sample_owner(name))
        .await
        .expect("create owner");
    reconcile_once(&client, &owners, name).await;

    let patch = serde_json::json!({ "spec": { "source": { "targetRevision": "v2" } } });
    owners
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .expect("patch owner");
    reconcile_once(&client, &owners, name).await;

    let target = targets.get(&target_name).await.expect("target exists");
    assert_eq!(target.spec.source.target_revision.as_deref(), Some("v2"));

    let owner = owners.get(name).await.expect("read owner");
    assert_eq!(owner.status.expect("status").references.len(), 1);

    cleanup(&client, name, &target_name).await;
}

/// Story: deleting the tenant's Application removes the Argo CD Application
/// before the owner goes away
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deletion_cleans_up() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let owners: Api<Application> = Api::namespaced(client.clone(), TENANT_NAMESPACE);
    let targets: Api<ArgoApplication> = Api::namespaced(client.clone(), TARGET_NAMESPACE);
    let name = "lifecycle-delete";
    let target_name = format!("{TENANT_NAMESPACE}-{name}");
    cleanup(&client, name, &target_name).await;

    owners
        .create(&PostParams::default(), &sample_owner(name))
        .await
        .expect("create owner");
    reconcile_once(&client, &owners, name).await;

    owners
        .delete(name, &DeleteParams::default())
        .await
        .expect("delete owner");

    // Finalizer keeps the owner around until the operator has cleaned up
    let action = reconcile_once(&client, &owners, name).await;
    assert_eq!(action, Action::await_change());

    assert!(targets.get_opt(&target_name).await.expect("read target").is_none());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(owners.get_opt(name).await.expect("read owner").is_none());
}

/// Story: a hand-made Argo CD Application blocks the owner and stays untouched
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_foreign_application_is_not_adopted() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let owners: Api<Application> = Api::namespaced(client.clone(), TENANT_NAMESPACE);
    let targets: Api<ArgoApplication> = Api::namespaced(client.clone(), TARGET_NAMESPACE);
    let name = "lifecycle-conflict";
    let target_name = format!("{TENANT_NAMESPACE}-{name}");
    cleanup(&client, name, &target_name).await;

    let mut foreign = project(&sample_owner(name), &test_config());
    foreign.metadata.labels = None;
    foreign.spec.project = "default".to_string();
    targets
        .create(&PostParams::default(), &foreign)
        .await
        .expect("create foreign target");

    owners
        .create(&PostParams::default(), &sample_owner(name))
        .await
        .expect("create owner");
    let owner = owners.get(name).await.expect("read owner");
    let err = reconcile(Arc::new(owner), context(&client))
        .await
        .expect_err("conflict");
    assert!(err.is_conflict());

    let target = targets.get(&target_name).await.expect("target exists");
    assert_eq!(target.spec.project, "default");

    let owner = owners.get(name).await.expect("read owner");
    let status = owner.status.expect("status written");
    let available = status.condition("Available").expect("Available condition");
    assert_eq!(available.reason, "Failed");

    cleanup(&client, name, &target_name).await;
}

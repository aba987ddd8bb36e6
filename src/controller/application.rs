//! Application controller implementation
//!
//! Keeps one Argo CD Application in sync with each owner `Application`.
//! A finalizer on the owner guarantees the Argo CD Application is deleted
//! before the owner disappears.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, Patch, PatchParams, PostParams};
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use crate::config::OperatorConfig;
use crate::crd::{Application, ApplicationStatus, ArgoApplication, ObjectReference};
use crate::ownership::is_owned_by;
use crate::patch::reconcile_target;
use crate::projection::{project, target_ref};
use crate::status::{add_reference, desired_condition, next_status, remove_reference};
use crate::Error;

/// Finalizer placed on every owner this operator manages
pub const FINALIZER: &str = "finalizer.application.ops.csas.cz";

/// Field manager recorded on status writes
pub const FIELD_MANAGER: &str = "application-operator";

/// Requeue interval after a successful reconcile of an active owner
///
/// Catches Argo CD Applications deleted while the target watch was down;
/// a relist cannot tell which owner such a target belonged to.
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(600);

/// Requeue delay for transient failures
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Requeue delay for failures that need a human (ownership conflicts)
pub const CONFLICT_RETRY_INTERVAL: Duration = Duration::from_secs(300);

/// Storage port for owners and their Argo CD Applications
///
/// "Not found" is reported as `Ok(None)` on reads and as success on deletes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Fetch an owner by identity
    async fn get_owner(&self, namespace: &str, name: &str) -> Result<Option<Application>, Error>;

    /// Add [`FINALIZER`] to the owner, conditional on its resourceVersion
    async fn add_finalizer(&self, owner: &Application) -> Result<(), Error>;

    /// Remove [`FINALIZER`] from the owner, conditional on its resourceVersion
    async fn remove_finalizer(&self, owner: &Application) -> Result<(), Error>;

    /// Overwrite the owner's status subresource
    async fn patch_owner_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ApplicationStatus,
    ) -> Result<(), Error>;

    /// Fetch an Argo CD Application
    async fn get_target(&self, namespace: &str, name: &str)
        -> Result<Option<ArgoApplication>, Error>;

    /// Create an Argo CD Application
    async fn create_target(&self, target: &ArgoApplication) -> Result<(), Error>;

    /// Write labels and spec of an existing Argo CD Application
    ///
    /// The write is conditional on `target`'s resourceVersion and leaves the
    /// fields Argo CD maintains (status, operation) as they are.
    async fn update_target(&self, target: &ArgoApplication) -> Result<(), Error>;

    /// Delete an Argo CD Application; already gone counts as success
    async fn delete_target(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn owners(&self, namespace: &str) -> Api<Application> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn targets(&self, namespace: &str) -> Api<ArgoApplication> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn patch_finalizers(
        &self,
        owner: &Application,
        finalizers: Vec<String>,
    ) -> Result<(), Error> {
        let patch = serde_json::json!({
            "metadata": {
                "finalizers": finalizers,
                "resourceVersion": owner.resource_version(),
            }
        });

        self.owners(&owner.namespace().unwrap_or_default())
            .patch(&owner.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_owner(&self, namespace: &str, name: &str) -> Result<Option<Application>, Error> {
        Ok(self.owners(namespace).get_opt(name).await?)
    }

    async fn add_finalizer(&self, owner: &Application) -> Result<(), Error> {
        let mut finalizers = owner.finalizers().to_vec();
        if finalizers.iter().any(|f| f == FINALIZER) {
            return Ok(());
        }
        finalizers.push(FINALIZER.to_string());
        self.patch_finalizers(owner, finalizers).await
    }

    async fn remove_finalizer(&self, owner: &Application) -> Result<(), Error> {
        let finalizers: Vec<String> = owner
            .finalizers()
            .iter()
            .filter(|f| *f != FINALIZER)
            .cloned()
            .collect();
        self.patch_finalizers(owner, finalizers).await
    }

    async fn patch_owner_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ApplicationStatus,
    ) -> Result<(), Error> {
        let status_patch = serde_json::json!({
            "status": status
        });

        self.owners(namespace)
            .patch_status(
                name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&status_patch),
            )
            .await?;

        Ok(())
    }

    async fn get_target(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ArgoApplication>, Error> {
        Ok(self.targets(namespace).get_opt(name).await?)
    }

    async fn create_target(&self, target: &ArgoApplication) -> Result<(), Error> {
        self.targets(&target.namespace().unwrap_or_default())
            .create(&PostParams::default(), target)
            .await?;
        Ok(())
    }

    async fn update_target(&self, target: &ArgoApplication) -> Result<(), Error> {
        let namespace = target.namespace().unwrap_or_default();
        let name = target.name_any();
        let resource = ApiResource::erase::<ArgoApplication>(&());
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &namespace, &resource);

        // Start from the live object so fields outside our model survive the replace
        let mut live = api.get(&name).await?;
        live.metadata.labels = target.metadata.labels.clone();
        live.metadata.resource_version = target.metadata.resource_version.clone();
        live.data["spec"] = serde_json::to_value(&target.spec)
            .map_err(|e| Error::serialization_for_kind("ArgoApplication", e.to_string()))?;

        api.replace(&name, &PostParams::default(), &live).await?;
        Ok(())
    }

    async fn delete_target(&self, namespace: &str, name: &str) -> Result<(), Error> {
        match self
            .targets(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Controller context shared by all reconciliations
pub struct Context {
    /// Kubernetes client for API operations (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// Operator configuration, read once at startup
    pub config: OperatorConfig,
}

impl Context {
    /// Create a new controller context with the given Kubernetes client
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self {
            kube: Arc::new(KubeClientImpl::new(client)),
            config,
        }
    }

    /// Create a context for testing with a custom client
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn KubeClient>, config: OperatorConfig) -> Self {
        Self { kube, config }
    }
}

/// Reconcile an owner Application
///
/// The owner is re-read through the storage port so decisions are made on
/// current data rather than the watch cache.
#[instrument(
    skip(owner, ctx),
    fields(owner = %owner.name_any(), namespace = %owner.namespace().unwrap_or_default())
)]
pub async fn reconcile(owner: Arc<Application>, ctx: Arc<Context>) -> Result<Action, Error> {
    let namespace = owner.namespace().unwrap_or_default();
    let name = owner.name_any();

    let Some(owner) = ctx.kube.get_owner(&namespace, &name).await? else {
        debug!("owner no longer exists");
        return Ok(Action::await_change());
    };

    reconcile_owner(&owner, &ctx).await
}

/// Run one reconciliation pass for a freshly read owner
pub async fn reconcile_owner(owner: &Application, ctx: &Context) -> Result<Action, Error> {
    let mut references = owner
        .status
        .as_ref()
        .map(|s| s.references.clone())
        .unwrap_or_default();

    if owner.is_deleting() {
        if !owner.has_finalizer(FINALIZER) {
            debug!("owner is deleting and holds no finalizer of ours");
            return Ok(Action::await_change());
        }

        let outcome = match finalize(owner, ctx, &mut references).await {
            Ok(()) => ctx.kube.remove_finalizer(owner).await,
            Err(e) => Err(e),
        };
        let reported = report(owner, ctx, references, outcome.as_ref().err(), true).await;
        settle(outcome, reported)?;

        info!("finalized, Argo CD Application removed");
        return Ok(Action::await_change());
    }

    let outcome = ensure_target(owner, ctx, &mut references).await;
    let reported = report(owner, ctx, references, outcome.as_ref().err(), false).await;
    settle(outcome, reported)?;

    Ok(Action::requeue(RESYNC_INTERVAL))
}

/// Delete the owner's Argo CD Application and drop its reference
async fn finalize(
    owner: &Application,
    ctx: &Context,
    references: &mut Vec<ObjectReference>,
) -> Result<(), Error> {
    let reference = target_ref(owner, &ctx.config);

    match ctx
        .kube
        .get_target(&reference.namespace, &reference.name)
        .await?
    {
        Some(target) if is_owned_by(&target, owner) => {
            ctx.kube
                .delete_target(&reference.namespace, &reference.name)
                .await?;
            info!(target = %reference.name, "deleted Argo CD Application");
        }
        // Name taken by another owner; it was never ours to delete
        Some(_) => warn!(
            target = %reference.name,
            "Argo CD Application belongs to someone else, leaving it in place"
        ),
        None => debug!(target = %reference.name, "Argo CD Application already gone"),
    }

    remove_reference(references, &reference);
    Ok(())
}

/// Make sure the finalizer is set and the Argo CD Application matches the owner
async fn ensure_target(
    owner: &Application,
    ctx: &Context,
    references: &mut Vec<ObjectReference>,
) -> Result<(), Error> {
    if !owner.has_finalizer(FINALIZER) {
        ctx.kube.add_finalizer(owner).await?;
        info!("added finalizer");
    }

    create_or_update(owner, ctx, references).await
}

async fn create_or_update(
    owner: &Application,
    ctx: &Context,
    references: &mut Vec<ObjectReference>,
) -> Result<(), Error> {
    let reference = target_ref(owner, &ctx.config);
    let desired = project(owner, &ctx.config);

    let Some(mut existing) = ctx
        .kube
        .get_target(&reference.namespace, &reference.name)
        .await?
    else {
        ctx.kube.create_target(&desired).await?;
        info!(target = %reference.name, "created Argo CD Application");
        add_reference(references, reference);
        return Ok(());
    };

    if !is_owned_by(&existing, owner) {
        warn!(target = %reference.name, "Argo CD Application exists and belongs to someone else");
        return Err(Error::ownership_conflict(
            reference.name,
            reference.namespace,
            format!(
                "{}/{}",
                owner.namespace().unwrap_or_default(),
                owner.name_any()
            ),
        ));
    }

    add_reference(references, reference.clone());

    if reconcile_target(&mut existing, &desired) {
        ctx.kube.update_target(&existing).await?;
        info!(target = %reference.name, "updated Argo CD Application");
    } else {
        debug!(target = %reference.name, "Argo CD Application in sync");
    }

    Ok(())
}

/// Write the owner's status if the outcome changed what users see
async fn report(
    owner: &Application,
    ctx: &Context,
    references: Vec<ObjectReference>,
    outcome: Option<&Error>,
    deleting: bool,
) -> Result<(), Error> {
    let condition = desired_condition(outcome, deleting);
    let Some(status) = next_status(owner.status.as_ref(), references, condition) else {
        debug!("status unchanged");
        return Ok(());
    };

    let namespace = owner.namespace().unwrap_or_default();
    match ctx
        .kube
        .patch_owner_status(&namespace, &owner.name_any(), &status)
        .await
    {
        Err(e) if deleting && e.is_not_found() => {
            debug!("owner gone before final status write");
            Ok(())
        }
        other => other,
    }
}

/// Combine the pass outcome with the status write that reported it
///
/// The pass error wins; a status write that failed on top of it is logged.
fn settle(outcome: Result<(), Error>, reported: Result<(), Error>) -> Result<(), Error> {
    match (outcome, reported) {
        (Err(e), Err(status_error)) => {
            warn!(error = %status_error, "failed to report reconcile error on owner status");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), reported) => reported,
    }
}

/// Error policy for the controller
///
/// Transient failures are retried quickly; anything that needs a human,
/// such as an ownership conflict, is retried on a slow fixed interval.
pub fn error_policy(owner: Arc<Application>, error: &Error, _ctx: Arc<Context>) -> Action {
    if error.is_retryable() {
        error!(
            ?error,
            owner = %owner.name_any(),
            namespace = %owner.namespace().unwrap_or_default(),
            "reconciliation failed"
        );
        Action::requeue(RETRY_INTERVAL)
    } else {
        warn!(
            %error,
            owner = %owner.name_any(),
            namespace = %owner.namespace().unwrap_or_default(),
            "reconciliation failed, needs intervention"
        );
        Action::requeue(CONFLICT_RETRY_INTERVAL)
    }
}

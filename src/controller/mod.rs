//! Controller for ops.csas.cz Applications
//!
//! Reconciliation follows the usual observe-decide-act loop: read the owner
//! and its Argo CD Application, work out the single corrective step, apply it
//! and report the outcome on the owner's status.

mod application;
mod runner;

pub use application::{
    error_policy, reconcile, reconcile_owner, Context, KubeClient, KubeClientImpl,
    CONFLICT_RETRY_INTERVAL, FIELD_MANAGER, FINALIZER, RESYNC_INTERVAL, RETRY_INTERVAL,
};
pub use runner::run;

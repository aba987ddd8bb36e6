//! Custom Resource Definitions used by the operator
//!
//! `Application` (ops.csas.cz) is the owner CRD this operator serves.
//! `ArgoApplication` is the Argo CD Application it manages on the owner's behalf.

mod application;
mod argocd;
mod types;

pub use application::{Application, ApplicationSpec, ApplicationStatus};
pub use argocd::{ArgoApplication, ArgoApplicationSpec, ARGO_API_VERSION, ARGO_KIND};
pub use types::{
    ApplicationDestination, ApplicationSource, Condition, ConditionStatus, Info, ObjectReference,
    ResourceIgnoreDifferences, SyncPolicy, SyncPolicyAutomated,
};

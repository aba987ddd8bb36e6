//! Application operator - keeps Argo CD Applications in sync with tenant requests
//!
//! Tenants create namespaced `Application` resources in the `ops.csas.cz`
//! group. For each one the operator maintains an Argo CD Application in a
//! central namespace, pinned to the tenant's namespace as destination and
//! project, and removes it again when the tenant's resource is deleted.
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (Application, ArgoApplication)
//! - [`controller`] - Reconciliation loop, storage port and controller wiring
//! - [`ownership`] - Ownership labels linking Argo CD Applications to owners
//! - [`projection`] - Derivation of the desired Argo CD Application
//! - [`patch`] - Update decision for existing Argo CD Applications
//! - [`status`] - Owner status conditions and references
//! - [`trigger`] - Mapping Argo CD Application events back to owners
//! - [`config`] - Operator configuration
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod ownership;
pub mod patch;
pub mod projection;
pub mod status;
pub mod trigger;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

//! Integration tests for the Application operator
//!
//! These tests require a Kubernetes cluster (kind) and tell the story of how
//! tenants and the operator interact through the API server.
//!
//! # Test Organization
//!
//! - `crd_operations`: Stories about creating, reading and updating owner
//!   Applications through the Kubernetes API
//!
//! - `application_lifecycle`: Stories about how the controller creates,
//!   updates and removes Argo CD Applications for an owner
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored --nocapture
//! ```

mod application_lifecycle;
mod crd_operations;
mod helpers;

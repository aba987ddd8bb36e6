//! Operator configuration
//!
//! Values come from the command line or environment once at startup and are
//! then shared read-only by every reconciliation.

use crate::Error;

/// Destination API server used when none is configured
pub const DEFAULT_DESTINATION_SERVER: &str = "https://kubernetes.default.svc";

/// Immutable operator configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Namespace Argo CD Applications are created in
    pub target_namespace: String,
    /// API server URL written as the Argo CD destination
    pub destination_server: String,
    /// Value of the `app.kubernetes.io/managed-by` label, if any
    pub operator_name: Option<String>,
    /// Restrict the owner watch to a single namespace
    pub watch_namespace: Option<String>,
}

impl OperatorConfig {
    /// Validate and normalise raw configuration values
    ///
    /// Empty strings count as unset. A missing target namespace is fatal.
    pub fn new(
        target_namespace: Option<String>,
        destination_server: Option<String>,
        operator_name: Option<String>,
        watch_namespace: Option<String>,
    ) -> Result<Self, Error> {
        let target_namespace = non_empty(target_namespace)
            .ok_or_else(|| Error::config("TARGET_NAMESPACE must be set to a non-empty value"))?;

        Ok(Self {
            target_namespace,
            destination_server: non_empty(destination_server)
                .unwrap_or_else(|| DEFAULT_DESTINATION_SERVER.to_string()),
            operator_name: non_empty(operator_name),
            watch_namespace: non_empty(watch_namespace),
        })
    }

    /// Minimal config for tests and tools: only the target namespace set
    pub fn with_target_namespace(target_namespace: impl Into<String>) -> Self {
        Self {
            target_namespace: target_namespace.into(),
            destination_server: DEFAULT_DESTINATION_SERVER.to_string(),
            operator_name: None,
            watch_namespace: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

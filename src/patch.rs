//! Decide whether an existing Argo CD Application needs a write
//!
//! The decider mutates `existing` in place toward `desired` and reports
//! whether anything changed. Labels are merged additively so labels added by
//! other tools survive; the spec is replaced wholesale whenever it differs.

use crate::crd::ArgoApplication;

/// Bring `existing` in line with `desired`, returning true if it was mutated
///
/// Name, namespace and all other metadata stay untouched.
pub fn reconcile_target(existing: &mut ArgoApplication, desired: &ArgoApplication) -> bool {
    let mut mutated = false;

    if let Some(wanted) = desired.metadata.labels.as_ref() {
        let labels = existing.metadata.labels.get_or_insert_with(Default::default);
        for (key, value) in wanted {
            if labels.get(key) != Some(value) {
                labels.insert(key.clone(), value.clone());
                mutated = true;
            }
        }
    }

    if existing.spec != desired.spec {
        existing.spec = desired.spec.clone();
        mutated = true;
    }

    mutated
}

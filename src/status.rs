//! Owner status: the `Available` condition and the reference list
//!
//! Every reconciliation attempt ends by computing the status it would write.
//! The write only happens when something a user can see changed, so a
//! steady-state reconcile costs no API calls beyond its reads.

use crate::crd::{ApplicationStatus, Condition, ConditionStatus, ObjectReference};
use crate::Error;

/// Condition type reported on every owner
pub const CONDITION_AVAILABLE: &str = "Available";
/// Reason for a successfully created or updated target
pub const REASON_CREATED: &str = "Created";
/// Reason after the target was removed during deletion
pub const REASON_DELETED: &str = "Deleted";
/// Reason for a failed attempt; the message carries the error
pub const REASON_FAILED: &str = "Failed";

/// Add `reference` unless an identical one is already present
///
/// Returns true if the list changed.
pub fn add_reference(references: &mut Vec<ObjectReference>, reference: ObjectReference) -> bool {
    if references.contains(&reference) {
        return false;
    }
    references.push(reference);
    true
}

/// Remove the first entry equal to `reference`
///
/// Returns true if the list changed.
pub fn remove_reference(references: &mut Vec<ObjectReference>, reference: &ObjectReference) -> bool {
    match references.iter().position(|r| r == reference) {
        Some(index) => {
            references.remove(index);
            true
        }
        None => false,
    }
}

/// The `Available` condition for an attempt's outcome
pub fn desired_condition(outcome: Option<&Error>, deleting: bool) -> Condition {
    match (outcome, deleting) {
        (Some(err), _) => Condition::new(
            CONDITION_AVAILABLE,
            ConditionStatus::False,
            REASON_FAILED,
            err.to_string(),
        ),
        (None, true) => Condition::new(
            CONDITION_AVAILABLE,
            ConditionStatus::False,
            REASON_DELETED,
            "",
        ),
        (None, false) => Condition::new(
            CONDITION_AVAILABLE,
            ConditionStatus::True,
            REASON_CREATED,
            "",
        ),
    }
}

/// Compute the status to write, or `None` if the stored one is current
///
/// `lastTransitionTime` is carried over when the condition's status did not
/// flip, so a reason or message change alone does not look like a transition.
/// Conditions of other types are kept as they are.
pub fn next_status(
    current: Option<&ApplicationStatus>,
    references: Vec<ObjectReference>,
    mut condition: Condition,
) -> Option<ApplicationStatus> {
    let current = current.cloned().unwrap_or_default();
    let previous = current.condition(&condition.type_);

    if previous.is_some_and(|p| p.same_state(&condition)) && current.references == references {
        return None;
    }

    if let Some(previous) = previous.filter(|p| p.status == condition.status) {
        condition.last_transition_time = previous.last_transition_time;
    }

    let mut conditions: Vec<Condition> = current
        .conditions
        .iter()
        .filter(|c| c.type_ != condition.type_)
        .cloned()
        .collect();
    conditions.push(condition);

    Some(ApplicationStatus {
        conditions,
        references,
    })
}

//! Turning watch events into reconcile triggers
//!
//! Two kinds of writes must not wake an owner: the status this operator
//! writes on the owner itself, and the status Argo CD rewrites on its
//! Applications every few seconds while it syncs and health-checks. Both
//! streams are reduced to a fingerprint of the fields this operator cares
//! about, and events whose fingerprint has not changed are dropped.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use futures::{Stream, StreamExt};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::ResourceExt;
use serde::Serialize;
use tracing::{debug, trace};

use crate::crd::{Application, ArgoApplication};
use crate::ownership::owner_key_from_labels;

type TargetKey = (String, String);

/// In-process hash of labels, annotations, spec, owner references, the
/// deletion marker and finalizers. Status and resourceVersion are excluded.
fn hash_relevant<S: Serialize>(meta: &ObjectMeta, spec: &S) -> u64 {
    let relevant = serde_json::json!({
        "labels": meta.labels,
        "annotations": meta.annotations,
        "spec": spec,
        "ownerReferences": meta.owner_references,
        "deletionTimestamp": meta.deletion_timestamp,
        "finalizers": meta.finalizers,
    });

    let mut hasher = DefaultHasher::new();
    relevant.to_string().hash(&mut hasher);
    hasher.finish()
}

/// Hash of the trigger-relevant parts of a target
pub fn target_fingerprint(target: &ArgoApplication) -> u64 {
    hash_relevant(&target.metadata, &target.spec)
}

/// Hash of the trigger-relevant parts of an owner
///
/// Shaped as a kube-runtime predicate: a status-only write keeps the value,
/// so the owner stream drops it.
pub fn owner_fingerprint(owner: &Application) -> Option<u64> {
    Some(hash_relevant(&owner.metadata, &owner.spec))
}

/// Owner events that can change what the reconciler does
pub fn owner_triggers<S>(
    events: S,
) -> impl Stream<Item = Result<Application, watcher::Error>> + Send + 'static
where
    S: Stream<Item = Result<Application, watcher::Error>> + Send + 'static,
{
    events.predicate_filter(owner_fingerprint)
}

/// Target events that can change what the reconciler does
///
/// Deletions always pass. Every other event passes only when the target's
/// fingerprint moved.
pub fn target_triggers<S>(
    events: S,
) -> impl Stream<Item = Result<ArgoApplication, watcher::Error>> + Send + 'static
where
    S: Stream<Item = Result<Event<ArgoApplication>, watcher::Error>> + Send + 'static,
{
    let mut filter = ChangeFilter::new();
    events.filter_map(move |event| {
        std::future::ready(event.map(|event| filter.admit(event)).transpose())
    })
}

/// Remembers the last fingerprint seen per target
///
/// Holds one entry per target currently in the watched set. Entries are
/// evicted on delete events and pruned on every relist, so targets removed
/// while the watch was down do not linger.
#[derive(Debug, Default)]
pub struct ChangeFilter {
    seen: HashMap<TargetKey, u64>,
    relisted: Option<HashSet<TargetKey>>,
}

impl ChangeFilter {
    /// Create an empty filter; the first event for every target passes
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `target` and report whether it differs from the last one seen
    pub fn changed(&mut self, target: &ArgoApplication) -> bool {
        let fp = target_fingerprint(target);
        self.seen.insert(key_of(target), fp) != Some(fp)
    }

    /// Number of targets currently remembered
    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    /// Feed one watch event through the filter
    ///
    /// Returns the target when the event should wake its owner.
    pub fn admit(&mut self, event: Event<ArgoApplication>) -> Option<ArgoApplication> {
        match event {
            Event::Apply(target) => self.changed(&target).then_some(target),
            Event::InitApply(target) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(key_of(&target));
                }
                self.changed(&target).then_some(target)
            }
            Event::Delete(target) => {
                self.seen.remove(&key_of(&target));
                Some(target)
            }
            Event::Init => {
                self.relisted = Some(HashSet::new());
                None
            }
            Event::InitDone => {
                if let Some(relisted) = self.relisted.take() {
                    self.seen.retain(|key, _| relisted.contains(key));
                }
                None
            }
        }
    }
}

fn key_of(target: &ArgoApplication) -> TargetKey {
    (target.namespace().unwrap_or_default(), target.name_any())
}

/// Owner identity encoded in a target's ownership labels
pub fn owner_for_target(target: &ArgoApplication) -> Option<ObjectRef<Application>> {
    let (namespace, name) = owner_key_from_labels(target.labels())?;
    Some(ObjectRef::new(&name).within(&namespace))
}

/// Watch mapper: owner to reconcile for a target that passed the filter
///
/// Unowned targets map to nothing.
pub fn owners_to_reconcile(target: ArgoApplication) -> Option<ObjectRef<Application>> {
    let owner = owner_for_target(&target);
    match &owner {
        Some(owner) => {
            debug!(target = %target.name_any(), owner = %owner, "target changed, enqueueing owner")
        }
        None => trace!(target = %target.name_any(), "target carries no owner labels"),
    }
    owner
}

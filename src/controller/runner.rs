//! Controller wiring
//!
//! Owners are watched cluster-wide (or in one namespace); Argo CD
//! Applications are watched in the target namespace and mapped back to their
//! owner through the ownership labels.

use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::watcher::{self, Config as WatcherConfig};
use kube::runtime::{reflector, Controller, WatchStreamExt};
use kube::{Api, Client, Resource};

use super::application::{error_policy, reconcile, Context};
use crate::config::OperatorConfig;
use crate::crd::{Application, ArgoApplication};
use crate::ownership::LABEL_OWNER_KIND;
use crate::trigger::{owner_triggers, owners_to_reconcile, target_triggers};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
///
/// Idle watches are restarted before the client gives up on the response body.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Run the Application controller until a shutdown signal arrives
pub async fn run(client: Client, config: OperatorConfig) {
    let owners: Api<Application> = match config.watch_namespace.as_deref() {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };
    let targets: Api<ArgoApplication> =
        Api::namespaced(client.clone(), &config.target_namespace);

    tracing::info!(
        target_namespace = %config.target_namespace,
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        destination_server = %config.destination_server,
        "starting Application controller"
    );

    let ctx = Arc::new(Context::new(client, config));

    // The store sees every owner event; only the reconcile triggers are filtered
    let (reader, writer) = reflector::store();
    let owner_config = WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS);
    let owner_events = watcher::watcher(owners, owner_config)
        .default_backoff()
        .reflect(writer)
        .applied_objects();
    let target_events = watcher::watcher(targets, target_watch_config()).default_backoff();

    Controller::for_stream(owner_triggers(owner_events), reader)
        .watches_stream(target_triggers(target_events), owners_to_reconcile)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(log_reconcile_result("Application"))
        .await;

    tracing::info!("Application controller stopped");
}

/// Only Argo CD Applications labelled by this operator are of interest
fn target_watch_config() -> WatcherConfig {
    WatcherConfig::default()
        .timeout(WATCH_TIMEOUT_SECS)
        .labels(&format!("{}={}", LABEL_OWNER_KIND, Application::kind(&())))
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}

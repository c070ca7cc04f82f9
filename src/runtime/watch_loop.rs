//! # Watch Loop
//!
//! Runs the kube-runtime `Controller` for `ACMCertificateImport`.
//!
//! Besides the primary resource, Secrets and Services are watched and mapped
//! back to the imports that name them. A rotated certificate or a stripped
//! annotation then re-triggers reconciliation without waiting for the resync.

use crate::controller::Error;
use crate::crd::AcmCertificateImport;
use crate::observability::metrics;
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::runtime::Context;
use crate::server::ServerState;
use crate::store::ResourceKey;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::api::Api;
use kube::{Client, ResourceExt};
use kube_runtime::controller::{self, Action};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the controller until SIGINT/SIGTERM
///
/// # Errors
///
/// Returns an error only if the controller could not be started.
pub async fn run_watch_loop(
    client: Client,
    ctx: Arc<Context>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let namespace = ctx.config.watch_namespace.clone();
    let imports: Api<AcmCertificateImport> = scoped_api(&client, namespace.as_deref());
    let secrets: Api<Secret> = scoped_api(&client, namespace.as_deref());
    let services: Api<Service> = scoped_api(&client, namespace.as_deref());

    info!(
        "Starting controller watch loop (namespace: {}, concurrency: {})",
        namespace.as_deref().unwrap_or("all"),
        ctx.config.max_concurrent_reconciliations
    );

    let controller = Controller::new(imports, watcher::Config::default().any_semantic());
    let cache = controller.store();
    let secret_cache = cache.clone();
    let service_cache = cache;

    controller
        .watches(secrets, watcher::Config::default(), move |secret: Secret| {
            let name = secret.name_any();
            let namespace = secret.namespace().unwrap_or_default();
            imports_referencing(&secret_cache.state(), &namespace, |import| {
                import.spec.secret_ref.name == name
            })
        })
        .watches(services, watcher::Config::default(), move |service: Service| {
            let name = service.name_any();
            let namespace = service.namespace().unwrap_or_default();
            imports_referencing(&service_cache.state(), &namespace, |import| {
                import.service_names().contains(&name.as_str())
            })
        })
        .with_config(
            controller::Config::default().concurrency(ctx.config.max_concurrent_reconciliations),
        )
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, Arc::clone(&ctx))
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!(
                    "Reconciled {}/{}",
                    obj.namespace.as_deref().unwrap_or("default"),
                    obj.name
                ),
                Err(e) => warn!("Controller stream error: {}", e),
            }
        })
        .await;

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Controller stopped gracefully");
    Ok(())
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// References to the cached imports in `namespace` matching `predicate`
pub fn imports_referencing<F>(
    imports: &[Arc<AcmCertificateImport>],
    namespace: &str,
    predicate: F,
) -> Vec<ObjectRef<AcmCertificateImport>>
where
    F: Fn(&AcmCertificateImport) -> bool,
{
    imports
        .iter()
        .filter(|import| import.namespace().as_deref() == Some(namespace))
        .filter(|import| predicate(import))
        .map(|import| ObjectRef::from_obj(import.as_ref()))
        .collect()
}

async fn reconcile(obj: Arc<AcmCertificateImport>, ctx: Arc<Context>) -> Result<Action, Error> {
    let key = ResourceKey::of(&obj);
    let start = Instant::now();

    let result = ctx.reconciler.reconcile(&key).await;
    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    let outcome = result?;
    info!("Reconciled ACMCertificateImport {}: {}", key, outcome);
    metrics::increment_reconciliations(outcome.as_str());
    ctx.reset_backoff(&key);
    Ok(ctx.action_for(outcome))
}

//! # Annotation Synchronizer
//!
//! Sets and clears the load balancer certificate annotation on Services.
//!
//! Ownership rules:
//! - `apply` never overwrites an existing value, whatever it is (first writer wins)
//! - `remove` only removes a value exactly equal to the ARN this import set
//!
//! Each Service patch touches only the one annotation key, so concurrent edits
//! to other annotations survive. Every Service is attempted; failures are returned together as
//! [`Error::Aggregate`].

use crate::controller::Error;
use crate::observability::metrics;
use crate::store::{ResourceStore, ServicePatch};
use k8s_openapi::api::core::v1::Service;
use tracing::{debug, info, warn};

/// Escape a map key for use as a JSON pointer token (RFC 6901)
#[must_use]
pub fn escape_pointer_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn annotation_path(key: &str) -> String {
    format!("/metadata/annotations/{}", escape_pointer_token(key))
}

/// Current value of an annotation on a Service
#[must_use]
pub fn annotation_value<'a>(service: &'a Service, key: &str) -> Option<&'a str> {
    service
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .map(String::as_str)
}

/// Patch setting `key` to `value`
///
/// A merge patch naming the single key. It creates the annotation map when
/// the Service has none, and leaves every other annotation alone even if
/// they were added after the Service was read.
#[must_use]
pub fn set_annotation_patch(key: &str, value: &str) -> ServicePatch {
    ServicePatch::Merge(serde_json::json!({
        "metadata": { "annotations": { key: value } }
    }))
}

/// Patch removing `key`, guarded by a `test` that it still holds `expected`
pub fn remove_annotation_patch(key: &str, expected: &str) -> Result<ServicePatch, Error> {
    let path = annotation_path(key);
    let ops = serde_json::from_value(serde_json::json!([
        { "op": "test", "path": path, "value": expected },
        { "op": "remove", "path": path }
    ]))?;
    Ok(ServicePatch::Json(ops))
}

/// Ensure every named Service carries `key`, setting it to `value` where absent
///
/// Returns how many Services were patched.
///
/// # Errors
///
/// Every Service is attempted; all failures are returned as one error.
pub async fn apply(
    store: &dyn ResourceStore,
    namespace: &str,
    services: &[&str],
    key: &str,
    value: &str,
) -> Result<usize, Error> {
    let mut errors = Vec::new();
    let mut patched = 0;

    for name in services {
        match apply_one(store, namespace, name, key, value).await {
            Ok(true) => patched += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to annotate Service {}/{}: {}", namespace, name, e);
                errors.push(e);
            }
        }
    }

    Error::aggregate(errors).map(|()| patched)
}

async fn apply_one(
    store: &dyn ResourceStore,
    namespace: &str,
    name: &str,
    key: &str,
    value: &str,
) -> Result<bool, Error> {
    let service = store.get_service(namespace, name).await?;

    if let Some(existing) = annotation_value(&service, key) {
        if existing != value {
            warn!(
                service.namespace = namespace,
                service.name = name,
                annotation.current = existing,
                annotation.wanted = value,
                "Service annotation holds a different certificate, leaving it untouched"
            );
            metrics::increment_annotation_collisions();
        }
        return Ok(false);
    }

    let patch = set_annotation_patch(key, value);
    store.patch_service(namespace, name, &patch).await?;
    metrics::increment_annotation_patches("set");
    info!("Annotated Service {}/{} with {}", namespace, name, value);
    Ok(true)
}

/// Remove `key` from every named Service where it equals `expected`
///
/// Services that no longer exist are skipped. Returns how many Services were patched.
///
/// # Errors
///
/// Every Service is attempted; all failures are returned as one error.
pub async fn remove(
    store: &dyn ResourceStore,
    namespace: &str,
    services: &[&str],
    key: &str,
    expected: &str,
) -> Result<usize, Error> {
    let mut errors = Vec::new();
    let mut patched = 0;

    for name in services {
        match remove_one(store, namespace, name, key, expected).await {
            Ok(true) => patched += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(
                    "Failed to remove annotation from Service {}/{}: {}",
                    namespace, name, e
                );
                errors.push(e);
            }
        }
    }

    Error::aggregate(errors).map(|()| patched)
}

async fn remove_one(
    store: &dyn ResourceStore,
    namespace: &str,
    name: &str,
    key: &str,
    expected: &str,
) -> Result<bool, Error> {
    let service = match store.get_service(namespace, name).await {
        Ok(service) => service,
        Err(e) if e.is_not_found() => {
            debug!("Service {}/{} is gone, nothing to clean up", namespace, name);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if annotation_value(&service, key) != Some(expected) {
        return Ok(false);
    }

    let patch = remove_annotation_patch(key, expected)?;
    match store.patch_service(namespace, name, &patch).await {
        // Deleted between the read and the patch
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
        Ok(()) => {
            metrics::increment_annotation_patches("remove");
            info!("Removed annotation {} from Service {}/{}", key, namespace, name);
            Ok(true)
        }
    }
}

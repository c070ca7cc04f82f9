//! # Finalizer Guard
//!
//! Presence of the controller's finalizer on an object. Callers persist the
//! object when a function reports a change.

use crate::constants::FINALIZER;
use kube::api::ObjectMeta;

/// Whether the controller's finalizer is present
#[must_use]
pub fn has_finalizer(meta: &ObjectMeta) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|name| name == FINALIZER))
}

/// Add the finalizer if absent; returns true when `meta` was changed
pub fn ensure(meta: &mut ObjectMeta) -> bool {
    if has_finalizer(meta) {
        return false;
    }
    meta.finalizers
        .get_or_insert_with(Vec::new)
        .push(FINALIZER.to_string());
    true
}

/// Remove the finalizer if present; returns true when `meta` was changed
pub fn release(meta: &mut ObjectMeta) -> bool {
    let Some(finalizers) = meta.finalizers.as_mut() else {
        return false;
    };
    let before = finalizers.len();
    finalizers.retain(|name| name != FINALIZER);
    finalizers.len() != before
}

//! # Error Policy
//!
//! Requeue decisions after a failed reconcile.
//!
//! | Error kind | Action |
//! |---|---|
//! | malformed input | wait for a change (the Secret watch re-triggers) |
//! | conflict | short fixed requeue, a fresh read usually succeeds |
//! | not found, transient | per-resource Fibonacci backoff |

use crate::controller::{Error, ErrorKind};
use crate::crd::AcmCertificateImport;
use crate::observability::metrics;
use crate::runtime::Context;
use crate::store::ResourceKey;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Handle a reconciliation error for the controller
pub fn handle_reconciliation_error(
    obj: Arc<AcmCertificateImport>,
    error: &Error,
    ctx: Arc<Context>,
) -> Action {
    let key = ResourceKey::of(&obj);
    requeue_action(&key, error, &ctx)
}

/// Pick the requeue action for `error` and record it
pub fn requeue_action(key: &ResourceKey, error: &Error, ctx: &Context) -> Action {
    let kind = error.kind();
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.namespace = key.namespace.as_str(),
        resource.name = key.name.as_str(),
        error.kind = kind.as_str()
    );
    let _error_guard = error_span.enter();

    metrics::increment_reconciliation_errors(kind.as_str());

    match kind {
        ErrorKind::MalformedInput => {
            warn!(
                "ACMCertificateImport {} cannot progress until its secret is fixed: {}",
                key, error
            );
            metrics::increment_requeues_total("await-change");
            Action::await_change()
        }
        ErrorKind::Conflict => {
            debug!("Conflict reconciling {}: {}", key, error);
            metrics::increment_requeues_total("conflict");
            Action::requeue(ctx.config.conflict_requeue())
        }
        ErrorKind::NotFound | ErrorKind::Transient => {
            error!("Reconciliation error for {}: {}", key, error);
            let (delay, attempts) = ctx.next_backoff(key);
            info!(
                "Retrying {} with Fibonacci backoff: {}s (error count: {})",
                key,
                delay.as_secs(),
                attempts
            );
            metrics::increment_requeues_total("error-backoff");
            Action::requeue(delay)
        }
    }
}

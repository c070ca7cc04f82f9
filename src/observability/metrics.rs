//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `acm_import_reconciliations_total` - Reconcile passes, labelled by outcome
//! - `acm_import_reconciliation_errors_total` - Failed reconcile passes, labelled by error kind
//! - `acm_import_reconciliation_duration_seconds` - Duration of reconcile passes
//! - `acm_import_requeues_total` - Requeues scheduled by the error policy, labelled by reason
//! - `acm_import_acm_operations_total` - Successful ACM calls, labelled by operation
//! - `acm_import_acm_operation_duration_seconds` - Duration of ACM calls
//! - `acm_import_acm_operation_errors_total` - Failed ACM calls, labelled by operation
//! - `acm_import_annotation_patches_total` - Service annotation patches, labelled by action
//! - `acm_import_annotation_collisions_total` - Services already annotated with a foreign ARN

use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "acm_import_reconciliations_total",
            "Total number of successful reconcile passes",
        ),
        &["outcome"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "acm_import_reconciliation_errors_total",
            "Total number of failed reconcile passes",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "acm_import_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "acm_import_requeues_total",
            "Total number of requeues scheduled after a failed reconcile",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static ACM_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "acm_import_acm_operations_total",
            "Total number of successful AWS Certificate Manager operations",
        ),
        &["operation"],
    )
    .expect("Failed to create ACM_OPERATIONS_TOTAL metric - this should never happen")
});

static ACM_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "acm_import_acm_operation_duration_seconds",
            "Duration of AWS Certificate Manager operations in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create ACM_OPERATION_DURATION metric - this should never happen")
});

static ACM_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "acm_import_acm_operation_errors_total",
            "Total number of failed AWS Certificate Manager operations",
        ),
        &["operation"],
    )
    .expect("Failed to create ACM_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static ANNOTATION_PATCHES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "acm_import_annotation_patches_total",
            "Total number of Service annotation patches",
        ),
        &["action"],
    )
    .expect("Failed to create ANNOTATION_PATCHES_TOTAL metric - this should never happen")
});

static ANNOTATION_COLLISIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "acm_import_annotation_collisions_total",
        "Total number of Services found annotated with a certificate this import did not set",
    )
    .expect("Failed to create ANNOTATION_COLLISIONS_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACM_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACM_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(ACM_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ANNOTATION_PATCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ANNOTATION_COLLISIONS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(outcome: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_acm_operation(operation: &str, duration: f64) {
    ACM_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
    ACM_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_acm_operation_errors(operation: &str) {
    ACM_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn increment_annotation_patches(action: &str) {
    ANNOTATION_PATCHES_TOTAL.with_label_values(&[action]).inc();
}

pub fn increment_annotation_collisions() {
    ANNOTATION_COLLISIONS_TOTAL.inc();
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> Result<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_labelled() {
        increment_annotation_patches("set");
        increment_annotation_patches("set");
        increment_annotation_patches("remove");
        assert!(ANNOTATION_PATCHES_TOTAL.with_label_values(&["set"]).get() >= 2);
        assert!(ANNOTATION_PATCHES_TOTAL.with_label_values(&["remove"]).get() >= 1);
    }

    #[test]
    fn test_record_acm_operation_counts_and_times() {
        record_acm_operation("import", 0.25);
        assert!(ACM_OPERATIONS_TOTAL.with_label_values(&["import"]).get() >= 1);
        assert!(
            ACM_OPERATION_DURATION
                .with_label_values(&["import"])
                .get_sample_count()
                >= 1
        );
    }
}

//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! The well-known keys below form the controller's contract with the cluster
//! and with the AWS load balancer controller; changing any of them strands
//! state written by earlier releases.

/// Finalizer placed on every `ACMCertificateImport` the controller manages
pub const FINALIZER: &str = "acm.kubespress.com/imported";

/// Field manager used for every write, so conflicts are attributed to us
pub const FIELD_MANAGER: &str = "acm.kubespress.com";

/// Service annotation read by the AWS load balancer controller
pub const SERVICE_ANNOTATION: &str = "service.beta.kubernetes.io/aws-load-balancer-ssl-cert";

/// Secret key holding the PEM certificate chain (leaf first)
pub const SECRET_CERTIFICATE_KEY: &str = "tls.crt";

/// Secret key holding the PEM private key
pub const SECRET_PRIVATE_KEY_KEY: &str = "tls.key";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default requeue interval after a successful reconciliation (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Default requeue interval after an optimistic concurrency conflict (seconds)
pub const DEFAULT_CONFLICT_REQUEUE_SECS: u64 = 1;

/// Default Fibonacci backoff starting value (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default Fibonacci backoff maximum value (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default bound on concurrently running reconciliations
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

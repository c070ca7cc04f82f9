//! # ACM Import Controller
//!
//! A Kubernetes controller that imports TLS Secrets into AWS Certificate
//! Manager and annotates load balancer Services with the certificate ARN.
//!
//! ## Overview
//!
//! For every `ACMCertificateImport` the controller:
//!
//! 1. **Reads the Secret** - Loads `tls.crt` and `tls.key` from the referenced Secret
//! 2. **Imports into ACM** - Re-imports under the same ARN whenever the leaf serial number changes
//! 3. **Annotates Services** - Sets `service.beta.kubernetes.io/aws-load-balancer-ssl-cert` on each referenced Service
//! 4. **Cleans up** - On deletion removes its annotations and the ACM certificate before releasing the finalizer
//!
//! ## Features
//!
//! - **Frozen imports**: `spec.frozen` stops ACM updates and deletion while Services keep being annotated
//! - **Prometheus metrics**: Exposes metrics for monitoring and observability
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

use acm_import_controller::runtime::{initialization, watch_loop};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialization::initialize().await?;

    watch_loop::run_watch_loop(init.client, init.context, init.server_state).await
}

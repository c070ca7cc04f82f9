//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use acm_import_controller::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Seams the reconciler is built from
pub use crate::provider::{CertificateGateway, ImportRequest};
pub use crate::store::{ResourceKey, ResourceStore};

// Reconciler types
pub use crate::controller::{Error, ErrorKind, ReconcileOutcome, Reconciler};

pub use crate::certificate::{load_certificate_bundle, CertificateBundle};
pub use crate::config::ControllerConfig;

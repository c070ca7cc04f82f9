//! # Controller
//!
//! Core controller modules for the ACM import controller.
//!
//! - `annotations`: Service annotation synchronization
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `error`: error taxonomy shared with the store and provider layers
//! - `finalizer`: finalizer presence on `ACMCertificateImport` objects
//! - `reconciler`: the reconcile state machine

pub mod annotations;
pub mod backoff;
pub mod error;
pub mod finalizer;
pub mod reconciler;

pub use error::{Error, ErrorKind};
pub use reconciler::{ReconcileOutcome, Reconciler};

//! # Custom Resource Definitions
//!
//! CRD types for the ACM import controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `ACMCertificateImport` specification
//! - `status.rs` - Status and derived lifecycle state

mod spec;
mod status;

pub use spec::{AcmCertificateImport, AcmCertificateImportSpec, LocalRef};
pub use status::{AcmCertificateImportStatus, ImportState};

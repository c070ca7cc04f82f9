//! ACM Import Controller Library
//!
//! Imports TLS certificates held in Kubernetes Secrets into AWS Certificate
//! Manager and points load balancer Services at the imported certificate.
//!
//! ## Quick Start
//!
//! ```rust
//! use acm_import_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod certificate;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod server;
pub mod store;

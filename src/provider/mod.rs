//! # Provider Modules
//!
//! The remote certificate store the controller imports into.
//!
//! The reconciler only sees the [`CertificateGateway`] trait, so tests can
//! substitute an in-memory store and other certificate stores can be added
//! without touching the reconciliation logic.

use crate::controller::Error;
use async_trait::async_trait;

pub mod aws;

/// Certificate material for a single import call
#[derive(Clone, Copy)]
pub struct ImportRequest<'a> {
    /// Identifier of the certificate to update in place; `None` creates a new one
    pub current_arn: Option<&'a str>,
    /// PEM of the leaf certificate
    pub certificate_pem: &'a [u8],
    /// PEM of the intermediate chain, possibly empty
    pub chain_pem: &'a [u8],
    /// Private key bytes
    pub private_key: &'a [u8],
}

impl std::fmt::Debug for ImportRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportRequest")
            .field("current_arn", &self.current_arn)
            .field("certificate_pem_len", &self.certificate_pem.len())
            .field("chain_pem_len", &self.chain_pem.len())
            .finish_non_exhaustive()
    }
}

/// Provider trait for remote certificate stores
#[async_trait]
pub trait CertificateGateway: Send + Sync {
    /// Import a certificate, updating `current_arn` in place when given
    /// Returns the identifier the store now holds the certificate under
    async fn import_certificate(&self, request: ImportRequest<'_>) -> Result<String, Error>;

    /// Delete a certificate
    /// A certificate the store reports as already gone counts as deleted
    async fn delete_certificate(&self, arn: &str) -> Result<(), Error>;
}

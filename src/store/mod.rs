//! # Resource Store
//!
//! Kubernetes access used by the reconciler, behind a trait so the control
//! loop can be exercised against an in-memory cluster.
//!
//! Every write is a single API call. Writes to `ACMCertificateImport` carry the
//! `resourceVersion` the caller read, so a stale write fails with
//! [`Error::Conflict`] instead of overwriting a newer object. Service writes are
//! JSON patches scoped to one annotation key, so they never clobber unrelated
//! concurrent edits.

use crate::controller::Error;
use crate::crd::AcmCertificateImport;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::ResourceExt;

pub mod kube_store;

pub use kube_store::KubeStore;

/// A change to a Service, scoped to a single annotation key
#[derive(Debug, Clone, PartialEq)]
pub enum ServicePatch {
    /// RFC 7386 merge patch; creates the annotation map when the Service has none
    Merge(serde_json::Value),
    /// RFC 6902 patch, for changes guarded by a `test` operation
    Json(json_patch::Patch),
}

/// Namespace and name of an `ACMCertificateImport`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an object as seen by a watch; cluster-scoped objects fall back to `default`
    #[must_use]
    pub fn of(import: &AcmCertificateImport) -> Self {
        Self::new(
            import.namespace().unwrap_or_else(|| "default".to_string()),
            import.name_any(),
        )
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read an import; `None` when it no longer exists
    async fn get_import(&self, key: &ResourceKey) -> Result<Option<AcmCertificateImport>, Error>;

    /// Persist `metadata.finalizers` of an import, guarded by its `resourceVersion`
    /// Returns the object as stored after the write
    async fn update_finalizers(
        &self,
        import: &AcmCertificateImport,
    ) -> Result<AcmCertificateImport, Error>;

    /// Persist the status of an import, guarded by its `resourceVersion`
    /// Returns the object as stored after the write
    async fn update_status(&self, import: &AcmCertificateImport)
        -> Result<AcmCertificateImport, Error>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, Error>;

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, Error>;

    async fn patch_service(
        &self,
        namespace: &str,
        name: &str,
        patch: &ServicePatch,
    ) -> Result<(), Error>;
}

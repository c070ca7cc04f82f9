//! # Kubernetes Store
//!
//! [`ResourceStore`] backed by the Kubernetes API server.

use crate::constants::FIELD_MANAGER;
use crate::controller::Error;
use crate::crd::AcmCertificateImport;
use crate::store::{ResourceKey, ResourceStore, ServicePatch};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

const IMPORT_KIND: &str = "ACMCertificateImport";

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn imports(&self, import: &AcmCertificateImport) -> Api<AcmCertificateImport> {
        let namespace = import.namespace().unwrap_or_else(|| "default".to_string());
        Api::namespaced(self.client.clone(), &namespace)
    }

    fn patch_params() -> PatchParams {
        PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        }
    }
}

/// Merge patch body pinning `resourceVersion` so the API server rejects stale writes
fn guarded_patch(import: &AcmCertificateImport, body: serde_json::Value) -> serde_json::Value {
    let mut patch = body;
    patch["metadata"]["resourceVersion"] = serde_json::json!(import.resource_version());
    patch
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_import(&self, key: &ResourceKey) -> Result<Option<AcmCertificateImport>, Error> {
        let api: Api<AcmCertificateImport> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name)
            .await
            .map_err(|e| Error::from_kube(e, IMPORT_KIND, &key.name))
    }

    async fn update_finalizers(
        &self,
        import: &AcmCertificateImport,
    ) -> Result<AcmCertificateImport, Error> {
        let name = import.name_any();
        let patch = guarded_patch(
            import,
            serde_json::json!({
                "metadata": { "finalizers": import.finalizers() }
            }),
        );
        debug!("Updating finalizers of {} {}", IMPORT_KIND, name);
        self.imports(import)
            .patch(&name, &Self::patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(e, IMPORT_KIND, &name))
    }

    async fn update_status(
        &self,
        import: &AcmCertificateImport,
    ) -> Result<AcmCertificateImport, Error> {
        let name = import.name_any();
        let patch = guarded_patch(
            import,
            serde_json::json!({
                "metadata": {},
                "status": serde_json::to_value(import.status.clone().unwrap_or_default())?
            }),
        );
        debug!("Updating status of {} {}", IMPORT_KIND, name);
        self.imports(import)
            .patch_status(&name, &Self::patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(e, IMPORT_KIND, &name))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::from_kube(e, "Secret", name))
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::from_kube(e, "Service", name))
    }

    async fn patch_service(
        &self,
        namespace: &str,
        name: &str,
        patch: &ServicePatch,
    ) -> Result<(), Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let params = Self::patch_params();
        let result = match patch {
            ServicePatch::Merge(body) => api.patch(name, &params, &Patch::Merge(body)).await,
            ServicePatch::Json(ops) => {
                api.patch(name, &params, &Patch::Json::<()>(ops.clone()))
                    .await
            }
        };
        result
            .map(|_| ())
            .map_err(|e| Error::from_kube(e, "Service", name))
    }
}

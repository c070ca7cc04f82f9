//! Common test utilities
//!
//! In-memory stand-ins for the Kubernetes API and ACM, plus certificate
//! fixtures. Both fakes write to one shared journal so tests can assert on the
//! order of side effects across the two systems.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use acm_import_controller::constants::{
    SECRET_CERTIFICATE_KEY, SECRET_PRIVATE_KEY_KEY, SERVICE_ANNOTATION,
};
use acm_import_controller::controller::{Error, Reconciler};
use acm_import_controller::crd::{AcmCertificateImport, AcmCertificateImportSpec, LocalRef};
use acm_import_controller::provider::{CertificateGateway, ImportRequest};
use acm_import_controller::store::{ResourceKey, ResourceStore, ServicePatch};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const NAMESPACE: &str = "ingress";

/// Ordered record of side effects across both fakes
pub type Journal = Arc<Mutex<Vec<String>>>;

fn not_found(kind: &'static str, name: &str) -> Error {
    Error::NotFound {
        kind,
        name: name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

/// A self-signed certificate with a fixed serial number
pub struct TestCertificate {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

pub fn certificate_with_serial(serial: u64) -> TestCertificate {
    let mut params = rcgen::CertificateParams::new(vec!["example.com".to_string()])
        .expect("valid subject alt names");
    // Minimal big-endian bytes, as DER wants them
    let bytes = serial.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    params.serial_number = Some(rcgen::SerialNumber::from_slice(&bytes[first..]));
    let key = rcgen::KeyPair::generate().expect("key generation");
    let certificate = params.self_signed(&key).expect("self-signed certificate");
    TestCertificate {
        certificate_pem: certificate.pem(),
        private_key_pem: key.serialize_pem(),
    }
}

/// A TLS Secret holding `certificates` (leaf first) and the leaf's key
pub fn tls_secret(name: &str, certificates: &[&TestCertificate]) -> Secret {
    let chain: String = certificates
        .iter()
        .map(|c| c.certificate_pem.as_str())
        .collect();
    let key = certificates
        .first()
        .map(|c| c.private_key_pem.clone())
        .unwrap_or_default();
    secret_with_data(
        name,
        &[
            (SECRET_CERTIFICATE_KEY, chain.into_bytes()),
            (SECRET_PRIVATE_KEY_KEY, key.into_bytes()),
        ],
    )
}

pub fn secret_with_data(name: &str, entries: &[(&str, Vec<u8>)]) -> Secret {
    let mut secret = Secret::default();
    secret.metadata.name = Some(name.to_string());
    secret.metadata.namespace = Some(NAMESPACE.to_string());
    secret.data = Some(
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), ByteString(v.clone())))
            .collect(),
    );
    secret
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

pub fn import(name: &str, secret: &str, services: &[&str]) -> AcmCertificateImport {
    let mut obj = AcmCertificateImport::new(
        name,
        AcmCertificateImportSpec {
            frozen: None,
            secret_ref: LocalRef::new(secret),
            service_refs: services.iter().map(|s| LocalRef::new(*s)).collect(),
        },
    );
    obj.metadata.namespace = Some(NAMESPACE.to_string());
    obj
}

pub fn service(name: &str, annotations: &[(&str, &str)]) -> Service {
    let mut service = Service::default();
    service.metadata.name = Some(name.to_string());
    service.metadata.namespace = Some(NAMESPACE.to_string());
    if !annotations.is_empty() {
        service.metadata.annotations = Some(
            annotations
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
    }
    service
}

pub fn key(name: &str) -> ResourceKey {
    ResourceKey::new(NAMESPACE, name)
}

// ---------------------------------------------------------------------------
// Kubernetes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Cluster {
    imports: BTreeMap<ResourceKey, AcmCertificateImport>,
    secrets: BTreeMap<(String, String), Secret>,
    services: BTreeMap<(String, String), Service>,
    next_version: u64,
    failing_services: BTreeSet<String>,
    failing_status_updates: u32,
    stale_writes: u32,
}

impl Cluster {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// In-memory API server
///
/// Writes to imports enforce `resourceVersion` like the real API server. Once
/// a deleting import has no finalizers left it disappears. Service patches
/// are applied for real with `json-patch`.
pub struct FakeStore {
    cluster: Mutex<Cluster>,
    journal: Journal,
}

impl FakeStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            cluster: Mutex::new(Cluster::default()),
            journal,
        }
    }

    pub async fn insert_import(&self, mut import: AcmCertificateImport) {
        let mut cluster = self.cluster.lock().await;
        import.metadata.resource_version = Some(cluster.bump());
        cluster.imports.insert(ResourceKey::of(&import), import);
    }

    pub async fn import(&self, key: &ResourceKey) -> Option<AcmCertificateImport> {
        self.cluster.lock().await.imports.get(key).cloned()
    }

    /// Apply an arbitrary edit as another client would, bumping the version
    pub async fn edit_import<F>(&self, key: &ResourceKey, edit: F)
    where
        F: FnOnce(&mut AcmCertificateImport),
    {
        let mut cluster = self.cluster.lock().await;
        let version = cluster.bump();
        let import = cluster.imports.get_mut(key).expect("import exists");
        edit(import);
        import.metadata.resource_version = Some(version);
    }

    /// Request deletion; the object stays while finalizers remain
    pub async fn request_deletion(&self, key: &ResourceKey) {
        let timestamp: Time = serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z"))
            .expect("valid timestamp");
        self.edit_import(key, |import| {
            import.metadata.deletion_timestamp = Some(timestamp);
        })
        .await;
        let mut cluster = self.cluster.lock().await;
        let releasable = cluster
            .imports
            .get(key)
            .is_some_and(|i| i.finalizers().is_empty());
        if releasable {
            cluster.imports.remove(key);
        }
    }

    pub async fn insert_secret(&self, secret: Secret) {
        let key = (secret.namespace().unwrap_or_default(), secret.name_any());
        self.cluster.lock().await.secrets.insert(key, secret);
    }

    pub async fn insert_service(&self, service: Service) {
        let key = (service.namespace().unwrap_or_default(), service.name_any());
        self.cluster.lock().await.services.insert(key, service);
    }

    pub async fn remove_service(&self, name: &str) {
        self.cluster
            .lock()
            .await
            .services
            .remove(&(NAMESPACE.to_string(), name.to_string()));
    }

    pub async fn service(&self, name: &str) -> Option<Service> {
        self.cluster
            .lock()
            .await
            .services
            .get(&(NAMESPACE.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn service_annotation(&self, name: &str) -> Option<String> {
        self.service(name).await.and_then(|s| {
            s.metadata
                .annotations
                .and_then(|a| a.get(SERVICE_ANNOTATION).cloned())
        })
    }

    /// Every read of this Service fails with a server error
    pub async fn fail_service(&self, name: &str) {
        self.cluster
            .lock()
            .await
            .failing_services
            .insert(name.to_string());
    }

    pub async fn heal_service(&self, name: &str) {
        self.cluster.lock().await.failing_services.remove(name);
    }

    /// The next `count` status updates fail with a server error
    pub async fn fail_status_updates(&self, count: u32) {
        self.cluster.lock().await.failing_status_updates = count;
    }

    /// The next `count` import writes are rejected as stale
    pub async fn reject_writes_as_stale(&self, count: u32) {
        self.cluster.lock().await.stale_writes = count;
    }

    async fn record(&self, entry: String) {
        self.journal.lock().await.push(entry);
    }

    fn check_version(
        cluster: &mut Cluster,
        import: &AcmCertificateImport,
    ) -> Result<ResourceKey, Error> {
        let key = ResourceKey::of(import);
        let stored = cluster
            .imports
            .get(&key)
            .ok_or_else(|| not_found("ACMCertificateImport", &key.name))?;
        if cluster.stale_writes > 0 {
            cluster.stale_writes -= 1;
            return Err(Error::Conflict {
                kind: "ACMCertificateImport",
                name: key.name,
            });
        }
        if stored.metadata.resource_version != import.metadata.resource_version {
            return Err(Error::Conflict {
                kind: "ACMCertificateImport",
                name: key.name,
            });
        }
        Ok(key)
    }
}

fn server_error(context: &str) -> Error {
    Error::Kube {
        context: context.to_string(),
        source: kube::Error::Api(
            serde_json::from_value(serde_json::json!({
                "status": "Failure",
                "message": "injected failure",
                "reason": "InternalError",
                "code": 500
            }))
            .expect("valid status"),
        ),
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn get_import(&self, key: &ResourceKey) -> Result<Option<AcmCertificateImport>, Error> {
        Ok(self.cluster.lock().await.imports.get(key).cloned())
    }

    async fn update_finalizers(
        &self,
        import: &AcmCertificateImport,
    ) -> Result<AcmCertificateImport, Error> {
        let mut cluster = self.cluster.lock().await;
        let key = Self::check_version(&mut cluster, import)?;
        let version = cluster.bump();
        let stored = cluster.imports.get_mut(&key).expect("checked above");
        stored.metadata.finalizers = import.metadata.finalizers.clone();
        stored.metadata.resource_version = Some(version);
        let result = stored.clone();

        if result.metadata.deletion_timestamp.is_some() && result.finalizers().is_empty() {
            cluster.imports.remove(&key);
        }
        drop(cluster);

        self.record(format!("update_finalizers {key}")).await;
        Ok(result)
    }

    async fn update_status(
        &self,
        import: &AcmCertificateImport,
    ) -> Result<AcmCertificateImport, Error> {
        let mut cluster = self.cluster.lock().await;
        if cluster.failing_status_updates > 0 {
            cluster.failing_status_updates -= 1;
            return Err(server_error("ACMCertificateImport status"));
        }
        let key = Self::check_version(&mut cluster, import)?;
        let version = cluster.bump();
        let stored = cluster.imports.get_mut(&key).expect("checked above");
        stored.status = import.status.clone();
        stored.metadata.resource_version = Some(version);
        let result = stored.clone();
        drop(cluster);

        self.record(format!("update_status {key}")).await;
        Ok(result)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, Error> {
        self.cluster
            .lock()
            .await
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("Secret", name))
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, Error> {
        let cluster = self.cluster.lock().await;
        if cluster.failing_services.contains(name) {
            return Err(server_error(&format!("Service {name:?}")));
        }
        cluster
            .services
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("Service", name))
    }

    async fn patch_service(
        &self,
        namespace: &str,
        name: &str,
        patch: &ServicePatch,
    ) -> Result<(), Error> {
        let mut cluster = self.cluster.lock().await;
        let service = cluster
            .services
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| not_found("Service", name))?;

        let mut document = serde_json::to_value(&*service)?;
        match patch {
            ServicePatch::Merge(body) => json_patch::merge(&mut document, body),
            ServicePatch::Json(ops) => {
                json_patch::patch(&mut document, ops).map_err(|_| Error::Conflict {
                    kind: "Service",
                    name: name.to_string(),
                })?;
            }
        }
        *service = serde_json::from_value(document)?;
        drop(cluster);

        self.record(format!("patch_service {namespace}/{name}")).await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ACM
// ---------------------------------------------------------------------------

/// Arguments of one `import_certificate` call
#[derive(Debug, Clone)]
pub struct ImportCall {
    pub current_arn: Option<String>,
    pub certificate_pem: Vec<u8>,
    pub chain_pem: Vec<u8>,
    pub private_key: Vec<u8>,
}

#[derive(Default)]
struct Acm {
    certificates: BTreeMap<String, ImportCall>,
    next_id: u64,
    imports: Vec<ImportCall>,
    deletes: Vec<String>,
    failing_imports: u32,
    failing_deletes: u32,
}

/// In-memory certificate store handing out ACM-shaped ARNs
pub struct FakeGateway {
    acm: Mutex<Acm>,
    journal: Journal,
}

impl FakeGateway {
    pub fn new(journal: Journal) -> Self {
        Self {
            acm: Mutex::new(Acm::default()),
            journal,
        }
    }

    pub async fn imports(&self) -> Vec<ImportCall> {
        self.acm.lock().await.imports.clone()
    }

    pub async fn deletes(&self) -> Vec<String> {
        self.acm.lock().await.deletes.clone()
    }

    pub async fn holds(&self, arn: &str) -> bool {
        self.acm.lock().await.certificates.contains_key(arn)
    }

    pub async fn certificate_count(&self) -> usize {
        self.acm.lock().await.certificates.len()
    }

    /// Remove a certificate behind the controller's back
    pub async fn forget(&self, arn: &str) {
        self.acm.lock().await.certificates.remove(arn);
    }

    pub async fn fail_imports(&self, count: u32) {
        self.acm.lock().await.failing_imports = count;
    }

    pub async fn fail_deletes(&self, count: u32) {
        self.acm.lock().await.failing_deletes = count;
    }
}

#[async_trait]
impl CertificateGateway for FakeGateway {
    async fn import_certificate(&self, request: ImportRequest<'_>) -> Result<String, Error> {
        let mut acm = self.acm.lock().await;
        if acm.failing_imports > 0 {
            acm.failing_imports -= 1;
            return Err(Error::remote(
                "import",
                anyhow::anyhow!("injected ImportCertificate failure"),
            ));
        }

        let call = ImportCall {
            current_arn: request.current_arn.map(ToString::to_string),
            certificate_pem: request.certificate_pem.to_vec(),
            chain_pem: request.chain_pem.to_vec(),
            private_key: request.private_key.to_vec(),
        };
        let arn = if let Some(arn) = request.current_arn {
            arn.to_string()
        } else {
            acm.next_id += 1;
            format!(
                "arn:aws:acm:eu-west-1:123456789012:certificate/{:08}",
                acm.next_id
            )
        };
        acm.certificates.insert(arn.clone(), call.clone());
        acm.imports.push(call);
        drop(acm);

        self.journal.lock().await.push(format!("acm.import {arn}"));
        Ok(arn)
    }

    async fn delete_certificate(&self, arn: &str) -> Result<(), Error> {
        let mut acm = self.acm.lock().await;
        if acm.failing_deletes > 0 {
            acm.failing_deletes -= 1;
            return Err(Error::remote(
                "delete",
                anyhow::anyhow!("injected DeleteCertificate failure"),
            ));
        }
        // Already gone counts as deleted
        acm.certificates.remove(arn);
        acm.deletes.push(arn.to_string());
        drop(acm);

        self.journal.lock().await.push(format!("acm.delete {arn}"));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A reconciler wired to fresh fakes sharing one journal
pub struct Harness {
    pub store: Arc<FakeStore>,
    pub gateway: Arc<FakeGateway>,
    pub reconciler: Reconciler,
    pub journal: Journal,
}

impl Harness {
    pub fn new() -> Self {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(FakeStore::new(Arc::clone(&journal)));
        let gateway = Arc::new(FakeGateway::new(Arc::clone(&journal)));
        let reconciler = Reconciler::new(
            Arc::clone(&store) as Arc<dyn ResourceStore>,
            Arc::clone(&gateway) as Arc<dyn CertificateGateway>,
        );
        Self {
            store,
            gateway,
            reconciler,
            journal,
        }
    }

    pub async fn journal(&self) -> Vec<String> {
        self.journal.lock().await.clone()
    }

    pub async fn clear_journal(&self) {
        self.journal.lock().await.clear();
    }
}

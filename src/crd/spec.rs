//! # ACMCertificateImport Spec
//!
//! Main CRD specification types and default values.

use serde::{Deserialize, Serialize};

/// ACMCertificateImport Custom Resource Definition
///
/// Imports the certificate held in a `kubernetes.io/tls` Secret into AWS
/// Certificate Manager and points the referenced Services at the resulting ARN.
///
/// # Example
///
/// ```yaml
/// apiVersion: acm.kubespress.com/v1alpha1
/// kind: ACMCertificateImport
/// metadata:
///   name: public-ingress
///   namespace: ingress
/// spec:
///   secretRef:
///     name: public-ingress-tls
///   serviceRefs:
///     - name: ingress-nginx-controller
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ACMCertificateImport",
    root = "AcmCertificateImport",
    group = "acm.kubespress.com",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::AcmCertificateImportStatus",
    shortname = "acmimport",
    printcolumn = r#"{"name":"Secret", "type":"string", "jsonPath":".spec.secretRef.name"}"#,
    printcolumn = r#"{"name":"Frozen", "type":"boolean", "jsonPath":".spec.frozen"}"#,
    printcolumn = r#"{"name":"ARN", "type":"string", "jsonPath":".status.arn"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AcmCertificateImportSpec {
    /// Freeze the import
    /// When true the certificate in ACM is neither updated nor deleted, even when the
    /// resource itself is deleted. Services keep being annotated.
    /// Default: false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen: Option<bool>,
    /// Secret to load the certificate from
    /// The certificate chain must be under `tls.crt` (leaf first) and the private key under `tls.key`
    pub secret_ref: LocalRef,
    /// Services that should carry the load balancer certificate annotation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_refs: Vec<LocalRef>,
}

/// Reference to an object in the same namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct LocalRef {
    pub name: String,
}

impl LocalRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

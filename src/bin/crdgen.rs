//! # CRD Generator
//!
//! Prints the `ACMCertificateImport` CustomResourceDefinition as YAML.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/acmcertificateimport.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use acm_import_controller::crd::AcmCertificateImport;
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&AcmCertificateImport::crd())?);
    Ok(())
}

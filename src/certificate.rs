//! # Certificate Loader
//!
//! Extracts the certificate material ACM needs from a TLS Secret.
//!
//! `tls.crt` holds the leaf certificate followed by any intermediates. ACM
//! wants the leaf and the rest of the chain as separate PEM documents, so the
//! chain is split at position 0 and each half re-encoded. The leaf's serial
//! number is the change-detection fingerprint recorded in the import status.

use crate::constants::{SECRET_CERTIFICATE_KEY, SECRET_PRIVATE_KEY_KEY};
use crate::controller::Error;
use k8s_openapi::api::core::v1::Secret;
use pem::{EncodeConfig, LineEnding, Pem};
use zeroize::Zeroizing;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Certificate material ready to hand to the certificate store
pub struct CertificateBundle {
    /// PEM of the leaf certificate alone
    pub certificate_pem: Vec<u8>,
    /// PEM of the remaining certificates, empty when the secret holds only the leaf
    pub chain_pem: Vec<u8>,
    /// Private key exactly as stored in the secret
    pub private_key: Zeroizing<Vec<u8>>,
    /// Decimal serial number of the leaf certificate
    pub serial_number: String,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("serial_number", &self.serial_number)
            .field("certificate_pem_len", &self.certificate_pem.len())
            .field("chain_pem_len", &self.chain_pem.len())
            .finish_non_exhaustive()
    }
}

/// Load certificate material from a Secret
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] when either key is missing or empty, or
/// when `tls.crt` holds no parseable certificate.
pub fn load_certificate_bundle(
    secret_name: &str,
    secret: &Secret,
) -> Result<CertificateBundle, Error> {
    let malformed = |reason: String| Error::MalformedInput {
        secret: secret_name.to_string(),
        reason,
    };

    let data = secret.data.as_ref();
    let certificate_bytes = data
        .and_then(|d| d.get(SECRET_CERTIFICATE_KEY))
        .map(|b| b.0.as_slice())
        .ok_or_else(|| malformed(format!("missing key {SECRET_CERTIFICATE_KEY:?}")))?;
    let private_key = data
        .and_then(|d| d.get(SECRET_PRIVATE_KEY_KEY))
        .map(|b| b.0.as_slice())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| malformed(format!("missing key {SECRET_PRIVATE_KEY_KEY:?}")))?;

    let certificates = parse_certificate_chain(certificate_bytes).map_err(malformed)?;
    let (leaf, chain) = certificates
        .split_first()
        .ok_or_else(|| malformed("no certificates found".to_string()))?;

    Ok(CertificateBundle {
        certificate_pem: encode_pem(std::slice::from_ref(leaf)),
        chain_pem: encode_pem(chain),
        private_key: Zeroizing::new(private_key.to_vec()),
        serial_number: serial_number(leaf).map_err(malformed)?,
    })
}

/// Parse every `CERTIFICATE` block in a PEM document, in order
///
/// Blocks with other tags are skipped. Each certificate block must be valid DER.
pub fn parse_certificate_chain(bytes: &[u8]) -> Result<Vec<Pem>, String> {
    let blocks = pem::parse_many(bytes).map_err(|e| format!("invalid PEM: {e}"))?;
    let certificates: Vec<Pem> = blocks
        .into_iter()
        .filter(|block| block.tag() == CERTIFICATE_TAG)
        .collect();

    for (index, certificate) in certificates.iter().enumerate() {
        x509_parser::parse_x509_certificate(certificate.contents())
            .map_err(|e| format!("certificate {index} is not valid X.509: {e}"))?;
    }

    if certificates.is_empty() {
        return Err("no certificates found".to_string());
    }
    Ok(certificates)
}

/// Decimal rendering of a certificate's serial number
///
/// The serial is read as an unsigned integer. A negative serial, which RFC 5280
/// forbids, renders as its unsigned magnitude rather than with a sign. The
/// value is only compared for change detection.
fn serial_number(certificate: &Pem) -> Result<String, String> {
    let (_, parsed) = x509_parser::parse_x509_certificate(certificate.contents())
        .map_err(|e| format!("leaf certificate is not valid X.509: {e}"))?;
    Ok(parsed.tbs_certificate.serial.to_string())
}

fn encode_pem(blocks: &[Pem]) -> Vec<u8> {
    if blocks.is_empty() {
        return Vec::new();
    }
    pem::encode_many_config(blocks, EncodeConfig::new().set_line_ending(LineEnding::LF))
        .into_bytes()
}

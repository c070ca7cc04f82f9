//! # ACMCertificateImport Status
//!
//! Status types and the lifecycle state derived from a resource.

use super::AcmCertificateImport;
use serde::{Deserialize, Serialize};

/// Status of the ACMCertificateImport resource
///
/// `arn` is present exactly while a certificate imported by this resource exists in ACM.
/// `serial_number` is only meaningful while `arn` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcmCertificateImportStatus {
    /// ARN of the imported certificate
    /// Serialized as `null` when cleared so a merge patch removes it
    #[serde(default)]
    pub arn: Option<String>,
    /// Decimal serial number of the leaf certificate last imported under `arn`
    #[serde(default)]
    pub serial_number: String,
}

/// Lifecycle state of an import, folded from `spec.frozen` and the deletion timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    /// Live resource, ACM is kept in step with the secret
    Active,
    /// Live resource, ACM is left alone
    ActiveFrozen,
    /// Deletion requested, ACM and Service state must be unwound first
    Deleting,
    /// Deletion requested, ACM state is abandoned
    DeletingFrozen,
}

impl ImportState {
    #[must_use]
    pub fn from_flags(deletion_requested: bool, frozen: bool) -> Self {
        match (deletion_requested, frozen) {
            (false, false) => Self::Active,
            (false, true) => Self::ActiveFrozen,
            (true, false) => Self::Deleting,
            (true, true) => Self::DeletingFrozen,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ActiveFrozen => "active-frozen",
            Self::Deleting => "deleting",
            Self::DeletingFrozen => "deleting-frozen",
        }
    }
}

impl AcmCertificateImport {
    /// Whether ACM mutation is suspended for this import
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.spec.frozen.unwrap_or(false)
    }

    /// Whether the API server has been asked to delete this resource
    #[must_use]
    pub fn is_deletion_requested(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    #[must_use]
    pub fn state(&self) -> ImportState {
        ImportState::from_flags(self.is_deletion_requested(), self.is_frozen())
    }

    /// ARN of the currently imported certificate; an empty string counts as absent
    #[must_use]
    pub fn arn(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.arn.as_deref())
            .filter(|arn| !arn.is_empty())
    }

    /// Serial number recorded for the current import, empty when never imported
    #[must_use]
    pub fn serial_number(&self) -> &str {
        self.status
            .as_ref()
            .map_or("", |s| s.serial_number.as_str())
    }

    /// Names of the Services this import annotates, in declaration order
    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        self.spec
            .service_refs
            .iter()
            .map(|r| r.name.as_str())
            .collect()
    }
}

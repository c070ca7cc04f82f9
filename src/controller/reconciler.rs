//! # Reconciler
//!
//! Core reconciliation logic for `ACMCertificateImport` resources.
//!
//! ## Reconciliation Flow
//!
//! 1. Load the resource by key; a missing resource is a no-op
//! 2. Classify it into an [`ImportState`]
//! 3. Active:
//!    - Add the finalizer and persist it
//!    - Unless frozen, import the secret's certificate into ACM when its serial
//!      number differs from the one recorded in status, then persist `arn` and
//!      `serialNumber`
//!    - Annotate every referenced Service with the ARN
//! 4. Deleting:
//!    - Frozen or never imported: drop the finalizer
//!    - Otherwise remove the annotations this import set, delete the ACM
//!      certificate and clear `arn`; the next pass drops the finalizer
//!
//! Each step is re-entrant. A failure aborts the pass with nothing rolled back,
//! and the next pass picks up where this one stopped.

use crate::certificate::load_certificate_bundle;
use crate::constants::SERVICE_ANNOTATION;
use crate::controller::{annotations, finalizer, Error};
use crate::crd::{AcmCertificateImport, AcmCertificateImportStatus, ImportState};
use crate::provider::{CertificateGateway, ImportRequest};
use crate::store::{ResourceKey, ResourceStore};
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// What a reconcile pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The resource no longer exists
    NotFound,
    /// The finalizer was added; the certificate was already current or frozen
    FinalizerAdded,
    /// A certificate was imported into ACM and recorded in status
    Imported,
    /// Everything was already in the desired state
    Synced,
    /// The finalizer was removed, releasing the resource for deletion
    FinalizerRemoved,
    /// The ACM certificate was deleted and `arn` cleared; the finalizer is still held
    RemoteDeleted,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::FinalizerAdded => "finalizer_added",
            Self::Imported => "imported",
            Self::Synced => "synced",
            Self::FinalizerRemoved => "finalizer_removed",
            Self::RemoteDeleted => "remote_deleted",
        }
    }
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives one `ACMCertificateImport` towards its desired state per call
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    gateway: Arc<dyn CertificateGateway>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: Arc<dyn ResourceStore>, gateway: Arc<dyn CertificateGateway>) -> Self {
        Self { store, gateway }
    }

    /// Run one reconcile pass for the resource at `key`
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. Annotation failures across
    /// several Services are reported together as [`Error::Aggregate`].
    pub async fn reconcile(&self, key: &ResourceKey) -> Result<ReconcileOutcome, Error> {
        let Some(import) = self.store.get_import(key).await? else {
            debug!("ACMCertificateImport {} no longer exists", key);
            return Ok(ReconcileOutcome::NotFound);
        };

        let state = import.state();
        let span = info_span!(
            "reconcile",
            resource.namespace = key.namespace.as_str(),
            resource.name = key.name.as_str(),
            resource.state = ?state
        );

        async move {
            match state {
                ImportState::Active | ImportState::ActiveFrozen => {
                    self.reconcile_active(key, import).await
                }
                ImportState::Deleting | ImportState::DeletingFrozen => {
                    self.reconcile_delete(key, import).await
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn reconcile_active(
        &self,
        key: &ResourceKey,
        import: AcmCertificateImport,
    ) -> Result<ReconcileOutcome, Error> {
        let (import, finalizer_added) = self.ensure_finalizer(import).await?;
        let (import, imported) = self.ensure_certificate_current(key, import).await?;
        self.ensure_service_annotations(key, &import).await?;

        Ok(if imported {
            ReconcileOutcome::Imported
        } else if finalizer_added {
            ReconcileOutcome::FinalizerAdded
        } else {
            ReconcileOutcome::Synced
        })
    }

    async fn ensure_finalizer(
        &self,
        mut import: AcmCertificateImport,
    ) -> Result<(AcmCertificateImport, bool), Error> {
        if !finalizer::ensure(&mut import.metadata) {
            return Ok((import, false));
        }
        let stored = self.store.update_finalizers(&import).await?;
        debug!("Added finalizer");
        Ok((stored, true))
    }

    async fn ensure_certificate_current(
        &self,
        key: &ResourceKey,
        mut import: AcmCertificateImport,
    ) -> Result<(AcmCertificateImport, bool), Error> {
        if import.is_frozen() {
            debug!("Import is frozen, leaving ACM untouched");
            return Ok((import, false));
        }

        let secret_name = import.spec.secret_ref.name.clone();
        let secret = self.store.get_secret(&key.namespace, &secret_name).await?;
        let bundle = load_certificate_bundle(&secret_name, &secret)?;

        if import.serial_number() == bundle.serial_number {
            debug!(
                certificate.serial = bundle.serial_number.as_str(),
                "Certificate already current"
            );
            return Ok((import, false));
        }

        info!(
            certificate.arn = import.arn().unwrap_or(""),
            certificate.serial = bundle.serial_number.as_str(),
            "Importing certificate into ACM"
        );
        let arn = self
            .gateway
            .import_certificate(ImportRequest {
                current_arn: import.arn(),
                certificate_pem: &bundle.certificate_pem,
                chain_pem: &bundle.chain_pem,
                private_key: &bundle.private_key,
            })
            .await?;

        import.status = Some(AcmCertificateImportStatus {
            arn: Some(arn),
            serial_number: bundle.serial_number.clone(),
        });
        let stored = self.store.update_status(&import).await?;
        Ok((stored, true))
    }

    async fn ensure_service_annotations(
        &self,
        key: &ResourceKey,
        import: &AcmCertificateImport,
    ) -> Result<usize, Error> {
        let Some(arn) = import.arn() else {
            return Ok(0);
        };
        annotations::apply(
            self.store.as_ref(),
            &key.namespace,
            &import.service_names(),
            SERVICE_ANNOTATION,
            arn,
        )
        .await
    }

    async fn reconcile_delete(
        &self,
        key: &ResourceKey,
        mut import: AcmCertificateImport,
    ) -> Result<ReconcileOutcome, Error> {
        // Frozen or never imported: nothing remote to unwind
        let remote_arn = match import.state() {
            ImportState::Deleting => import.arn().map(ToString::to_string),
            _ => None,
        };
        let Some(arn) = remote_arn else {
            if !finalizer::release(&mut import.metadata) {
                return Ok(ReconcileOutcome::Synced);
            }
            self.store.update_finalizers(&import).await?;
            info!("Removed finalizer");
            return Ok(ReconcileOutcome::FinalizerRemoved);
        };

        annotations::remove(
            self.store.as_ref(),
            &key.namespace,
            &import.service_names(),
            SERVICE_ANNOTATION,
            &arn,
        )
        .await?;

        info!(certificate.arn = arn.as_str(), "Deleting certificate from ACM");
        self.gateway.delete_certificate(&arn).await?;

        let status = import.status.get_or_insert_with(Default::default);
        status.arn = None;
        self.store.update_status(&import).await?;
        Ok(ReconcileOutcome::RemoteDeleted)
    }
}

//! # AWS Certificate Manager Client
//!
//! [`CertificateGateway`] backed by AWS Certificate Manager.
//!
//! Credentials come from the SDK default chain. In-cluster this is IRSA: the
//! pod's service account carries `eks.amazonaws.com/role-arn` and the SDK
//! exchanges the projected token for role credentials.

use crate::controller::Error;
use crate::observability::metrics;
use crate::provider::{CertificateGateway, ImportRequest};
use async_trait::async_trait;
use aws_sdk_acm::error::DisplayErrorContext;
use aws_sdk_acm::primitives::Blob;
use aws_sdk_acm::Client as AcmClient;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};

/// AWS Certificate Manager provider implementation
pub struct AcmCertificateGateway {
    client: AcmClient,
    region: String,
}

impl std::fmt::Debug for AcmCertificateGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcmCertificateGateway")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AcmCertificateGateway {
    /// Create a new ACM client from the default credential chain
    /// `region` overrides the region the chain would otherwise resolve
    pub async fn new(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;
        let region = sdk_config
            .region()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);
        info!("Using AWS Certificate Manager in region {}", region);

        Self {
            client: AcmClient::new(&sdk_config),
            region,
        }
    }

    #[must_use]
    pub fn from_client(client: AcmClient, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }
}

#[async_trait]
impl CertificateGateway for AcmCertificateGateway {
    async fn import_certificate(&self, request: ImportRequest<'_>) -> Result<String, Error> {
        let span = info_span!(
            "aws.acm.import_certificate",
            certificate.arn = request.current_arn.unwrap_or(""),
            region = self.region.as_str()
        );
        let start = Instant::now();

        async move {
            let mut call = self
                .client
                .import_certificate()
                .certificate(Blob::new(request.certificate_pem))
                .private_key(Blob::new(request.private_key))
                .set_certificate_arn(request.current_arn.map(ToString::to_string));
            if !request.chain_pem.is_empty() {
                call = call.certificate_chain(Blob::new(request.chain_pem));
            }

            let output = call.send().await.map_err(|e| {
                metrics::increment_acm_operation_errors("import");
                Error::remote("import", anyhow::anyhow!("{}", DisplayErrorContext(&e)))
            })?;
            metrics::record_acm_operation("import", start.elapsed().as_secs_f64());

            output
                .certificate_arn()
                .map(ToString::to_string)
                .ok_or_else(|| {
                    Error::remote(
                        "import",
                        anyhow::anyhow!("ImportCertificate response carried no certificate ARN"),
                    )
                })
        }
        .instrument(span)
        .await
    }

    async fn delete_certificate(&self, arn: &str) -> Result<(), Error> {
        let span = info_span!(
            "aws.acm.delete_certificate",
            certificate.arn = arn,
            region = self.region.as_str()
        );
        let start = Instant::now();

        async move {
            match self
                .client
                .delete_certificate()
                .certificate_arn(arn)
                .send()
                .await
            {
                Ok(_) => {
                    metrics::record_acm_operation("delete", start.elapsed().as_secs_f64());
                    Ok(())
                }
                Err(e)
                    if e.as_service_error()
                        .is_some_and(|se| se.is_resource_not_found_exception()) =>
                {
                    debug!("ACM certificate {} already deleted", arn);
                    metrics::record_acm_operation("delete", start.elapsed().as_secs_f64());
                    Ok(())
                }
                Err(e) => {
                    metrics::increment_acm_operation_errors("delete");
                    Err(Error::remote(
                        "delete",
                        anyhow::anyhow!("{}", DisplayErrorContext(&e)),
                    ))
                }
            }
        }
        .instrument(span)
        .await
    }
}

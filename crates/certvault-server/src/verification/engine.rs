//! Certificate verification.
//!
//! Answers "is certificate X valid right now" and records every attempt,
//! including attempts against unknown IDs. Verifying never mutates the
//! certificate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use certvault_core::{Certificate, Validity, compute_validity};

use super::device;
use super::geo::{GeoLocator, NoGeoLocator};
use crate::storage::{CertificateGateway, DatabaseError, NewVerificationEvent, Template};

/// Caller-supplied request details, passed through to the event log.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Answer returned to the verifier.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub certificate_id: String,
    pub found: bool,
    pub certificate: Option<Certificate>,
    pub template: Option<Template>,
    /// `None` when the certificate was not found.
    pub validity: Option<Validity>,
    pub successful: bool,
    pub verified_at: DateTime<Utc>,
    /// `false` when the audit event could not be written.
    pub event_recorded: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Certificate ID must not be empty")]
    EmptyIdentifier,

    /// The certificate could not be looked up. Retryable.
    #[error("Certificate lookup failed: {0}")]
    LookupFailed(#[source] DatabaseError),
}

impl VerifyError {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LookupFailed(_))
    }
}

struct EventMetadata {
    device_info: Option<String>,
    geo_info: Option<String>,
}

/// Verifies certificates against a gateway and logs each attempt.
pub struct VerificationEngine<G, L = NoGeoLocator> {
    gateway: G,
    geo: L,
}

impl<G: CertificateGateway> VerificationEngine<G, NoGeoLocator> {
    pub const fn new(gateway: G) -> Self {
        Self {
            gateway,
            geo: NoGeoLocator,
        }
    }
}

impl<G: CertificateGateway, L: GeoLocator> VerificationEngine<G, L> {
    pub const fn with_geo_locator(gateway: G, geo: L) -> Self {
        Self { gateway, geo }
    }

    /// Verify `certificate_id` as of now.
    pub async fn verify(
        &self,
        certificate_id: &str,
        ctx: &RequestContext,
    ) -> Result<VerificationResult, VerifyError> {
        self.verify_at(certificate_id, ctx, Utc::now()).await
    }

    /// Verify `certificate_id` as of `now`.
    ///
    /// Exactly one event is appended per call that passes identifier
    /// validation, whatever the outcome. A failed append is logged and
    /// reported through `event_recorded` but never changes the answer. A
    /// failed lookup still attempts to log a failed event before returning
    /// `LookupFailed`.
    #[instrument(skip_all, fields(certificate_id = %certificate_id.trim()))]
    pub async fn verify_at(
        &self,
        certificate_id: &str,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<VerificationResult, VerifyError> {
        let certificate_id = certificate_id.trim();
        if certificate_id.is_empty() {
            return Err(VerifyError::EmptyIdentifier);
        }

        let (certificate, lookup_error) = match self.gateway.find_certificate(certificate_id).await {
            Ok(certificate) => (certificate, None),
            Err(e) => (None, Some(e)),
        };

        let validity = certificate.as_ref().map(|c| compute_validity(c, now));
        let successful = validity.is_some_and(Validity::is_valid);

        let metadata = self.collect_metadata(ctx).await;
        let event_recorded = self
            .record_event(certificate_id, ctx, &metadata, successful, now)
            .await;

        if let Some(e) = lookup_error {
            error!(error = %e, event_recorded, "Certificate lookup failed during verification");
            return Err(VerifyError::LookupFailed(e));
        }

        let template = match certificate.as_ref().and_then(|c| c.template_id) {
            Some(template_id) => self.lookup_template(template_id).await,
            None => None,
        };

        info!(
            found = certificate.is_some(),
            validity = validity.map_or("not_found", Validity::as_str),
            successful,
            "Certificate verified"
        );

        Ok(VerificationResult {
            certificate_id: certificate_id.to_string(),
            found: certificate.is_some(),
            certificate,
            template,
            validity,
            successful,
            verified_at: now,
            event_recorded,
        })
    }

    async fn collect_metadata(&self, ctx: &RequestContext) -> EventMetadata {
        let device_info = ctx
            .user_agent
            .as_deref()
            .and_then(|ua| device::detect(ua).to_json());

        let geo_info = match ctx.ip_address.as_deref() {
            Some(ip) => match self.geo.locate(ip).await {
                Ok(geo) => geo.and_then(|g| g.to_json()),
                Err(e) => {
                    warn!(error = %e, "Geo lookup failed; recording verification without location");
                    None
                }
            },
            None => None,
        };

        EventMetadata {
            device_info,
            geo_info,
        }
    }

    async fn record_event(
        &self,
        certificate_id: &str,
        ctx: &RequestContext,
        metadata: &EventMetadata,
        successful: bool,
        now: DateTime<Utc>,
    ) -> bool {
        let event = NewVerificationEvent {
            certificate_id,
            verified_at: now,
            ip_address: ctx.ip_address.as_deref(),
            user_agent: ctx.user_agent.as_deref(),
            device_info: metadata.device_info.as_deref(),
            geo_info: metadata.geo_info.as_deref(),
            successful,
        };
        match self.gateway.append_verification_event(&event).await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "Failed to record verification event");
                false
            }
        }
    }

    /// Template details are display-only; a failure degrades to `None`.
    async fn lookup_template(&self, template_id: i64) -> Option<Template> {
        match self.gateway.find_template(template_id).await {
            Ok(template) => template,
            Err(e) => {
                warn!(template_id, error = %e, "Template lookup failed during verification");
                None
            }
        }
    }
}

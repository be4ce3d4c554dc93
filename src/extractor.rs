// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for Fident-authenticated identities.
//!
//! The verifier only reports; these extractors are where a host turns the
//! report into a decision. Any state works as long as `Arc<Verifier>` can be
//! pulled out of it with `FromRef`:
//!
//! ```rust,ignore
//! async fn my_orders(FidentIdentity(identity): FidentIdentity) -> impl IntoResponse {
//!     // identity.identity_id carries a valid Fident signature
//! }
//!
//! let app = Router::new()
//!     .route("/orders", get(my_orders))
//!     .with_state(Arc::new(Verifier::new(store)));
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::verifier::{Authentication, VerificationOutcome, VerifiedIdentity, Verifier};

/// Why an extractor refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRejection {
    /// No `<Prefix>-Identity-Id` header
    MissingIdentity,
    /// Identity claimed but the signature did not verify
    InvalidSignature(VerificationOutcome),
}

#[derive(Serialize)]
struct RejectionBody {
    error: String,
    error_code: String,
}

impl IdentityRejection {
    pub fn error_code(&self) -> &'static str {
        match self {
            IdentityRejection::MissingIdentity => "missing_identity",
            IdentityRejection::InvalidSignature(_) => "invalid_signature",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl std::fmt::Display for IdentityRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityRejection::MissingIdentity => write!(f, "Fident identity is required"),
            // The outcome stays in logs; clients only learn that the check failed.
            IdentityRejection::InvalidSignature(_) => {
                write!(f, "Fident signature could not be verified")
            }
        }
    }
}

impl std::error::Error for IdentityRejection {}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(RejectionBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

/// Extractor that requires a verified Fident identity.
pub struct FidentIdentity(pub VerifiedIdentity);

impl<S> FromRequestParts<S> for FidentIdentity
where
    Arc<Verifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve(parts, state) {
            Ok(Some(identity)) => Ok(FidentIdentity(identity)),
            Ok(None) => Err(IdentityRejection::MissingIdentity),
            Err(rejection) => Err(rejection),
        }
    }
}

/// Optional identity extractor.
///
/// Anonymous requests yield `None`. A claimed identity that fails
/// verification is still rejected: a forged claim is not the same as no claim.
pub struct OptionalFidentIdentity(pub Option<VerifiedIdentity>);

impl<S> FromRequestParts<S> for OptionalFidentIdentity
where
    Arc<Verifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts, state).map(OptionalFidentIdentity)
    }
}

/// Identity verified by [`resolve`] for this request.
///
/// Private so that only this module can fill the cache; a bare
/// `VerifiedIdentity` inserted by other middleware is ignored.
#[derive(Clone)]
struct CachedIdentity(VerifiedIdentity);

/// Verify once per request; later extractors reuse the cached identity.
fn resolve<S>(
    parts: &mut Parts,
    state: &S,
) -> Result<Option<VerifiedIdentity>, IdentityRejection>
where
    Arc<Verifier>: FromRef<S>,
{
    if let Some(CachedIdentity(identity)) = parts.extensions.get::<CachedIdentity>() {
        return Ok(Some(identity.clone()));
    }

    let verifier = Arc::<Verifier>::from_ref(state);
    match verifier.authenticate(&*parts) {
        Authentication::Anonymous => Ok(None),
        Authentication::Verified(identity) => {
            parts.extensions.insert(CachedIdentity(identity.clone()));
            Ok(Some(identity))
        }
        Authentication::Rejected(outcome) => {
            warn!(
                path = parts.uri.path(),
                reason = outcome.reason(),
                "Rejected request with unverifiable Fident identity"
            );
            Err(IdentityRejection::InvalidSignature(outcome))
        }
    }
}

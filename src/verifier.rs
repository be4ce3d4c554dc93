// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fident request verification.
//!
//! ## Checks
//!
//! - [`Verifier::has_identity_claim`] / [`Verifier::identity_claim`] only look
//!   at the identity header. They prove nothing on their own.
//! - [`Verifier::verify_signature`] rebuilds the canonical message and checks
//!   the RSA signature in `<Prefix>-Signature` against the trusted key.
//!
//! Every failure collapses to `false` for callers. [`Verifier::check`] exposes
//! the tagged [`VerificationOutcome`] for hosts that want to log the reason.

use std::sync::Arc;

use base64::{
    alphabet,
    engine::{
        general_purpose::URL_SAFE_NO_PAD, DecodePaddingMode, GeneralPurpose,
        GeneralPurposeConfig,
    },
    Engine,
};
use serde::Serialize;
use tracing::debug;

use crate::canonical::CanonicalMessage;
use crate::headers::HeaderContract;
use crate::key_store::{KeyStore, TrustedKey};
use crate::request::SignedRequest;

/// URL-safe base64 with optional padding.
const SIGNATURE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a signature check passed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Valid,
    /// No trusted key is installed.
    KeyMissing,
    /// The signature header is absent or empty.
    MissingSignature,
    /// The signature header is not valid base64url.
    MalformedSignature,
    /// A signed header (or the signature header) was repeated.
    AmbiguousHeader,
    /// The signature does not match the canonical message under the trusted key.
    DigestMismatch,
}

impl VerificationOutcome {
    pub fn is_valid(self) -> bool {
        self == VerificationOutcome::Valid
    }

    /// Stable reason string for logs.
    pub fn reason(self) -> &'static str {
        match self {
            VerificationOutcome::Valid => "valid",
            VerificationOutcome::KeyMissing => "key_missing",
            VerificationOutcome::MissingSignature => "missing_signature",
            VerificationOutcome::MalformedSignature => "malformed_signature",
            VerificationOutcome::AmbiguousHeader => "ambiguous_header",
            VerificationOutcome::DigestMismatch => "digest_mismatch",
        }
    }
}

/// An identity whose headers carry a valid Fident signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    /// Value of `<Prefix>-Identity-Id`.
    pub identity_id: String,
    /// Canonical names of the headers covered by the signature.
    pub signed_headers: Vec<String>,
    /// Fingerprint of the key that verified the signature.
    #[serde(skip)]
    pub key_fingerprint: String,
}

/// Combined claim and signature result for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// No identity claim attached.
    Anonymous,
    Verified(VerifiedIdentity),
    /// An identity is claimed but the signature check failed.
    Rejected(VerificationOutcome),
}

struct SignatureMatch {
    message: CanonicalMessage,
    key: Arc<TrustedKey>,
}

/// Verifies Fident headers against a shared [`KeyStore`].
#[derive(Debug, Clone)]
pub struct Verifier {
    store: Arc<KeyStore>,
    contract: HeaderContract,
}

impl Verifier {
    /// Verifier using the default `X-Fident` header prefix.
    pub fn new(store: Arc<KeyStore>) -> Self {
        Self::with_contract(store, HeaderContract::default())
    }

    pub fn with_contract(store: Arc<KeyStore>, contract: HeaderContract) -> Self {
        Self { store, contract }
    }

    pub fn contract(&self) -> &HeaderContract {
        &self.contract
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.store
    }

    /// Whether the identity header is present and non-empty.
    ///
    /// Not proof of authenticity; pair with [`verify_signature`](Self::verify_signature).
    pub fn has_identity_claim<R: SignedRequest + ?Sized>(&self, request: &R) -> bool {
        request
            .first_header(self.contract.identity_header())
            .is_some_and(|v| !v.is_empty())
    }

    /// Raw identity header value, or an empty string when absent.
    pub fn identity_claim<R: SignedRequest + ?Sized>(&self, request: &R) -> String {
        request
            .first_header(self.contract.identity_header())
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default()
    }

    /// Whether the request carries a valid Fident signature.
    pub fn verify_signature<R: SignedRequest + ?Sized>(&self, request: &R) -> bool {
        self.check(request).is_valid()
    }

    /// Signature check with the failure reason kept.
    pub fn check<R: SignedRequest + ?Sized>(&self, request: &R) -> VerificationOutcome {
        match self.match_signature(request) {
            Ok(_) => VerificationOutcome::Valid,
            Err(outcome) => outcome,
        }
    }

    /// Claim presence and signature validity in one pass.
    pub fn authenticate<R: SignedRequest + ?Sized>(&self, request: &R) -> Authentication {
        if !self.has_identity_claim(request) {
            return Authentication::Anonymous;
        }

        match self.match_signature(request) {
            Ok(matched) => Authentication::Verified(VerifiedIdentity {
                identity_id: self.identity_claim(request),
                signed_headers: matched.message.signed_headers().to_vec(),
                key_fingerprint: matched.key.fingerprint().to_string(),
            }),
            Err(outcome) => Authentication::Rejected(outcome),
        }
    }

    fn match_signature<R: SignedRequest + ?Sized>(
        &self,
        request: &R,
    ) -> Result<SignatureMatch, VerificationOutcome> {
        let target = request.request_target();

        let Some(key) = self.store.current() else {
            debug!(target_uri = target, reason = "key_missing", "Fident signature rejected");
            return Err(VerificationOutcome::KeyMissing);
        };

        let message = CanonicalMessage::build(request, &self.contract).map_err(|e| {
            debug!(
                target_uri = target,
                header = %e.name,
                values = e.count,
                reason = "ambiguous_header",
                "Fident signature rejected"
            );
            VerificationOutcome::AmbiguousHeader
        })?;

        let signature = self.decode_signature(request).inspect_err(|outcome| {
            debug!(
                target_uri = target,
                reason = outcome.reason(),
                "Fident signature rejected"
            );
        })?;

        let digest = URL_SAFE_NO_PAD.encode(message.digest());
        if !key.verify(message.as_bytes(), &signature) {
            debug!(
                target_uri = target,
                digest = %digest,
                signed_headers = ?message.signed_headers(),
                reason = "digest_mismatch",
                "Fident signature rejected"
            );
            return Err(VerificationOutcome::DigestMismatch);
        }

        debug!(
            target_uri = target,
            digest = %digest,
            key = key.fingerprint(),
            "Fident signature verified"
        );
        Ok(SignatureMatch { message, key })
    }

    fn decode_signature<R: SignedRequest + ?Sized>(
        &self,
        request: &R,
    ) -> Result<Vec<u8>, VerificationOutcome> {
        let values = request.header_values(self.contract.signature_header());
        let encoded = match values.as_slice() {
            [] => return Err(VerificationOutcome::MissingSignature),
            [value] => *value,
            _ => return Err(VerificationOutcome::AmbiguousHeader),
        };

        if encoded.is_empty() {
            return Err(VerificationOutcome::MissingSignature);
        }

        SIGNATURE_ENGINE
            .decode(encoded)
            .map_err(|_| VerificationOutcome::MalformedSignature)
    }
}

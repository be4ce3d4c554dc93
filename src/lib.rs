// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fident Verify - offline verification of Fident-signed requests
//!
//! Fident sits in front of services and attaches the authenticated identity to
//! each proxied request as `X-Fident-*` headers, signed with its RSA key. This
//! crate checks those headers without calling Fident.
//!
//! ## Modules
//!
//! - `key_store` - The trusted public key (load once, swap atomically)
//! - `canonical` - Canonical message the signature covers
//! - `verifier` - Identity claim and signature checks
//! - `extractor` - Axum extractors gating handlers on a verified identity
//! - `config` / `logging` - Environment configuration and tracing setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = FidentConfig::from_env()?;
//! logging::init_tracing(config.log_format);
//! let verifier = config.build_verifier()?;
//!
//! if verifier.has_identity_claim(&request) && verifier.verify_signature(&request) {
//!     let user = verifier.identity_claim(&request);
//! }
//! ```

pub mod canonical;
pub mod config;
pub mod error;
pub mod extractor;
pub mod headers;
pub mod key_store;
pub mod logging;
pub mod request;
pub mod verifier;

pub use canonical::{AmbiguousHeader, CanonicalMessage};
pub use config::{ConfigError, FidentConfig, LogFormat};
pub use error::{KeyError, KeyResult};
pub use extractor::{FidentIdentity, IdentityRejection, OptionalFidentIdentity};
pub use headers::{canonical_header_name, HeaderContract, DEFAULT_HEADER_PREFIX};
pub use key_store::{DecodedKey, KeyStore, TrustedKey};
pub use request::{RequestView, SignedRequest};
pub use verifier::{Authentication, VerificationOutcome, VerifiedIdentity, Verifier};

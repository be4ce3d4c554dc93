// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key provisioning errors.
//!
//! Only initialisation of the trusted key can fail with an error. Verification
//! never raises; it reports a [`VerificationOutcome`](crate::verifier::VerificationOutcome)
//! and collapses it to a boolean for callers.

use std::io;
use std::path::PathBuf;

/// Errors raised while loading the trusted public key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The key file could not be read.
    #[error("failed to read public key file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No PEM block was found, or its payload is not a SubjectPublicKeyInfo.
    #[error("no Fident public key found: {0}")]
    Format(String),

    /// The key decoded fine but is not an RSA key.
    #[error("unsupported public key algorithm {algorithm} (expected RSA)")]
    KeyType { algorithm: String },

    /// RSA key whose modulus size cannot be used for verification.
    #[error("unsupported RSA modulus size of {bits} bits (expected 1024 to 8192)")]
    KeySize { bits: usize },
}

impl KeyError {
    /// Stable error code for logs and host-side error mapping.
    pub fn error_code(&self) -> &'static str {
        match self {
            KeyError::Io { .. } => "key_io_error",
            KeyError::Format(_) => "key_format_error",
            KeyError::KeyType { .. } => "key_type_error",
            KeyError::KeySize { .. } => "key_size_error",
        }
    }
}

pub type KeyResult<T> = Result<T, KeyError>;

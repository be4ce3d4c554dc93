// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fident header contract.
//!
//! Every header Fident adds to a proxied request shares one prefix:
//!
//! | Header | Meaning |
//! |--------|---------|
//! | `<Prefix>-Identity-Id` | Opaque identity identifier (the claim) |
//! | `<Prefix>-Signature` | base64url RSA signature over the canonical message |
//! | any other `<Prefix>*` | Signed content, folded into the canonical message |
//!
//! Header names travel case-insensitively, but the signer hashes them in
//! MIME-canonical form (`X-Fident-Identity-Id`), so selection and ordering are
//! done on [`canonical_header_name`].

/// Default header prefix used by Fident.
pub const DEFAULT_HEADER_PREFIX: &str = "X-Fident";

const IDENTITY_SUFFIX: &str = "-Identity-Id";
const SIGNATURE_SUFFIX: &str = "-Signature";

/// Names of the headers the verifier reads, derived from one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderContract {
    prefix: String,
    identity_header: String,
    signature_header: String,
}

impl HeaderContract {
    /// Build a contract for `prefix`.
    ///
    /// The prefix is stored in canonical form so it matches the canonical
    /// header names produced from the wire.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let prefix = canonical_header_name(prefix.as_ref());
        Self {
            identity_header: format!("{prefix}{IDENTITY_SUFFIX}"),
            signature_header: format!("{prefix}{SIGNATURE_SUFFIX}"),
            prefix,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Canonical name of the identity claim header.
    pub fn identity_header(&self) -> &str {
        &self.identity_header
    }

    /// Canonical name of the signature header.
    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }

    /// Whether a canonical header name is part of the signed content.
    ///
    /// The prefix match is case-sensitive and the signature header itself is
    /// never signed.
    pub fn is_signed_header(&self, canonical_name: &str) -> bool {
        canonical_name.starts_with(&self.prefix) && canonical_name != self.signature_header
    }
}

impl Default for HeaderContract {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_PREFIX)
    }
}

/// MIME-canonical form of a header name.
///
/// The first character and every character following a hyphen are
/// upper-cased, everything else is lower-cased. Names containing a space or
/// a byte outside the token alphabet are returned unchanged, matching how
/// the signer treats them.
pub fn canonical_header_name(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

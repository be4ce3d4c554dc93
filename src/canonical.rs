// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical message construction.
//!
//! The signed payload is the request target followed by `name ++ value` for
//! every prefixed header (signature header excluded), ordered by canonical
//! header name, byte-wise ascending, with no delimiters:
//!
//! ```text
//! /orders/42?x=1 X-Fident-Identity-Id u-9     (spaces shown for clarity only)
//! ```
//!
//! Changing the selection, ordering or concatenation rules here breaks every
//! signature Fident has issued. Any such change needs a new protocol version.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::headers::{canonical_header_name, HeaderContract};
use crate::request::SignedRequest;

/// A signed header arrived with more than one value.
///
/// The protocol carries one value per header, so repeated signed headers are
/// rejected rather than resolved by picking one of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("signed header {name} carries {count} values")]
pub struct AmbiguousHeader {
    pub name: String,
    pub count: usize,
}

/// The byte string Fident signs for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    bytes: Vec<u8>,
    signed_headers: Vec<String>,
}

impl CanonicalMessage {
    /// Rebuild the canonical message of `request` under `contract`.
    pub fn build<R>(request: &R, contract: &HeaderContract) -> Result<Self, AmbiguousHeader>
    where
        R: SignedRequest + ?Sized,
    {
        let mut selected: BTreeMap<String, Vec<&[u8]>> = BTreeMap::new();
        for (name, value) in request.header_entries() {
            let name = canonical_header_name(name);
            if contract.is_signed_header(&name) {
                selected.entry(name).or_default().push(value);
            }
        }

        let mut bytes = request.request_target().as_bytes().to_vec();
        let mut signed_headers = Vec::with_capacity(selected.len());
        for (name, values) in selected {
            let [value] = values.as_slice() else {
                return Err(AmbiguousHeader {
                    count: values.len(),
                    name,
                });
            };
            bytes.extend_from_slice(name.as_bytes());
            bytes.extend_from_slice(value);
            signed_headers.push(name);
        }

        Ok(Self {
            bytes,
            signed_headers,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Canonical names of the headers folded into the message, in order.
    pub fn signed_headers(&self) -> &[String] {
        &self.signed_headers
    }

    /// SHA-256 digest of the message.
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(&self.bytes).into()
    }
}

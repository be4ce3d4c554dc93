// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test signer standing in for the Fident identity service.

#![allow(dead_code)]

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE, Engine};
use fident_verify::{KeyStore, Verifier};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};

pub const SIGNER_PRIVATE: &[u8] = include_bytes!("../fixtures/signer_private.pem");
pub const SIGNER_PUBLIC: &[u8] = include_bytes!("../fixtures/signer_public.pem");
pub const OTHER_PUBLIC: &[u8] = include_bytes!("../fixtures/other_public.pem");
pub const EC_PUBLIC: &[u8] = include_bytes!("../fixtures/ec_public.pem");
pub const LEGACY_1024_PUBLIC: &[u8] = include_bytes!("../fixtures/legacy_1024_public.pem");
pub const WEAK_512_PUBLIC: &[u8] = include_bytes!("../fixtures/weak_512_public.pem");

/// OpenSSL signature over `/orders/42?x=1X-Fident-Identity-Idu-9` made with
/// the 1024-bit key.
pub const LEGACY_1024_ORDERS_SIGNATURE: &str =
    include_str!("../fixtures/legacy_1024_orders_42_signature.txt");

/// Signs canonical messages the way Fident does.
pub struct TestSigner {
    key_pair: RsaKeyPair,
}

impl TestSigner {
    pub fn new() -> Self {
        let block = pem::parse(SIGNER_PRIVATE).expect("Failed to parse signer PEM");
        let key_pair =
            RsaKeyPair::from_pkcs8(block.contents()).expect("Failed to load signer key");
        Self { key_pair }
    }

    /// base64url (padded) RSA-SHA256 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> String {
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &SystemRandom::new(), message, &mut signature)
            .expect("Failed to sign");
        URL_SAFE.encode(signature)
    }

    /// Sign `target` plus `headers`, which must already be in canonical
    /// form. Headers are sorted here, independently of the crate.
    pub fn sign_request(&self, target: &str, headers: &[(&str, &str)]) -> String {
        let mut sorted = headers.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut message = target.to_string();
        for (name, value) in sorted {
            message.push_str(name);
            message.push_str(value);
        }
        self.sign(message.as_bytes())
    }
}

pub fn verifier_with(pem: &[u8]) -> Verifier {
    Verifier::new(Arc::new(KeyStore::from_pem(pem).expect("Failed to load key")))
}

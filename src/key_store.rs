// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trusted key store.
//!
//! Holds the single RSA public key Fident signs with. The store is an explicit
//! value owned by the host (usually behind an `Arc`) rather than a global, so
//! tests and multi-tenant hosts can hold independent keys.
//!
//! ## Lifecycle
//!
//! 1. `KeyStore::new()` starts empty; every verification fails closed.
//! 2. `initialize(path)` loads a PEM-encoded SubjectPublicKeyInfo and installs it.
//! 3. A later successful `initialize` replaces the key. A failed one leaves the
//!    previous key in place.
//!
//! Verifications take an `Arc<TrustedKey>` snapshot, so a key swap never
//! blocks on or disturbs in-flight checks.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ring::signature::{RsaPublicKeyComponents, RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY};
use sha2::{Digest, Sha256};
use spki::der::{asn1::UintRef, Decode, Reader, SliceReader};
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};
use tracing::{info, warn};

use crate::error::{KeyError, KeyResult};

/// rsaEncryption (PKCS #1).
const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Modulus sizes the verifier can check signatures with.
pub const MIN_MODULUS_BITS: usize = 1024;
pub const MAX_MODULUS_BITS: usize = 8192;

/// Largest public exponent accepted (33 bits).
const MAX_EXPONENT_BITS: usize = 33;

/// An RSA public key trusted to sign Fident headers.
pub struct TrustedKey {
    /// Big-endian modulus and public exponent, already validated.
    components: RsaPublicKeyComponents<Vec<u8>>,
    modulus_bits: usize,
    fingerprint: String,
}

impl TrustedKey {
    /// base64url SHA-256 of the SubjectPublicKeyInfo DER.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    /// Check an RSASSA-PKCS1-v1_5 / SHA-256 signature over `message`.
    ///
    /// `message` is hashed with SHA-256 before the PKCS #1 check. Keys from
    /// 1024 bits upwards verify, so deployments still on 1024-bit Fident keys
    /// keep working.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        self.components
            .verify(
                &RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
                message,
                signature,
            )
            .is_ok()
    }
}

impl fmt::Debug for TrustedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedKey")
            .field("fingerprint", &self.fingerprint)
            .field("modulus_bits", &self.modulus_bits)
            .finish_non_exhaustive()
    }
}

/// Result of decoding a SubjectPublicKeyInfo, tagged by algorithm.
#[derive(Debug)]
pub enum DecodedKey {
    Rsa(TrustedKey),
    /// Any other algorithm, identified by its OID.
    Unsupported { algorithm: String },
}

/// Decode the first PEM block of `pem` as a SubjectPublicKeyInfo.
///
/// The PEM label is ignored.
pub fn decode_public_key_pem(pem: &[u8]) -> KeyResult<DecodedKey> {
    let block = pem::parse(pem).map_err(|e| KeyError::Format(format!("invalid PEM: {e}")))?;
    decode_public_key_der(block.contents())
}

/// Decode a DER SubjectPublicKeyInfo.
///
/// For RSA keys the embedded PKCS #1 `RSAPublicKey` is parsed and checked
/// here, so a key that could never verify a signature is refused up front.
pub fn decode_public_key_der(der: &[u8]) -> KeyResult<DecodedKey> {
    let spki = SubjectPublicKeyInfoRef::try_from(der)
        .map_err(|e| KeyError::Format(format!("failed to parse public key: {e}")))?;

    if spki.algorithm.oid != RSA_ENCRYPTION {
        return Ok(DecodedKey::Unsupported {
            algorithm: spki.algorithm.oid.to_string(),
        });
    }

    let rsa_public_key = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| KeyError::Format("public key bit string is not octet aligned".into()))?;
    let (modulus, exponent) = parse_rsa_public_key(rsa_public_key)?;

    let modulus_bits = bit_length(modulus);
    if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&modulus_bits) {
        return Err(KeyError::KeySize { bits: modulus_bits });
    }
    if modulus.last().is_some_and(|b| b & 1 == 0) {
        return Err(KeyError::Format("RSA modulus is even".into()));
    }

    // ring accepts odd exponents from 3 up to 2^33 - 1.
    let exponent_bits = bit_length(exponent);
    if exponent_bits < 2
        || exponent_bits > MAX_EXPONENT_BITS
        || exponent.last().is_some_and(|b| b & 1 == 0)
    {
        return Err(KeyError::Format("unusable RSA public exponent".into()));
    }

    Ok(DecodedKey::Rsa(TrustedKey {
        components: RsaPublicKeyComponents {
            n: modulus.to_vec(),
            e: exponent.to_vec(),
        },
        modulus_bits,
        fingerprint: URL_SAFE_NO_PAD.encode(Sha256::digest(der)),
    }))
}

/// Parse `RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }`.
///
/// Both integers must be non-negative; the returned slices have no leading
/// zero bytes.
fn parse_rsa_public_key(der: &[u8]) -> KeyResult<(&[u8], &[u8])> {
    let parsed = SliceReader::new(der).and_then(|mut reader| {
        let (modulus, exponent) = reader.sequence(|seq| {
            let modulus = UintRef::decode(seq)?;
            let exponent = UintRef::decode(seq)?;
            Ok((modulus, exponent))
        })?;
        reader.finish((modulus, exponent))
    });

    let (modulus, exponent) =
        parsed.map_err(|e| KeyError::Format(format!("invalid RSA public key: {e}")))?;
    Ok((modulus.as_bytes(), exponent.as_bytes()))
}

/// Significant bits in a big-endian unsigned integer.
fn bit_length(be: &[u8]) -> usize {
    let digits = match be.iter().position(|&b| b != 0) {
        Some(start) => &be[start..],
        None => return 0,
    };
    digits.len() * 8 - digits[0].leading_zeros() as usize
}

fn decode_rsa_key(pem: &[u8]) -> KeyResult<TrustedKey> {
    match decode_public_key_pem(pem)? {
        DecodedKey::Rsa(key) => Ok(key),
        DecodedKey::Unsupported { algorithm } => Err(KeyError::KeyType { algorithm }),
    }
}

/// Holder of the trusted Fident key.
#[derive(Debug, Default)]
pub struct KeyStore {
    key: RwLock<Option<Arc<TrustedKey>>>,
}

impl KeyStore {
    /// Create an empty store. Verification fails until a key is installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding the key encoded in `pem`.
    pub fn from_pem(pem: &[u8]) -> KeyResult<Self> {
        let store = Self::new();
        store.initialize_from_pem(pem)?;
        Ok(store)
    }

    /// Load the PEM public key at `path` and make it the trusted key.
    ///
    /// # Errors
    /// - [`KeyError::Io`] if the file cannot be read
    /// - [`KeyError::Format`] if it holds no PEM-encoded SubjectPublicKeyInfo
    /// - [`KeyError::KeyType`] if the key is not RSA
    /// - [`KeyError::KeySize`] if the modulus is outside 1024-8192 bits
    pub fn initialize(&self, path: impl AsRef<Path>) -> KeyResult<()> {
        let path = path.as_ref();
        let loaded = fs::read(path)
            .map_err(|source| KeyError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|pem| decode_rsa_key(&pem));

        match loaded {
            Ok(key) => {
                info!(
                    path = %path.display(),
                    fingerprint = key.fingerprint(),
                    "Loaded Fident public key"
                );
                self.install(key);
                Ok(())
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error_code = e.error_code(),
                    error = %e,
                    "Failed to load Fident public key"
                );
                Err(e)
            }
        }
    }

    /// Same as [`initialize`](Self::initialize) for a key already in memory.
    pub fn initialize_from_pem(&self, pem: &[u8]) -> KeyResult<()> {
        let key = decode_rsa_key(pem)?;
        info!(fingerprint = key.fingerprint(), "Loaded Fident public key");
        self.install(key);
        Ok(())
    }

    /// Whether a trusted key is installed.
    pub fn has_key(&self) -> bool {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Snapshot of the current key.
    pub fn current(&self) -> Option<Arc<TrustedKey>> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, key: TrustedKey) {
        let mut slot = self.key.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SIGNER_PUBLIC: &[u8] = include_bytes!("../tests/fixtures/signer_public.pem");
    const OTHER_PUBLIC: &[u8] = include_bytes!("../tests/fixtures/other_public.pem");
    const EC_PUBLIC: &[u8] = include_bytes!("../tests/fixtures/ec_public.pem");
    const LEGACY_1024_PUBLIC: &[u8] = include_bytes!("../tests/fixtures/legacy_1024_public.pem");
    const WEAK_512_PUBLIC: &[u8] = include_bytes!("../tests/fixtures/weak_512_public.pem");

    /// rsaEncryption SPKI whose key body is the four bytes `de ad be ef`.
    const GARBAGE_RSA_BODY: &[u8] =
        b"-----BEGIN PUBLIC KEY-----\nMBYwDQYJKoZIhvcNAQEBBQADBQDerb7v\n-----END PUBLIC KEY-----\n";

    fn key_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(contents).expect("Failed to write key file");
        file
    }

    #[test]
    fn new_store_has_no_key() {
        let store = KeyStore::new();
        assert!(!store.has_key());
        assert!(store.current().is_none());
    }

    #[test]
    fn initialize_loads_rsa_key() {
        let file = key_file(SIGNER_PUBLIC);
        let store = KeyStore::new();
        store.initialize(file.path()).unwrap();
        assert!(store.has_key());
        assert!(!store.current().unwrap().fingerprint().is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let store = KeyStore::new();
        let err = store.initialize("/definitely/not/here/fident.pem").unwrap_err();
        assert!(matches!(err, KeyError::Io { .. }));
        assert!(!store.has_key());
    }

    #[test]
    fn non_pem_file_is_format_error() {
        let file = key_file(b"not a pem file\n");
        let err = KeyStore::new().initialize(file.path()).unwrap_err();
        assert!(matches!(err, KeyError::Format(_)));
    }

    #[test]
    fn pem_without_spki_is_format_error() {
        let pem = b"-----BEGIN PUBLIC KEY-----\nAAECAwQ=\n-----END PUBLIC KEY-----\n";
        let err = KeyStore::from_pem(pem).unwrap_err();
        assert!(matches!(err, KeyError::Format(_)));
    }

    #[test]
    fn ec_key_is_key_type_error() {
        let file = key_file(EC_PUBLIC);
        let err = KeyStore::new().initialize(file.path()).unwrap_err();
        match err {
            KeyError::KeyType { algorithm } => assert_eq!(algorithm, "1.2.840.10045.2.1"),
            other => panic!("expected KeyType, got {other:?}"),
        }
    }

    #[test]
    fn pem_label_is_ignored() {
        let relabelled = String::from_utf8(SIGNER_PUBLIC.to_vec())
            .unwrap()
            .replace("PUBLIC KEY", "FIDENT KEY");
        let store = KeyStore::from_pem(relabelled.as_bytes()).unwrap();
        let reference = KeyStore::from_pem(SIGNER_PUBLIC).unwrap();
        assert_eq!(
            store.current().unwrap().fingerprint(),
            reference.current().unwrap().fingerprint()
        );
    }

    #[test]
    fn reinitialize_replaces_key() {
        let store = KeyStore::from_pem(SIGNER_PUBLIC).unwrap();
        let first = store.current().unwrap().fingerprint().to_string();

        store.initialize_from_pem(OTHER_PUBLIC).unwrap();
        assert_ne!(store.current().unwrap().fingerprint(), first);
    }

    #[test]
    fn failed_initialize_keeps_previous_key() {
        let store = KeyStore::from_pem(SIGNER_PUBLIC).unwrap();
        let before = store.current().unwrap().fingerprint().to_string();

        let file = key_file(EC_PUBLIC);
        assert!(store.initialize(file.path()).is_err());
        assert!(store.initialize("/missing.pem").is_err());

        assert_eq!(store.current().unwrap().fingerprint(), before);
    }

    #[test]
    fn decoded_key_is_tagged_by_algorithm() {
        assert!(matches!(
            decode_public_key_pem(SIGNER_PUBLIC).unwrap(),
            DecodedKey::Rsa(_)
        ));
        assert!(matches!(
            decode_public_key_pem(EC_PUBLIC).unwrap(),
            DecodedKey::Unsupported { .. }
        ));
    }

    #[test]
    fn debug_output_hides_key_material() {
        let store = KeyStore::from_pem(SIGNER_PUBLIC).unwrap();
        let rendered = format!("{:?}", store.current().unwrap());
        assert!(rendered.contains("fingerprint"));
        assert!(!rendered.contains("components"));
    }

    #[test]
    fn rsa_key_with_garbage_body_is_format_error() {
        let store = KeyStore::new();
        let err = store.initialize_from_pem(GARBAGE_RSA_BODY).unwrap_err();
        assert!(matches!(err, KeyError::Format(_)), "got {err:?}");
        assert!(!store.has_key());
    }

    #[test]
    fn rsa_key_with_trailing_bytes_is_format_error() {
        let block = pem::parse(SIGNER_PUBLIC).unwrap();
        let spki = SubjectPublicKeyInfoRef::try_from(block.contents()).unwrap();
        let mut body = spki.subject_public_key.raw_bytes().to_vec();
        body.push(0);
        assert!(matches!(
            parse_rsa_public_key(&body),
            Err(KeyError::Format(_))
        ));
    }

    #[test]
    fn modulus_and_exponent_are_parsed() {
        let key = match decode_public_key_pem(SIGNER_PUBLIC).unwrap() {
            DecodedKey::Rsa(key) => key,
            other => panic!("expected RSA key, got {other:?}"),
        };
        assert_eq!(key.modulus_bits(), 2048);
        assert_eq!(key.components.e, vec![0x01, 0x00, 0x01]);
        assert_eq!(key.components.n.len(), 256);
    }

    #[test]
    fn legacy_1024_bit_key_is_accepted() {
        let store = KeyStore::from_pem(LEGACY_1024_PUBLIC).unwrap();
        assert_eq!(store.current().unwrap().modulus_bits(), 1024);
    }

    #[test]
    fn undersized_key_is_key_size_error() {
        let file = key_file(WEAK_512_PUBLIC);
        let store = KeyStore::from_pem(SIGNER_PUBLIC).unwrap();
        let before = store.current().unwrap().fingerprint().to_string();

        let err = store.initialize(file.path()).unwrap_err();
        assert!(matches!(err, KeyError::KeySize { bits: 512 }), "got {err:?}");
        assert_eq!(store.current().unwrap().fingerprint(), before);
    }

    #[test]
    fn bit_length_ignores_leading_zeros() {
        assert_eq!(bit_length(&[]), 0);
        assert_eq!(bit_length(&[0, 0]), 0);
        assert_eq!(bit_length(&[0x01, 0x00, 0x01]), 17);
        assert_eq!(bit_length(&[0x00, 0x80]), 8);
    }
}

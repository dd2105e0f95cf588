//! Authenticated blob envelope.
//!
//! # Layout
//!
//! ```text
//! version (1) || nonce (24) || XChaCha20-Poly1305 ciphertext || HMAC-SHA512 (64)
//! ```
//!
//! The MAC covers the version byte and the whole cipher output and is keyed
//! with the same key as the cipher. On the way back the MAC is checked in
//! constant time before anything else is looked at; the version byte is only
//! trusted once it is authenticated, and the cipher never sees unauthenticated
//! bytes.
//!
//! Private blobs use the master key, public blobs the fixed
//! [`OBFUSCATION_KEY`](super::keys::OBFUSCATION_KEY). Since the key is derived
//! from the blob's category, an envelope sealed in one category cannot
//! authenticate in the other.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use super::error::{StoreError, StoreResult};
use super::keys::{select_key, MasterKey, KEY_SIZE};
use super::types::ObjectBlob;

/// Current envelope format version.
pub const BLOB_VERSION: u8 = 1;

/// Size of the trailing HMAC-SHA512 tag.
pub const MAC_SIZE: usize = 64;

/// Size of the XChaCha20-Poly1305 nonce embedded in the cipher output.
pub const NONCE_SIZE: usize = 24;

type HmacSha512 = Hmac<Sha512>;

/// Seals a plaintext blob into its stored envelope.
///
/// # Errors
///
/// Returns [`StoreError::KeyNotInitialized`] for a private blob without a
/// master key, or [`StoreError::Encryption`] if the cipher fails.
pub fn encrypt(plaintext: &ObjectBlob, master: Option<&MasterKey>) -> StoreResult<ObjectBlob> {
    let key = select_key(plaintext.is_private, master)?;
    let sealed = seal(key, &plaintext.payload)?;

    let mut envelope = Vec::with_capacity(1 + sealed.len() + MAC_SIZE);
    envelope.push(BLOB_VERSION);
    envelope.extend_from_slice(&sealed);
    let tag = compute_mac(key, &envelope)?;
    envelope.extend_from_slice(&tag);

    Ok(ObjectBlob::new(plaintext.is_private, envelope))
}

/// Opens a stored envelope back into the plaintext blob.
///
/// # Errors
///
/// - [`StoreError::KeyNotInitialized`] for a private blob without a master key.
/// - [`StoreError::Integrity`] if the envelope is truncated or its MAC does
///   not verify under the category's key.
/// - [`StoreError::UnsupportedVersion`] for an authenticated envelope of an
///   unknown format version.
/// - [`StoreError::Decryption`] if the cipher rejects the authenticated body.
pub fn decrypt(ciphertext: &ObjectBlob, master: Option<&MasterKey>) -> StoreResult<ObjectBlob> {
    let key = select_key(ciphertext.is_private, master)?;
    let body = verify_and_strip_mac(key, &ciphertext.payload)?;
    let (&version, sealed) = body
        .split_first()
        .ok_or_else(|| StoreError::Integrity("envelope has no version header".to_string()))?;
    if version != BLOB_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }
    let plaintext = open(key, sealed)?;
    Ok(ObjectBlob::new(ciphertext.is_private, plaintext))
}

/// Encrypts with a fresh random nonce and returns `nonce || ciphertext`.
fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> StoreResult<Vec<u8>> {
    let cipher = <XChaCha20Poly1305 as KeyInit>::new(Key::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|err| StoreError::Encryption(err.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open(key: &[u8; KEY_SIZE], sealed: &[u8]) -> StoreResult<Vec<u8>> {
    if sealed.len() < NONCE_SIZE {
        return Err(StoreError::Decryption("ciphertext too short".to_string()));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let cipher = <XChaCha20Poly1305 as KeyInit>::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|err| StoreError::Decryption(err.to_string()))
}

fn compute_mac(key: &[u8; KEY_SIZE], message: &[u8]) -> StoreResult<[u8; MAC_SIZE]> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(key)
        .map_err(|err| StoreError::Encryption(err.to_string()))?;
    mac.update(message);
    let mut tag = [0u8; MAC_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

fn verify_and_strip_mac<'a>(key: &[u8; KEY_SIZE], input: &'a [u8]) -> StoreResult<&'a [u8]> {
    if input.len() < MAC_SIZE {
        return Err(StoreError::Integrity(format!(
            "envelope of {} bytes is shorter than its MAC",
            input.len()
        )));
    }
    let (body, tag) = input.split_at(input.len() - MAC_SIZE);
    let expected = compute_mac(key, body)?;
    if bool::from(expected[..].ct_eq(tag)) {
        Ok(body)
    } else {
        Err(StoreError::Integrity("MAC mismatch".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::OBFUSCATION_KEY;
    use test_case::test_case;

    fn master() -> MasterKey {
        MasterKey::from_bytes([0x5a; KEY_SIZE])
    }

    /// Builds an envelope with a valid MAC around an arbitrary body.
    fn forge(key: &[u8; KEY_SIZE], body: &[u8]) -> Vec<u8> {
        let mut out = body.to_vec();
        out.extend_from_slice(&compute_mac(key, body).expect("mac"));
        out
    }

    #[test_case(false; "public")]
    #[test_case(true; "private")]
    fn test_round_trip(is_private: bool) {
        let key = master();
        for payload in [Vec::new(), b"secret".to_vec(), vec![0xEE; 4096]] {
            let plaintext = ObjectBlob::new(is_private, payload);
            let envelope = encrypt(&plaintext, Some(&key)).expect("encrypt");
            assert_eq!(envelope.is_private, is_private);
            assert_eq!(
                envelope.payload.len(),
                1 + NONCE_SIZE + plaintext.payload.len() + 16 + MAC_SIZE
            );
            assert_eq!(envelope.payload[0], BLOB_VERSION);
            let decrypted = decrypt(&envelope, Some(&key)).expect("decrypt");
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn test_public_round_trip_needs_no_master_key() {
        let plaintext = ObjectBlob::public(b"certificate".to_vec());
        let envelope = encrypt(&plaintext, None).expect("encrypt");
        assert_eq!(decrypt(&envelope, None).expect("decrypt"), plaintext);
    }

    #[test]
    fn test_encryption_is_randomized() {
        let plaintext = ObjectBlob::public(b"same bytes".to_vec());
        let first = encrypt(&plaintext, None).expect("encrypt");
        let second = encrypt(&plaintext, None).expect("encrypt");
        assert_ne!(first.payload, second.payload);
    }

    #[test]
    fn test_private_blob_requires_key() {
        let plaintext = ObjectBlob::private(b"secret".to_vec());
        assert!(matches!(
            encrypt(&plaintext, None),
            Err(StoreError::KeyNotInitialized)
        ));
        let envelope = encrypt(&plaintext, Some(&master())).expect("encrypt");
        assert!(matches!(
            decrypt(&envelope, None),
            Err(StoreError::KeyNotInitialized)
        ));
    }

    #[test_case(false; "public")]
    #[test_case(true; "private")]
    fn test_any_bit_flip_fails_integrity(is_private: bool) {
        let key = master();
        let envelope =
            encrypt(&ObjectBlob::new(is_private, b"secret".to_vec()), Some(&key)).expect("encrypt");
        for index in 0..envelope.payload.len() {
            for bit in 0..8 {
                let mut tampered = envelope.clone();
                tampered.payload[index] ^= 1 << bit;
                match decrypt(&tampered, Some(&key)) {
                    Err(StoreError::Integrity(_)) => {}
                    Err(err) => panic!("byte {index} bit {bit}: unexpected error: {err}"),
                    Ok(_) => panic!("byte {index} bit {bit}: tampering went undetected"),
                }
            }
        }
    }

    #[test]
    fn test_truncated_envelope_fails_integrity() {
        let key = master();
        let envelope = encrypt(&ObjectBlob::private(b"secret".to_vec()), Some(&key)).expect("encrypt");
        for len in [0, 1, MAC_SIZE - 1, MAC_SIZE, envelope.payload.len() - 1] {
            let truncated = ObjectBlob::private(envelope.payload[..len].to_vec());
            assert!(matches!(
                decrypt(&truncated, Some(&key)),
                Err(StoreError::Integrity(_))
            ));
        }
    }

    #[test]
    fn test_categories_are_isolated() {
        let key = master();
        let public = encrypt(&ObjectBlob::public(b"data".to_vec()), Some(&key)).expect("encrypt");
        let as_private = ObjectBlob::private(public.payload.clone());
        assert!(matches!(
            decrypt(&as_private, Some(&key)),
            Err(StoreError::Integrity(_))
        ));

        let private = encrypt(&ObjectBlob::private(b"data".to_vec()), Some(&key)).expect("encrypt");
        let as_public = ObjectBlob::public(private.payload.clone());
        assert!(matches!(
            decrypt(&as_public, Some(&key)),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn test_wrong_master_key_fails_integrity() {
        let envelope =
            encrypt(&ObjectBlob::private(b"secret".to_vec()), Some(&master())).expect("encrypt");
        let other = MasterKey::from_bytes([0x01; KEY_SIZE]);
        assert!(matches!(
            decrypt(&envelope, Some(&other)),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn test_unknown_version_is_rejected_after_authentication() {
        let key = master();
        let envelope = encrypt(&ObjectBlob::private(b"secret".to_vec()), Some(&key)).expect("encrypt");
        let mut body = envelope.payload[..envelope.payload.len() - MAC_SIZE].to_vec();
        body[0] = BLOB_VERSION + 1;
        let forged = ObjectBlob::private(forge(key.expose(), &body));
        match decrypt(&forged, Some(&key)) {
            Err(StoreError::UnsupportedVersion(version)) => assert_eq!(version, BLOB_VERSION + 1),
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_authenticated_garbage_fails_decryption() {
        let mut body = vec![BLOB_VERSION];
        body.extend_from_slice(&[0x33; NONCE_SIZE + 20]);
        let forged = ObjectBlob::public(forge(&OBFUSCATION_KEY, &body));
        assert!(matches!(
            decrypt(&forged, None),
            Err(StoreError::Decryption(_))
        ));

        let short = ObjectBlob::public(forge(&OBFUSCATION_KEY, &[BLOB_VERSION, 1, 2, 3]));
        assert!(matches!(
            decrypt(&short, None),
            Err(StoreError::Decryption(_))
        ));
    }

    #[test]
    fn test_authenticated_empty_body_fails_integrity() {
        let forged = ObjectBlob::public(forge(&OBFUSCATION_KEY, &[]));
        assert!(matches!(
            decrypt(&forged, None),
            Err(StoreError::Integrity(_))
        ));
    }
}

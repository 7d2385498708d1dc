use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};

use crate::error::{Error, Result};

/// Which server-issued key a blob of key material is expected to be.
///
/// The firmware publishes two: a 1024-bit password key and a 512-bit
/// signing key. The hex lengths are fixed per kind; a mismatch means the
/// router speaks a different protocol revision, not that the response
/// was garbled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Password,
    Signing,
}

impl KeyKind {
    /// Expected exponent length in hex characters.
    pub const EXPONENT_LEN: usize = 6;

    /// Expected modulus length in hex characters.
    pub fn modulus_len(self) -> usize {
        match self {
            KeyKind::Password => 256,
            KeyKind::Signing => 128,
        }
    }
}

/// Public-key-only RSA encryption with a raw modulus/exponent pair.
/// Plaintext must fit the PKCS#1 v1.5 limit for the modulus; chunking is
/// the caller's job.
#[derive(Clone)]
pub struct RsaCipher {
    key: RsaPublicKey,
}

impl RsaCipher {
    /// Parses the two-element `[modulus, exponent]` hex array the router
    /// returns for `kind`.
    pub fn parse(material: &[String], kind: KeyKind) -> Result<Self> {
        if material.len() != 2 {
            return Err(Error::Protocol(format!(
                "expected 2 key strings, got {}",
                material.len()
            )));
        }
        if material[0].len() != kind.modulus_len() {
            return Err(Error::Protocol(format!(
                "bad modulus length ({} != {})",
                material[0].len(),
                kind.modulus_len()
            )));
        }
        if material[1].len() != KeyKind::EXPONENT_LEN {
            return Err(Error::Protocol(format!(
                "bad exponent length ({} != {})",
                material[1].len(),
                KeyKind::EXPONENT_LEN
            )));
        }
        let modulus = hex::decode(&material[0])
            .map_err(|e| Error::Protocol(format!("modulus is not hex: {e}")))?;
        let exponent = u64::from_str_radix(&material[1], 16)
            .map_err(|e| Error::Protocol(format!("exponent is not hex: {e}")))?;
        let key = RsaPublicKey::new(BigUint::from_bytes_be(&modulus), BigUint::from(exponent))?;
        Ok(Self { key })
    }

    /// PKCS#1 v1.5 encryption with fresh random padding per call.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        Ok(self.key.encrypt(&mut rng, Pkcs1v15Encrypt, data)?)
    }

    pub fn encrypt_hex(&self, data: &[u8]) -> Result<String> {
        Ok(hex::encode(self.encrypt(data)?))
    }

    pub fn encrypt_base64(&self, data: &[u8]) -> Result<String> {
        Ok(BASE64.encode(self.encrypt(data)?))
    }
}

/// Signing-shaped key material from a throwaway 512-bit key, for tests.
#[cfg(test)]
pub(crate) fn test_signing_key_material() -> Vec<String> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rsa::traits::PublicKeyParts;
    use rsa::RsaPrivateKey;

    let mut rng = StdRng::seed_from_u64(7);
    let key = RsaPrivateKey::new(&mut rng, 512).unwrap();
    vec![hex::encode(key.n().to_bytes_be()), "010001".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_wrong_element_count() {
        let material = vec!["ab".repeat(64)];
        assert!(matches!(
            RsaCipher::parse(&material, KeyKind::Signing),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn parse_rejects_wrong_modulus_length() {
        // Signing-length material offered as a password key.
        let material = test_signing_key_material();
        assert!(matches!(
            RsaCipher::parse(&material, KeyKind::Password),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn parse_rejects_wrong_exponent_length() {
        let mut material = test_signing_key_material();
        material[1] = "10001".to_string();
        assert!(matches!(
            RsaCipher::parse(&material, KeyKind::Signing),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn ciphertext_matches_modulus_size() {
        let cipher = RsaCipher::parse(&test_signing_key_material(), KeyKind::Signing).unwrap();
        // 512-bit modulus: 64-byte ciphertext, 128 hex chars.
        assert_eq!(cipher.encrypt(b"hello").unwrap().len(), 64);
        assert_eq!(cipher.encrypt_hex(b"hello").unwrap().len(), 128);
    }

    #[test]
    fn oversized_plaintext_is_rejected() {
        let cipher = RsaCipher::parse(&test_signing_key_material(), KeyKind::Signing).unwrap();
        // PKCS#1 v1.5 limit for a 512-bit key is 53 bytes.
        assert!(cipher.encrypt(&[0u8; 53]).is_ok());
        assert!(cipher.encrypt(&[0u8; 54]).is_err());
    }

    #[test]
    fn randomized_padding_differs_per_call() {
        let cipher = RsaCipher::parse(&test_signing_key_material(), KeyKind::Signing).unwrap();
        assert_ne!(
            cipher.encrypt_base64(b"hello").unwrap(),
            cipher.encrypt_base64(b"hello").unwrap()
        );
    }
}

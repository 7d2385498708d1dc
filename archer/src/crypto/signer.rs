use std::sync::Arc;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::crypto::aes::BLOCK_SIZE;
use crate::crypto::{pad, unpad, AesCipher, KeyKind, RsaCipher};
use crate::error::Result;
use crate::form::FormRequest;

/// Signature material is RSA-encrypted in chunks of at most this many
/// bytes. The ceiling is fixed by the firmware and is not derived from
/// the signing key's actual capacity.
pub const SIGNATURE_CHUNK_LEN: usize = 53;

/// Whether the signature material carries the session key.
///
/// The login call must hand the freshly generated AES key and iv to the
/// server inside the RSA-encrypted signature; every later call signs
/// with the credential hash and sequence only. The caller picks the
/// variant explicitly.
#[derive(Clone, Debug)]
pub enum SignatureContext {
    Login {
        session_key: String,
        session_iv: String,
    },
    Standard,
}

/// Outbound signed envelope. Field names are fixed by the firmware.
#[derive(Clone, Debug, Serialize)]
pub struct EncryptedFormData {
    pub sign: String,
    pub data: String,
}

#[derive(Deserialize)]
struct EncryptedResponse {
    data: String,
}

/// Signs and encrypts outbound requests and decrypts inbound responses.
/// Built once per login and immutable afterwards.
pub struct RsaSigner {
    hashed_pw: String,
    key: RsaCipher,
    base_seq: i64,
    aes: Arc<AesCipher>,
}

impl RsaSigner {
    /// `material` is the `[modulus, exponent]` pair from the auth form.
    ///
    /// The credential hash is md5 over the literal account name `admin`
    /// concatenated with the plaintext password, lowercase hex. The
    /// firmware compares this string byte for byte, so a stronger hash
    /// will not authenticate.
    pub fn new(
        password: &str,
        material: &[String],
        base_seq: i64,
        aes: Arc<AesCipher>,
    ) -> Result<Self> {
        let mut hasher = Md5::new();
        hasher.update(b"admin");
        hasher.update(password.as_bytes());
        let hashed_pw = hex::encode(hasher.finalize());
        let key = RsaCipher::parse(material, KeyKind::Signing)?;
        Ok(Self {
            hashed_pw,
            key,
            base_seq,
            aes,
        })
    }

    /// Context carrying this signer's session key, for the login call.
    pub fn login_context(&self) -> SignatureContext {
        SignatureContext::Login {
            session_key: self.aes.key_str(),
            session_iv: self.aes.iv_str(),
        }
    }

    /// The string that gets chunked and RSA-encrypted.
    ///
    /// The sequence field is always the base sequence plus the byte
    /// length of this call's base64 ciphertext. It is not a running
    /// counter; two calls with equal ciphertext lengths send the same
    /// value and the firmware accepts both.
    pub fn signature_material(&self, data_len: usize, ctx: &SignatureContext) -> String {
        let seq = self.base_seq + data_len as i64;
        match ctx {
            SignatureContext::Login {
                session_key,
                session_iv,
            } => format!(
                "k={}&i={}&h={}&s={}",
                session_key, session_iv, self.hashed_pw, seq
            ),
            SignatureContext::Standard => format!("h={}&s={}", self.hashed_pw, seq),
        }
    }

    fn signature(&self, data_len: usize, ctx: &SignatureContext) -> Result<String> {
        let material = self.signature_material(data_len, ctx);
        let mut signature = String::new();
        for chunk in material.as_bytes().chunks(SIGNATURE_CHUNK_LEN) {
            signature.push_str(&self.key.encrypt_hex(chunk)?);
        }
        Ok(signature)
    }

    /// Serializes, pads, encrypts, and signs one request body.
    pub fn sign<B: FormRequest>(&self, body: &B, ctx: &SignatureContext) -> Result<EncryptedFormData> {
        let plain = body.to_form_bytes()?;
        let data = self.aes.encrypt_base64(&pad(&plain, BLOCK_SIZE))?;
        let sign = self.signature(data.len(), ctx)?;
        tracing::debug!(plain_len = plain.len(), data_len = data.len(), "signed request body");
        Ok(EncryptedFormData { sign, data })
    }

    /// Unwraps `{"data": <base64>}`, decrypts with the session cipher
    /// and strips the padding.
    pub fn decrypt_response(&self, body: &[u8]) -> Result<Vec<u8>> {
        let resp: EncryptedResponse = serde_json::from_slice(body)?;
        let plain = self.aes.decrypt_base64(&resp.data)?;
        Ok(unpad(&plain)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rsa::test_signing_key_material;
    use crate::error::Error;
    use crate::form::Operation;

    fn fixed_signer() -> RsaSigner {
        let aes = AesCipher::new("1693216558004123", "1693216558004987").unwrap();
        RsaSigner::new("hunter2", &test_signing_key_material(), 1000, Arc::new(aes)).unwrap()
    }

    fn trailing_seq(material: &str) -> i64 {
        material.rsplit("&s=").next().unwrap().parse().unwrap()
    }

    #[test]
    fn credential_hash_is_lowercase_hex() {
        let signer = fixed_signer();
        assert_eq!(signer.hashed_pw.len(), 32);
        assert!(signer
            .hashed_pw
            .bytes()
            .all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn signature_material_is_deterministic() {
        let signer = fixed_signer();
        let ctx = signer.login_context();
        assert_eq!(
            signer.signature_material(88, &ctx),
            signer.signature_material(88, &ctx)
        );
    }

    #[test]
    fn login_material_carries_session_key() {
        let signer = fixed_signer();
        let material = signer.signature_material(88, &signer.login_context());
        assert!(material.starts_with("k=1693216558004123&i=1693216558004987&h="));
        assert_eq!(trailing_seq(&material), 1088);
    }

    #[test]
    fn standard_material_omits_session_key() {
        let signer = fixed_signer();
        let material = signer.signature_material(88, &SignatureContext::Standard);
        assert!(material.starts_with("h="));
        assert!(!material.contains("k="));
        assert_eq!(trailing_seq(&material), 1088);
    }

    #[test]
    fn sequence_tracks_ciphertext_length() {
        let signer = fixed_signer();
        let ctx = SignatureContext::Standard;
        let a = trailing_seq(&signer.signature_material(64, &ctx));
        let b = trailing_seq(&signer.signature_material(176, &ctx));
        assert_eq!(b - a, 112);
    }

    #[test]
    fn signature_has_one_chunk_per_53_bytes() {
        let signer = fixed_signer();
        let ctx = signer.login_context();
        let envelope = signer.sign(&Operation::read(), &ctx).unwrap();
        let material_len = signer.signature_material(envelope.data.len(), &ctx).len();
        let chunks = material_len.div_ceil(SIGNATURE_CHUNK_LEN);
        // Each chunk encrypts to 64 bytes under the 512-bit test key,
        // 128 hex chars after encoding.
        assert_eq!(envelope.sign.len(), chunks * 128);
    }

    #[test]
    fn envelope_data_is_deterministic_for_fixed_cipher() {
        let signer = fixed_signer();
        let ctx = signer.login_context();
        let first = signer.sign(&Operation::read(), &ctx).unwrap();
        let second = signer.sign(&Operation::read(), &ctx).unwrap();
        assert_eq!(first.data, second.data);

        // The data field decrypts back to the padded form encoding.
        let aes = AesCipher::new("1693216558004123", "1693216558004987").unwrap();
        let plain = aes.decrypt_base64(&first.data).unwrap();
        assert_eq!(unpad(&plain).unwrap(), b"operation=read");
    }

    #[test]
    fn decrypt_response_round_trip() {
        let signer = fixed_signer();
        let aes = AesCipher::new("1693216558004123", "1693216558004987").unwrap();
        let inner = br#"{"success":true,"data":{}}"#;
        let data = aes.encrypt_base64(&pad(inner, BLOCK_SIZE)).unwrap();
        let body = serde_json::json!({ "data": data }).to_string();
        assert_eq!(signer.decrypt_response(body.as_bytes()).unwrap(), inner);
    }

    #[test]
    fn decrypt_response_rejects_malformed_envelope() {
        let signer = fixed_signer();
        assert!(matches!(
            signer.decrypt_response(b"not json"),
            Err(Error::MalformedEnvelope(_))
        ));
    }
}

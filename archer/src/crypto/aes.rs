use std::time::{SystemTime, UNIX_EPOCH};

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::Rng;

use crate::error::{Error, Result};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES block size in bytes; also the length of the key and iv.
pub const BLOCK_SIZE: usize = 16;

/// AES-128-CBC session cipher.
///
/// Key and iv are the first 16 bytes of the seed strings. By protocol
/// the seeds are ASCII digit strings, so the string views used in
/// signature material are lossless.
#[derive(Clone)]
pub struct AesCipher {
    key: [u8; BLOCK_SIZE],
    iv: [u8; BLOCK_SIZE],
}

impl AesCipher {
    /// Builds a cipher from seed strings, truncating each to 16 bytes.
    /// Fails if either seed is shorter than that.
    pub fn new(key_seed: &str, iv_seed: &str) -> Result<Self> {
        let (key_bytes, iv_bytes) = (key_seed.as_bytes(), iv_seed.as_bytes());
        if key_bytes.len() < BLOCK_SIZE || iv_bytes.len() < BLOCK_SIZE {
            return Err(Error::SeedTooShort);
        }
        let mut key = [0u8; BLOCK_SIZE];
        let mut iv = [0u8; BLOCK_SIZE];
        key.copy_from_slice(&key_bytes[..BLOCK_SIZE]);
        iv.copy_from_slice(&iv_bytes[..BLOCK_SIZE]);
        Ok(Self { key, iv })
    }

    /// Generates a fresh session cipher. Each seed is the millisecond
    /// timestamp followed by an independent 9-10 digit random integer,
    /// which keeps the digit-string shape the firmware parses. The key is
    /// later sent to the server under RSA, so the rng only has to make
    /// the two seeds differ.
    pub fn generate<R: Rng>(rng: &mut R) -> Result<Self> {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let k = rng.gen_range(100_000_000i64..1_100_000_000);
        let i = rng.gen_range(100_000_000i64..1_100_000_000);
        Self::new(&format!("{ts}{k}"), &format!("{ts}{i}"))
    }

    /// Key as the text form used in signature material.
    pub fn key_str(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }

    /// IV as the text form used in signature material.
    pub fn iv_str(&self) -> String {
        String::from_utf8_lossy(&self.iv).into_owned()
    }

    /// CBC-encrypts block-aligned plaintext; callers pad first.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(Error::BlockAlignment(data.len()));
        }
        let mut buf = data.to_vec();
        Aes128CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, data.len())
            .map_err(|e| Error::Decode(format!("aes encrypt: {e}")))?;
        Ok(buf)
    }

    /// CBC-decrypts block-aligned ciphertext.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(Error::BlockAlignment(data.len()));
        }
        let mut buf = data.to_vec();
        Aes128CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|e| Error::Decode(format!("aes decrypt: {e}")))?;
        Ok(buf)
    }

    pub fn encrypt_hex(&self, data: &[u8]) -> Result<String> {
        Ok(hex::encode(self.encrypt(data)?))
    }

    pub fn encrypt_base64(&self, data: &[u8]) -> Result<String> {
        Ok(BASE64.encode(self.encrypt(data)?))
    }

    pub fn decrypt_hex(&self, data: &str) -> Result<Vec<u8>> {
        let raw = hex::decode(data).map_err(|e| Error::Decode(format!("hex: {e}")))?;
        self.decrypt(&raw)
    }

    pub fn decrypt_base64(&self, data: &str) -> Result<Vec<u8>> {
        let raw = BASE64
            .decode(data)
            .map_err(|e| Error::Decode(format!("base64: {e}")))?;
        self.decrypt(&raw)
    }
}

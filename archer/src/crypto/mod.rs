//! Cryptographic pieces of the admin protocol: byte-count padding,
//! the AES-128-CBC session cipher, raw-key RSA encryption, and the
//! request signer that ties them together.

pub mod aes;
pub mod rsa;
pub mod signer;

pub use self::aes::AesCipher;
pub use self::rsa::{KeyKind, RsaCipher};
pub use self::signer::{EncryptedFormData, RsaSigner, SignatureContext};

use crate::error::{Error, Result};

/// Appends byte-count padding: `n = size - (len % size)` bytes, each
/// holding the value `n`. Input that is already block-aligned gains a
/// full extra block of padding.
pub fn pad(data: &[u8], size: usize) -> Vec<u8> {
    let n = size - (data.len() % size);
    let mut padded = Vec::with_capacity(data.len() + n);
    padded.extend_from_slice(data);
    padded.resize(data.len() + n, n as u8);
    padded
}

/// Strips byte-count padding by reading the final byte as the pad
/// length.
///
/// The trailing pad bytes are not cross-checked against each other; this
/// only ever sees plaintext the router itself produced. Fails when the
/// count is out of range for the input.
pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    let n = *data
        .last()
        .ok_or_else(|| Error::Decode("unpad on empty input".into()))? as usize;
    data.len()
        .checked_sub(n)
        .map(|end| &data[..end])
        .ok_or_else(|| {
            Error::Decode(format!(
                "pad count {} exceeds input length {}",
                n,
                data.len()
            ))
        })
}

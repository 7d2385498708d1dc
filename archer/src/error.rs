use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the client.
///
/// The login-specific variants are kept distinct so callers can react
/// differently to a wrong password, a lockout, and another active admin
/// session.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure from the HTTP client.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The router answered with a non-success HTTP status.
    #[error("router returned {0}")]
    Status(StatusCode),

    /// A JSON envelope did not have the expected shape.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] serde_json::Error),

    /// Base64/hex decoding or block decryption failed.
    #[error("decode failure: {0}")]
    Decode(String),

    /// Key lengths or response shapes do not match the fixed protocol
    /// constants. Usually means a different firmware revision.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A key or iv seed shorter than one AES block.
    #[error("key or iv seed is shorter than 16 bytes")]
    SeedTooShort,

    /// Plaintext or ciphertext not a multiple of the AES block size.
    #[error("input length {0} is not a multiple of the aes block size")]
    BlockAlignment(usize),

    #[error("form encoding failed: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),

    #[error("rsa encryption failed: {0}")]
    Rsa(#[from] rsa::Error),

    /// Wrong password. `remaining` of `allowed` attempts are left before
    /// the router locks the account.
    #[error("login failed, wrong password ({remaining}/{allowed} attempts remaining)")]
    LoginFailed { remaining: i64, allowed: i64 },

    #[error("login failed, maximum login attempts exceeded, wait 60-120 minutes")]
    LockedOut,

    #[error("login conflict, someone else is logged in")]
    ConcurrentSession,

    #[error("login error: {0}")]
    Login(String),

    /// The endpoint reported failure inside a successful HTTP response.
    #[error("endpoint error: {0}")]
    Endpoint(String),

    #[error("not logged in")]
    NotLoggedIn,
}

pub type Result<T> = std::result::Result<T, Error>;

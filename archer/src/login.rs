//! The login handshake: password key, session cipher and signing key,
//! then the signed login call itself.

use std::sync::Arc;

use rand::thread_rng;
use serde::{Deserialize, Serialize};

use crate::client::{Client, Session};
use crate::crypto::{AesCipher, KeyKind, RsaCipher, RsaSigner, SignatureContext};
use crate::error::{Error, Result};
use crate::form::{FormRequest, Operation};
use crate::response::{read_response, ResponseWrapper};

#[derive(Deserialize)]
struct KeysResponse {
    #[serde(default)]
    password: Vec<String>,
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(default)]
    key: Vec<String>,
    #[serde(default)]
    seq: i64,
}

#[derive(Serialize)]
struct LoginRequest {
    operation: &'static str,
    password: String,
}

impl FormRequest for LoginRequest {}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(rename = "stok", default)]
    token: String,
    #[serde(rename = "attemptsAllowed", default)]
    attempts_allowed: i64,
    #[serde(rename = "failureCount", default)]
    failure_count: i64,
}

/// Maps a failed login's error code onto the login error taxonomy.
/// Counters may be absent from the response; the caller passes defaults
/// of zero in that case.
fn login_failure(errorcode: Option<&str>, counters: &LoginResponse) -> Error {
    match errorcode {
        Some("login failed") => Error::LoginFailed {
            remaining: counters.attempts_allowed,
            allowed: counters.attempts_allowed + counters.failure_count,
        },
        Some("exceeded max attempts") => Error::LockedOut,
        Some("user conflict") => Error::ConcurrentSession,
        Some(code) => Error::Login(code.to_string()),
        None => Error::Login("fail".to_string()),
    }
}

impl Client {
    /// Runs the full handshake: fetch the password key, generate the
    /// session cipher and fetch the signing key, then send the signed
    /// login call. On success the client holds a token-scoped session
    /// used by every subsequent call.
    ///
    /// Any transport, decode, or key-validation failure aborts the
    /// sequence; nothing here retries.
    pub async fn login(&mut self, password: &str) -> Result<()> {
        let password_key = self.fetch_password_key().await?;
        let cipher = Arc::new(AesCipher::generate(&mut thread_rng())?);
        let signer = self.fetch_signer(password, cipher).await?;
        let token = self.do_login(password, &password_key, &signer).await?;
        tracing::info!("login succeeded");
        self.session = Some(Session { token, signer });
        Ok(())
    }

    /// Tells the router to drop the session, then clears it locally.
    /// The session is cleared even when the router call fails, and
    /// calling this while already logged out is a no-op.
    pub async fn logout(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Ok(());
        }
        let url = self.make_form_url("admin/system", "logout")?;
        let result = {
            let signer = self.signer()?;
            self.request(url, &Operation::write(), Some((signer, &SignatureContext::Standard)))
                .await
        };
        self.session = None;
        let body = result?;
        read_response::<serde_json::Value>(&body)?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Unsigned read of `login?form=keys`: the 1024-bit key the password
    /// field is encrypted with.
    async fn fetch_password_key(&self) -> Result<RsaCipher> {
        let url = self.make_form_url("login", "keys")?;
        let body = self.request(url, &Operation::read(), None).await?;
        let resp = read_response::<KeysResponse>(&body)?
            .ok_or_else(|| Error::Protocol("keys response had no data".to_string()))?;
        tracing::debug!("fetched password key");
        RsaCipher::parse(&resp.password, KeyKind::Password)
    }

    /// Unsigned read of `login?form=auth`: the 512-bit signing key and
    /// the session's base sequence number.
    async fn fetch_signer(&self, password: &str, cipher: Arc<AesCipher>) -> Result<RsaSigner> {
        let url = self.make_form_url("login", "auth")?;
        let body = self.request(url, &Operation::read(), None).await?;
        let resp = read_response::<AuthResponse>(&body)?
            .ok_or_else(|| Error::Protocol("auth response had no data".to_string()))?;
        tracing::debug!(seq = resp.seq, "fetched signing key");
        RsaSigner::new(password, &resp.key, resp.seq, cipher)
    }

    /// The signed login call. The password travels RSA-encrypted under
    /// the password key; the envelope signature carries the session key.
    async fn do_login(
        &self,
        password: &str,
        password_key: &RsaCipher,
        signer: &RsaSigner,
    ) -> Result<String> {
        let request = LoginRequest {
            operation: "login",
            password: password_key.encrypt_hex(password.as_bytes())?,
        };
        let url = self.make_form_url("login", "login")?;
        let ctx = signer.login_context();
        let body = self.request(url, &request, Some((signer, &ctx))).await?;
        let resp = ResponseWrapper::<LoginResponse>::decode(&body)?;
        if !resp.success {
            let counters = resp.data.unwrap_or_default();
            return Err(login_failure(resp.errorcode.as_deref(), &counters));
        }
        resp.data
            .filter(|data| !data.token.is_empty())
            .map(|data| data.token)
            .ok_or_else(|| Error::Protocol("login response had no token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_taxonomy() {
        let counters = LoginResponse::default();
        assert!(matches!(
            login_failure(Some("exceeded max attempts"), &counters),
            Error::LockedOut
        ));
        assert!(matches!(
            login_failure(Some("user conflict"), &counters),
            Error::ConcurrentSession
        ));
        match login_failure(Some("bad stuff"), &counters) {
            Error::Login(detail) => assert_eq!(detail, "bad stuff"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_counters_default_to_zero() {
        // The firmware can report "login failed" with no data payload at
        // all; that must not be treated as anything other than 0/0.
        let counters = LoginResponse::default();
        match login_failure(Some("login failed"), &counters) {
            Error::LoginFailed { remaining, allowed } => {
                assert_eq!((remaining, allowed), (0, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn attempt_counters_are_combined() {
        let counters = LoginResponse {
            token: String::new(),
            attempts_allowed: 3,
            failure_count: 7,
        };
        match login_failure(Some("login failed"), &counters) {
            Error::LoginFailed { remaining, allowed } => {
                assert_eq!((remaining, allowed), (3, 10));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn logout_is_idempotent_when_logged_out() {
        let mut client = Client::new("192.168.0.1").unwrap();
        assert!(client.logout().await.is_ok());
        assert!(client.logout().await.is_ok());
        assert_eq!(client.token(), "");
    }
}

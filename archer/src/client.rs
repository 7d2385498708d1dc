use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::crypto::{RsaSigner, SignatureContext};
use crate::error::{Error, Result};
use crate::form::{FormRequest, Operation};
use crate::response::read_response;

/// One authenticated admin session: the token scoped into every URL
/// plus the signer created at login. The signer owns the session
/// cipher, so token, cipher, and signer share one lifetime.
pub(crate) struct Session {
    pub(crate) token: String,
    pub(crate) signer: RsaSigner,
}

/// Client for the router's web-administration API.
///
/// Every call borrows the client, so one session only ever runs one
/// request at a time; run independent logins on separate clients when
/// parallelism is needed. Retry and timeout policy belongs to the
/// caller, nothing in here retries.
pub struct Client {
    host: String,
    pub(crate) http: reqwest::Client,
    pub(crate) session: Option<Session>,
}

impl Client {
    /// `host` is the router's address, e.g. `192.168.0.1`.
    ///
    /// The firmware checks browser-shaped headers and sets a session
    /// cookie, so both are wired into the HTTP client up front.
    pub fn new(host: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0",
            ),
        );
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            host: host.to_string(),
            http,
            session: None,
        })
    }

    /// Current session token, empty when logged out.
    pub fn token(&self) -> &str {
        self.session.as_ref().map(|s| s.token.as_str()).unwrap_or("")
    }

    pub(crate) fn signer(&self) -> Result<&RsaSigner> {
        self.session
            .as_ref()
            .map(|s| &s.signer)
            .ok_or(Error::NotLoggedIn)
    }

    /// Builds the token-scoped URL for an endpoint. The `;stok=` path
    /// segment is present even before login, with an empty token.
    pub(crate) fn make_url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "http://{}/cgi-bin/luci/;stok={}/{}",
            self.host,
            self.token(),
            endpoint
        ))
        .map_err(|e| Error::Protocol(format!("bad endpoint url: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub(crate) fn make_form_url(&self, endpoint: &str, form: &str) -> Result<Url> {
        self.make_url(endpoint, &[("form", form)])
    }

    /// POSTs form bytes and returns the raw body. Non-2xx statuses are
    /// transport failures; protocol errors live inside 200 bodies.
    async fn post_form(&self, url: Url, body: Vec<u8>) -> Result<Vec<u8>> {
        let resp = self.http.post(url).body(body).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            tracing::warn!(%status, "router returned error status");
            return Err(Error::Status(status));
        }
        Ok(body.to_vec())
    }

    /// Sends one request: signs and encrypts the body when a signer is
    /// given, POSTs it, and decrypts the response the same way.
    pub(crate) async fn request<B: FormRequest>(
        &self,
        url: Url,
        body: &B,
        signer: Option<(&RsaSigner, &SignatureContext)>,
    ) -> Result<Vec<u8>> {
        let payload = match signer {
            Some((signer, ctx)) => signer.sign(body, ctx)?.to_form_bytes()?,
            None => body.to_form_bytes()?,
        };
        let raw = self.post_form(url, payload).await?;
        match signer {
            Some((signer, _)) => signer.decrypt_response(&raw),
            None => Ok(raw),
        }
    }
}

/// Devices attached to the router, as shown on the status page.
#[derive(Debug, Deserialize, Serialize)]
pub struct ClientList {
    #[serde(rename = "access_devices_wireless_host", default)]
    pub wireless: Vec<AccessDevice>,
    #[serde(rename = "access_devices_wired", default)]
    pub wired: Vec<AccessDevice>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AccessDevice {
    pub hostname: String,
    #[serde(rename = "ipaddr")]
    pub ipv4: String,
    #[serde(rename = "macaddr")]
    pub mac: String,
    pub wire_type: String,
}

impl Client {
    /// Fetches the attached-device list. Requires a logged-in session.
    pub async fn client_list(&self) -> Result<ClientList> {
        let url = self.make_form_url("admin/status", "client_status")?;
        let signer = self.signer()?;
        let body = self
            .request(url, &Operation::read(), Some((signer, &SignatureContext::Standard)))
            .await?;
        read_response::<ClientList>(&body)?
            .ok_or_else(|| Error::Protocol("client list response had no data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_empty_token_before_login() {
        let client = Client::new("192.168.0.1").unwrap();
        let url = client.make_form_url("login", "keys").unwrap();
        assert_eq!(
            url.as_str(),
            "http://192.168.0.1/cgi-bin/luci/;stok=/login?form=keys"
        );
    }

    #[test]
    fn calls_without_session_report_not_logged_in() {
        let client = Client::new("192.168.0.1").unwrap();
        assert!(matches!(client.signer(), Err(Error::NotLoggedIn)));
    }

    #[test]
    fn device_list_decodes_firmware_field_names() {
        let body = br#"{
            "access_devices_wireless_host": [
                {"hostname": "phone", "ipaddr": "192.168.0.23",
                 "macaddr": "aa:bb:cc:dd:ee:ff", "wire_type": "wireless"}
            ],
            "access_devices_wired": []
        }"#;
        let list: ClientList = serde_json::from_slice(body).unwrap();
        assert_eq!(list.wireless.len(), 1);
        assert_eq!(list.wireless[0].ipv4, "192.168.0.23");
        assert!(list.wired.is_empty());
    }
}

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Generic envelope every endpoint answers with: plaintext for unsigned
/// calls, post-decryption for signed ones.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct ResponseWrapper<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errorcode: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T: DeserializeOwned> ResponseWrapper<T> {
    /// Decodes the raw wrapper without judging `success`. Login needs
    /// the payload even when the call failed, to read attempt counters.
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

impl<T> ResponseWrapper<T> {
    /// Turns `success: false` into an endpoint error carrying the code.
    pub fn into_data(self) -> Result<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(Error::Endpoint(
                self.errorcode.unwrap_or_else(|| "fail".to_string()),
            ))
        }
    }
}

/// Decodes a response body and unwraps its payload.
pub fn read_response<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>> {
    ResponseWrapper::<T>::decode(body)?.into_data()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: i64,
    }

    #[test]
    fn success_yields_data() {
        let body = br#"{"success":true,"errorcode":null,"data":{"value":7}}"#;
        let data = read_response::<Payload>(body).unwrap();
        assert_eq!(data, Some(Payload { value: 7 }));
    }

    #[test]
    fn failure_carries_error_code() {
        let body = br#"{"success":false,"errorcode":"timeout"}"#;
        match read_response::<Payload>(body) {
            Err(Error::Endpoint(code)) => assert_eq!(code, "timeout"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn failure_without_code_maps_to_fail() {
        let body = br#"{"success":false}"#;
        match read_response::<Payload>(body) {
            Err(Error::Endpoint(code)) => assert_eq!(code, "fail"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_malformed_envelope() {
        assert!(matches!(
            read_response::<Payload>(b"<html>"),
            Err(Error::MalformedEnvelope(_))
        ));
    }
}

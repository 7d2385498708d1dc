use serde::Serialize;

use crate::crypto::EncryptedFormData;
use crate::error::Result;

/// Request bodies that can be sent as `application/x-www-form-urlencoded`.
///
/// Implemented explicitly per request type; the provided body covers any
/// `Serialize` struct with scalar fields.
pub trait FormRequest: Serialize {
    fn to_form_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_urlencoded::to_string(self)?.into_bytes())
    }
}

/// The bare `operation` field that read/write endpoints expect.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Operation {
    pub operation: &'static str,
}

impl Operation {
    pub fn read() -> Self {
        Self { operation: "read" }
    }

    pub fn write() -> Self {
        Self { operation: "write" }
    }
}

impl FormRequest for Operation {}

impl FormRequest for EncryptedFormData {}

//! Client for the TP-Link Archer AX50 web-administration API.
//!
//! The router's admin interface runs over plain HTTP and layers its own
//! hybrid encryption on top instead of TLS client auth. At login the
//! client fetches two server-issued RSA public keys (one for the
//! password field, one for request signing), generates a fresh AES-128
//! session cipher, and transmits the session key to the firmware inside
//! an RSA-encrypted signature string. Every authenticated call after
//! that wraps its form body in a signed, AES-CBC-encrypted envelope and
//! decrypts the matching encrypted response.
//!
//! The byte-level details (chunked RSA signature encryption, byte-count
//! padding, the sequence field derived from each call's ciphertext
//! length) reproduce what the firmware expects; deviating from any of
//! them makes authenticated calls fail silently.
//!
//! ```rust,no_run
//! use archer::Client;
//!
//! # async fn run() -> archer::Result<()> {
//! let mut client = Client::new("192.168.0.1")?;
//! client.login("hunter2").await?;
//! let devices = client.client_list().await?;
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod crypto;
pub mod error;
pub mod form;
pub mod response;

mod login;

pub use client::{AccessDevice, Client, ClientList};
pub use error::{Error, Result};

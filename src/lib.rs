//! Sign and dispatch OpenAPI requests authenticated with a SigV4-style
//! HMAC-SHA256 chain.
//!
//! The crate takes a description of one API call ([`RequestDescriptor`]) and
//! a resolved credential pair ([`Credential`]), deterministically builds the
//! canonical request, derives a per-request signing key, and attaches the
//! resulting `Authorization` header before dispatching the call over HTTP.
//!
//! ## Overview
//!
//! - [`RequestDescriptor`]: immutable value describing one API call.
//! - [`sign`]: pure function producing a [`SignedRequest`] for a fixed
//!   timestamp.
//! - [`Signer`]: validates, signs with the current time, and dispatches via
//!   a pluggable [`HttpSend`] transport.
//!
//! ## Example
//!
//! ```no_run
//! use vesign::{Credential, RequestDescriptor, Signer};
//!
//! # async fn example() -> vesign::Result<()> {
//! let desc = RequestDescriptor::new("open", "cn-beijing", "open.volcengineapi.com")
//!     .with_method("POST")
//!     .with_action("ListFoundationModels")
//!     .with_version("2024-01-01")
//!     .with_body(serde_json::json!({ "PageSize": 10 }));
//!
//! let cred = Credential::new("access_key_id", "secret_access_key");
//!
//! let signer = Signer::default();
//! let body = signer.send(&desc, &cred).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Signing is stateless: every call reads only its own descriptor and
//! credential, so a single [`Signer`] may be shared freely across tasks.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;

mod constants;
mod credential;
pub use credential::Credential;
mod error;
pub use error::{Error, ErrorKind, Result};
mod request;
pub use request::RequestDescriptor;
mod sign;
pub use sign::{derive_signing_key, sign, SignedRequest};
mod dispatch;
pub use dispatch::{HttpSend, ReqwestHttpSend, Signer};

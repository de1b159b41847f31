//! HTTP dispatch of signed requests.

use crate::sign::sign;
use crate::time::now;
use crate::{Credential, Error, RequestDescriptor, Result, SignedRequest};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use log::debug;
use once_cell::sync::Lazy;
use reqwest::Client;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// HttpSend is used to send the signed request over the wire.
///
/// This trait exists so the dispatch path can be driven by any HTTP client,
/// including a mock transport in tests.
#[async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send the request and return the response.
    ///
    /// A `timeout` of `None` means the transport default applies.
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
        timeout: Option<Duration>,
    ) -> Result<http::Response<Bytes>>;
}

// Shared client used when no per-request timeout is given. reqwest clients
// pool connections internally, so one is enough for the whole process.
static DEFAULT_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// HttpSend implementation backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpSend {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT.clone())
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
        timeout: Option<Duration>,
    ) -> Result<http::Response<Bytes>> {
        // A non-zero timeout gets a client of its own; everything else
        // shares the configured client.
        let client = match timeout {
            Some(d) => Client::builder().timeout(d).build().map_err(|e| {
                Error::transport_failed("failed to build http client").with_source(e)
            })?,
            None => self.client.clone(),
        };

        let req = reqwest::Request::try_from(req)
            .map_err(|e| Error::transport_failed("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = client
            .execute(req)
            .await
            .map_err(|e| Error::transport_failed(format!("request failed: {e}")).with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| {
                Error::transport_failed("failed to read response body").with_source(e)
            })?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

/// Signer validates, signs and dispatches API requests.
///
/// Stateless across calls: no credential or signature is cached, and a
/// single instance is safe to share between concurrent tasks.
#[derive(Clone, Debug)]
pub struct Signer {
    http: Arc<dyn HttpSend>,
}

impl Default for Signer {
    fn default() -> Self {
        Self::new(ReqwestHttpSend::default())
    }
}

impl Signer {
    /// Create a new signer over the given transport.
    pub fn new(http: impl HttpSend) -> Self {
        Self {
            http: Arc::new(http),
        }
    }

    /// Sign the descriptor at the current time and dispatch it.
    ///
    /// Returns the raw response body on 2xx. On a non-2xx status the body is
    /// still available through [`Error::body`] so callers can parse a
    /// provider-specific error payload.
    pub async fn send(&self, desc: &RequestDescriptor, cred: &Credential) -> Result<Bytes> {
        let signed = sign(desc, cred, now())?;
        self.dispatch(signed, desc.timeout).await
    }

    /// Dispatch an already signed request.
    pub async fn dispatch(&self, signed: SignedRequest, timeout: Option<Duration>) -> Result<Bytes> {
        let req = signed.into_http_request()?;
        debug!("dispatching {} {}", req.method(), req.uri());

        let timeout = timeout.filter(|d| !d.is_zero());
        let (parts, body) = self.http.http_send(req, timeout).await?.into_parts();

        if !parts.status.is_success() {
            return Err(Error::remote_rejected(format!(
                "status={} body={}",
                parts.status.as_u16(),
                String::from_utf8_lossy(&body)
            ))
            .with_body(body));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    #[derive(Debug)]
    struct StaticHttpSend {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpSend for StaticHttpSend {
        async fn http_send(
            &self,
            _req: http::Request<Bytes>,
            _timeout: Option<Duration>,
        ) -> Result<http::Response<Bytes>> {
            Ok(http::Response::builder()
                .status(self.status)
                .body(Bytes::from_static(self.body.as_bytes()))?)
        }
    }

    fn test_descriptor() -> RequestDescriptor {
        RequestDescriptor::new("open", "cn-beijing", "open.volcengineapi.com")
            .with_method("POST")
            .with_path("/v1/test")
            .with_body(json!({}))
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let signer = Signer::new(StaticHttpSend {
            status: 200,
            body: r#"{"ok":true}"#,
        });

        let body = signer
            .send(&test_descriptor(), &Credential::new("ak", "sk"))
            .await
            .expect("2xx must succeed");
        assert_eq!(body.as_ref(), br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_non_2xx_preserves_body() {
        let signer = Signer::new(StaticHttpSend {
            status: 403,
            body: r#"{"error":"denied"}"#,
        });

        let err = signer
            .send(&test_descriptor(), &Credential::new("ak", "sk"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteRejected);
        assert!(err.to_string().contains("403"), "{err}");
        assert_eq!(
            err.body().expect("body must be attached").as_ref(),
            br#"{"error":"denied"}"#
        );
    }

    #[tokio::test]
    async fn test_validation_runs_before_dispatch() {
        let signer = Signer::new(StaticHttpSend {
            status: 200,
            body: "",
        });

        let err = signer
            .send(&test_descriptor(), &Credential::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }
}

//! Canonical request construction, key derivation and signature assembly.

use crate::constants::{
    ALGORITHM, CONTENT_TYPE_JSON, SCOPE_TERMINATOR, SIGNED_HEADERS, X_CONTENT_SHA256, X_DATE,
    X_SECURITY_TOKEN,
};
use crate::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use crate::time::{format_date, format_iso8601, DateTime};
use crate::{Credential, Error, RequestDescriptor, Result};
use bytes::Bytes;
use http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderValue, Method, Uri};
use log::debug;

/// A fully signed request, ready for dispatch.
///
/// Created fresh for every call and discarded after dispatch. Signatures are
/// never reused: each call captures its own timestamp and therefore carries
/// its own signature.
#[derive(Debug)]
pub struct SignedRequest {
    /// HTTP method.
    pub method: Method,
    /// Full request URI including the canonical query string.
    pub uri: Uri,
    /// Complete header set including `X-Date`, `X-Content-Sha256` and
    /// `Authorization`.
    pub headers: HeaderMap,
    /// Serialized JSON body. Empty when the descriptor carried no body.
    pub body: Bytes,
    /// Final signature in lowercase hex, for inspection.
    pub signature: String,
}

impl SignedRequest {
    /// Convert into an `http::Request` for the transport layer.
    pub fn into_http_request(self) -> Result<http::Request<Bytes>> {
        let mut req = http::Request::builder()
            .method(self.method)
            .uri(self.uri)
            .body(self.body)?;
        *req.headers_mut() = self.headers;
        Ok(req)
    }
}

/// Derive the per-request signing key via four chained HMAC-SHA256 steps.
///
/// `date_stamp` is the `YYYYMMDD` prefix of the ISO-8601 basic timestamp.
/// The resulting 32 bytes are ephemeral; they are never logged or
/// serialized.
pub fn derive_signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());

    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

/// Sign one request at the given timestamp.
///
/// Pure function: the same descriptor, credential and timestamp always
/// produce the same canonical request, signing key and signature. Use
/// [`Signer`](crate::Signer) to sign with the current time and dispatch.
pub fn sign(desc: &RequestDescriptor, cred: &Credential, now: DateTime) -> Result<SignedRequest> {
    desc.validate(cred)?;

    let body = match &desc.body {
        Some(v) => Bytes::from(serde_json::to_vec(v)?),
        None => Bytes::new(),
    };
    let payload_hash = hex_sha256(&body);

    let timestamp = format_iso8601(now);
    let date_stamp = format_date(now);

    let headers = build_headers(desc, cred, &timestamp, &payload_hash)?;

    let query = canonical_query(desc);
    let creq = canonical_request(&desc.method.to_uppercase(), desc, &query, &headers)?;
    let hashed_creq = hex_sha256(creq.as_bytes());

    // Scope: "20250101/<region>/<service>/request"
    let scope = format!(
        "{date_stamp}/{}/{}/{SCOPE_TERMINATOR}",
        desc.region, desc.service
    );
    debug!("calculated scope: {scope}");

    // StringToSign:
    //
    // HMAC-SHA256
    // 20250101T000000Z
    // 20250101/<region>/<service>/request
    // <hashed_canonical_request>
    let string_to_sign = format!("{ALGORITHM}\n{timestamp}\n{scope}\n{hashed_creq}");
    debug!("calculated string to sign: {string_to_sign}");

    let signing_key = derive_signing_key(
        &cred.secret_access_key,
        &date_stamp,
        &desc.region,
        &desc.service,
    );
    let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

    let mut headers = headers;
    let mut authorization = HeaderValue::from_str(&format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
        cred.access_key_id,
        SIGNED_HEADERS.join(";"),
    ))?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);

    let uri = build_uri(desc, &query)?;
    let method = Method::from_bytes(desc.method.to_uppercase().as_bytes())?;

    Ok(SignedRequest {
        method,
        uri,
        headers,
        body,
        signature,
    })
}

/// Assemble the outgoing header set, `Authorization` excluded.
///
/// Computed defaults go in first so that explicit caller headers can
/// override them. The session token header is applied after caller headers;
/// like `Authorization` it is owned by the signer.
fn build_headers(
    desc: &RequestDescriptor,
    cred: &Credential,
    timestamp: &str,
    payload_hash: &str,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    headers.insert(HOST, HeaderValue::from_str(&desc.host)?);
    headers.insert(
        HeaderName::from_static(X_DATE),
        HeaderValue::from_str(timestamp)?,
    );
    headers.insert(
        HeaderName::from_static(X_CONTENT_SHA256),
        HeaderValue::from_str(payload_hash)?,
    );

    for (name, value) in &desc.headers {
        headers.insert(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
    }

    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token)?;
        // Set token value sensitive to avoid leaking.
        value.set_sensitive(true);
        headers.insert(HeaderName::from_static(X_SECURITY_TOKEN), value);
    }

    Ok(headers)
}

/// Build the canonical query string.
///
/// `Action` and `Version` are merged with the extra query parameters, pairs
/// are sorted, and the result is form-urlencoded with `+` rewritten to
/// `%20`: the target dialect requires spaces percent-encoded. The exact same
/// string goes into both the canonical request and the dispatched URI.
fn canonical_query(desc: &RequestDescriptor) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(desc.queries.len() + 2);
    if let Some(action) = &desc.action {
        pairs.push(("Action", action));
    }
    if let Some(version) = &desc.version {
        pairs.push(("Version", version));
    }
    for (k, v) in &desc.queries {
        pairs.push((k, v));
    }
    pairs.sort();

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    encoded.replace('+', "%20")
}

/// Serialize the canonical request.
///
/// The signed header set is fixed to `host`, `x-date`, `x-content-sha256`
/// and `content-type`, in that order. Values are read from the merged header
/// map (so a caller override of a signed header is what gets signed) and
/// trimmed of surrounding whitespace; the host value is taken verbatim, not
/// lower-cased.
fn canonical_request(
    method: &str,
    desc: &RequestDescriptor,
    query: &str,
    headers: &HeaderMap,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    f.push_str(method);
    f.push('\n');
    // An empty path stays empty; callers wanting "/" must say so.
    f.push_str(&desc.path);
    f.push('\n');
    f.push_str(query);
    f.push('\n');

    for name in SIGNED_HEADERS {
        let value = headers
            .get(name)
            .ok_or_else(|| Error::unexpected(format!("signed header {name} is missing")))?
            .to_str()?;
        f.push_str(name);
        f.push(':');
        f.push_str(value.trim());
        f.push('\n');
    }
    f.push('\n');

    f.push_str(&SIGNED_HEADERS.join(";"));
    f.push('\n');

    let payload_hash = headers
        .get(X_CONTENT_SHA256)
        .ok_or_else(|| Error::unexpected("payload hash header is missing"))?
        .to_str()?;
    f.push_str(payload_hash);

    Ok(f)
}

fn build_uri(desc: &RequestDescriptor, query: &str) -> Result<Uri> {
    let mut s = format!(
        "{}://{}{}",
        desc.scheme_or_default(),
        desc.host,
        desc.path
    );
    if !query.is_empty() {
        s.push('?');
        s.push_str(query);
    }

    Ok(s.parse::<Uri>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test_time() -> DateTime {
        chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn test_descriptor() -> RequestDescriptor {
        RequestDescriptor::new("open", "cn-beijing", "open.volcengineapi.com")
            .with_method("POST")
            .with_path("/v1/test")
            .with_body(json!({}))
    }

    fn test_credential() -> Credential {
        Credential::new("ak", "sk")
    }

    #[test]
    fn test_derive_signing_key_golden() {
        let key = derive_signing_key("sk", "20250101", "cn-beijing", "open");
        assert_eq!(
            hex::encode(&key),
            "2b2633a00d324793e7ee8c1640aaef48ca5cde2062ad6e2861c164f8dedc650e"
        );
    }

    #[test]
    fn test_authorization_golden() {
        let signed = sign(&test_descriptor(), &test_credential(), test_time()).unwrap();

        assert_eq!(
            signed.headers[AUTHORIZATION].to_str().unwrap(),
            "HMAC-SHA256 Credential=ak/20250101/cn-beijing/open/request, \
             SignedHeaders=host;x-date;x-content-sha256;content-type, \
             Signature=086287ea1713d49c81f1daff8699cdb72448d522040f5481807c9af5971cdd52"
        );
        assert_eq!(signed.headers[X_DATE], "20250101T000000Z");
        assert_eq!(
            signed.headers[X_CONTENT_SHA256],
            // sha256("{}")
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        assert_eq!(signed.headers[CONTENT_TYPE], "application/json");
        assert_eq!(signed.uri.to_string(), "https://open.volcengineapi.com/v1/test");
        assert_eq!(signed.body.as_ref(), b"{}");
    }

    #[test]
    fn test_sign_is_deterministic() {
        let a = sign(&test_descriptor(), &test_credential(), test_time()).unwrap();
        let b = sign(&test_descriptor(), &test_credential(), test_time()).unwrap();

        assert_eq!(a.signature, b.signature);
        assert_eq!(a.headers, b.headers);
        assert_eq!(a.uri, b.uri);
    }

    #[test]
    fn test_signature_sensitive_to_signed_fields() {
        let base = sign(&test_descriptor(), &test_credential(), test_time()).unwrap();

        let variants = vec![
            test_descriptor().with_method("PUT"),
            test_descriptor().with_path("/v1/other"),
            test_descriptor().with_query("PageSize", "10"),
            test_descriptor().with_action("ListThings"),
            test_descriptor().with_header("content-type", "application/json; charset=utf-8"),
            test_descriptor().with_body(json!({"a": 1})),
            RequestDescriptor::new("open", "cn-beijing", "other.volcengineapi.com")
                .with_method("POST")
                .with_path("/v1/test")
                .with_body(json!({})),
        ];

        for desc in variants {
            let signed = sign(&desc, &test_credential(), test_time()).unwrap();
            assert_ne!(base.signature, signed.signature, "descriptor: {desc:?}");
        }
    }

    #[test]
    fn test_signature_ignores_unsigned_headers() {
        let base = sign(&test_descriptor(), &test_credential(), test_time()).unwrap();
        let signed = sign(
            &test_descriptor().with_header("x-custom-trace", "abc123"),
            &test_credential(),
            test_time(),
        )
        .unwrap();

        assert_eq!(base.signature, signed.signature);
        assert_eq!(signed.headers["x-custom-trace"], "abc123");
    }

    #[test]
    fn test_empty_body_hashes_empty_string() {
        let mut desc = test_descriptor().with_method("GET");
        desc.body = None;

        let signed = sign(&desc, &test_credential(), test_time()).unwrap();
        assert_eq!(
            signed.headers[X_CONTENT_SHA256],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(signed.body.is_empty());
    }

    #[test]
    fn test_canonical_query_encoding() {
        let desc = test_descriptor()
            .with_action("DescribeInstances")
            .with_version("2020-04-01")
            .with_query("Filter.Name", "a b")
            .with_query("PageSize", "10");

        let query = canonical_query(&desc);
        assert_eq!(
            query,
            "Action=DescribeInstances&Filter.Name=a%20b&PageSize=10&Version=2020-04-01"
        );

        let signed = sign(&desc, &test_credential(), test_time()).unwrap();
        assert_eq!(signed.uri.query(), Some(query.as_str()));
    }

    #[test]
    fn test_empty_path_is_passed_through() {
        let mut desc = test_descriptor();
        desc.path = String::new();

        let signed = sign(&desc, &test_credential(), test_time()).unwrap();
        assert_eq!(signed.uri.to_string(), "https://open.volcengineapi.com/");

        let query = canonical_query(&desc);
        let creq = canonical_request("POST", &desc, &query, &signed.headers).unwrap();
        assert!(creq.starts_with("POST\n\n\n"), "{creq:?}");
    }

    #[test]
    fn test_session_token_header_is_set_but_unsigned() {
        let base = sign(&test_descriptor(), &test_credential(), test_time()).unwrap();
        let signed = sign(
            &test_descriptor(),
            &test_credential().with_session_token("token"),
            test_time(),
        )
        .unwrap();

        assert_eq!(signed.headers["x-security-token"], "token");
        assert_eq!(base.signature, signed.signature);
    }

    #[test]
    fn test_caller_cannot_override_authorization() {
        let signed = sign(
            &test_descriptor().with_header("authorization", "Basic forged"),
            &test_credential(),
            test_time(),
        )
        .unwrap();

        let value = signed.headers[AUTHORIZATION].to_str().unwrap();
        assert!(value.starts_with("HMAC-SHA256 Credential=ak/"), "{value}");
    }

    #[test]
    fn test_caller_header_overrides_content_type_and_gets_signed() {
        let signed = sign(
            &test_descriptor().with_header("Content-Type", "application/json; charset=utf-8"),
            &test_credential(),
            test_time(),
        )
        .unwrap();

        assert_eq!(
            signed.headers[CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
    }
}

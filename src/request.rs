use crate::{Credential, Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Methods the signing protocol accepts, matched case-insensitively.
const ALLOWED_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// RequestDescriptor is an immutable value describing one API call.
///
/// Build it once with the `with_*` methods, then hand it to
/// [`sign`](crate::sign) or [`Signer::send`](crate::Signer::send). The
/// descriptor is read-only for the duration of one signing operation, so the
/// same descriptor signed twice at the same timestamp yields the same
/// signature.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    /// HTTP method, one of GET/POST/PUT/DELETE/PATCH/HEAD/OPTIONS.
    pub method: String,
    /// `http` or `https`. Empty means `https`.
    pub scheme: Option<String>,
    /// Authority only, no path separator.
    pub host: String,
    /// Empty, or starting with `/`. An empty path is passed through
    /// literally; no `/` is implied.
    pub path: String,
    /// Service id used in the credential scope.
    pub service: String,
    /// Region id used in the credential scope.
    pub region: String,
    /// Optional provider `Action` query parameter.
    pub action: Option<String>,
    /// Optional provider `Version` query parameter.
    pub version: Option<String>,
    /// Extra headers merged into the signed request. Later entries override
    /// computed defaults.
    pub headers: Vec<(String, String)>,
    /// Extra query parameters merged with `action`/`version`.
    pub queries: Vec<(String, String)>,
    /// JSON body. Required for POST/PUT/PATCH.
    pub body: Option<Value>,
    /// Dispatch timeout. `None` or zero means the transport default.
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Create a descriptor for the given service, region and host.
    ///
    /// The method defaults to `GET` and the scheme to `https`.
    pub fn new(service: &str, region: &str, host: &str) -> Self {
        Self {
            method: "GET".to_string(),
            host: host.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            ..Default::default()
        }
    }

    /// Specify the HTTP method.
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    /// Specify the scheme, `http` or `https`.
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = Some(scheme.to_string());
        self
    }

    /// Specify the request path. Must start with `/` when non-empty.
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Specify the provider `Action` query parameter.
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// Specify the provider `Version` query parameter.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Add an extra header to the signed request.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Add an extra query parameter.
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.queries.push((name.to_string(), value.to_string()));
        self
    }

    /// Specify the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Specify the dispatch timeout. Zero means the transport default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Effective scheme of this request.
    pub fn scheme_or_default(&self) -> &str {
        match self.scheme.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => "https",
        }
    }

    /// Check that this descriptor can be signed and dispatched safely.
    ///
    /// All rules are checked; every violation is reported in one
    /// [`RequestInvalid`](crate::ErrorKind::RequestInvalid) error so callers
    /// can fix their input in a single pass. Pure function, no side effects.
    pub fn validate(&self, cred: &Credential) -> Result<()> {
        let mut reasons = Vec::new();

        if cred.access_key_id.trim().is_empty() {
            reasons.push("access key id is empty".to_string());
        }
        if cred.secret_access_key.trim().is_empty() {
            reasons.push("secret access key is empty".to_string());
        }

        let method = self.method.to_uppercase();
        if !ALLOWED_METHODS.contains(&method.as_str()) {
            reasons.push(format!("method {:?} is not supported", self.method));
        }

        if self.host.is_empty() {
            reasons.push("host is empty".to_string());
        } else if self.host.contains('/') {
            reasons.push(format!("host {:?} contains a path separator", self.host));
        }

        if !self.path.is_empty() && !self.path.starts_with('/') {
            reasons.push(format!("path {:?} does not start with '/'", self.path));
        }

        if self.service.is_empty() {
            reasons.push("service is empty".to_string());
        }
        if self.region.is_empty() {
            reasons.push("region is empty".to_string());
        }

        if matches!(method.as_str(), "POST" | "PUT" | "PATCH") && self.body.is_none() {
            reasons.push(format!("method {method} requires a body"));
        }

        if let Some(scheme) = self.scheme.as_deref() {
            if !scheme.is_empty() && scheme != "http" && scheme != "https" {
                reasons.push(format!("scheme {scheme:?} is not http or https"));
            }
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(Error::request_invalid(reasons.join("; ")))
        }
    }
}

// Headers carried by every signed request.
pub const X_DATE: &str = "x-date";
pub const X_CONTENT_SHA256: &str = "x-content-sha256";
pub const X_SECURITY_TOKEN: &str = "x-security-token";

/// Algorithm id used in both the string-to-sign and the Authorization header.
pub const ALGORITHM: &str = "HMAC-SHA256";

/// Terminator of the key derivation chain and of the credential scope.
pub const SCOPE_TERMINATOR: &str = "request";

/// The signed header set is deliberately fixed: the server canonicalizes the
/// same four headers in the same order, which keeps the rule auditable.
pub const SIGNED_HEADERS: [&str; 4] = ["host", X_DATE, X_CONTENT_SHA256, "content-type"];

pub const CONTENT_TYPE_JSON: &str = "application/json";

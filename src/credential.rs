use std::fmt::{Debug, Formatter};

/// Credential that holds the access key and secret key.
///
/// Credentials are borrowed for the duration of one sign and dispatch call;
/// the signer never stores or caches them.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key. Never logged; the `Debug` output is redacted.
    pub secret_access_key: String,
    /// Optional session token for temporary credentials.
    pub session_token: Option<String>,
}

impl Credential {
    /// Create a new credential pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attach a session token to this credential.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field(
                "session_token",
                &redact(self.session_token.as_deref().unwrap_or_default()),
            )
            .finish()
    }
}

/// Keep the first and last three characters of longer values so users can
/// tell credentials apart without leaking them.
fn redact(value: &str) -> String {
    match value.len() {
        0 => "EMPTY".to_string(),
        n if n < 12 => "***".to_string(),
        n => format!("{}***{}", &value[..3], &value[n - 3..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let cred = Credential::new("AKIDEXAMPLEKEY", "secret_value_example")
            .with_session_token("tok");

        let output = format!("{cred:?}");
        assert!(!output.contains("secret_value_example"));
        assert!(!output.contains("AKIDEXAMPLEKEY"));
        assert!(output.contains("AKI***KEY"));
        assert!(output.contains("sec***ple"));
    }

    #[test]
    fn test_redact_boundaries() {
        assert_eq!(redact(""), "EMPTY");
        assert_eq!(redact("shortvalue!"), "***");
        assert_eq!(redact("exactly12chs"), "exa***chs");
    }
}

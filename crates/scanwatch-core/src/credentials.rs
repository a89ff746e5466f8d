//! Read-only access to the session credential.
//!
//! Token storage and refresh belong to whoever owns the session; this crate
//! only asks for the current bearer token before each request.

/// Supplies the bearer token for scan service requests.
pub trait CredentialSource: Send + Sync {
    /// Current token, or `None` when the user is not signed in.
    fn bearer_token(&self) -> Option<String>;
}

/// Reads the token from an environment variable on every request.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredentials {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Fixed token (or none), for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<String>);

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

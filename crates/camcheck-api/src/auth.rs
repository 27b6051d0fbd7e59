use secrecy::{ExposeSecret, SecretString};

/// HTTP credentials supplied once at session creation.
///
/// The device authenticates every request with HTTP Basic; there is no
/// login endpoint and no credential rotation.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Plaintext password, for embedding in browser page URLs.
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Attach Basic authentication to a request builder.
    pub(crate) fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.username, Some(self.password.expose_secret()))
    }
}

// HTTP client settings for talking to a camera
//
// A session refresh throws the old reqwest client away and builds a new one
// from this config, so everything a rebuild needs is kept here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

use crate::error::Error;

/// How the camera's HTTPS certificate is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Trust only the platform's root store.
    System,
    /// Additionally trust the PEM-encoded CA at this path.
    CustomCa(PathBuf),
    /// Skip certificate checks. Factory cameras present self-signed certs.
    DangerAcceptInvalid,
}

/// Timeout, TLS and cookie settings for one device connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl TlsMode {
    fn apply(&self, builder: reqwest::ClientBuilder) -> Result<reqwest::ClientBuilder, Error> {
        Ok(match self {
            Self::System => builder,
            Self::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
            Self::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    Error::Tls(format!("reading CA bundle {}: {e}", path.display()))
                })?;
                let ca = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    Error::Tls(format!("CA bundle {} is not valid PEM: {e}", path.display()))
                })?;
                builder.add_root_certificate(ca)
            }
        })
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("camcheck/", env!("CARGO_PKG_VERSION")));
        let builder = self.tls.apply(builder)?;
        let builder = match &self.cookie_jar {
            Some(jar) => builder.cookie_provider(Arc::clone(jar)),
            None => builder,
        };
        builder
            .build()
            .map_err(|e| Error::Tls(format!("cannot construct HTTP client: {e}")))
    }

    /// Same settings with an empty cookie jar, so no old session cookie is sent.
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}

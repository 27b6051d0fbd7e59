// Device API HTTP client
//
// Wraps `reqwest::Client` with webSetup.cgi URL construction, Basic auth, the
// retry-on-401 / retry-on-transient policy, and returnCode interpretation.
// Every public call is one logical request; retries are invisible to callers
// unless the attempt budget runs out.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use strum::Display;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::request::{Method, Mode, RequestDescriptor};
use crate::retry::{Classify, Decision, FaultClass, RetryPolicy};
use crate::transport::TransportConfig;
use crate::wire::ResponseRecord;

/// Path of the device's single configuration endpoint.
pub const DEFAULT_ENDPOINT: &str = "/cgi-bin/webSetup.cgi";

const BODY_PREVIEW_CHARS: usize = 200;

/// Outcome of an accepted write or verify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// `returnCode=0`: applied immediately.
    #[strum(to_string = "applied")]
    Applied,
    /// `returnCode=301`: applied, the device is rebooting or will disconnect.
    /// State must not be read back before the device is ready again.
    #[strum(to_string = "pending reboot")]
    PendingReboot,
}

impl WriteOutcome {
    /// Interpret the `returnCode` of a write/verify response.
    pub fn from_record(req: &RequestDescriptor, record: &ResponseRecord) -> Result<Self, Error> {
        match record.return_code() {
            Some("0") => Ok(Self::Applied),
            Some("301") => Ok(Self::PendingReboot),
            Some(code) => Err(Error::Rejected {
                action: req.action().to_owned(),
                code: code.to_owned(),
                params: req.describe_params(),
            }),
            None => Err(Error::MissingReturnCode {
                action: req.action().to_owned(),
            }),
        }
    }

    pub fn requires_reboot(self) -> bool {
        matches!(self, Self::PendingReboot)
    }
}

/// Tuning for a [`DeviceClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Path of the configuration endpoint, relative to the device URL.
    pub endpoint: String,
    /// Path polled to decide that the device is up and the session usable.
    pub ready_path: String,
    /// Text that must appear in the ready page body, if any.
    pub ready_marker: Option<String>,
    /// Upper bound on one readiness wait.
    pub ready_timeout: Duration,
    /// Pause between readiness probes.
    pub ready_poll: Duration,
    /// Attempt budget and backoff for every request.
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            ready_path: "/".into(),
            ready_marker: None,
            ready_timeout: Duration::from_secs(15),
            ready_poll: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

/// Resilient client for the device's query/command API.
///
/// Single-session and strictly sequential: the device API is not assumed safe
/// under concurrent writers, so callers issue one request at a time. After a
/// 401 the underlying HTTP client (and its cookie jar) is replaced before the
/// next attempt; a session known to be invalid is never reused.
pub struct DeviceClient {
    http: RwLock<reqwest::Client>,
    base_url: Url,
    credentials: Option<Credentials>,
    transport: TransportConfig,
    options: ClientOptions,
}

impl DeviceClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the device root, e.g. `http://192.168.0.90`.
    pub fn new(
        base_url: Url,
        credentials: Option<Credentials>,
        transport: &TransportConfig,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        let transport = transport.clone().with_cookie_jar();
        let http = transport.build_client()?;
        Ok(Self {
            http: RwLock::new(http),
            base_url,
            credentials,
            transport,
            options,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// Session refreshes still rebuild from a default `TransportConfig`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Option<Credentials>,
        options: ClientOptions,
    ) -> Self {
        Self {
            http: RwLock::new(http),
            base_url,
            credentials,
            transport: TransportConfig::default(),
            options,
        }
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Full URL of the configuration endpoint.
    pub fn endpoint_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join(&self.options.endpoint)?)
    }

    fn http(&self) -> reqwest::Client {
        self.http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Public operations ───────────────────────────────────────────

    /// Read an action (`mode=1`) and return the parsed record.
    pub async fn get(&self, action: &str) -> Result<ResponseRecord, Error> {
        self.send(&RequestDescriptor::read(action)).await
    }

    /// Read an action with an explicit mode.
    pub async fn get_with_mode(&self, action: &str, mode: Mode) -> Result<ResponseRecord, Error> {
        self.send(&RequestDescriptor::read(action).with_mode(mode)).await
    }

    /// Write parameters (`mode=0`). `returnCode` in `params` is never sent.
    ///
    /// Succeeds only for `returnCode` 0 or 301.
    pub async fn set<I, K, V>(&self, action: &str, params: I) -> Result<WriteOutcome, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.mutate(RequestDescriptor::write(action, params)).await
    }

    /// Verify parameters (`mode=2`) with the same success rules as [`set`](Self::set).
    pub async fn verify<I, K, V>(&self, action: &str, params: I) -> Result<WriteOutcome, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.mutate(RequestDescriptor::verify(action, params)).await
    }

    async fn mutate(&self, req: RequestDescriptor) -> Result<WriteOutcome, Error> {
        let record = self.send(&req).await?;
        let outcome = WriteOutcome::from_record(&req, &record);
        match &outcome {
            Ok(outcome) => debug!(action = req.action(), %outcome, "write accepted"),
            Err(e) => warn!(
                action = req.action(),
                mode = %req.mode(),
                params = %req.describe_params(),
                code = record.return_code().unwrap_or("<none>"),
                error = %e,
                "write rejected by device"
            ),
        }
        outcome
    }

    /// Issue one logical request under the retry policy.
    pub async fn send(&self, req: &RequestDescriptor) -> Result<ResponseRecord, Error> {
        let policy = self.options.retry;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let err = match self.execute(req).await {
                Ok(record) => return Ok(record),
                Err(e) => e,
            };

            match policy.decide(attempt, &err) {
                Decision::Refresh => {
                    warn!(
                        action = req.action(),
                        attempt,
                        max_attempts = policy.max_attempts,
                        "unauthorized, refreshing session before retry"
                    );
                    if let Err(e) = self.refresh_session().await {
                        warn!(error = %e, "session refresh did not complete");
                    }
                    policy.pause().await;
                }
                Decision::Backoff => {
                    warn!(
                        action = req.action(),
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %err,
                        "request failed, retrying after backoff"
                    );
                    policy.pause().await;
                }
                Decision::GiveUp if attempt > 1 && err.class() != FaultClass::Fatal => {
                    warn!(action = req.action(), attempt, error = %err, "retries exhausted");
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Decision::GiveUp => return Err(err),
            }
        }
    }

    // ── Single attempt ──────────────────────────────────────────────

    async fn execute(&self, req: &RequestDescriptor) -> Result<ResponseRecord, Error> {
        let url = self.endpoint_url()?;
        let http = self.http();
        let pairs = req.pairs();

        debug!(
            action = req.action(),
            mode = %req.mode(),
            method = %req.method(),
            "{} {}",
            req.method(),
            url
        );

        let builder = match req.method() {
            Method::Get => http.get(url).query(&pairs),
            Method::Post => http.post(url).form(&pairs),
        };
        let builder = match &self.credentials {
            Some(credentials) => credentials.apply(builder),
            None => builder,
        };

        let resp = builder.send().await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let body = resp.text().await?;
        trace!(body = %body, "response body");
        Ok(ResponseRecord::parse(&body))
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Discard the current session and wait for the device to accept a new one.
    ///
    /// Replaces the HTTP client (fresh cookie jar), then waits for the ready
    /// path within `ready_timeout`.
    pub async fn refresh_session(&self) -> Result<(), Error> {
        let transport = self.transport.clone().with_cookie_jar();
        let fresh = transport.build_client()?;
        *self.http.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        debug!("HTTP session replaced");
        self.wait_until_ready(self.options.ready_timeout).await
    }

    /// Poll the ready path until the device answers with a success status
    /// (and the ready marker, if configured), or `timeout` elapses.
    ///
    /// A 401 on the ready path means the credentials themselves are rejected
    /// and returns [`Error::Unauthorized`] at once.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), Error> {
        let url = self.base_url.join(&self.options.ready_path)?;
        let deadline = Instant::now() + timeout;

        loop {
            match self.probe_ready(&url).await {
                Probe::Ready => {
                    debug!(%url, "device ready");
                    return Ok(());
                }
                Probe::Rejected => {
                    warn!(%url, "device rejected credentials while waiting for readiness");
                    return Err(Error::Unauthorized);
                }
                Probe::NotYet => {}
            }
            if Instant::now() + self.options.ready_poll > deadline {
                return Err(Error::NotReady {
                    timeout_secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.options.ready_poll).await;
        }
    }

    async fn probe_ready(&self, url: &Url) -> Probe {
        let builder = self.http().get(url.clone());
        let builder = match &self.credentials {
            Some(credentials) => credentials.apply(builder),
            None => builder,
        };

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                trace!(error = %e, "ready probe failed");
                return Probe::NotYet;
            }
        };

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Probe::Rejected;
        }
        if !resp.status().is_success() {
            trace!(status = %resp.status(), "ready probe not successful");
            return Probe::NotYet;
        }

        let ready = match &self.options.ready_marker {
            None => true,
            Some(marker) => resp
                .text()
                .await
                .is_ok_and(|body| body.contains(marker.as_str())),
        };
        if ready { Probe::Ready } else { Probe::NotYet }
    }
}

/// Result of one readiness poll.
enum Probe {
    Ready,
    NotYet,
    Rejected,
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

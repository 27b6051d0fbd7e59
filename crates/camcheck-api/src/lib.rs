// camcheck-api: resilient client for the camera's webSetup.cgi configuration API

pub mod auth;
pub mod client;
pub mod error;
pub mod request;
pub mod retry;
pub mod transport;
pub mod wire;

pub use auth::Credentials;
pub use client::{ClientOptions, DEFAULT_ENDPOINT, DeviceClient, WriteOutcome};
pub use error::Error;
pub use request::{Method, Mode, RequestDescriptor};
pub use retry::{Classify, Decision, FaultClass, RetryPolicy};
pub use transport::{TlsMode, TransportConfig};
pub use wire::ResponseRecord;

// camcheck-core: settings round-trip workflow over a browser-driven UI
//
// Components receive a `SuiteConfig` at construction and a `UiDriver` for
// every browser interaction; the request client comes from `camcheck-api`.

pub mod config;
pub mod error;
pub mod popup;
pub mod settings;
pub mod ui;
pub mod verify;

pub use config::{BrowserSettings, DeviceSettings, FieldTarget, Selectors, SuiteConfig, Timeouts};
pub use error::CoreError;
pub use popup::{ButtonChoice, PopupResolver};
pub use settings::{ExportArtifact, SettingsController};
pub use ui::{Download, ElementState, Locator, Nth, UiDriver, UiError};
pub use verify::{
    DEFAULT_DIRTY, DEFAULT_SENTINEL, RoundTrip, RoundTripPlan, RoundTripReport, Stage, Verdict,
    read_field,
};

#[cfg(feature = "webdriver")]
pub use ui::webdriver::WebDriverSession;

// Browser automation capability
//
// The workflow components only see `UiDriver`: navigate, reload, click,
// fill, bounded waits on element state, element counts, file chooser
// injection and download capture. `webdriver` provides the real backend;
// tests script their own.

#[cfg(feature = "webdriver")]
pub mod webdriver;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use strum::Display;
use thiserror::Error;

use camcheck_api::{Classify, FaultClass};

// ── Locators ────────────────────────────────────────────────────────

/// Which of several matching elements a locator designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nth {
    First,
    Last,
    Index(usize),
}

impl Nth {
    /// Pick the designated element out of the matches, in document order.
    pub fn pick<T>(self, mut matches: Vec<T>) -> Option<T> {
        match self {
            Self::First if !matches.is_empty() => Some(matches.swap_remove(0)),
            Self::First => None,
            Self::Last => matches.pop(),
            Self::Index(i) if i < matches.len() => Some(matches.swap_remove(i)),
            Self::Index(_) => None,
        }
    }
}

/// A CSS-addressed element, optionally scoped inside another locator.
///
/// With `visible_only`, hidden matches are filtered out before `nth` is
/// applied and before counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    css: String,
    nth: Nth,
    visible_only: bool,
    within: Option<Box<Locator>>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            css: selector.into(),
            nth: Nth::First,
            visible_only: false,
            within: None,
        }
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Nth::Index(index);
        self
    }

    pub fn last(mut self) -> Self {
        self.nth = Nth::Last;
        self
    }

    pub fn visible(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Scope this locator inside the element designated by `parent`.
    pub fn within(mut self, parent: Locator) -> Self {
        self.within = Some(Box::new(parent));
        self
    }

    pub fn selector(&self) -> &str {
        &self.css
    }

    pub fn position(&self) -> Nth {
        self.nth
    }

    pub fn visible_only(&self) -> bool {
        self.visible_only
    }

    pub fn parent(&self) -> Option<&Locator> {
        self.within.as_deref()
    }

    /// Locators from the outermost scope down to `self`.
    pub fn chain(&self) -> Vec<&Locator> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent() {
            write!(f, "{parent} >> ")?;
        }
        f.write_str(&self.css)?;
        if self.visible_only {
            f.write_str(":visible")?;
        }
        match self.nth {
            Nth::First => Ok(()),
            Nth::Last => f.write_str("[last]"),
            Nth::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Element condition a bounded wait can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ElementState {
    /// Present in the DOM, regardless of visibility.
    Attached,
    /// Present and displayed.
    Visible,
    /// Absent or not displayed.
    Hidden,
    /// Displayed and accepting input.
    Enabled,
}

/// A completed browser download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Where the browser saved the file.
    pub path: PathBuf,
    pub suggested_name: Option<String>,
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum UiError {
    /// A bounded wait expired.
    #[error("Timed out after {}ms waiting for {what}", .after.as_millis())]
    Timeout { what: String, after: Duration },

    /// The locator matched nothing when an element was required.
    #[error("No element matches {0}")]
    NotFound(String),

    /// The browser or WebDriver server reported an error.
    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UiError {
    pub fn timeout(what: impl fmt::Display, after: Duration) -> Self {
        Self::Timeout {
            what: what.to_string(),
            after,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl Classify for UiError {
    fn class(&self) -> FaultClass {
        match self {
            Self::Timeout { .. } | Self::Driver(_) => FaultClass::Transient,
            Self::NotFound(_) | Self::Io(_) => FaultClass::Fatal,
        }
    }
}

// ── Capability ──────────────────────────────────────────────────────

/// Browser automation as used by the workflow components.
///
/// Every wait is bounded by the `timeout` argument and reports
/// [`UiError::Timeout`] on expiry. Implementations never block forever.
#[allow(async_fn_in_trait)]
pub trait UiDriver {
    /// Load a page and wait for the navigation to commit.
    async fn navigate(&mut self, url: &str) -> Result<(), UiError>;

    /// Reload the current page.
    async fn reload(&mut self) -> Result<(), UiError>;

    /// Wait for `target` to be visible, then click it.
    async fn click(&mut self, target: &Locator, timeout: Duration) -> Result<(), UiError>;

    /// Wait for `target` to be visible, then replace its text with `value`.
    async fn fill(&mut self, target: &Locator, value: &str, timeout: Duration)
    -> Result<(), UiError>;

    /// Wait until `target` reaches `state`.
    async fn wait_for(
        &mut self,
        target: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<(), UiError>;

    /// Number of elements `target` currently matches, ignoring its `nth`.
    async fn count(&mut self, target: &Locator) -> Result<usize, UiError>;

    /// Opaque identity of the element `target` designates right now, or
    /// `None` if it matches nothing. Equal ids mean the same DOM element.
    async fn element_id(&mut self, target: &Locator) -> Result<Option<String>, UiError>;

    /// Inject `file` (absolute path) into the file chooser behind `input`.
    async fn choose_file(
        &mut self,
        input: &Locator,
        file: &Path,
        timeout: Duration,
    ) -> Result<(), UiError>;

    /// Click `trigger` and wait for the resulting download to finish.
    async fn expect_download(
        &mut self,
        trigger: &Locator,
        timeout: Duration,
    ) -> Result<Download, UiError>;
}

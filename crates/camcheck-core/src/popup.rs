// Modal dialog resolution
//
// Dialogs are addressed by button position, never by label, so the same
// choice works under every UI language. With stacked dialogs only the
// topmost (last visible) one is acted on. The click succeeded once that
// dialog is no longer on top, whether it closed outright or was replaced by
// a follow-up notice.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::ui::{ElementState, Locator, UiDriver, UiError};

/// Which dialog button to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonChoice {
    /// Exactly this zero-based position; fails if the dialog has fewer buttons.
    Index(usize),
    /// The last button, whatever the count.
    Last,
    /// This position if present, otherwise the last button.
    Prefer(usize),
}

impl ButtonChoice {
    /// The negative answer of a Yes/No prompt, or the only button of a notice.
    pub const NO: Self = Self::Prefer(1);

    /// Concrete index for a dialog showing `available` buttons.
    pub fn resolve(self, available: usize) -> Option<usize> {
        let last = available.checked_sub(1)?;
        match self {
            Self::Index(i) => (i < available).then_some(i),
            Self::Last => Some(last),
            Self::Prefer(i) => Some(i.min(last)),
        }
    }
}

pub struct PopupResolver {
    dialog: Locator,
    buttons: String,
    timeout: Duration,
    poll: Duration,
}

impl PopupResolver {
    pub fn new(dialog: Locator, buttons: &str, timeout: Duration, poll: Duration) -> Self {
        Self {
            dialog,
            buttons: buttons.to_owned(),
            timeout,
            poll,
        }
    }

    fn visible_dialogs(&self) -> Locator {
        self.dialog.clone().visible()
    }

    fn topmost(&self) -> Locator {
        self.visible_dialogs().last()
    }

    /// Wait for a dialog, press the chosen button on the topmost one, and
    /// confirm that it closed.
    pub async fn resolve<D: UiDriver>(
        &self,
        driver: &mut D,
        choice: ButtonChoice,
    ) -> Result<(), CoreError> {
        let topmost = self.topmost();

        match driver
            .wait_for(&topmost, ElementState::Visible, self.timeout)
            .await
        {
            Ok(()) => {}
            Err(UiError::Timeout { .. }) => {
                warn!(dialog = %self.dialog, "expected dialog never appeared");
                return Err(CoreError::DialogNotShown {
                    timeout_ms: self.timeout.as_millis(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let open = driver.count(&self.visible_dialogs()).await?;
        let clicked = driver.element_id(&topmost).await?;
        let buttons = Locator::css(&self.buttons).visible().within(topmost);
        let available = driver.count(&buttons).await?;

        let requested = match choice {
            ButtonChoice::Index(i) | ButtonChoice::Prefer(i) => i,
            ButtonChoice::Last => available.saturating_sub(1),
        };
        let Some(index) = choice.resolve(available) else {
            return Err(CoreError::ButtonNotVisible {
                index: requested,
                available,
            });
        };

        let button = buttons.nth(index);
        debug!(
            %button,
            open,
            dialog = clicked.as_deref().unwrap_or("-"),
            "clicking dialog button"
        );
        match driver.click(&button, self.timeout).await {
            Ok(()) => {}
            Err(UiError::Timeout { .. } | UiError::NotFound(_)) => {
                return Err(CoreError::ButtonNotVisible { index, available });
            }
            Err(e) => return Err(e.into()),
        }

        self.await_closed(driver, open, clicked.as_deref()).await
    }

    /// Wait until fewer dialogs are open or the clicked one is no longer on top.
    async fn await_closed<D: UiDriver>(
        &self,
        driver: &mut D,
        open: usize,
        clicked: Option<&str>,
    ) -> Result<(), CoreError> {
        let topmost = self.topmost();
        let deadline = Instant::now() + self.timeout;
        loop {
            let now_open = driver.count(&self.visible_dialogs()).await?;
            if now_open < open {
                debug!(open, now_open, "dialog closed");
                return Ok(());
            }
            let on_top = driver.element_id(&topmost).await?;
            if clicked.is_some() && on_top.as_deref() != clicked {
                debug!(open, now_open, "dialog replaced by another");
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(open, "dialog did not close after click");
                return Err(CoreError::DialogStuckOpen {
                    timeout_ms: self.timeout.as_millis(),
                });
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_requires_the_button_to_exist() {
        assert_eq!(ButtonChoice::Index(1).resolve(2), Some(1));
        assert_eq!(ButtonChoice::Index(2).resolve(2), None);
    }

    #[test]
    fn no_falls_back_to_the_only_button() {
        assert_eq!(ButtonChoice::NO.resolve(2), Some(1));
        assert_eq!(ButtonChoice::NO.resolve(1), Some(0));
        assert_eq!(ButtonChoice::NO.resolve(3), Some(1));
    }

    #[test]
    fn nothing_resolves_without_buttons() {
        assert_eq!(ButtonChoice::Last.resolve(0), None);
        assert_eq!(ButtonChoice::NO.resolve(0), None);
    }
}

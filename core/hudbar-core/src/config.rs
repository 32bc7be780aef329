//! Configuration types for progress bar construction and updates.
//!
//! `BarUpdate` fields are `Option` on purpose: `Some(0)` and `Some("")` are
//! real assignments, `None` means "leave the current value alone". Nothing
//! here treats zero or empty as "unset".

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bar::ProgressBar;
use crate::error::BarError;

/// Maximum progress value accepted by [`ProgressBar::set_progress`].
pub const MAX_PROGRESS: u8 = 100;

/// Presentation style of a native progress indicator.
///
/// Semantics belong to the surface implementation; the core only carries the
/// selection through to `Surface::create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Standard window chrome.
    #[default]
    Default,
    /// Borderless heads-up-display overlay.
    Hud,
    /// Auxiliary utility window chrome.
    Utility,
}

impl FromStr for Style {
    type Err = BarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Style::Default),
            "hud" => Ok(Style::Hud),
            "utility" => Ok(Style::Utility),
            other => Err(BarError::UnknownStyle(other.to_string())),
        }
    }
}

/// Callback invoked when a button is clicked. Receives the owning bar, so
/// the action can update or close it.
pub type ClickAction = Arc<dyn Fn(&ProgressBar) + Send + Sync>;

/// Callback invoked exactly once, when the bar closes.
pub type CloseAction = Box<dyn FnOnce(&ProgressBar) + Send>;

/// A button displayed alongside the progress indicator.
#[derive(Clone)]
pub struct Button {
    pub label: String,
    pub action: ClickAction,
}

impl Button {
    pub fn new(
        label: impl Into<String>,
        action: impl Fn(&ProgressBar) + Send + Sync + 'static,
    ) -> Self {
        Button {
            label: label.into(),
            action: Arc::new(action),
        }
    }

    /// Assignment-identity comparison used for change detection: same label
    /// and the same action allocation. Closures are not value-comparable,
    /// so identity is the contract (a re-created closure counts as a new
    /// button even if it behaves identically).
    pub(crate) fn same_assignment(&self, other: &Button) -> bool {
        self.label == other.label && Arc::ptr_eq(&self.action, &other.action)
    }
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Construction arguments for [`ProgressBar::create`].
///
/// `Default` supplies the resolved defaults: title "Progress", empty
/// message, [`Style::Default`], no buttons, no close callback.
pub struct BarConfig {
    pub title: String,
    pub message: String,
    pub style: Style,
    pub buttons: Vec<Button>,
    pub on_close: Option<CloseAction>,
}

impl Default for BarConfig {
    fn default() -> Self {
        BarConfig {
            title: "Progress".to_string(),
            message: String::new(),
            style: Style::Default,
            buttons: Vec::new(),
            on_close: None,
        }
    }
}

impl fmt::Debug for BarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarConfig")
            .field("title", &self.title)
            .field("message", &self.message)
            .field("style", &self.style)
            .field("buttons", &self.buttons)
            .field("on_close", &self.on_close.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Partial update pushed through [`ProgressBar::update`]. Absent fields
/// leave the current value untouched.
#[derive(Debug, Default)]
pub struct BarUpdate {
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub buttons: Option<Vec<Button>>,
}

//! Banner notifications
//!
//! Action boundaries (save, create) report their outcome as a banner. The
//! host's banner service sits behind [`Notifier`].

use crate::error::ConformanceError;
use parking_lot::Mutex;
use serde::Serialize;

/// Banner shown after saving settings
pub const SAVE_SUCCESS_MESSAGE: &str =
    "Continuous Conformance Settings successfully saved for this project.";

/// Severity of a banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Failure
    Error,
    /// Success
    Success,
}

/// A message for the host's banner area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    /// Severity
    pub level: BannerLevel,
    /// Text
    pub message: String,
    /// Whether the user may close it
    pub dismissable: bool,
    /// Icon name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Banner {
    /// Dismissable banner without an icon
    #[must_use]
    pub fn new(level: BannerLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            dismissable: true,
            icon: None,
        }
    }

    /// With icon
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Settings saved
    #[must_use]
    pub fn settings_saved() -> Self {
        Self::new(BannerLevel::Success, SAVE_SUCCESS_MESSAGE).with_icon("Save")
    }

    /// Settings could not be saved
    #[must_use]
    pub fn settings_save_failed(err: &ConformanceError) -> Self {
        Self::new(
            BannerLevel::Error,
            format!("Failed to save Continuous Conformance Settings. {}", err.report()),
        )
        .with_icon("Save")
    }

    /// Measure work items created or adopted
    #[must_use]
    pub fn work_items_created(count: usize) -> Self {
        Self::new(
            BannerLevel::Success,
            format!("Linked {count} Conformance Work Item(s)."),
        )
        .with_icon("WorkItem")
    }

    /// Creation stopped on a failure
    #[must_use]
    pub fn work_item_creation_failed(err: &ConformanceError) -> Self {
        Self::new(
            BannerLevel::Error,
            format!("Failed to create Conformance Work Items. {}", err.report()),
        )
        .with_icon("WorkItem")
    }
}

/// Sink for banners
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Show a banner
    fn notify(&self, banner: Banner);
}

/// Logs banners through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, banner: Banner) {
        match banner.level {
            BannerLevel::Error => tracing::error!(message = %banner.message, "banner"),
            BannerLevel::Warning => tracing::warn!(message = %banner.message, "banner"),
            BannerLevel::Info | BannerLevel::Success => {
                tracing::info!(message = %banner.message, "banner");
            }
        }
    }
}

/// Keeps every banner for later inspection
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    banners: Mutex<Vec<Banner>>,
}

impl CollectingNotifier {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Banners so far
    #[must_use]
    pub fn banners(&self) -> Vec<Banner> {
        self.banners.lock().clone()
    }

    /// Drain collected banners
    pub fn take(&self) -> Vec<Banner> {
        std::mem::take(&mut *self.banners.lock())
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, banner: Banner) {
        self.banners.lock().push(banner);
    }
}

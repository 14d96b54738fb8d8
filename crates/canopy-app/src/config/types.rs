//! Configuration types for Canopy
//!
//! Defines:
//! - `Settings` - Global application settings
//! - `BrowserSettings`, `LoadingSettings`, `BehaviorSettings` - sections of
//!   `.canopy/config.toml`

use std::time::Duration;

use canopy_core::{DisplayMode, SortOptions};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lower bound for `loading.fetch_timeout_secs`.
pub const MIN_FETCH_TIMEOUT_SECS: u64 = 1;

/// Lower bound for `loading.count_timeout_ms`.
pub const MIN_COUNT_TIMEOUT_MS: u64 = 100;

/// Global settings from `.canopy/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub loading: LoadingSettings,

    #[serde(default)]
    pub behavior: BehaviorSettings,
}

impl Settings {
    /// Clamp out-of-range values to their minimums, logging each fix.
    pub fn validated(mut self) -> Self {
        if self.loading.fetch_timeout_secs < MIN_FETCH_TIMEOUT_SECS {
            warn!(
                "loading.fetch_timeout_secs = {} is below {}, clamping",
                self.loading.fetch_timeout_secs, MIN_FETCH_TIMEOUT_SECS
            );
            self.loading.fetch_timeout_secs = MIN_FETCH_TIMEOUT_SECS;
        }
        if self.loading.count_timeout_ms < MIN_COUNT_TIMEOUT_MS {
            warn!(
                "loading.count_timeout_ms = {} is below {}, clamping",
                self.loading.count_timeout_ms, MIN_COUNT_TIMEOUT_MS
            );
            self.loading.count_timeout_ms = MIN_COUNT_TIMEOUT_MS;
        }
        if self.loading.count_concurrency == 0 {
            warn!("loading.count_concurrency = 0, using 1");
            self.loading.count_concurrency = 1;
        }
        self
    }
}

/// Tree presentation settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BrowserSettings {
    /// Which administrative level organises the top of each tree
    #[serde(default)]
    pub display_mode: DisplayMode,

    /// Order children by acquisition date instead of name
    #[serde(default)]
    pub sort_by_date: bool,

    #[serde(default)]
    pub sort_descending: bool,
}

impl BrowserSettings {
    pub fn sort_options(&self) -> SortOptions {
        SortOptions {
            by_date: self.sort_by_date,
            descending: self.sort_descending,
        }
    }
}

/// Background fetch settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoadingSettings {
    /// Upper bound on one children/leaves fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Time a count batch may run before the browser gives up on it
    #[serde(default = "default_count_timeout_ms")]
    pub count_timeout_ms: u64,

    /// Count fetches in flight at once
    #[serde(default = "default_count_concurrency")]
    pub count_concurrency: usize,
}

impl LoadingSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(MIN_FETCH_TIMEOUT_SECS))
    }

    pub fn count_timeout(&self) -> Duration {
        Duration::from_millis(self.count_timeout_ms.max(MIN_COUNT_TIMEOUT_MS))
    }
}

impl Default for LoadingSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            count_timeout_ms: default_count_timeout_ms(),
            count_concurrency: default_count_concurrency(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_count_timeout_ms() -> u64 {
    10_000
}

fn default_count_concurrency() -> usize {
    4
}

/// Behavior settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BehaviorSettings {
    /// Count the items of containers revealed by an expand
    #[serde(default = "default_true")]
    pub auto_count_on_expand: bool,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            auto_count_on_expand: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.browser.display_mode, DisplayMode::ExperimenterDisplay);
        assert_eq!(settings.loading.fetch_timeout_secs, 30);
        assert_eq!(settings.loading.count_concurrency, 4);
        assert!(settings.behavior.auto_count_on_expand);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
[browser]
display_mode = "group_display"
sort_descending = true

[loading]
count_timeout_ms = 500
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.browser.display_mode, DisplayMode::GroupDisplay);
        assert!(settings.browser.sort_options().descending);
        assert_eq!(settings.loading.count_timeout_ms, 500);
        assert_eq!(settings.loading.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_validated_clamps_minimums() {
        let mut settings = Settings::default();
        settings.loading.fetch_timeout_secs = 0;
        settings.loading.count_timeout_ms = 5;
        settings.loading.count_concurrency = 0;

        let settings = settings.validated();
        assert_eq!(settings.loading.fetch_timeout_secs, 1);
        assert_eq!(settings.loading.count_timeout_ms, 100);
        assert_eq!(settings.loading.count_concurrency, 1);
    }
}

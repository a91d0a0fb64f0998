//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::TimeWindow;
use crate::utils::clock::format_date;
use crate::utils::document::parse_selector;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Portal origin and HTTP behavior
    #[serde(default)]
    pub portal: PortalConfig,

    /// Blackboard list layout
    #[serde(default)]
    pub announcements: AnnouncementConfig,

    /// Notification table layout and alert policy
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Deduplication behavior
    #[serde(default)]
    pub dedup: DedupConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.portal.user_agent.trim().is_empty() {
            return Err(AppError::validation("portal.user_agent is empty"));
        }
        if self.portal.timeout_secs == 0 {
            return Err(AppError::validation("portal.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.portal.base_url)
            .map_err(|e| AppError::validation(format!("portal.base_url: {e}")))?;

        let a = &self.announcements;
        if a.sections.is_empty() {
            return Err(AppError::validation("announcements.sections is empty"));
        }
        for selector in a
            .sections
            .iter()
            .chain([
                &a.entry_selector,
                &a.title_selector,
                &a.date_selector,
                &a.abstract_selector,
                &a.link_selector,
                &a.content_selector,
            ])
        {
            parse_selector(selector)?;
        }

        let n = &self.notifications;
        for selector in [&n.row_selector, &n.link_block_selector] {
            parse_selector(selector)?;
        }
        if format_date(chrono::NaiveDate::default(), &n.date_format).is_none() {
            return Err(AppError::validation(format!(
                "notifications.date_format '{}' is not a valid date format",
                n.date_format
            )));
        }
        if n.cell_tag.trim().is_empty() {
            return Err(AppError::validation("notifications.cell_tag is empty"));
        }
        if n.alert_phrase.trim().is_empty() {
            return Err(AppError::validation("notifications.alert_phrase is empty"));
        }
        if n.windows.is_empty() {
            return Err(AppError::validation("notifications.windows is empty"));
        }
        for (i, window) in n.windows.iter().enumerate() {
            if !window.is_well_formed() {
                return Err(AppError::validation(format!(
                    "notifications.windows[{i}]: start {} is not before end {}",
                    window.start, window.end
                )));
            }
            if n.windows[i + 1..].iter().any(|other| window.overlaps(other)) {
                return Err(AppError::validation(format!(
                    "notifications.windows[{i}] overlaps another window"
                )));
            }
        }
        Ok(())
    }
}

/// Portal origin and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Origin relative detail links are resolved against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Selectors describing the blackboard list and its detail pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementConfig {
    /// Section containers, processed in order
    #[serde(default = "defaults::sections")]
    pub sections: Vec<String>,

    /// One entry per match inside a section
    #[serde(default = "defaults::entry_selector")]
    pub entry_selector: String,

    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    #[serde(default = "defaults::date_selector")]
    pub date_selector: String,

    #[serde(default = "defaults::abstract_selector")]
    pub abstract_selector: String,

    /// Anchor inside the abstract
    #[serde(default = "defaults::link_selector")]
    pub link_selector: String,

    /// HTML attribute holding the link (usually "href")
    #[serde(default = "defaults::attr_name")]
    pub attr_name: String,

    /// Paragraphs on the detail page that make up the body
    #[serde(default = "defaults::content_selector")]
    pub content_selector: String,

    /// Paragraphs containing this text are navigation chrome and skipped
    #[serde(default = "defaults::overview_sentinel")]
    pub overview_sentinel: String,

    /// Newline sequences removed from the start of a detail body
    #[serde(default = "defaults::leading_newlines")]
    pub leading_newlines: usize,
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            sections: defaults::sections(),
            entry_selector: defaults::entry_selector(),
            title_selector: defaults::title_selector(),
            date_selector: defaults::date_selector(),
            abstract_selector: defaults::abstract_selector(),
            link_selector: defaults::link_selector(),
            attr_name: defaults::attr_name(),
            content_selector: defaults::content_selector(),
            overview_sentinel: defaults::overview_sentinel(),
            leading_newlines: defaults::leading_newlines(),
        }
    }
}

/// Notification table layout and admission policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Tag of the row's direct children counted for the column indices below
    #[serde(default = "defaults::cell_tag")]
    pub cell_tag: String,

    /// Zero-based column holding the date
    #[serde(default = "defaults::date_column")]
    pub date_column: usize,

    /// Zero-based column holding the time of day
    #[serde(default = "defaults::time_column")]
    pub time_column: usize,

    /// Zero-based column holding the alert text and link
    #[serde(default = "defaults::text_column")]
    pub text_column: usize,

    /// chrono format used to render today's date for the date gate
    #[serde(default = "defaults::date_format")]
    pub date_format: String,

    #[serde(default = "defaults::alert_phrase")]
    pub alert_phrase: String,

    /// Disjoint windows an alert's time must fall strictly inside
    #[serde(default = "defaults::windows")]
    pub windows: Vec<TimeWindow>,

    /// Container on the alert detail page holding conference links
    #[serde(default = "defaults::link_block_selector")]
    pub link_block_selector: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            row_selector: defaults::row_selector(),
            cell_tag: defaults::cell_tag(),
            date_column: defaults::date_column(),
            time_column: defaults::time_column(),
            text_column: defaults::text_column(),
            date_format: defaults::date_format(),
            alert_phrase: defaults::alert_phrase(),
            windows: defaults::windows(),
            link_block_selector: defaults::link_block_selector(),
        }
    }
}

/// Deduplication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Clear the seen set when the calendar day changes
    #[serde(default = "defaults::reset_daily")]
    pub reset_daily: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            reset_daily: defaults::reset_daily(),
        }
    }
}

mod defaults {
    use super::TimeWindow;

    // Portal defaults
    pub fn base_url() -> String {
        "https://www.oc-campus.de".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; portal-notifier/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Announcement defaults
    pub fn sections() -> Vec<String> {
        vec!["#cell_blackboardtype1".into(), "#cell_mPrio".into()]
    }
    pub fn entry_selector() -> String {
        "li".into()
    }
    pub fn title_selector() -> String {
        ".titel".into()
    }
    pub fn date_selector() -> String {
        ".date".into()
    }
    pub fn abstract_selector() -> String {
        ".abstract".into()
    }
    pub fn link_selector() -> String {
        "a".into()
    }
    pub fn attr_name() -> String {
        "href".into()
    }
    pub fn content_selector() -> String {
        "#content p".into()
    }
    pub fn overview_sentinel() -> String {
        "Übersicht".into()
    }
    pub fn leading_newlines() -> usize {
        4
    }

    // Notification defaults
    pub fn row_selector() -> String {
        "tr".into()
    }
    pub fn cell_tag() -> String {
        "td".into()
    }
    pub fn date_column() -> usize {
        2
    }
    pub fn time_column() -> usize {
        3
    }
    pub fn text_column() -> usize {
        5
    }
    pub fn date_format() -> String {
        "%m.%d.%Y".into()
    }
    pub fn alert_phrase() -> String {
        "Ihre Videokonferenz startet in Kuerze um".into()
    }
    pub fn windows() -> Vec<TimeWindow> {
        [((7, 30), (8, 30)), ((11, 30), (12, 30))]
            .into_iter()
            .filter_map(|(start, end)| TimeWindow::from_hm(start, end))
            .collect()
    }
    pub fn link_block_selector() -> String {
        "table fieldset".into()
    }

    // Dedup defaults
    pub fn reset_daily() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_windows_are_the_session_blocks() {
        let windows = Config::default().notifications.windows;
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start.to_string(), "07:30:00");
        assert_eq!(windows[1].end.to_string(), "12:30:00");
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.portal.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.portal.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_invalid_selector() {
        let mut config = Config::default();
        config.announcements.title_selector = "[[broken".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_date_format() {
        let mut config = Config::default();
        config.notifications.date_format = "%Y-%".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_window() {
        let mut config = Config::default();
        config.notifications.windows = vec![TimeWindow::from_hm((9, 0), (8, 0)).unwrap()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_overlapping_windows() {
        let mut config = Config::default();
        config
            .notifications
            .windows
            .push(TimeWindow::from_hm((8, 0), (9, 0)).unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[portal]
base_url = "https://portal.example"

[[notifications.windows]]
start = "09:00:00"
end = "10:00:00"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.portal.base_url, "https://portal.example");
        assert_eq!(config.portal.timeout_secs, 30);
        assert_eq!(config.notifications.windows.len(), 1);
        assert_eq!(config.notifications.text_column, 5);
        assert!(config.dedup.reset_daily);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/nonexistent/notifier.toml");
        assert_eq!(config.announcements.sections.len(), 2);
    }
}

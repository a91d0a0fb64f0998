//! Conference alert scanning.
//!
//! Walks the portal's notification table row by row. A row becomes an
//! alert only when it passes three gates in order: it is dated today, its
//! time lies inside one of the alert windows, and its text contains the
//! alert phrase. Admitted rows go through the deduplicator before anything
//! is delivered.

use std::sync::Arc;

use chrono::NaiveTime;
use scraper::Selector;

use crate::error::{AppError, Result};
use crate::models::{Alert, NotificationCandidate, NotificationConfig, TimeWindow, within_any};
use crate::services::{AlertSink, DeliveryDeduplicator, DetailSource};
use crate::utils::clock::{Clock, format_date};
use crate::utils::document::{self, parse_selector};
use crate::utils::text::{normalize, strip_quotes};

/// Counters for one scan pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub rows_total: usize,
    /// Rows dated today
    pub rows_today: usize,
    /// Rows whose time cell could not be read
    pub time_parse_failures: usize,
    /// Rows that passed all three gates and were new
    pub admitted: Vec<NotificationCandidate>,
    /// Rows that passed all gates but had already been delivered
    pub suppressed: usize,
    /// Alerts accepted by the sink
    pub delivered: usize,
    /// Alerts the sink rejected
    pub delivery_failures: usize,
}

/// One table row as read from the markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// Text of each cell, in column order
    pub cells: Vec<String>,
    /// Link from the anchor inside the text column
    pub link: Option<String>,
}

/// Why a row was or wasn't turned into a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowVerdict {
    /// Not dated today; no further gate was evaluated
    NotToday,
    /// Time cell did not parse as `HH:MM:SS`
    TimeUnreadable(String),
    OutsideWindow(NaiveTime),
    NoAlertPhrase,
    Admitted(NotificationCandidate),
}

/// Column layout of the notification table.
pub struct TableSchema {
    row: Selector,
    cell_tag: String,
    anchor: Selector,
    date_column: usize,
    time_column: usize,
    text_column: usize,
}

impl TableSchema {
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        Ok(Self {
            row: parse_selector(&config.row_selector)?,
            cell_tag: config.cell_tag.clone(),
            anchor: parse_selector("a")?,
            date_column: config.date_column,
            time_column: config.time_column,
            text_column: config.text_column,
        })
    }

    /// Read every row of the table.
    pub fn read(&self, html: &str) -> Result<Vec<RawRow>> {
        let doc = document::parse(&normalize(html))?;

        let rows = doc
            .select_with(&self.row)
            .map(|row| {
                let cells: Vec<_> = row.child_elements(&self.cell_tag).collect();
                let link = cells
                    .get(self.text_column)
                    .and_then(|cell| cell.find(&self.anchor))
                    .and_then(|anchor| anchor.attr("href"))
                    .map(str::to_string);

                RawRow {
                    cells: cells.iter().map(|cell| cell.text()).collect(),
                    link,
                }
            })
            .collect();
        Ok(rows)
    }
}

/// Date, window and phrase rules for admitting a row.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    pub date_format: String,
    pub phrase: String,
    pub windows: Vec<TimeWindow>,
    pub date_column: usize,
    pub time_column: usize,
    pub text_column: usize,
}

impl AlertPolicy {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            date_format: config.date_format.clone(),
            phrase: config.alert_phrase.clone(),
            windows: config.windows.clone(),
            date_column: config.date_column,
            time_column: config.time_column,
            text_column: config.text_column,
        }
    }

    /// Run the three gates on one row.
    ///
    /// `today` is the already-formatted current date.
    pub fn evaluate(&self, row: &RawRow, today: &str) -> RowVerdict {
        let cell = |i: usize| row.cells.get(i).map(String::as_str);

        if !cell(self.date_column).is_some_and(|date| date.contains(today)) {
            return RowVerdict::NotToday;
        }

        let raw_time = cell(self.time_column).unwrap_or_default();
        let time = match parse_time_of_day(raw_time) {
            Ok(time) => time,
            Err(e) => return RowVerdict::TimeUnreadable(e.to_string()),
        };
        if !within_any(&self.windows, time) {
            return RowVerdict::OutsideWindow(time);
        }

        let text = match cell(self.text_column) {
            Some(text) if text.contains(&self.phrase) => text,
            _ => return RowVerdict::NoAlertPhrase,
        };

        RowVerdict::Admitted(NotificationCandidate {
            subject: strip_quotes(text),
            link: row.link.clone().unwrap_or_default(),
            raw_text: text.to_string(),
        })
    }
}

/// Parse a time cell such as `'08:00:00'`.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
    let value = strip_quotes(raw);
    NaiveTime::parse_from_str(&value, "%H:%M:%S").map_err(|e| AppError::time_parse(value, e))
}

/// Finds alerts in the notification table and delivers new ones.
pub struct NotificationScanner {
    schema: TableSchema,
    policy: AlertPolicy,
    detail: Arc<dyn DetailSource>,
    clock: Arc<dyn Clock>,
}

impl NotificationScanner {
    pub fn new(
        config: &NotificationConfig,
        detail: Arc<dyn DetailSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            schema: TableSchema::from_config(config)?,
            policy: AlertPolicy::from_config(config),
            detail,
            clock,
        })
    }

    /// Scan one table snapshot.
    ///
    /// Fails only when the page cannot be parsed or today's date cannot be
    /// rendered; per-row problems are logged and counted.
    pub async fn scan(
        &self,
        html: &str,
        dedup: &DeliveryDeduplicator,
        sink: &dyn AlertSink,
    ) -> Result<ScanOutcome> {
        let rows = self.schema.read(html)?;
        let today = format_date(self.clock.today(), &self.policy.date_format).ok_or_else(|| {
            AppError::config(format!("invalid date format '{}'", self.policy.date_format))
        })?;

        let mut outcome = ScanOutcome {
            rows_total: rows.len(),
            ..ScanOutcome::default()
        };

        for row in &rows {
            let candidate = match self.policy.evaluate(row, &today) {
                RowVerdict::NotToday => continue,
                RowVerdict::TimeUnreadable(reason) => {
                    outcome.rows_today += 1;
                    outcome.time_parse_failures += 1;
                    log::warn!("Skipping notification row: {reason}");
                    continue;
                }
                RowVerdict::OutsideWindow(time) => {
                    outcome.rows_today += 1;
                    log::debug!("Notification at {time} is outside the alert windows");
                    continue;
                }
                RowVerdict::NoAlertPhrase => {
                    outcome.rows_today += 1;
                    continue;
                }
                RowVerdict::Admitted(candidate) => {
                    outcome.rows_today += 1;
                    candidate
                }
            };

            if !dedup.check_and_mark(&candidate.subject) {
                log::debug!("Already notified: {}", candidate.subject);
                outcome.suppressed += 1;
                continue;
            }

            log::info!("Course alert: {} ({})", candidate.subject, candidate.link);
            self.deliver(&candidate, sink, &mut outcome).await;
            outcome.admitted.push(candidate);
        }

        Ok(outcome)
    }

    /// Resolve the candidate's conference links and hand them to the sink.
    ///
    /// Falls back to the detail page itself when no conference link can be
    /// found, so every admitted candidate produces at least one alert.
    async fn deliver(
        &self,
        candidate: &NotificationCandidate,
        sink: &dyn AlertSink,
        outcome: &mut ScanOutcome,
    ) {
        let mut links = Vec::new();
        if !candidate.link.is_empty() {
            match self.detail.fetch_links(&candidate.link).await {
                Ok(found) => links = found,
                Err(e) => log::warn!(
                    "Couldn't resolve conference link for '{}': {e}",
                    candidate.subject
                ),
            }
        }
        if links.is_empty() {
            let fallback = if candidate.link.is_empty() {
                String::new()
            } else {
                self.detail.resolve(&candidate.link)
            };
            links.push(fallback);
        }

        let text = candidate.display_text();
        for link in links {
            let alert = Alert {
                link,
                text: text.clone(),
            };
            match sink.deliver(&alert).await {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.delivery_failures += 1;
                    log::error!("Delivering alert '{}' failed: {e}", alert.text);
                }
            }
        }
    }
}

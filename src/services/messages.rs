//! Blackboard message extraction.
//!
//! Reads announcement entries from the portal's list sections, enriches
//! each with its detail page when possible, and appends the result to the
//! message queue.

use std::sync::Arc;

use scraper::Selector;

use crate::error::Result;
use crate::models::{AnnouncementConfig, Message};
use crate::services::{DetailSource, MessageQueue};
use crate::utils::document::{self, parse_selector};
use crate::utils::text::{normalize, repair_umlauts};

/// Counters for one extraction pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractOutcome {
    /// Entries found across all sections, empty ones included
    pub entries_total: usize,
    /// Entries skipped because they had no content
    pub empty_entries: usize,
    /// Messages appended to the queue
    pub queued: usize,
    /// Messages whose body was replaced by detail page text
    pub enriched: usize,
    /// Messages without a deep link
    pub missing_links: usize,
}

/// One list entry as read from the markup, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub date: String,
    pub abstract_text: String,
    /// `None` when the abstract has no anchor carrying the link attribute
    pub link: Option<String>,
}

/// Entries read from one page.
#[derive(Debug, Default)]
pub struct Listing {
    pub entries: Vec<RawEntry>,
    pub empty: usize,
}

/// Parsed selectors describing the list layout.
pub struct ListSchema {
    sections: Vec<Selector>,
    entry: Selector,
    title: Selector,
    date: Selector,
    abstract_: Selector,
    link: Selector,
    attr_name: String,
}

impl ListSchema {
    pub fn from_config(config: &AnnouncementConfig) -> Result<Self> {
        let sections = config
            .sections
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sections,
            entry: parse_selector(&config.entry_selector)?,
            title: parse_selector(&config.title_selector)?,
            date: parse_selector(&config.date_selector)?,
            abstract_: parse_selector(&config.abstract_selector)?,
            link: parse_selector(&config.link_selector)?,
            attr_name: config.attr_name.clone(),
        })
    }

    /// Read every entry of every section, in section then document order.
    pub fn read(&self, html: &str) -> Result<Listing> {
        let doc = document::parse(&normalize(html))?;
        let mut listing = Listing::default();

        for section_sel in &self.sections {
            for section in doc.select_with(section_sel) {
                for entry in section.select(&self.entry) {
                    if entry.is_empty() {
                        listing.empty += 1;
                        continue;
                    }

                    let link = entry
                        .select(&self.abstract_)
                        .find_map(|abs| abs.find(&self.link))
                        .and_then(|anchor| anchor.attr(&self.attr_name))
                        .map(str::to_string);

                    listing.entries.push(RawEntry {
                        title: entry.select_text(&self.title),
                        date: entry.select_text(&self.date),
                        abstract_text: entry.select_text(&self.abstract_),
                        link,
                    });
                }
            }
        }
        Ok(listing)
    }
}

/// Turns list markup into queued [`Message`]s.
pub struct MessageExtractor {
    schema: ListSchema,
    detail: Arc<dyn DetailSource>,
}

impl MessageExtractor {
    pub fn new(config: &AnnouncementConfig, detail: Arc<dyn DetailSource>) -> Result<Self> {
        Ok(Self {
            schema: ListSchema::from_config(config)?,
            detail,
        })
    }

    /// Extract every non-empty entry of `html` into `queue`.
    ///
    /// Fails only when the page cannot be parsed; every non-empty entry
    /// yields exactly one queued message.
    pub async fn extract(&self, html: &str, queue: &MessageQueue) -> Result<ExtractOutcome> {
        let listing = self.schema.read(html)?;

        let mut outcome = ExtractOutcome {
            entries_total: listing.entries.len() + listing.empty,
            empty_entries: listing.empty,
            ..ExtractOutcome::default()
        };

        if listing.entries.is_empty() {
            log::info!("Couldn't find any new articles");
            return Ok(outcome);
        }
        log::info!(
            "Got {} new blackboard entries, starting parsing process",
            listing.entries.len()
        );

        for entry in listing.entries {
            let message = self.build_message(entry, &mut outcome).await;
            queue.push(message);
            outcome.queued += 1;
        }
        Ok(outcome)
    }

    async fn build_message(&self, entry: RawEntry, outcome: &mut ExtractOutcome) -> Message {
        // Entities were decoded with the whole listing; only repair umlauts.
        let mut message = Message {
            body: repair_umlauts(&entry.abstract_text),
            link: entry.link.unwrap_or_default(),
            title: entry.title,
            date: entry.date,
        };

        if !message.has_link() {
            log::info!(
                "Message '{}' does not contain a hyperlink for more information",
                message.title.trim()
            );
            outcome.missing_links += 1;
            return message;
        }

        let rich_body = self.detail.fetch_body(&message.link).await;
        if !rich_body.is_empty() {
            message.body = rich_body;
            outcome.enriched += 1;
        }
        message
    }
}

//! Detail page resolution.
//!
//! Announcements and alerts both link to a detail page on the portal.
//! Announcement pages carry the full message text; alert pages carry the
//! conference URL inside a fieldset. Fetching is best-effort: a failed
//! request never aborts the surrounding scan.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::Selector;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::utils::document::{self, parse_selector};
use crate::utils::http::fetch_portal_page;
use crate::utils::resolve_url;
use crate::utils::text::{normalize, strip_leading_newlines};

/// A line consisting of nothing but one http(s) URL.
const URL_ONLY_LINE: &str = r"^https?://\S+$";

/// Source of detail page content.
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Full message text for an announcement link.
    ///
    /// Returns an empty string when the page cannot be fetched, so the
    /// caller keeps its short abstract.
    async fn fetch_body(&self, link: &str) -> String;

    /// URL-only lines from an alert's detail page.
    async fn fetch_links(&self, link: &str) -> Result<Vec<String>>;

    /// Absolute form of a relative portal link.
    fn resolve(&self, link: &str) -> String {
        link.to_string()
    }
}

/// Fetches detail pages from the portal over HTTP.
pub struct HttpDetailFetcher {
    client: Client,
    base: Url,
    extractor: DetailExtractor,
}

impl HttpDetailFetcher {
    /// Create a fetcher for the configured portal origin.
    ///
    /// Fails on an unparsable base URL or invalid selectors, which are
    /// startup-time configuration errors.
    pub fn new(client: Client, config: &Config) -> Result<Self> {
        Ok(Self {
            client,
            base: Url::parse(&config.portal.base_url)?,
            extractor: DetailExtractor::from_config(config)?,
        })
    }

    async fn try_fetch_body(&self, url: &str) -> Result<String> {
        let page = fetch_portal_page(&self.client, url).await?;
        self.extractor.extract_body(&page)
    }
}

#[async_trait]
impl DetailSource for HttpDetailFetcher {
    async fn fetch_body(&self, link: &str) -> String {
        let url = self.resolve(link);
        match self.try_fetch_body(&url).await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Can't get document from {url}, keeping abstract: {e}");
                String::new()
            }
        }
    }

    async fn fetch_links(&self, link: &str) -> Result<Vec<String>> {
        let url = self.resolve(link);
        let page = fetch_portal_page(&self.client, &url).await?;
        self.extractor.extract_links(&page)
    }

    fn resolve(&self, link: &str) -> String {
        resolve_url(&self.base, link)
    }
}

/// Pulls text out of fetched detail pages. Pure; no I/O.
pub struct DetailExtractor {
    content: Selector,
    link_block: Selector,
    overview_sentinel: String,
    leading_newlines: usize,
    url_line: Regex,
}

impl DetailExtractor {
    pub fn from_config(config: &Config) -> Result<Self> {
        let url_line = Regex::new(URL_ONLY_LINE)
            .map_err(|e| AppError::config(format!("URL line pattern: {e}")))?;

        Ok(Self {
            content: parse_selector(&config.announcements.content_selector)?,
            link_block: parse_selector(&config.notifications.link_block_selector)?,
            overview_sentinel: config.announcements.overview_sentinel.clone(),
            leading_newlines: config.announcements.leading_newlines,
            url_line,
        })
    }

    /// Join the non-empty content paragraphs with newlines.
    ///
    /// Paragraphs containing the overview sentinel are skipped, and the
    /// first few newline sequences at the very start are removed.
    pub fn extract_body(&self, page: &str) -> Result<String> {
        let doc = document::parse(&normalize(page))?;

        let mut body = String::new();
        for paragraph in doc.select_with(&self.content) {
            if paragraph.is_empty() {
                continue;
            }
            let text = paragraph.text();
            if !self.overview_sentinel.is_empty() && text.contains(&self.overview_sentinel) {
                continue;
            }
            body.push_str(&text);
            body.push('\n');
        }

        Ok(strip_leading_newlines(&body, self.leading_newlines).to_string())
    }

    /// Every direct child of the link block whose text is a lone URL.
    pub fn extract_links(&self, page: &str) -> Result<Vec<String>> {
        let doc = document::parse(&normalize(page))?;

        let mut links = Vec::new();
        for block in doc.select_with(&self.link_block) {
            for content in block.contents() {
                if content.is("br") {
                    continue;
                }
                let text = content.text();
                let line = text.trim();
                if self.url_line.is_match(line) {
                    log::debug!("Found conference link: {line}");
                    links.push(line.to_string());
                }
            }
        }
        Ok(links)
    }
}

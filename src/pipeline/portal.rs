// src/pipeline/portal.rs

//! The extraction-and-deduplication pipeline.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{BlackboardResponse, Config};
use crate::services::{
    AlertSink, DeliveryDeduplicator, DetailSource, ExtractOutcome, HttpDetailFetcher,
    MessageExtractor, MessageQueue, NotificationScanner, ScanOutcome,
};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::http::create_async_client;

/// Owns the queue and deduplicator and feeds portal pages through the
/// extractor and scanner.
///
/// Page-level failures (unparsable markup, an error envelope) are logged
/// and returned; the pipeline itself stays usable for the next poll.
pub struct PortalPipeline {
    extractor: MessageExtractor,
    scanner: NotificationScanner,
    queue: Arc<MessageQueue>,
    dedup: Arc<DeliveryDeduplicator>,
    sink: Arc<dyn AlertSink>,
}

impl PortalPipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        config: &Config,
        detail: Arc<dyn DetailSource>,
        sink: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            extractor: MessageExtractor::new(&config.announcements, Arc::clone(&detail))?,
            scanner: NotificationScanner::new(&config.notifications, detail, Arc::clone(&clock))?,
            queue: Arc::new(MessageQueue::new()),
            dedup: Arc::new(DeliveryDeduplicator::from_config(&config.dedup, clock)),
            sink,
        })
    }

    /// Assemble a pipeline that fetches detail pages over HTTP.
    ///
    /// Any error here (invalid config, HTTP client construction) is a
    /// startup failure.
    pub fn from_config(config: &Config, sink: Arc<dyn AlertSink>) -> Result<Self> {
        config.validate()?;
        let client = create_async_client(&config.portal)?;
        let detail = Arc::new(HttpDetailFetcher::new(client, config)?);
        Self::new(config, detail, sink, Arc::new(SystemClock))
    }

    /// Handle to the message queue for the consumer to drain.
    pub fn queue(&self) -> Arc<MessageQueue> {
        Arc::clone(&self.queue)
    }

    /// Handle to the deduplicator, e.g. to share with another pipeline.
    pub fn dedup(&self) -> Arc<DeliveryDeduplicator> {
        Arc::clone(&self.dedup)
    }

    /// Use an existing deduplicator instead of this pipeline's own.
    pub fn with_dedup(mut self, dedup: Arc<DeliveryDeduplicator>) -> Self {
        self.dedup = dedup;
        self
    }

    /// Scan a notification table snapshot and deliver new alerts.
    pub async fn process_notifications(&self, html: &str) -> Result<ScanOutcome> {
        match self.scanner.scan(html, &self.dedup, self.sink.as_ref()).await {
            Ok(outcome) => {
                log::info!(
                    "Notifications: {} row(s), {} today, {} new, {} already sent",
                    outcome.rows_total,
                    outcome.rows_today,
                    outcome.admitted.len(),
                    outcome.suppressed
                );
                Ok(outcome)
            }
            Err(e) => {
                log::error!("Couldn't parse html of notifications: {e}");
                Err(e)
            }
        }
    }

    /// Extract blackboard messages from list markup into the queue.
    pub async fn process_announcements(&self, html: &str) -> Result<ExtractOutcome> {
        match self.extractor.extract(html, &self.queue).await {
            Ok(outcome) => {
                log::info!(
                    "Blackboard: {} message(s) queued, {} enriched, {} without link",
                    outcome.queued,
                    outcome.enriched,
                    outcome.missing_links
                );
                Ok(outcome)
            }
            Err(e) => {
                log::error!("Couldn't parse html of blackboard data: {e}");
                Err(e)
            }
        }
    }

    /// Extract from the portal's JSON envelope, refusing error responses.
    pub async fn process_blackboard_response(
        &self,
        response: &BlackboardResponse,
    ) -> Result<ExtractOutcome> {
        if !response.is_ok() {
            log::error!(
                "Blackboard response carries status {}, looks like an API error. Aborting.",
                response.status
            );
            return Err(AppError::fetch(
                "blackboard",
                format!("envelope status {}", response.status),
            ));
        }
        self.process_announcements(&response.html).await
    }
}

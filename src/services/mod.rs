//! Service layer for the notifier.
//!
//! This module contains the business logic for:
//! - Detail page resolution (`DetailSource`, `HttpDetailFetcher`)
//! - Blackboard message extraction (`MessageExtractor`)
//! - Conference alert scanning (`NotificationScanner`)
//! - Delivery deduplication (`DeliveryDeduplicator`)
//! - Message queueing (`MessageQueue`) and alert hand-off (`AlertSink`)

mod dedup;
mod delivery;
mod detail;
mod messages;
mod notifications;
mod queue;

pub use dedup::DeliveryDeduplicator;
pub use delivery::{AlertSink, CollectingAlertSink};
pub use detail::{DetailExtractor, DetailSource, HttpDetailFetcher};
pub use messages::{ExtractOutcome, ListSchema, Listing, MessageExtractor, RawEntry};
pub use notifications::{
    AlertPolicy, NotificationScanner, RawRow, RowVerdict, ScanOutcome, TableSchema,
    parse_time_of_day,
};
pub use queue::MessageQueue;

//! Pipeline entry points.
//!
//! - `PortalPipeline::process_notifications`: scan the alert table
//! - `PortalPipeline::process_announcements`: extract blackboard messages

mod portal;

pub use portal::PortalPipeline;

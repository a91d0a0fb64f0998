// src/models/mod.rs

//! Domain models for the notifier.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod message;
mod notification;
mod window;

// Re-export all public types
pub use config::{AnnouncementConfig, Config, DedupConfig, NotificationConfig, PortalConfig};
pub use message::{BlackboardResponse, Message};
pub use notification::{Alert, NotificationCandidate};
pub use window::{TimeWindow, within_any};

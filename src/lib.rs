// src/lib.rs

//! Portal Notifier Library
//!
//! Extracts blackboard announcements and conference alerts from an academic
//! portal's HTML and decides which alerts still need to be delivered.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

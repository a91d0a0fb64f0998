//! Announcement message structures.

use serde::{Deserialize, Serialize};

/// An announcement taken from the portal blackboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Short label from the title cell
    pub title: String,

    /// Portal-supplied date, kept verbatim
    pub date: String,

    /// Enriched detail text, or the short abstract when enrichment failed
    pub body: String,

    /// Relative link to the detail page (empty if the entry had none)
    pub link: String,
}

impl Message {
    /// Whether the entry carried a deep link.
    pub fn has_link(&self) -> bool {
        !self.link.is_empty()
    }
}

/// JSON envelope the portal wraps blackboard markup in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackboardResponse {
    #[serde(rename = "Status")]
    pub status: u16,

    #[serde(rename = "HTML", default)]
    pub html: String,
}

impl BlackboardResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

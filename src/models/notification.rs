//! Conference alert structures.

use serde::{Deserialize, Serialize};

/// A table row that passed the date, time-window and phrase gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationCandidate {
    /// Trimmed, quote-stripped alert text; the deduplication key
    pub subject: String,

    /// Relative link to the alert's detail page
    pub link: String,

    /// Column text as it appeared in the table
    pub raw_text: String,
}

impl NotificationCandidate {
    /// The raw text without its leading marker character, trimmed.
    pub fn display_text(&self) -> String {
        let mut chars = self.raw_text.chars();
        chars.next();
        chars.as_str().trim().to_string()
    }
}

/// What is handed to the delivery collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    /// Conference URL (or the detail page when none was found)
    pub link: String,

    /// Alert text without its leading marker character
    pub text: String,
}

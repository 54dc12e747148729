//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::Language;
use crate::error::Result;

/// Maximum accepted message length in characters, matching the assistant's
/// input limit.
pub const MAX_MESSAGE_LENGTH: usize = 500;

/// Request body for `POST /responses/lookup`
///
/// # Fields
/// - `message`: The user message as the fallback client saw it
/// - `language`: `zh` or `en`, case-insensitive
#[derive(Debug, Clone, Deserialize)]
pub struct LookupRequest {
    pub message: String,
    pub language: String,
}

impl LookupRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.message.trim().is_empty() {
            return Some("Message cannot be empty".to_string());
        }
        if self.message.chars().count() > MAX_MESSAGE_LENGTH {
            return Some(format!(
                "Message exceeds maximum length of {} characters",
                MAX_MESSAGE_LENGTH
            ));
        }
        None
    }

    /// Parses the language tag.
    pub fn language(&self) -> Result<Language> {
        self.language.parse()
    }
}

//! Syntactic check for supported video links
//!
//! A link is accepted when, after an optional `http://`/`https://` prefix and
//! an optional `www.`, it starts with one of the accepted hosts followed by
//! `/` and at least one more character. Nothing is fetched.

use crate::error::{Error, Result};
use regex::Regex;

/// Compiled matcher for a fixed set of accepted hosts
#[derive(Clone, Debug)]
pub struct UrlMatcher {
    pattern: Regex,
}

impl UrlMatcher {
    /// Build a matcher for the given host names
    pub fn new<S: AsRef<str>>(hosts: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = hosts
            .iter()
            .map(|h| h.as_ref().trim())
            .filter(|h| !h.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Err(Error::Config {
                message: "at least one accepted host is required".to_string(),
                key: Some("job.accepted_hosts".to_string()),
            });
        }

        let pattern = Regex::new(&format!(
            r"^(?:https?://)?(?:www\.)?(?:{})/.+$",
            alternatives.join("|")
        ))
        .map_err(|e| Error::Config {
            message: format!("invalid accepted host pattern: {}", e),
            key: Some("job.accepted_hosts".to_string()),
        })?;

        Ok(Self { pattern })
    }

    /// Whether the input looks like a supported link (surrounding whitespace ignored)
    pub fn is_supported(&self, input: &str) -> bool {
        self.pattern.is_match(input.trim())
    }
}

//! Shared error type for the query builder, the HTTP client and the extractors.

use thiserror::Error;

/// Scraper error for criteria validation, HTTP, and document extraction.
#[derive(Debug, Error)]
pub enum ScraperError {
    // Input
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Invalid filter criteria for {field}: {reason}")]
    InvalidCriteria { field: &'static str, reason: String },

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    // HTTP and network
    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    /// Non-success status: there is no document to extract from.
    #[error("HTTP {status} when fetching: {url} (no document)")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    // Extraction
    #[error("Could not find {container} on the page (layout may have changed).")]
    MissingContainer { container: &'static str },

    #[error("Could not find the {name} filter section on the finder page.")]
    MissingSection { name: &'static str },

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

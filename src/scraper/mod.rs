//! Novel Updates scraping: query building, the shared client, and the three page extractors.
//!
//! Extractors are free functions over a parsed [Html] document; [NovelUpdates] wires them to the client.

mod client;
mod error;

pub mod catalog;
pub mod detail;
pub mod listing;
pub mod query;

pub use catalog::extract_catalog;
pub use client::{PoliteClient, PoliteClientBuilder};
pub use detail::extract_detail;
pub use error::ScraperError;
pub use listing::extract_listings;
pub use query::{build_finder_url, build_query, SERIES_FINDER_URL};

use crate::model::{DetailRecord, FilterCatalog, FilterCriteria, Genre, ListingPage};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const NOVELUPDATES_BASE: &str = "https://www.novelupdates.com/";

/// Parse a CSS selector or return an error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, ScraperError> {
    Selector::parse(sel).map_err(|e| ScraperError::InvalidSelector {
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

/// All text under `el`, trimmed.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Genre anchors under `scope` as (gid, text) pairs in document order.
pub(crate) fn genre_pairs(scope: ElementRef<'_>, anchor_sel: &Selector) -> Vec<Genre> {
    scope
        .select(anchor_sel)
        .map(|a| Genre {
            id: a.value().attr("gid").unwrap_or_default().trim().to_string(),
            name: element_text(a),
        })
        .collect()
}

/// Check response status and read the body. A non-success status means there is no document.
fn check_response(response: reqwest::blocking::Response, url: &str) -> Result<String, ScraperError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    response
        .text()
        .map_err(|e| ScraperError::BodyRead { source: e })
}

/// Novel Updates site facade. Holds a reference to the shared polite client.
pub struct NovelUpdates<'a> {
    client: &'a mut PoliteClient,
    base: Url,
}

impl<'a> NovelUpdates<'a> {
    /// Facade for the live site.
    pub fn new(client: &'a mut PoliteClient) -> Result<Self, ScraperError> {
        Self::with_base_url(client, NOVELUPDATES_BASE)
    }

    /// Facade for a mirror or a local test server. A trailing `/` is added when missing.
    pub fn with_base_url(client: &'a mut PoliteClient, base: &str) -> Result<Self, ScraperError> {
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base = Url::parse(&normalized).map_err(|e| ScraperError::InvalidUrl {
            input: base.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { client, base })
    }

    /// Finder URL for `criteria` on this site.
    pub fn finder_url(&self, criteria: &FilterCriteria) -> Result<String, ScraperError> {
        let finder = self.join("series-finder/")?;
        build_finder_url(finder.as_str(), criteria)
    }

    /// Series page URL. Absolute http(s) URLs are returned as-is; numeric ids become `{base}?p={id}`.
    pub fn novel_url(&self, id_or_url: &str) -> Result<String, ScraperError> {
        let input = id_or_url.trim();
        if let Ok(url) = Url::parse(input) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url.to_string());
            }
        }
        if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
            return Ok(self.join(&format!("?p={}", input))?.to_string());
        }
        Err(ScraperError::InvalidUrl {
            input: id_or_url.to_string(),
            reason: "expected a numeric series id or an http(s) URL".to_string(),
        })
    }

    /// Fetch one finder results page and extract its entries.
    pub fn series_finder(&mut self, criteria: &FilterCriteria) -> Result<ListingPage, ScraperError> {
        let url = self.finder_url(criteria)?;
        let doc = self.fetch_document(&url)?;
        extract_listings(&doc)
    }

    /// Fetch one series page by id or URL and extract its detail record.
    pub fn novel(&mut self, id_or_url: &str) -> Result<DetailRecord, ScraperError> {
        let url = self.novel_url(id_or_url)?;
        let doc = self.fetch_document(&url)?;
        extract_detail(&doc)
    }

    /// Fetch the bare finder form and extract the valid values of every filter.
    pub fn filter_catalog(&mut self) -> Result<FilterCatalog, ScraperError> {
        let url = self.join("series-finder/")?.to_string();
        let doc = self.fetch_document(&url)?;
        extract_catalog(&doc)
    }

    fn join(&self, path: &str) -> Result<Url, ScraperError> {
        self.base.join(path).map_err(|e| ScraperError::InvalidUrl {
            input: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn fetch_document(&mut self, url: &str) -> Result<Html, ScraperError> {
        debug!(url, "fetching");
        let response = self
            .client
            .get_with_retry(url)
            .map_err(|e| ScraperError::Network {
                url: url.to_string(),
                source: e,
            })?;
        let body = check_response(response, url)?;
        debug!(url, bytes = body.len(), "fetched");
        Ok(Html::parse_document(&body))
    }
}

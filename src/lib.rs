//! nuscrape: Novel Updates series finder query builder and page scraper, outputting JSON.

pub mod cli;
pub mod config;
pub mod logging;
pub mod model;
pub mod scraper;

pub use model::{DetailRecord, FilterCatalog, FilterCriteria, ListingPage};
pub use scraper::{
    build_finder_url, build_query, extract_catalog, extract_detail, extract_listings,
    NovelUpdates, PoliteClient, PoliteClientBuilder, ScraperError,
};

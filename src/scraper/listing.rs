//! Series finder results page -> [ListingPage].
//!
//! Malformed entries are skipped and reported in [ListingPage::failures] so the rest of the page stays usable.

use crate::model::{EntryFailure, ListingEntry, ListingPage};
use crate::scraper::error::ScraperError;
use crate::scraper::{element_text, genre_pairs, parse_selector};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

const RESULTS_CONTAINER: &str = "div.w-blog-content.other";
/// Prefix of the `id` attribute on the per-entry marker span (e.g. `sid4561`).
const SERIES_ID_PREFIX: &str = "sid";

struct ListingSelectors {
    entry: Selector,
    id_marker: Selector,
    title: Selector,
    genre: Selector,
    image: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self, ScraperError> {
        Ok(Self {
            entry: parse_selector("div.search_main_box_nu")?,
            id_marker: parse_selector("span.rl_icons_en")?,
            title: parse_selector("a")?,
            genre: parse_selector("div.search_genre a")?,
            image: parse_selector("img")?,
        })
    }
}

/// Extract every entry of a finder results page in document order.
///
/// Fails with [ScraperError::MissingContainer] when the results container is absent; a present
/// container without entries yields an empty page.
pub fn extract_listings(doc: &Html) -> Result<ListingPage, ScraperError> {
    let container_sel = parse_selector(RESULTS_CONTAINER)?;
    let container = doc
        .select(&container_sel)
        .next()
        .ok_or(ScraperError::MissingContainer {
            container: RESULTS_CONTAINER,
        })?;
    let sels = ListingSelectors::new()?;

    let mut page = ListingPage::default();
    for (position, entry) in container.select(&sels.entry).enumerate() {
        match parse_entry(entry, &sels) {
            Ok(listing) => page.entries.push(listing),
            Err(e) => {
                warn!(position, error = %e, "skipping malformed finder entry");
                page.failures.push(EntryFailure {
                    position,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(page)
}

fn parse_entry(entry: ElementRef<'_>, sels: &ListingSelectors) -> Result<ListingEntry, ScraperError> {
    let id = entry
        .select(&sels.id_marker)
        .next()
        .and_then(|span| span.value().attr("id"))
        .and_then(|raw| raw.trim().strip_prefix(SERIES_ID_PREFIX))
        .filter(|id| !id.is_empty())
        .map(String::from)
        .ok_or(ScraperError::MissingField { field: "id" })?;
    let title = entry
        .select(&sels.title)
        .next()
        .map(element_text)
        .ok_or(ScraperError::MissingField { field: "title" })?;
    let image_url = entry
        .select(&sels.image)
        .next()
        .and_then(|img| img.value().attr("src"))
        .unwrap_or_default()
        .to_string();
    Ok(ListingEntry {
        id,
        title,
        genres: genre_pairs(entry, &sels.genre),
        image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINDER_RESULTS: &str = include_str!("../../tests/fixtures/finder_results.html");
    const FINDER_RESULTS_EMPTY: &str = include_str!("../../tests/fixtures/finder_results_empty.html");

    #[test]
    fn fixture_entries_in_document_order() -> Result<(), ScraperError> {
        let page = extract_listings(&Html::parse_document(FINDER_RESULTS))?;
        assert!(page.failures.is_empty());
        let ids: Vec<_> = page.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["4561", "10023", "777"]);
        assert_eq!(page.entries[0].title, "The Regressor and the Blind Saint");
        assert_eq!(page.entries[2].title, "The Lady's Butler");
        Ok(())
    }

    #[test]
    fn fixture_genres_are_paired_in_order() -> Result<(), ScraperError> {
        let page = extract_listings(&Html::parse_document(FINDER_RESULTS))?;
        let first = &page.entries[0];
        let pairs: Vec<_> = first
            .genres
            .iter()
            .map(|g| (g.id.as_str(), g.name.as_str()))
            .collect();
        assert_eq!(pairs, [("8", "Fantasy"), ("3", "Action"), ("280", "Drama")]);
        assert!(page.entries[2].genres.is_empty());
        Ok(())
    }

    #[test]
    fn missing_cover_is_empty_string() -> Result<(), ScraperError> {
        let page = extract_listings(&Html::parse_document(FINDER_RESULTS))?;
        assert_eq!(
            page.entries[0].image_url,
            "https://cdn.novelupdates.com/imgmid/series_4561.jpg"
        );
        assert_eq!(page.entries[2].image_url, "");
        Ok(())
    }

    #[test]
    fn empty_container_is_zero_results() -> Result<(), ScraperError> {
        let page = extract_listings(&Html::parse_document(FINDER_RESULTS_EMPTY))?;
        assert!(page.entries.is_empty());
        assert!(page.failures.is_empty());
        Ok(())
    }

    #[test]
    fn missing_container_fails() {
        let doc = Html::parse_document("<html><body><div class=\"w-blog-content\"></div></body></html>");
        assert!(matches!(
            extract_listings(&doc),
            Err(ScraperError::MissingContainer { .. })
        ));
    }

    #[test]
    fn one_bad_entry_keeps_the_rest() -> Result<(), ScraperError> {
        let html = r#"<div class="w-blog-content other">
<div class="search_main_box_nu"><a>First</a><span class="rl_icons_en" id="sid1"></span></div>
<div class="search_main_box_nu"><a>No marker</a></div>
<div class="search_main_box_nu"><a>Third</a><span class="rl_icons_en" id="sid3"></span></div>
</div>"#;
        let page = extract_listings(&Html::parse_document(html))?;
        let titles: Vec<_> = page.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["First", "Third"]);
        assert_eq!(page.failures.len(), 1);
        assert_eq!(page.failures[0].position, 1);
        assert!(page.failures[0].reason.contains("id"));
        Ok(())
    }

    #[test]
    fn marker_without_id_attribute_is_reported() -> Result<(), ScraperError> {
        let html = r#"<div class="w-blog-content other">
<div class="search_main_box_nu"><a>Only</a><span class="rl_icons_en"></span></div>
</div>"#;
        let page = extract_listings(&Html::parse_document(html))?;
        assert!(page.entries.is_empty());
        assert_eq!(page.failures.len(), 1);
        Ok(())
    }

    #[test]
    fn marker_id_without_series_prefix_is_reported() -> Result<(), ScraperError> {
        let html = r#"<div class="w-blog-content other">
<div class="search_main_box_nu"><a>Flag only</a><span class="rl_icons_en" id="rl_en_flag"></span></div>
<div class="search_main_box_nu"><a>Bare prefix</a><span class="rl_icons_en" id="sid"></span></div>
<div class="search_main_box_nu"><a>Good</a><span class="rl_icons_en" id="sid42"></span></div>
</div>"#;
        let page = extract_listings(&Html::parse_document(html))?;
        let ids: Vec<_> = page.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["42"]);
        let positions: Vec<_> = page.failures.iter().map(|f| f.position).collect();
        assert_eq!(positions, [0, 1]);
        Ok(())
    }
}

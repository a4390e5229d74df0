//! Series page -> [DetailRecord].

use crate::model::{DetailRecord, Recommendation};
use crate::scraper::error::ScraperError;
use crate::scraper::{element_text, genre_pairs, parse_selector};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

const CONTENT_CONTAINER: &str = "div.w-blog-content";
const RECOMMENDATION_LIMIT: usize = 6;

/// First decimal with a 1-2 digit whole part, e.g. "4.12" in "(4.12 avg / 4.50)".
static RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.])(\d{1,2}\.\d+)").expect("rating pattern is valid")
});

/// Extract the full record of a series page.
///
/// Title, language, type, year, rating and description are required. Authors and artists are
/// `None` when the page lists none.
pub fn extract_detail(doc: &Html) -> Result<DetailRecord, ScraperError> {
    let content_sel = parse_selector(CONTENT_CONTAINER)?;
    let content = doc
        .select(&content_sel)
        .next()
        .ok_or(ScraperError::MissingContainer {
            container: CONTENT_CONTAINER,
        })?;

    let id = series_id(doc)?;
    let title = required_text(content, "div.seriestitlenu", "title")?;
    let image_url = first_attr(content, "img", "src")?.unwrap_or_default();
    let language = required_text(content, "a.genre.lang", "language")?;
    let kind = required_text(content, "div#showtype", "type")?;
    let year = required_text(content, "div#edityear", "year")?;

    let votes = first_text(content, "span.uvotes")?;
    let rating = votes
        .as_deref()
        .and_then(parse_rating)
        .ok_or(ScraperError::MissingField { field: "rating" })?;

    let genres = genre_pairs(content, &parse_selector("div#seriesgenre a")?);
    let tags = all_texts(content, "div#showtags a")?;
    let description = description(doc)?;
    let authors = non_empty(all_texts(content, "div#showauthors a")?);
    let artists = non_empty(all_texts(content, "div#showartists a")?);
    let recommendations = recommendations(content)?;

    Ok(DetailRecord {
        id,
        title,
        image_url,
        language,
        kind,
        year,
        rating,
        genres,
        tags,
        description,
        authors,
        artists,
        recommendations,
    })
}

/// First decimal number in a votes summary; `None` when there is none.
pub fn parse_rating(text: &str) -> Option<String> {
    RATING_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Series id from the shortlink (`https://www.novelupdates.com/?p=4561`).
fn series_id(doc: &Html) -> Result<String, ScraperError> {
    let sel = parse_selector("link[rel=\"shortlink\"]")?;
    doc.select(&sel)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| href.rsplit_once("p=").map(|(_, id)| id.trim().to_string()))
        .filter(|id| !id.is_empty())
        .ok_or(ScraperError::MissingField { field: "id" })
}

/// og:description, falling back to the visible description block.
fn description(doc: &Html) -> Result<String, ScraperError> {
    let meta_sel = parse_selector("meta[property=\"og:description\"]")?;
    let from_meta = doc
        .select(&meta_sel)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(desc) = from_meta {
        return Ok(desc);
    }
    let block_sel = parse_selector("div#editdescription")?;
    doc.select(&block_sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
        .ok_or(ScraperError::MissingField {
            field: "description",
        })
}

fn recommendations(content: ElementRef<'_>) -> Result<Vec<Recommendation>, ScraperError> {
    let sel = parse_selector("a.genre[id^=\"sid\"]")?;
    Ok(content
        .select(&sel)
        .take(RECOMMENDATION_LIMIT)
        .filter_map(|a| {
            let id = a.value().attr("id")?.strip_prefix("sid")?.to_string();
            Some(Recommendation {
                id,
                title: element_text(a),
            })
        })
        .collect())
}

fn first_text(scope: ElementRef<'_>, sel: &str) -> Result<Option<String>, ScraperError> {
    let sel = parse_selector(sel)?;
    Ok(scope.select(&sel).next().map(element_text))
}

fn required_text(
    scope: ElementRef<'_>,
    sel: &str,
    field: &'static str,
) -> Result<String, ScraperError> {
    first_text(scope, sel)?
        .filter(|s| !s.is_empty())
        .ok_or(ScraperError::MissingField { field })
}

fn first_attr(scope: ElementRef<'_>, sel: &str, attr: &str) -> Result<Option<String>, ScraperError> {
    let sel = parse_selector(sel)?;
    Ok(scope
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(String::from))
}

fn all_texts(scope: ElementRef<'_>, sel: &str) -> Result<Vec<String>, ScraperError> {
    let sel: Selector = parse_selector(sel)?;
    Ok(scope.select(&sel).map(element_text).collect())
}

fn non_empty(list: Vec<String>) -> Option<Vec<String>> {
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

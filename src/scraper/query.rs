//! Series finder URL builder. Maps [FilterCriteria] onto the finder's query-string grammar.

use crate::model::{FilterCriteria, IncludeFilter, RangeFilter};
use crate::scraper::error::ScraperError;
use url::form_urlencoded;

/// Finder path on the live site. The page number is appended as a path segment.
pub const SERIES_FINDER_URL: &str = "https://www.novelupdates.com/series-finder/";

const DEFAULT_SORT: &str = "sdate";

/// Build the finder URL for `criteria` against the live site.
pub fn build_query(criteria: &FilterCriteria) -> Result<String, ScraperError> {
    build_finder_url(SERIES_FINDER_URL, criteria)
}

/// Build `{base}{page}/?sf=1&...&sort=..&order=..`. `base` should end with `/`.
///
/// Optional parameters are emitted in a fixed order and absent ones contribute nothing.
/// A range with only one side set is rejected rather than defaulted.
pub fn build_finder_url(base: &str, criteria: &FilterCriteria) -> Result<String, ScraperError> {
    if criteria.page == 0 {
        return Err(ScraperError::InvalidCriteria {
            field: "page",
            reason: "page numbers start at 1".to_string(),
        });
    }
    let mut url = format!("{}{}/?sf=1", base, criteria.page);

    push_code(&mut url, "nt", criteria.novel_type.as_deref());
    push_code(&mut url, "org", criteria.language.as_deref());

    let ranges: [(&'static str, &str, &str, Option<&RangeFilter>); 8] = [
        ("chapterCount", "rl", "mrl", criteria.chapter_count.as_ref()),
        ("releaseFrequency", "rf", "mrf", criteria.release_frequency.as_ref()),
        ("reviewCount", "rvc", "mrvc", criteria.review_count.as_ref()),
        ("rating", "rt", "mrt", criteria.rating.as_ref()),
        ("ratingCount", "rtc", "mrtc", criteria.rating_count.as_ref()),
        ("readerCount", "rct", "mrct", criteria.reader_count.as_ref()),
        ("firstReleaseDate", "dtf", "mdtf", criteria.first_release_date.as_ref()),
        ("lastReleaseDate", "dt", "mdt", criteria.last_release_date.as_ref()),
    ];
    for (field, key, qualifier_key, range) in ranges {
        if let Some(range) = range {
            push_range(&mut url, field, key, qualifier_key, range)?;
        }
    }

    push_included(&mut url, "gi", "mgi", criteria.genre_included.as_ref());
    push_csv(&mut url, "ge", &criteria.genre_excluded);
    push_included(&mut url, "tgi", "mtgi", criteria.tags_included.as_ref());
    push_csv(&mut url, "tge", &criteria.tags_excluded);
    push_code(&mut url, "ss", criteria.status.as_deref());

    let sort = criteria
        .sort
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SORT);
    push_param(&mut url, "sort", &encode(sort));
    push_param(&mut url, "order", criteria.order.unwrap_or_default().as_str());
    Ok(url)
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn push_param(url: &mut String, key: &str, encoded_value: &str) {
    url.push('&');
    url.push_str(key);
    url.push('=');
    url.push_str(encoded_value);
}

fn push_code(url: &mut String, key: &str, code: Option<&str>) {
    if let Some(code) = code.filter(|c| !c.is_empty()) {
        push_param(url, key, &encode(code));
    }
}

/// Comma-joined codes, each encoded on its own so the commas stay separators.
fn join_codes(codes: &[String]) -> Option<String> {
    let encoded: Vec<String> = codes
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| encode(c))
        .collect();
    if encoded.is_empty() {
        None
    } else {
        Some(encoded.join(","))
    }
}

fn push_csv(url: &mut String, key: &str, codes: &[String]) {
    if let Some(csv) = join_codes(codes) {
        push_param(url, key, &csv);
    }
}

fn push_included(url: &mut String, key: &str, combinator_key: &str, filter: Option<&IncludeFilter>) {
    let Some(filter) = filter else {
        return;
    };
    if let Some(csv) = join_codes(&filter.codes) {
        push_param(url, key, &csv);
        push_param(url, combinator_key, filter.combinator.as_str());
    }
}

fn push_range(
    url: &mut String,
    field: &'static str,
    key: &str,
    qualifier_key: &str,
    range: &RangeFilter,
) -> Result<(), ScraperError> {
    let value = range.value.as_deref().filter(|v| !v.trim().is_empty());
    match (value, range.qualifier) {
        (Some(value), Some(qualifier)) => {
            push_param(url, key, &encode(value.trim()));
            push_param(url, qualifier_key, qualifier.as_str());
            Ok(())
        }
        (None, None) => Ok(()),
        (Some(_), None) => Err(ScraperError::InvalidCriteria {
            field,
            reason: "value given without a min/max qualifier".to_string(),
        }),
        (None, Some(_)) => Err(ScraperError::InvalidCriteria {
            field,
            reason: "qualifier given without a value".to_string(),
        }),
    }
}

//! Series finder form -> [FilterCatalog].
//!
//! Each category's section is found by a marker that identifies it (option class or the select's
//! name), not by its position among the form's rows.

use crate::model::{CatalogCategory, CatalogOption, FilterCatalog};
use crate::scraper::error::ScraperError;
use crate::scraper::{element_text, parse_selector};
use scraper::{ElementRef, Html};

/// One row of the finder form.
const FILTER_ROW: &str = "div.g-cols.wpb_row.offset_default";

/// Where a category's options live.
enum Section {
    /// The first filter row holding at least one option.
    RowWithOptions,
    /// A specific control, matched anywhere in the document.
    Control(&'static str),
}

struct CategorySource {
    kind: CatalogCategory,
    section: Section,
    option: &'static str,
    code_attr: &'static str,
    limit: Option<usize>,
}

const CATEGORIES: [CategorySource; 7] = [
    CategorySource {
        kind: CatalogCategory::NovelType,
        section: Section::RowWithOptions,
        option: "a.typerank",
        code_attr: "genreid",
        limit: None,
    },
    CategorySource {
        kind: CatalogCategory::Language,
        section: Section::RowWithOptions,
        option: "a.langrank",
        code_attr: "genreid",
        limit: None,
    },
    CategorySource {
        kind: CatalogCategory::Genre,
        section: Section::RowWithOptions,
        option: "a.genreme",
        code_attr: "genreid",
        limit: None,
    },
    // Include and exclude share the tag list.
    CategorySource {
        kind: CatalogCategory::Tag,
        section: Section::Control("select[name=\"tags_include\"]"),
        option: "option",
        code_attr: "value",
        limit: None,
    },
    CategorySource {
        kind: CatalogCategory::StoryStatus,
        section: Section::Control("select[name=\"storystatus\"]"),
        option: "option",
        code_attr: "value",
        limit: None,
    },
    CategorySource {
        kind: CatalogCategory::Sort,
        section: Section::Control("select[name=\"sortmyresults\"]"),
        option: "option",
        code_attr: "value",
        limit: None,
    },
    CategorySource {
        kind: CatalogCategory::Order,
        section: Section::Control("select[name=\"sortmyorder\"]"),
        option: "option",
        code_attr: "value",
        limit: Some(2),
    },
];

/// Extract the valid (code, label) options of every finder filter, in document order.
///
/// Fails with [ScraperError::MissingSection] naming the first category whose section is absent.
pub fn extract_catalog(doc: &Html) -> Result<FilterCatalog, ScraperError> {
    let mut catalog = FilterCatalog::default();
    for category in &CATEGORIES {
        let section = locate_section(doc, category)?.ok_or(ScraperError::MissingSection {
            name: category.kind.name(),
        })?;
        *catalog.options_mut(category.kind) = read_options(section, category)?;
    }
    Ok(catalog)
}

fn locate_section<'a>(
    doc: &'a Html,
    category: &CategorySource,
) -> Result<Option<ElementRef<'a>>, ScraperError> {
    match category.section {
        Section::RowWithOptions => {
            let row_sel = parse_selector(FILTER_ROW)?;
            let option_sel = parse_selector(category.option)?;
            Ok(doc
                .select(&row_sel)
                .find(|row| row.select(&option_sel).next().is_some()))
        }
        Section::Control(control) => {
            let control_sel = parse_selector(control)?;
            Ok(doc.select(&control_sel).next())
        }
    }
}

fn read_options(
    section: ElementRef<'_>,
    category: &CategorySource,
) -> Result<Vec<CatalogOption>, ScraperError> {
    let option_sel = parse_selector(category.option)?;
    let options = section.select(&option_sel).map(|el| CatalogOption {
        code: el
            .value()
            .attr(category.code_attr)
            .unwrap_or_default()
            .trim()
            .to_string(),
        label: element_text(el),
    });
    Ok(match category.limit {
        Some(n) => options.take(n).collect(),
        None => options.collect(),
    })
}

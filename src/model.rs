//! Data model for series finder queries and scraped records.
//!
//! Records serialize with camelCase keys; those names are the output contract of the CLI.

use serde::{Deserialize, Serialize};

/// Which bound a range value represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Qualifier {
    Min,
    Max,
}

impl Qualifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Min => "min",
            Qualifier::Max => "max",
        }
    }
}

/// Whether an included multi-value filter requires all codes or any of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn as_str(self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One bound of a ranged filter (chapter count, rating, release date, ...).
///
/// Both sides are optional so that partially specified input can be represented;
/// the query builder rejects a range with only one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<Qualifier>,
}

impl RangeFilter {
    pub fn new(value: impl Into<String>, qualifier: Qualifier) -> Self {
        Self {
            value: Some(value.into()),
            qualifier: Some(qualifier),
        }
    }
}

/// Codes that must (all or any) be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeFilter {
    pub codes: Vec<String>,
    pub combinator: Combinator,
}

impl IncludeFilter {
    pub fn new<I, S>(codes: I, combinator: Combinator) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            combinator,
        }
    }
}

/// Series finder search criteria. Only `page` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// 1-based result page.
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_count: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_frequency: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_count: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_release_date: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_release_date: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre_included: Option<IncludeFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genre_excluded: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_included: Option<IncludeFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags_excluded: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Sort code; `sdate` when not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::page(1)
    }
}

impl FilterCriteria {
    /// Criteria with only the page set.
    pub fn page(page: u32) -> Self {
        Self {
            page,
            novel_type: None,
            language: None,
            chapter_count: None,
            release_frequency: None,
            review_count: None,
            rating: None,
            rating_count: None,
            reader_count: None,
            first_release_date: None,
            last_release_date: None,
            genre_included: None,
            genre_excluded: Vec::new(),
            tags_included: None,
            tags_excluded: Vec::new(),
            status: None,
            sort: None,
            order: None,
        }
    }
}

/// Genre as (site id, display name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
}

/// One summarized series from a finder results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub id: String,
    pub title: String,
    pub genres: Vec<Genre>,
    /// Empty when the entry has no cover.
    pub image_url: String,
}

/// Entry on a results page that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    /// 0-based position among the page's entry elements.
    pub position: usize,
    pub reason: String,
}

/// Extracted entries of one results page plus any skipped malformed entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<EntryFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
}

/// Full record of one series page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub language: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Free text; the site does not guarantee a numeric year.
    pub year: String,
    /// Decimal string, e.g. "4.12".
    pub rating: String,
    pub genres: Vec<Genre>,
    pub tags: Vec<String>,
    pub description: String,
    /// `None` when the page lists no authors (section missing or empty).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artists: Option<Vec<String>>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// Filter dimension of the series finder form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogCategory {
    NovelType,
    Language,
    Genre,
    Tag,
    StoryStatus,
    Sort,
    Order,
}

impl CatalogCategory {
    pub const ALL: [CatalogCategory; 7] = [
        CatalogCategory::NovelType,
        CatalogCategory::Language,
        CatalogCategory::Genre,
        CatalogCategory::Tag,
        CatalogCategory::StoryStatus,
        CatalogCategory::Sort,
        CatalogCategory::Order,
    ];

    /// Key used in the serialized catalog.
    pub fn name(self) -> &'static str {
        match self {
            CatalogCategory::NovelType => "novelType",
            CatalogCategory::Language => "language",
            CatalogCategory::Genre => "genre",
            CatalogCategory::Tag => "tag",
            CatalogCategory::StoryStatus => "storyStatus",
            CatalogCategory::Sort => "sort",
            CatalogCategory::Order => "order",
        }
    }
}

/// Valid (code, label) for one filter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOption {
    pub code: String,
    pub label: String,
}

/// Enumerated valid values per filter dimension, each in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCatalog {
    pub novel_type: Vec<CatalogOption>,
    pub language: Vec<CatalogOption>,
    pub genre: Vec<CatalogOption>,
    pub tag: Vec<CatalogOption>,
    pub story_status: Vec<CatalogOption>,
    pub sort: Vec<CatalogOption>,
    pub order: Vec<CatalogOption>,
}

impl FilterCatalog {
    pub fn options(&self, category: CatalogCategory) -> &[CatalogOption] {
        match category {
            CatalogCategory::NovelType => &self.novel_type,
            CatalogCategory::Language => &self.language,
            CatalogCategory::Genre => &self.genre,
            CatalogCategory::Tag => &self.tag,
            CatalogCategory::StoryStatus => &self.story_status,
            CatalogCategory::Sort => &self.sort,
            CatalogCategory::Order => &self.order,
        }
    }

    pub fn options_mut(&mut self, category: CatalogCategory) -> &mut Vec<CatalogOption> {
        match category {
            CatalogCategory::NovelType => &mut self.novel_type,
            CatalogCategory::Language => &mut self.language,
            CatalogCategory::Genre => &mut self.genre,
            CatalogCategory::Tag => &mut self.tag,
            CatalogCategory::StoryStatus => &mut self.story_status,
            CatalogCategory::Sort => &mut self.sort,
            CatalogCategory::Order => &mut self.order,
        }
    }
}

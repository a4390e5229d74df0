//! CLI parsing and orchestration. Parses args, runs finder / novel / filters, prints JSON. Maps errors to exit codes.

use crate::config::{self, Config};
use crate::model::{Combinator, FilterCriteria, IncludeFilter, ListingPage, Qualifier, RangeFilter, SortOrder};
use crate::scraper::{NovelUpdates, PoliteClient, ScraperError, NOVELUPDATES_BASE};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Output(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_)
            | CliRunError::Scraper(ScraperError::InvalidCriteria { .. })
            | CliRunError::Scraper(ScraperError::InvalidUrl { .. }) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Output(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "nuscrape")]
#[command(about = "Query the Novel Updates series finder and scrape series pages as JSON")]
#[command(
    after_help = "Config file keys (base_url, user_agent, request_delay_secs, timeout_secs, retry_count, retry_backoff_secs) are read from ./nuscrape.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Write JSON here instead of stdout.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Pretty-print JSON.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Suppress progress and info logging (warnings and errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 2).
    #[arg(long, global = true)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the series finder and list matching series.
    Finder(FinderArgs),
    /// Scrape one series page by numeric id or URL.
    Novel {
        /// Series id (e.g. 4561) or full series URL.
        id: String,
    },
    /// Scrape the valid codes of every finder filter.
    Filters,
}

#[derive(clap::Args, Debug, Default)]
pub struct FinderArgs {
    /// Result page (1-based). Overrides the page in --criteria.
    #[arg(long, conflicts_with = "pages")]
    pub page: Option<u32>,

    /// Inclusive page range, e.g. 1-5. Pages are fetched in order; stops early at an empty page.
    #[arg(long, value_parser = parse_page_range)]
    pub pages: Option<(u32, u32)>,

    /// Load base criteria from a JSON file (camelCase keys); flags below override it.
    #[arg(long)]
    pub criteria: Option<PathBuf>,

    /// Novel type code.
    #[arg(long = "type")]
    pub novel_type: Option<String>,

    /// Original language code.
    #[arg(long)]
    pub language: Option<String>,

    /// Story status code.
    #[arg(long)]
    pub status: Option<String>,

    /// Chapter count bound, VALUE:min or VALUE:max.
    #[arg(long, value_parser = parse_range)]
    pub chapters: Option<RangeFilter>,

    /// Release frequency bound (days), VALUE:min|max.
    #[arg(long, value_parser = parse_range)]
    pub release_frequency: Option<RangeFilter>,

    /// Review count bound, VALUE:min|max.
    #[arg(long, value_parser = parse_range)]
    pub reviews: Option<RangeFilter>,

    /// Rating bound, VALUE:min|max.
    #[arg(long, value_parser = parse_range)]
    pub rating: Option<RangeFilter>,

    /// Rating count bound, VALUE:min|max.
    #[arg(long, value_parser = parse_range)]
    pub ratings: Option<RangeFilter>,

    /// Reader count bound, VALUE:min|max.
    #[arg(long, value_parser = parse_range)]
    pub readers: Option<RangeFilter>,

    /// First release date bound, VALUE:min|max.
    #[arg(long, value_parser = parse_range)]
    pub first_date: Option<RangeFilter>,

    /// Last release date bound, VALUE:min|max.
    #[arg(long, value_parser = parse_range)]
    pub last_date: Option<RangeFilter>,

    /// Genre codes to include (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub genre_include: Vec<String>,

    /// How included genres combine: and, or.
    #[arg(long, default_value = "and", value_parser = parse_combinator)]
    pub genre_mode: Combinator,

    /// Genre codes to exclude (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub genre_exclude: Vec<String>,

    /// Tag codes to include (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub tag_include: Vec<String>,

    /// How included tags combine: and, or.
    #[arg(long, default_value = "and", value_parser = parse_combinator)]
    pub tag_mode: Combinator,

    /// Tag codes to exclude (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub tag_exclude: Vec<String>,

    /// Sort code (default sdate).
    #[arg(long)]
    pub sort: Option<String>,

    /// asc or desc (default desc).
    #[arg(long, value_parser = parse_order)]
    pub order: Option<SortOrder>,

    /// Print the finder URL(s) and exit without fetching.
    #[arg(long)]
    pub url_only: bool,
}

fn parse_page_range(s: &str) -> Result<(u32, u32), String> {
    let s = s.trim();
    let (from_str, to_str) = s
        .split_once('-')
        .ok_or_else(|| format!("Invalid --pages: expected 'from-to' (e.g. 1-5), got '{}'", s))?;
    let from: u32 = from_str.trim().parse().map_err(|_| {
        format!("Invalid --pages: '{}' is not a valid page number", from_str.trim())
    })?;
    let to: u32 = to_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid --pages: '{}' is not a valid page number", to_str.trim()))?;
    if from == 0 {
        return Err("Invalid --pages: pages start at 1".to_string());
    }
    if from > to {
        return Err(format!(
            "Invalid --pages: start ({}) must be <= end ({})",
            from, to
        ));
    }
    Ok((from, to))
}

fn parse_range(s: &str) -> Result<RangeFilter, String> {
    let (value, qualifier) = s
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| format!("Invalid range '{}': expected VALUE:min or VALUE:max", s))?;
    let qualifier = match qualifier.trim().to_lowercase().as_str() {
        "min" => Qualifier::Min,
        "max" => Qualifier::Max,
        other => {
            return Err(format!(
                "Invalid range qualifier '{}'. Use min or max.",
                other
            ))
        }
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("Invalid range '{}': value is empty", s));
    }
    Ok(RangeFilter::new(value, qualifier))
}

fn parse_combinator(s: &str) -> Result<Combinator, String> {
    match s.to_lowercase().as_str() {
        "and" | "all" => Ok(Combinator::And),
        "or" | "any" => Ok(Combinator::Or),
        _ => Err(format!("Invalid mode '{}'. Use and or or.", s)),
    }
}

fn parse_order(s: &str) -> Result<SortOrder, String> {
    match s.to_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        _ => Err(format!("Invalid --order value: '{}'. Use asc or desc.", s)),
    }
}

/// Overlay finder flags onto `criteria`. Flags that were not given leave the criteria untouched.
fn apply_finder_flags(criteria: &mut FilterCriteria, args: &FinderArgs) {
    if let Some(page) = args.page {
        criteria.page = page;
    }
    let codes = [
        (&mut criteria.novel_type, &args.novel_type),
        (&mut criteria.language, &args.language),
        (&mut criteria.status, &args.status),
        (&mut criteria.sort, &args.sort),
    ];
    for (slot, flag) in codes {
        if flag.is_some() {
            slot.clone_from(flag);
        }
    }
    let ranges = [
        (&mut criteria.chapter_count, &args.chapters),
        (&mut criteria.release_frequency, &args.release_frequency),
        (&mut criteria.review_count, &args.reviews),
        (&mut criteria.rating, &args.rating),
        (&mut criteria.rating_count, &args.ratings),
        (&mut criteria.reader_count, &args.readers),
        (&mut criteria.first_release_date, &args.first_date),
        (&mut criteria.last_release_date, &args.last_date),
    ];
    for (slot, flag) in ranges {
        if flag.is_some() {
            slot.clone_from(flag);
        }
    }
    if !args.genre_include.is_empty() {
        criteria.genre_included = Some(IncludeFilter::new(
            args.genre_include.iter().cloned(),
            args.genre_mode,
        ));
    }
    if !args.genre_exclude.is_empty() {
        criteria.genre_excluded = args.genre_exclude.clone();
    }
    if !args.tag_include.is_empty() {
        criteria.tags_included = Some(IncludeFilter::new(
            args.tag_include.iter().cloned(),
            args.tag_mode,
        ));
    }
    if !args.tag_exclude.is_empty() {
        criteria.tags_excluded = args.tag_exclude.clone();
    }
    if args.order.is_some() {
        criteria.order = args.order;
    }
}

fn load_criteria(path: &Path) -> Result<FilterCriteria, CliRunError> {
    let f = std::fs::File::open(path).map_err(|e| {
        CliRunError::InvalidInput(format!("Cannot read criteria file {}: {}", path.display(), e))
    })?;
    serde_json::from_reader(f).map_err(|e| {
        CliRunError::InvalidInput(format!("Invalid criteria file {}: {}", path.display(), e))
    })
}

fn build_criteria(args: &FinderArgs) -> Result<FilterCriteria, CliRunError> {
    let mut criteria = match &args.criteria {
        Some(path) => load_criteria(path)?,
        None => FilterCriteria::default(),
    };
    apply_finder_flags(&mut criteria, args);
    Ok(criteria)
}

fn build_client(args: &Args, config: Option<&Config>) -> Result<PoliteClient, CliRunError> {
    const DEFAULT_DELAY_SECS: u64 = 2;
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    let delay_secs = args
        .delay
        .or_else(|| config.and_then(|c| c.request_delay_secs))
        .unwrap_or(DEFAULT_DELAY_SECS);
    let timeout_secs = args
        .timeout
        .or_else(|| config.and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.and_then(|c| c.user_agent.clone()));

    let mut builder = PoliteClient::builder()
        .delay_secs(delay_secs)
        .timeout_secs(timeout_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(n) = config.and_then(|c| c.retry_count) {
        builder = builder.retry_count(n);
    }
    if let Some(secs) = config.and_then(|c| c.retry_backoff_secs.clone()) {
        builder = builder.retry_backoff_secs(secs);
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

/// Serialize `value` as JSON to `output` (or stdout).
fn write_json<T: Serialize>(value: &T, output: Option<&Path>, pretty: bool) -> Result<(), CliRunError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| CliRunError::Output(format!("Failed to serialize JSON: {}", e)))?;
    match output {
        Some(path) => std::fs::write(path, json + "\n").map_err(|e| {
            CliRunError::Output(format!("Failed to write output: {}: {}", path.display(), e))
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)
                .map_err(|e| CliRunError::Output(format!("Failed to write to stdout: {}", e)))
        }
    }
}

/// One fetched page of a `--pages` run.
#[derive(Debug, Serialize)]
struct FinderPageOutput {
    page: u32,
    #[serde(flatten)]
    listing: ListingPage,
}

fn page_progress(total: u64) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(total);
    if let Ok(style) =
        indicatif::ProgressStyle::default_bar().template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
    {
        bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn run_finder(args: &Args, finder: &FinderArgs, site: &mut NovelUpdates<'_>) -> Result<(), CliRunError> {
    let mut criteria = build_criteria(finder)?;
    let (first, last) = finder.pages.unwrap_or((criteria.page, criteria.page));

    if finder.url_only {
        let mut stdout = std::io::stdout().lock();
        for page in first..=last {
            criteria.page = page;
            let url = site.finder_url(&criteria)?;
            writeln!(stdout, "{}", url)
                .map_err(|e| CliRunError::Output(format!("Failed to write to stdout: {}", e)))?;
        }
        return Ok(());
    }

    if finder.pages.is_none() {
        let listing = site.series_finder(&criteria)?;
        info!(entries = listing.entries.len(), skipped = listing.failures.len(), "finder page scraped");
        return write_json(&listing, args.output.as_deref(), args.pretty);
    }

    let progress = (!args.quiet).then(|| page_progress(u64::from(last - first + 1)));
    let (pages, failed) = collect_pages(first, last, progress.as_ref(), |page| {
        criteria.page = page;
        site.series_finder(&criteria)
    });
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    let total: usize = pages.iter().map(|p| p.listing.entries.len()).sum();
    info!(pages = pages.len(), entries = total, "finder pages scraped");
    match failed {
        None => write_json(&pages, args.output.as_deref(), args.pretty),
        Some((page, e)) if !pages.is_empty() => {
            warn!(page, error = %e, "page fetch failed; writing the pages scraped so far");
            write_json(&pages, args.output.as_deref(), args.pretty)?;
            Err(e.into())
        }
        Some((_, e)) => Err(e.into()),
    }
}

/// Fetch pages `first..=last` in order. Stops at the first page with no results, or at the first
/// error, which is returned with its page number alongside the pages fetched before it.
fn collect_pages<F>(
    first: u32,
    last: u32,
    progress: Option<&indicatif::ProgressBar>,
    mut fetch: F,
) -> (Vec<FinderPageOutput>, Option<(u32, ScraperError)>)
where
    F: FnMut(u32) -> Result<ListingPage, ScraperError>,
{
    let mut pages = Vec::new();
    for page in first..=last {
        if let Some(bar) = progress {
            bar.set_message(format!("Fetching page {}", page));
        }
        let listing = match fetch(page) {
            Ok(listing) => listing,
            Err(e) => return (pages, Some((page, e))),
        };
        if let Some(bar) = progress {
            bar.inc(1);
        }
        let exhausted = listing.entries.is_empty() && listing.failures.is_empty();
        pages.push(FinderPageOutput { page, listing });
        if exhausted {
            info!(page, "no results on page; stopping");
            break;
        }
    }
    (pages, None)
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let mut client = build_client(args, config.as_ref())?;
    let base_url = config
        .as_ref()
        .and_then(|c| c.base_url.clone())
        .unwrap_or_else(|| NOVELUPDATES_BASE.to_string());
    let mut site = NovelUpdates::with_base_url(&mut client, &base_url)?;

    match &args.command {
        Command::Finder(finder) => run_finder(args, finder, &mut site),
        Command::Novel { id } => {
            let record = site.novel(id)?;
            info!(id = %record.id, title = %record.title, "series page scraped");
            write_json(&record, args.output.as_deref(), args.pretty)
        }
        Command::Filters => {
            let catalog = site.filter_catalog()?;
            info!(
                genres = catalog.genre.len(),
                tags = catalog.tag.len(),
                "filter catalog scraped"
            );
            write_json(&catalog, args.output.as_deref(), args.pretty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListingEntry;

    fn finder_args(argv: &[&str]) -> FinderArgs {
        let mut full = vec!["nuscrape", "finder"];
        full.extend_from_slice(argv);
        match Args::try_parse_from(full).expect("args parse").command {
            Command::Finder(f) => f,
            other => panic!("expected finder, got {:?}", other),
        }
    }

    #[test]
    fn parse_page_range_valid() {
        assert_eq!(parse_page_range("1-5").unwrap(), (1, 5));
        assert_eq!(parse_page_range(" 3 - 3 ").unwrap(), (3, 3));
    }

    #[test]
    fn parse_page_range_rejects_bad_input() {
        assert!(parse_page_range("5").is_err());
        assert!(parse_page_range("a-2").is_err());
        assert!(parse_page_range("0-2").is_err());
        assert!(parse_page_range("4-2").is_err());
    }

    #[test]
    fn parse_range_valid() {
        assert_eq!(
            parse_range("100:min").unwrap(),
            RangeFilter::new("100", Qualifier::Min)
        );
        assert_eq!(
            parse_range("2024-01-01:MAX").unwrap(),
            RangeFilter::new("2024-01-01", Qualifier::Max)
        );
    }

    #[test]
    fn parse_range_rejects_one_sided_input() {
        assert!(parse_range("100").is_err());
        assert!(parse_range(":min").is_err());
        assert!(parse_range("100:most").is_err());
    }

    #[test]
    fn parse_combinator_and_order() {
        assert_eq!(parse_combinator("AND").unwrap(), Combinator::And);
        assert_eq!(parse_combinator("or").unwrap(), Combinator::Or);
        assert!(parse_combinator("xor").is_err());
        assert_eq!(parse_order("asc").unwrap(), SortOrder::Asc);
        assert_eq!(parse_order("DESC").unwrap(), SortOrder::Desc);
        assert!(parse_order("up").is_err());
    }

    #[test]
    fn finder_flags_build_criteria() -> Result<(), CliRunError> {
        let args = finder_args(&[
            "--page",
            "2",
            "--language",
            "495",
            "--chapters",
            "100:min",
            "--genre-include",
            "8,280",
            "--genre-mode",
            "or",
            "--tag-exclude",
            "77",
            "--order",
            "asc",
        ]);
        let criteria = build_criteria(&args)?;
        assert_eq!(criteria.page, 2);
        assert_eq!(criteria.language.as_deref(), Some("495"));
        assert_eq!(
            criteria.chapter_count,
            Some(RangeFilter::new("100", Qualifier::Min))
        );
        assert_eq!(
            criteria.genre_included,
            Some(IncludeFilter::new(["8", "280"], Combinator::Or))
        );
        assert_eq!(criteria.tags_excluded, ["77"]);
        assert_eq!(criteria.order, Some(SortOrder::Asc));
        assert!(criteria.tags_included.is_none());
        Ok(())
    }

    #[test]
    fn flags_override_loaded_criteria_only_where_given() {
        let mut criteria = FilterCriteria::page(4);
        criteria.language = Some("496".to_string());
        criteria.rating = Some(RangeFilter::new("4", Qualifier::Min));
        let args = finder_args(&["--rating", "3:max"]);
        apply_finder_flags(&mut criteria, &args);
        assert_eq!(criteria.page, 4);
        assert_eq!(criteria.language.as_deref(), Some("496"));
        assert_eq!(criteria.rating, Some(RangeFilter::new("3", Qualifier::Max)));
    }

    #[test]
    fn criteria_file_is_loaded() -> Result<(), CliRunError> {
        let path = std::env::temp_dir().join("nuscrape_cli_test_criteria.json");
        std::fs::write(&path, r#"{"page": 5, "status": "2"}"#)
            .map_err(|e| CliRunError::Output(e.to_string()))?;
        let args = FinderArgs {
            criteria: Some(path.clone()),
            ..FinderArgs::default()
        };
        let criteria = build_criteria(&args)?;
        let _ = std::fs::remove_file(&path);
        assert_eq!(criteria.page, 5);
        assert_eq!(criteria.status.as_deref(), Some("2"));
        Ok(())
    }

    #[test]
    fn missing_criteria_file_is_invalid_input() {
        let args = FinderArgs {
            criteria: Some(PathBuf::from("/nonexistent_dir_nuscrape_xyz/criteria.json")),
            ..FinderArgs::default()
        };
        assert!(matches!(
            build_criteria(&args),
            Err(CliRunError::InvalidInput(_))
        ));
    }

    #[test]
    fn page_and_pages_conflict() {
        assert!(Args::try_parse_from(["nuscrape", "finder", "--page", "1", "--pages", "1-3"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from(["nuscrape", "novel", "4561", "--pretty", "-q"]).unwrap();
        assert!(args.pretty);
        assert!(args.quiet);
        match args.command {
            Command::Novel { id } => assert_eq!(id, "4561"),
            other => panic!("expected novel, got {:?}", other),
        }
    }

    #[test]
    fn write_json_to_file() -> Result<(), CliRunError> {
        let path = std::env::temp_dir().join("nuscrape_cli_test_output.json");
        write_json(&ListingPage::default(), Some(&path), false)?;
        let written = std::fs::read_to_string(&path).map_err(|e| CliRunError::Output(e.to_string()))?;
        let _ = std::fs::remove_file(&path);
        assert_eq!(written.trim(), r#"{"entries":[]}"#);
        Ok(())
    }

    fn listing_with(id: &str) -> ListingPage {
        ListingPage {
            entries: vec![ListingEntry {
                id: id.to_string(),
                title: format!("Series {}", id),
                genres: Vec::new(),
                image_url: String::new(),
            }],
            failures: Vec::new(),
        }
    }

    #[test]
    fn page_range_stops_at_first_empty_page() {
        let mut requested = Vec::new();
        let (pages, failed) = collect_pages(1, 5, None, |page| {
            requested.push(page);
            Ok(if page < 3 {
                listing_with(&page.to_string())
            } else {
                ListingPage::default()
            })
        });
        assert!(failed.is_none());
        assert_eq!(requested, [1, 2, 3]);
        let numbers: Vec<_> = pages.iter().map(|p| p.page).collect();
        assert_eq!(numbers, [1, 2, 3]);
    }

    #[test]
    fn page_range_failure_keeps_earlier_pages() {
        let (pages, failed) = collect_pages(4, 8, None, |page| {
            if page == 6 {
                Err(ScraperError::HttpStatus {
                    status: 503,
                    url: format!("https://www.novelupdates.com/series-finder/{}/", page),
                })
            } else {
                Ok(listing_with(&page.to_string()))
            }
        });
        let ids: Vec<_> = pages
            .iter()
            .flat_map(|p| p.listing.entries.iter().map(|e| e.id.as_str()))
            .collect();
        assert_eq!(ids, ["4", "5"]);
        match failed {
            Some((6, ScraperError::HttpStatus { status: 503, .. })) => {}
            other => panic!("expected page 6 HttpStatus(503), got {:?}", other),
        }
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Scraper(ScraperError::InvalidCriteria {
                field: "rating",
                reason: "x".into()
            })
            .exit_code(),
            1
        );
        assert_eq!(
            CliRunError::Scraper(ScraperError::MissingField { field: "title" }).exit_code(),
            2
        );
        assert_eq!(
            CliRunError::Scraper(ScraperError::HttpStatus {
                status: 404,
                url: "x".into()
            })
            .exit_code(),
            2
        );
        assert_eq!(CliRunError::Output("x".into()).exit_code(), 3);
    }
}

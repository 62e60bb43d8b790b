//! Crawl frontier builder
//!
//! Collects same-site links from the home page, drops blocklisted ones,
//! scores the rest by path keywords and keeps the best few. When the home
//! page itself could not be fetched, a fixed list of conventional paths is
//! used instead.

use crate::url::{extract_domain, is_same_site, normalize_url, registrable_domain};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Cap on raw links read from one page
pub const MAX_DISCOVERED_LINKS: usize = 300;

/// Keyword buckets and their weights; a bucket counts once per URL
const KEYWORD_BUCKETS: &[(&str, u32, &[&str])] = &[
    (
        "careers",
        4,
        &[
            "careers", "jobs", "empleo", "trabajo", "talento", "carreras", "trabaja", "join-us",
        ],
    ),
    (
        "product",
        3,
        &["product", "platform", "solution", "producto", "servicios", "soluciones"],
    ),
    (
        "about",
        2,
        &["about", "company", "quienes-somos", "nosotros", "empresa"],
    ),
    ("news", 2, &["news", "press", "noticias", "prensa"]),
    ("blog", 1, &["blog"]),
];

/// Paths with at most this many segments get the shallow bonus
const SHALLOW_DEPTH: usize = 2;

/// Conventional paths tried when the home page is unavailable (EN, then ES)
pub const FALLBACK_PATHS: &[&str] = &[
    "/about",
    "/company",
    "/product",
    "/platform",
    "/solutions",
    "/blog",
    "/news",
    "/press",
    "/careers",
    "/jobs",
    "/contact",
    "/es",
    "/empresa",
    "/quienes-somos",
    "/nosotros",
    "/producto",
    "/productos",
    "/servicios",
    "/soluciones",
    "/noticias",
    "/prensa",
    "/empleo",
    "/empleos",
    "/trabajo",
    "/trabaja-con-nosotros",
    "/carreras",
    "/talento",
    "/equipo",
    "/contacto",
];

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Home,
    Discovered,
    Explicit,
    Fallback,
}

/// A page the pipeline intends to fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlCandidate {
    pub url: String,
    pub priority_score: u32,
    pub source_kind: SourceKind,
}

fn blocklist() -> &'static Regex {
    static BLOCKLIST: OnceLock<Regex> = OnceLock::new();
    BLOCKLIST.get_or_init(|| {
        Regex::new(r"(?i)(privacy|terms|cookie|login|signin|signup|account)")
            .expect("Invalid blocklist regex")
    })
}

/// Returns true if the URL's path or query matches the blocklist
///
/// The host is not checked, so a company named "Account Co" is still
/// scanned.
pub fn is_blocklisted(url: &Url) -> bool {
    let pattern = blocklist();
    pattern.is_match(url.path()) || url.query().map_or(false, |q| pattern.is_match(q))
}

/// Scores a URL path by keyword buckets plus a shallow-depth bonus
///
/// # Examples
///
/// ```
/// use signal_scan::crawler::keyword_score;
///
/// assert_eq!(keyword_score("/careers"), 5);
/// assert_eq!(keyword_score("/about/company/history/2010"), 2);
/// ```
pub fn keyword_score(path: &str) -> u32 {
    let path = path.to_lowercase();

    let mut score: u32 = KEYWORD_BUCKETS
        .iter()
        .filter(|(_, _, words)| words.iter().any(|w| path.contains(w)))
        .map(|(_, weight, _)| weight)
        .sum();

    let depth = path.split('/').filter(|s| !s.is_empty()).count();
    if depth <= SHALLOW_DEPTH {
        score += 1;
    }

    score
}

/// Builds the prioritized frontier from the home page
///
/// # Arguments
///
/// * `origin` - The resolved origin (or the final home URL)
/// * `home_html` - Body of the home page
/// * `max_links` - Cap on distinct links considered
/// * `top_k` - Number of discovered links kept after scoring
///
/// # Returns
///
/// The home URL followed by up to `top_k` discovered candidates, highest
/// score first. Equal scores keep document order, so the result is
/// deterministic for identical input.
pub fn build_frontier(
    origin: &Url,
    home_html: &str,
    max_links: usize,
    top_k: usize,
) -> Vec<CrawlCandidate> {
    let home = home_candidate(origin);
    let site = extract_domain(origin)
        .map(|host| registrable_domain(&host))
        .unwrap_or_default();

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(home.url.clone());

    let mut discovered: Vec<CrawlCandidate> = Vec::new();
    for link in extract_links(home_html, origin) {
        if discovered.len() >= max_links {
            break;
        }

        let Ok(url) = normalize_url(&link) else {
            continue;
        };
        let same_site = extract_domain(&url).map_or(false, |host| is_same_site(&host, &site));
        if !same_site || is_blocklisted(&url) {
            continue;
        }
        if !seen.insert(url.to_string()) {
            continue;
        }

        discovered.push(CrawlCandidate {
            priority_score: keyword_score(url.path()),
            url: url.to_string(),
            source_kind: SourceKind::Discovered,
        });
    }

    discovered.sort_by_key(|c| Reverse(c.priority_score));
    discovered.truncate(top_k);

    tracing::debug!(
        "Frontier for {}: {} candidates kept",
        origin,
        discovered.len()
    );

    let mut frontier = Vec::with_capacity(discovered.len() + 1);
    frontier.push(home);
    frontier.extend(discovered);
    frontier
}

/// Conventional paths under the origin, in fixed order, capped at `limit`
pub fn fallback_frontier(origin: &Url, limit: usize) -> Vec<CrawlCandidate> {
    FALLBACK_PATHS
        .iter()
        .filter_map(|path| origin.join(path).ok())
        .filter_map(|url| normalize_url(url.as_str()).ok())
        .map(|url| CrawlCandidate {
            priority_score: keyword_score(url.path()),
            url: url.to_string(),
            source_kind: SourceKind::Fallback,
        })
        .take(limit)
        .collect()
}

/// Inserts caller-supplied URLs after the home entry and caps the result
///
/// Explicit URLs are normalized, blocklist-filtered and deduplicated the same
/// way as discovered links. Unparseable ones are dropped.
pub fn merge_explicit(
    frontier: Vec<CrawlCandidate>,
    explicit: &[String],
    budget: usize,
) -> Vec<CrawlCandidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(frontier.len() + explicit.len());

    let (home, rest): (Vec<_>, Vec<_>) = frontier
        .into_iter()
        .partition(|c| c.source_kind == SourceKind::Home);

    for candidate in home {
        if seen.insert(candidate.url.clone()) {
            merged.push(candidate);
        }
    }

    for raw in explicit {
        match normalize_url(raw) {
            Ok(url) if !is_blocklisted(&url) => {
                if seen.insert(url.to_string()) {
                    merged.push(CrawlCandidate {
                        priority_score: keyword_score(url.path()),
                        url: url.to_string(),
                        source_kind: SourceKind::Explicit,
                    });
                }
            }
            Ok(url) => tracing::debug!("Explicit URL {} is blocklisted, skipping", url),
            Err(e) => tracing::debug!("Ignoring explicit URL '{}': {}", raw, e),
        }
    }

    for candidate in rest {
        if seen.insert(candidate.url.clone()) {
            merged.push(candidate);
        }
    }

    merged.truncate(budget);
    merged
}

fn home_candidate(origin: &Url) -> CrawlCandidate {
    let url = normalize_url(origin.as_str())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| origin.to_string());

    CrawlCandidate {
        url,
        priority_score: 0,
        source_kind: SourceKind::Home,
    }
}

/// Extracts every followable `<a href>` target as an absolute URL
fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

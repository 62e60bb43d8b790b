//! Reference extractors
//!
//! Small extractors that let the scanner produce useful output without any
//! external collaborators.

use crate::extract::{ExtractorError, PartialSignal, SignalExtractor};
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

/// Upper bound on feed links read from one page
const MAX_FEEDS_PER_PAGE: usize = 20;

/// Singleton `title` signal from the page `<title>`
#[derive(Debug, Default)]
pub struct TitleExtractor;

impl TitleExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SignalExtractor for TitleExtractor {
    fn name(&self) -> &str {
        "title"
    }

    fn extract(&self, _url: &Url, html: &str) -> Result<Option<PartialSignal>, ExtractorError> {
        let title_selector = selector("title")?;
        let document = Html::parse_document(html);

        let title = document
            .select(&title_selector)
            .next()
            .map(|element| {
                element
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|s| !s.is_empty());

        Ok(title.map(|t| PartialSignal::Single(Value::String(t))))
    }
}

/// Repeatable `feeds` signal: RSS/Atom links advertised in `<head>`
#[derive(Debug, Default)]
pub struct FeedExtractor;

impl FeedExtractor {
    pub fn new() -> Self {
        Self
    }
}

const FEED_SELECTOR: &str = "link[rel~='alternate'][type='application/rss+xml'][href], \
                             link[rel~='alternate'][type='application/atom+xml'][href]";

fn selector(css: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(css).map_err(|e| ExtractorError::Failed(format!("invalid selector: {:?}", e)))
}

impl SignalExtractor for FeedExtractor {
    fn name(&self) -> &str {
        "feeds"
    }

    fn extract(&self, url: &Url, html: &str) -> Result<Option<PartialSignal>, ExtractorError> {
        let feed_selector = selector(FEED_SELECTOR)?;
        let document = Html::parse_document(html);

        let mut feeds: Vec<Value> = Vec::new();
        for element in document.select(&feed_selector).take(MAX_FEEDS_PER_PAGE) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Ok(absolute) = url.join(href.trim()) else {
                continue;
            };
            if !matches!(absolute.scheme(), "http" | "https") {
                continue;
            }
            let value = Value::String(absolute.to_string());
            if !feeds.contains(&value) {
                feeds.push(value);
            }
        }

        if feeds.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PartialSignal::Many(feeds)))
        }
    }
}

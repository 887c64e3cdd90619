//! Link extraction for NetTruyen index and chapter pages.
//!
//! Extraction is split from the transport: [`fetch_html`] only retrieves the page,
//! while the parse functions are pure and operate on the raw HTML, so they can be
//! tested without network access.
//!
//! Chapter images carry the real URL in a lazy-load attribute; the eager `src` is a
//! placeholder and is never read.
use log::{debug, warn};
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

pub mod error;

use error::ExtractorError;

/// User-Agent sent when fetching index and chapter pages.
pub const PAGE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/105.0.0.0 Safari/537.36";

const TITLE_SELECTOR: &str = "h1.title-detail";
const CHAPTER_LIST_SELECTOR: &str = "nav ul#desc a";
const IMAGE_SELECTOR: &str = "div.reading div.reading-detail.box_doc img.lozad";
const LAZY_LOAD_ATTR: &str = "data-src";

/// Everything the pipeline needs from a series index page.
#[derive(Debug)]
pub struct IndexPage {
    /// Series title, as displayed on the page.
    pub title: String,
    /// Chapter page URLs, absolute, in document order.
    pub chapter_urls: Vec<Url>,
}

/// Image URLs discovered on a single chapter page.
#[derive(Debug, Default)]
pub struct ChapterPage {
    /// Lazy-load URLs of every image with a non-empty attribute, in document order.
    pub images: Vec<String>,
    /// Matched image elements that had an empty or missing lazy-load attribute.
    pub skipped: usize,
}

impl ChapterPage {
    /// Total image elements matched on the page, including skipped ones.
    pub fn matched(&self) -> usize {
        self.images.len() + self.skipped
    }
}

/// Compiled CSS selectors for the NetTruyen page layout.
pub struct SiteSelectors {
    title: Selector,
    chapters: Selector,
    images: Selector,
}

impl SiteSelectors {
    pub fn new() -> Self {
        // The patterns are compile-time constants and always parse.
        Self {
            title: Selector::parse(TITLE_SELECTOR).unwrap(),
            chapters: Selector::parse(CHAPTER_LIST_SELECTOR).unwrap(),
            images: Selector::parse(IMAGE_SELECTOR).unwrap(),
        }
    }
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches a page, failing on any non-2xx status.
pub async fn fetch_html(client: &Client, url: &Url) -> Result<String, ExtractorError> {
    debug!("Fetching page {}", url);

    let res = client.get(url.clone()).send().await?;

    let status = res.status();
    if !status.is_success() {
        return Err(ExtractorError::InvalidServerResponse { status });
    }

    Ok(res.text().await?)
}

/// Parses a series index page into its title and ordered chapter list.
///
/// Relative chapter hrefs are resolved against `base`. A missing title or an empty
/// chapter list is fatal: it means the page is not a series index at all.
pub fn parse_index(
    html: &str,
    base: &Url,
    selectors: &SiteSelectors,
) -> Result<IndexPage, ExtractorError> {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&selectors.title)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ExtractorError::TitleNotFound)?;

    let mut chapter_urls = Vec::new();

    for element in doc.select(&selectors.chapters) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        match base.join(href) {
            Ok(url) => chapter_urls.push(url),
            Err(error) => warn!("Skipping unparseable chapter link {}: {}", href, error),
        }
    }

    if chapter_urls.is_empty() {
        return Err(ExtractorError::ZeroChapters);
    }

    debug!("Found {} chapters for {}", chapter_urls.len(), title);

    Ok(IndexPage {
        title,
        chapter_urls,
    })
}

/// Parses a chapter reading page into its ordered image URL list.
///
/// Elements with an empty or missing lazy-load attribute are logged and counted,
/// never fatal.
pub fn parse_chapter_images(html: &str, selectors: &SiteSelectors) -> ChapterPage {
    let doc = Html::parse_document(html);

    let mut page = ChapterPage::default();

    for element in doc.select(&selectors.images) {
        match element.value().attr(LAZY_LOAD_ATTR) {
            Some(url) if !url.is_empty() => page.images.push(url.to_string()),
            _ => {
                warn!("Image element has no {} URL", LAZY_LOAD_ATTR);
                page.skipped += 1;
            }
        }
    }

    page
}

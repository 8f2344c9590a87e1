use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;

use crate::error::Result;

// Closing brace must sit on its own (possibly indented) line.
static BIBTEX_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)@\w+\s*\{.*?\n\s*\}").expect("Invalid BibTeX block regex pattern")
});
static BIBTEX_CONTAINERS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("textarea, pre, code, .bibtex, .citation-body")
        .expect("Invalid BibTeX container selector")
});
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("Invalid body selector"));
static EPDF_ANCHOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href*="/doi/epdf/"]"#).expect("Invalid epdf anchor selector")
});
static CITATION_PDF_META: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="citation_pdf_url"]"#).expect("Invalid citation_pdf_url selector")
});
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("Invalid anchor selector"));

/// Elements whose content never renders.
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];
/// Elements that keep their whitespace as written.
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea"];
/// Elements rendered on their own line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody",
    "tfoot", "thead", "tr", "ul",
];

/// What a single scrape of the active page produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeResult {
    pub bib: Option<String>,
    pub pdf: Option<String>,
}

/// One-shot extraction of BibTeX and a PDF link from the page the user is looking at.
///
/// Implementations must not cache: every call re-reads the page.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self) -> Result<ScrapeResult>;
}

#[async_trait]
impl<T: PageScraper + ?Sized> PageScraper for Box<T> {
    async fn scrape(&self) -> Result<ScrapeResult> {
        (**self).scrape().await
    }
}

/// Scrapes a live page by fetching it over HTTP.
pub struct HttpPageScraper {
    url: Url,
    client: Client,
}

impl HttpPageScraper {
    pub fn new(url: Url) -> Self {
        Self::with_client(url, Client::new())
    }

    pub fn with_client(url: Url, client: Client) -> Self {
        Self { url, client }
    }
}

#[async_trait]
impl PageScraper for HttpPageScraper {
    async fn scrape(&self) -> Result<ScrapeResult> {
        info!("Fetching page {}", self.url);
        let response = self.client.get(self.url.clone()).send().await?.error_for_status()?;
        let final_url = response.url().clone();
        let html = response.text().await?;
        Ok(scrape_html(&html, Some(&final_url)))
    }
}

/// Serves a fixed document, e.g. a saved HTML file.
pub struct StaticPageScraper {
    html: String,
    base_url: Option<Url>,
}

impl StaticPageScraper {
    pub fn new(html: impl Into<String>, base_url: Option<Url>) -> Self {
        Self {
            html: html.into(),
            base_url,
        }
    }
}

#[async_trait]
impl PageScraper for StaticPageScraper {
    async fn scrape(&self) -> Result<ScrapeResult> {
        Ok(scrape_html(&self.html, self.base_url.as_ref()))
    }
}

/// Search a document for a BibTeX block and a PDF link.
pub fn scrape_html(html: &str, base_url: Option<&Url>) -> ScrapeResult {
    let document = Html::parse_document(html);
    let result = ScrapeResult {
        bib: find_bibtex(&document),
        pdf: find_pdf_link(&document, base_url),
    };
    debug!(
        "Scrape result: bib={} pdf={:?}",
        result.bib.is_some(),
        result.pdf
    );
    result
}

fn push_line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn push_collapsed(text: &str, out: &mut String) {
    for (i, word) in text.split_whitespace().enumerate() {
        let starts_with_space = i > 0 || text.starts_with(char::is_whitespace);
        if starts_with_space && !out.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        out.push_str(word);
    }
    if text.ends_with(char::is_whitespace) && !out.is_empty() && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn collect_visible_text(element: ElementRef<'_>, preformatted: bool, out: &mut String) {
    let name = element.value().name();
    if HIDDEN_ELEMENTS.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&name);
    let preformatted = preformatted || PREFORMATTED_ELEMENTS.contains(&name);
    if block {
        push_line_break(out);
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) if preformatted => out.push_str(text),
            Node::Text(text) => push_collapsed(text, out),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_visible_text(child, preformatted, out);
                }
            }
            _ => {}
        }
    }
    if block {
        push_line_break(out);
    }
}

/// Rendered text of an element, the way a browser's `innerText` reports it:
/// hidden elements dropped, whitespace collapsed outside `pre`/`textarea`,
/// a line break for `<br>` and around block elements.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_visible_text(element, false, &mut out);
    out
}

fn match_bibtex_block(text: &str) -> Option<String> {
    BIBTEX_BLOCK_REGEX.find(text).map(|m| m.as_str().to_string())
}

fn find_bibtex(document: &Html) -> Option<String> {
    for container in document.select(&BIBTEX_CONTAINERS) {
        let text = visible_text(container);
        if !text.contains('@') {
            continue;
        }
        if let Some(bib) = match_bibtex_block(&text) {
            return Some(bib);
        }
    }

    // Nothing in the usual containers, fall back to the whole page text
    let page_text = document
        .select(&BODY)
        .next()
        .map(visible_text)
        .unwrap_or_else(|| visible_text(document.root_element()));
    match_bibtex_block(&page_text)
}

fn resolve_href(href: &str, base_url: Option<&Url>) -> String {
    match base_url.and_then(|base| base.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}

fn find_pdf_link(document: &Html, base_url: Option<&Url>) -> Option<String> {
    // ACM serves a reader at /doi/epdf/ and the raw file at /doi/pdf/
    if let Some(anchor) = document.select(&EPDF_ANCHOR).next() {
        let href = anchor.value().attr("href").unwrap_or_default();
        return Some(resolve_href(href, base_url).replace("/doi/epdf/", "/doi/pdf/"));
    }

    if let Some(meta) = document.select(&CITATION_PDF_META).next() {
        if let Some(content) = meta.value().attr("content").filter(|c| !c.is_empty()) {
            return Some(content.to_string());
        }
    }

    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| resolve_href(href, base_url))
        .find(|href| href.to_lowercase().ends_with(".pdf"))
}

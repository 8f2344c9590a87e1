use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::classify::classify;

/// Meeting recorded when neither `booktitle` nor `journal` is present.
pub const UNKNOWN_MEETING: &str = "Unknown";
/// Year recorded when the entry carries no `year` field.
pub const UNKNOWN_YEAR: &str = "0";

/// Pull the value of a single `field = {value}` / `field = "value"` pair out of a
/// BibTeX-like blob.
///
/// Matching is case-insensitive and takes the first occurrence in the text. The
/// value stops at the first closing brace or quote; braces left inside it and a
/// trailing comma are stripped.
pub fn extract_field(field: &str, text: &str) -> Option<String> {
    let pattern = format!(r#"(?i)\b{}\s*=\s*[{{"]?([^}}"]+)[}}"]?"#, regex::escape(field));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            debug!("Could not build pattern for field {}: {}", field, e);
            return None;
        }
    };

    let captured = re.captures(text)?.get(1)?.as_str();
    let cleaned: String = captured.trim().chars().filter(|c| *c != '{' && *c != '}').collect();
    let cleaned = cleaned.strip_suffix(',').unwrap_or(&cleaned).trim();
    Some(cleaned.to_string())
}

/// Structured view of a paper, rebuilt from the BibTeX text on every extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperInfo {
    pub title: Option<String>,
    pub meeting: String,
    pub year: String,
    pub url: Option<String>,
    pub conference: String,
    pub pdf_path: Option<String>,
    pub pdf_link: Option<String>,
}

impl Default for PaperInfo {
    fn default() -> Self {
        Self {
            title: None,
            meeting: UNKNOWN_MEETING.to_string(),
            year: UNKNOWN_YEAR.to_string(),
            url: None,
            conference: String::new(),
            pdf_path: None,
            pdf_link: None,
        }
    }
}

impl PaperInfo {
    /// Derive a `PaperInfo` from raw BibTeX text.
    pub fn from_bibtex(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }

        let title = extract_field("title", text);
        let meeting = extract_field("booktitle", text)
            .or_else(|| extract_field("journal", text))
            .unwrap_or_else(|| UNKNOWN_MEETING.to_string());
        let year = extract_field("year", text).unwrap_or_else(|| UNKNOWN_YEAR.to_string());
        let url = extract_field("url", text)
            .or_else(|| extract_field("doi", text).map(|doi| format!("https://doi.org/{}", doi)));
        let conference = classify(&meeting, url.as_deref().unwrap_or("")).to_string();

        Self {
            title,
            meeting,
            year,
            url,
            conference,
            pdf_path: None,
            pdf_link: None,
        }
    }

    /// Attach the PDF link found on the page.
    pub fn with_pdf_link(mut self, pdf_link: Option<String>) -> Self {
        self.pdf_link = pdf_link;
        self
    }
}

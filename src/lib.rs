//! Scrape BibTeX and a PDF link from an academic paper page and record the paper
//! in a Notion database.

pub mod bibtex;
pub mod classify;
pub mod config;
pub mod download;
pub mod error;
pub mod notion;
pub mod preview;
pub mod scrape;
pub mod session;

pub use bibtex::{extract_field, PaperInfo};
pub use classify::{classify, Conference};
pub use config::{ConfigStore, UserConfig};
pub use error::{Bib2NotionError, Result};
pub use notion::NotionClient;
pub use scrape::{scrape_html, PageScraper, ScrapeResult};
pub use session::{ActionOutcome, Session};

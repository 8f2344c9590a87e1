use thiserror::Error;

/// Errors raised while scraping a page, building a record or publishing it to Notion.
#[derive(Debug, Error)]
pub enum Bib2NotionError {
    /// Missing token, database id or title property name, or an unknown config key.
    #[error("configuration error: {0}")]
    Config(String),

    /// No title could be extracted from the BibTeX text.
    #[error("parse error: {0}")]
    Parse(String),

    /// Notion answered with a non-success status.
    #[error("Notion error: {0}")]
    Remote(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The user declined the download. Never fatal for a sync.
    #[error("download canceled")]
    DownloadCanceled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Bib2NotionError>;

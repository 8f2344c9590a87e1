use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::bibtex::{PaperInfo, UNKNOWN_MEETING, UNKNOWN_YEAR};
use crate::config::UserConfig;
use crate::error::{Bib2NotionError, Result};

pub const NOTION_API_VERSION: &str = "2022-06-28";
pub const NOTION_DEFAULT_BASE_URL: &str = "https://api.notion.com";

/// Property names that are not user configurable.
pub const PDF_NAME_PROPERTY: &str = "PDF Name";
pub const DATE_ADDED_PROPERTY: &str = "Date Added";

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_URL: &str = "https://example.com";
const DEFAULT_PDF_NAME: &str = "No local file";

pub type NotionProperties = Map<String, Value>;

fn title_value(content: &str) -> Value {
    json!({ "title": [{ "text": { "content": content } }] })
}

fn rich_text_value(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

fn url_value(url: Option<&str>) -> Value {
    json!({ "url": url })
}

fn date_value(day: NaiveDate) -> Value {
    json!({ "date": { "start": day.format("%Y-%m-%d").to_string() } })
}

fn configured(name: &str) -> Option<&str> {
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

/// Build the `properties` object of a Notion "create page" request.
///
/// Only the title property is mandatory; every other configurable property is
/// emitted when the user gave it a name. `PDF Name` and `Date Added` are always set.
pub fn build_properties(
    info: &PaperInfo,
    config: &UserConfig,
    today: NaiveDate,
) -> Result<NotionProperties> {
    let title_name = configured(&config.field_title).ok_or_else(|| {
        Bib2NotionError::Config("the Notion title property name is not configured".to_string())
    })?;

    let mut properties = Map::new();
    properties.insert(
        title_name.to_string(),
        title_value(info.title.as_deref().unwrap_or(DEFAULT_TITLE)),
    );

    if let Some(name) = configured(&config.field_meeting) {
        let meeting: &str = if info.meeting.is_empty() { UNKNOWN_MEETING } else { &info.meeting };
        properties.insert(name.to_string(), rich_text_value(meeting));
    }
    if let Some(name) = configured(&config.field_year) {
        let year: &str = if info.year.is_empty() { UNKNOWN_YEAR } else { &info.year };
        properties.insert(name.to_string(), rich_text_value(year));
    }
    if let Some(name) = configured(&config.field_url) {
        properties.insert(
            name.to_string(),
            url_value(Some(info.url.as_deref().unwrap_or(DEFAULT_URL))),
        );
    }
    if let Some(name) = configured(&config.field_conference) {
        properties.insert(name.to_string(), rich_text_value(&info.conference));
    }
    if let Some(name) = configured(&config.field_pdf_link) {
        properties.insert(name.to_string(), url_value(info.pdf_link.as_deref()));
    }

    properties.insert(
        PDF_NAME_PROPERTY.to_string(),
        rich_text_value(info.pdf_path.as_deref().unwrap_or(DEFAULT_PDF_NAME)),
    );
    properties.insert(DATE_ADDED_PROPERTY.to_string(), date_value(today));

    Ok(properties)
}

/// Pull the service-reported `message` out of a Notion error body.
fn notion_error_message(body_text: &str) -> Option<String> {
    serde_json::from_str::<Value>(body_text)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
}

/// Creates pages in a Notion database.
pub struct NotionClient {
    client: Client,
    base_url: String,
}

impl Default for NotionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NotionClient {
    /// Client for the public API, or `NOTION_BASE_URL` when set.
    pub fn new() -> Self {
        let base_url = std::env::var("NOTION_BASE_URL")
            .unwrap_or_else(|_| NOTION_DEFAULT_BASE_URL.to_string());
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create one page for `info` in the configured database.
    ///
    /// Fails before any request when the token, database id or title property is
    /// missing.
    pub async fn publish(&self, info: &PaperInfo, config: &UserConfig) -> Result<()> {
        let token = config.notion_token.trim();
        let database_id = config.notion_db_id.trim();
        if token.is_empty() || database_id.is_empty() {
            error!("Token or Database ID is empty");
            return Err(Bib2NotionError::Config(
                "Notion token or database id is empty".to_string(),
            ));
        }

        let properties = build_properties(info, config, Utc::now().date_naive()).map_err(|e| {
            error!("{}", e);
            e
        })?;

        info!("Syncing to Notion...");
        let response = self
            .client
            .post(format!("{}/v1/pages", self.base_url))
            .header("Authorization", format!("Bearer {token}"))
            .header("Notion-Version", NOTION_API_VERSION)
            .header("Content-Type", "application/json")
            .json(&json!({
                "parent": { "database_id": database_id },
                "properties": properties,
            }))
            .send()
            .await
            .map_err(|e| {
                error!("Network error: {}", e);
                Bib2NotionError::Network(e)
            })?;

        let status = response.status();
        let body_text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = notion_error_message(&body_text)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            error!("Notion error: {}", message);
            warn!("Notion response body: {}", body_text);
            return Err(Bib2NotionError::Remote(message));
        }

        info!("Notion sync succeeded");
        Ok(())
    }
}

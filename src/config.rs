use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Bib2NotionError, Result};

/// Storage keys, in the order they are shown to the user.
pub const CONFIG_KEYS: [&str; 9] = [
    "subfolder",
    "notionToken",
    "notionDbId",
    "fieldTitle",
    "fieldMeeting",
    "fieldYear",
    "fieldUrl",
    "fieldConference",
    "fieldPdfLink",
];

/// User settings persisted between runs: download subfolder, Notion credentials and
/// the names of the Notion properties each paper field is written to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserConfig {
    pub subfolder: String,
    pub notion_token: String,
    pub notion_db_id: String,
    pub field_title: String,
    pub field_meeting: String,
    pub field_year: String,
    pub field_url: String,
    pub field_conference: String,
    pub field_pdf_link: String,
}

impl UserConfig {
    fn slot_mut(&mut self, key: &str) -> Option<&mut String> {
        let slot = match key {
            "subfolder" => &mut self.subfolder,
            "notionToken" => &mut self.notion_token,
            "notionDbId" => &mut self.notion_db_id,
            "fieldTitle" => &mut self.field_title,
            "fieldMeeting" => &mut self.field_meeting,
            "fieldYear" => &mut self.field_year,
            "fieldUrl" => &mut self.field_url,
            "fieldConference" => &mut self.field_conference,
            "fieldPdfLink" => &mut self.field_pdf_link,
            _ => return None,
        };
        Some(slot)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "subfolder" => &self.subfolder,
            "notionToken" => &self.notion_token,
            "notionDbId" => &self.notion_db_id,
            "fieldTitle" => &self.field_title,
            "fieldMeeting" => &self.field_meeting,
            "fieldYear" => &self.field_year,
            "fieldUrl" => &self.field_url,
            "fieldConference" => &self.field_conference,
            "fieldPdfLink" => &self.field_pdf_link,
            _ => return None,
        };
        Some(value)
    }

    /// Update a single setting by its storage key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let slot = self
            .slot_mut(key)
            .ok_or_else(|| Bib2NotionError::Config(format!("unknown config key '{}'", key)))?;
        *slot = value.into();
        Ok(())
    }

    /// Copy with every value trimmed, as written to storage.
    pub fn trimmed(&self) -> Self {
        let mut out = self.clone();
        for key in CONFIG_KEYS {
            if let Some(slot) = out.slot_mut(key) {
                *slot = slot.trim().to_string();
            }
        }
        out
    }
}

/// Persistent key-value storage for [`UserConfig`], backed by a JSON file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `BIB2NOTION_CONFIG` if set, else `<config dir>/bib2notion/config.json`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("BIB2NOTION_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bib2notion")
            .join("config.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored settings. Missing file or keys leave empty strings.
    pub fn restore(&self) -> Result<UserConfig> {
        if !self.path.exists() {
            debug!("No config at {:?}, using defaults", self.path);
            return Ok(UserConfig::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        let config: UserConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Write every setting at once, trimmed.
    pub fn save(&self, config: &UserConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&config.trimmed())?;
        fs::write(&self.path, json)?;
        debug!("Configuration saved to {:?}", self.path);
        Ok(())
    }

    /// Handle one edited input: update `key` and re-save the full mapping.
    pub fn set(&self, key: &str, value: &str) -> Result<UserConfig> {
        let mut config = self.restore()?;
        config.set(key, value)?;
        self.save(&config)?;
        info!("Saved {}", key);
        Ok(config.trimmed())
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::{Bib2NotionError, Result};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\\/:*?"<>|]"#).expect("Invalid filename character regex pattern")
});

/// Relative path a paper's PDF is saved under: `<subfolder>/<title>.pdf`.
pub fn pdf_filename(title: &str, subfolder: &str) -> String {
    let safe_title = UNSAFE_FILENAME_CHARS.replace_all(title, "_");
    let safe_title = safe_title.trim();
    let filename = if subfolder.is_empty() {
        format!("{}.pdf", safe_title)
    } else {
        format!("{}/{}.pdf", subfolder, safe_title)
    };
    filename.trim_start_matches(['\\', '/']).to_string()
}

/// A download the user has to confirm, like a browser "Save As" dialog.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Save `url` under `filename`. Declining yields [`Bib2NotionError::DownloadCanceled`].
    async fn download(&self, url: &str, filename: &str) -> Result<PathBuf>;
}

/// Downloads over HTTP into a root directory, asking on the terminal first unless
/// `assume_yes` is set.
pub struct HttpDownloader {
    client: Client,
    root: PathBuf,
    assume_yes: bool,
}

impl HttpDownloader {
    pub fn new(root: impl Into<PathBuf>, assume_yes: bool) -> Self {
        Self {
            client: Client::new(),
            root: root.into(),
            assume_yes,
        }
    }

    /// `dirs::download_dir()`, falling back to the working directory.
    pub fn default_root() -> PathBuf {
        dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    async fn confirm(&self, target: &Path) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        let mut stderr = tokio::io::stderr();
        stderr
            .write_all(format!("Save PDF to {}? [Y/n] ", target.display()).as_bytes())
            .await?;
        stderr.flush().await?;

        let mut answer = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut answer).await?;
        if read == 0 {
            return Ok(false);
        }
        let answer = answer.trim().to_lowercase();
        Ok(answer.is_empty() || answer == "y" || answer == "yes")
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, filename: &str) -> Result<PathBuf> {
        let target = self.root.join(filename);
        if !self.confirm(&target).await? {
            return Err(Bib2NotionError::DownloadCanceled);
        }

        info!("Downloading {} to {:?}", url, target);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;
        Ok(target)
    }
}

use log::{debug, error, info, warn};

use crate::bibtex::PaperInfo;
use crate::config::{ConfigStore, UserConfig};
use crate::download::{pdf_filename, Downloader};
use crate::error::{Bib2NotionError, Result};
use crate::notion::NotionClient;
use crate::preview::{render, Preview};
use crate::scrape::{PageScraper, ScrapeResult};

pub const STATUS_DETECTED: &str = "Detected automatically";
pub const STATUS_NOT_DETECTED: &str = "No BibTeX detected, please paste manually";

/// Recorded as the PDF name when the user declined or the download failed.
pub const PDF_PATH_CANCELED: &str = "Download canceled";
/// Recorded as the PDF name when the page had no PDF link.
pub const PDF_PATH_NOT_FOUND: &str = "PDF link not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scraping,
    Previewing,
    Publishing,
}

/// Everything the popup shows right after it opens.
#[derive(Debug, Clone)]
pub struct OpenState {
    /// BibTeX found on the page; becomes the initial content of the text box.
    pub bib_text: Option<String>,
    pub info: PaperInfo,
    pub preview: Preview,
    pub status: &'static str,
}

/// How a sync action ended. Failures have already been logged.
#[derive(Debug)]
pub enum ActionOutcome {
    Published(PaperInfo),
    PublishFailed { info: PaperInfo, error: Bib2NotionError },
    Aborted(Bib2NotionError),
}

/// Wires scraping, preview, download and publishing together for one page.
pub struct Session<S, D> {
    scraper: S,
    downloader: D,
    notion: NotionClient,
    store: ConfigStore,
    config: UserConfig,
    preview: Preview,
    phase: Phase,
}

impl<S: PageScraper, D: Downloader> Session<S, D> {
    pub fn new(scraper: S, downloader: D, notion: NotionClient, store: ConfigStore) -> Self {
        Self {
            scraper,
            downloader,
            notion,
            store,
            config: UserConfig::default(),
            preview: Preview::from_info(&PaperInfo::default()),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    /// The preview as last shown, including the PDF link from the latest scrape.
    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    fn enter(&mut self, phase: Phase) {
        debug!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    async fn scrape(&mut self) -> ScrapeResult {
        self.enter(Phase::Scraping);
        match self.scraper.scrape().await {
            Ok(result) => result,
            Err(e) => {
                warn!("Could not read the page: {}", e);
                ScrapeResult::default()
            }
        }
    }

    /// Restore settings, scrape the page and build the first preview.
    pub async fn open(&mut self) -> OpenState {
        self.config = match self.store.restore() {
            Ok(config) => config,
            Err(e) => {
                warn!("Could not restore configuration from {:?}: {}", self.store.path(), e);
                UserConfig::default()
            }
        };

        let scraped = self.scrape().await;
        self.enter(Phase::Previewing);

        let (info, preview) = render(scraped.bib.as_deref().unwrap_or(""), scraped.pdf.as_deref());
        let status = if scraped.bib.is_some() {
            STATUS_DETECTED
        } else {
            STATUS_NOT_DETECTED
        };
        info!("{}", status);
        self.preview = preview.clone();

        OpenState {
            bib_text: scraped.bib,
            info,
            preview,
            status,
        }
    }

    /// An edited settings field: apply it and re-save everything.
    pub fn update_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.config.set(key, value)?;
        self.store.save(&self.config)
    }

    /// The primary action: parse `bib_text`, download the PDF if the page has one,
    /// then publish to Notion whatever happened to the download.
    pub async fn submit(&mut self, bib_text: &str) -> ActionOutcome {
        let mut info = PaperInfo::from_bibtex(bib_text);
        let title = match info.title.clone() {
            Some(title) => title,
            None => {
                let err = Bib2NotionError::Parse("unable to parse title".to_string());
                error!("{}", err);
                self.enter(Phase::Idle);
                return ActionOutcome::Aborted(err);
            }
        };

        if let Err(e) = self.store.save(&self.config) {
            warn!("Could not save configuration: {}", e);
        }

        let scraped = self.scrape().await;
        self.enter(Phase::Previewing);
        info.pdf_link = scraped.pdf;
        match &info.pdf_link {
            Some(pdf) => info!("PDF link: {}", pdf),
            None => debug!("No PDF link on page"),
        }
        self.preview = Preview::from_info(&info);

        let pdf_path = match info.pdf_link.clone() {
            Some(pdf) => {
                let filename = pdf_filename(&title, &self.config.subfolder);
                info!("Starting download...");
                match self.downloader.download(&pdf, &filename).await {
                    Ok(saved) => {
                        info!("Saved PDF to {:?}", saved);
                        filename
                    }
                    Err(Bib2NotionError::DownloadCanceled) => {
                        warn!("Download canceled; path will not be recorded in Notion");
                        PDF_PATH_CANCELED.to_string()
                    }
                    Err(e) => {
                        warn!("Download failed ({}); path will not be recorded in Notion", e);
                        PDF_PATH_CANCELED.to_string()
                    }
                }
            }
            None => {
                info!("No PDF found, syncing info only...");
                PDF_PATH_NOT_FOUND.to_string()
            }
        };
        info.pdf_path = Some(pdf_path);

        self.enter(Phase::Publishing);
        let outcome = match self.notion.publish(&info, &self.config).await {
            Ok(()) => ActionOutcome::Published(info),
            Err(error) => ActionOutcome::PublishFailed { info, error },
        };
        self.enter(Phase::Idle);
        outcome
    }
}

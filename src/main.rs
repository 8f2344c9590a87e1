use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bib2notion::config::CONFIG_KEYS;
use bib2notion::download::HttpDownloader;
use bib2notion::scrape::{HttpPageScraper, StaticPageScraper};
use bib2notion::session::{ActionOutcome, Session};
use bib2notion::{ConfigStore, NotionClient, PageScraper};
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::info;
use reqwest::Url;

/// Grab BibTeX and a PDF from a paper page and add the paper to a Notion database
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to BIB2NOTION_CONFIG or the user config directory)
    #[arg(long = "config", global = true)]
    config_path: Option<PathBuf>,
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a page and preview the detected paper
    Open(PageArgs),
    /// Scrape a page, download its PDF and publish the paper to Notion
    Sync {
        #[command(flatten)]
        page: PageArgs,
        /// Use this BibTeX instead of the one found on the page
        #[arg(long)]
        bib: Option<PathBuf>,
        /// Download without asking for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Root directory for downloaded PDFs
        #[arg(long)]
        download_dir: Option<PathBuf>,
    },
    /// Show or edit saved settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(ClapArgs)]
struct PageArgs {
    /// Paper page to fetch
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    url: Option<Url>,
    /// Saved HTML page to read instead of fetching
    #[arg(long)]
    file: Option<PathBuf>,
    /// URL used to resolve relative links in --file
    #[arg(long, requires = "file")]
    base_url: Option<Url>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print every setting
    Show,
    /// Change one setting
    Set { key: String, value: String },
}

fn page_scraper(page: &PageArgs) -> Result<Box<dyn PageScraper>> {
    if let Some(file) = &page.file {
        let html = fs::read_to_string(file)
            .with_context(|| format!("Failed to read HTML from {:?}", file))?;
        return Ok(Box::new(StaticPageScraper::new(html, page.base_url.clone())));
    }
    match &page.url {
        Some(url) => Ok(Box::new(HttpPageScraper::new(url.clone()))),
        None => anyhow::bail!("Either --url or --file is required"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configure logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let store = ConfigStore::new(args.config_path.unwrap_or_else(ConfigStore::default_path));

    match args.command {
        Command::Config(ConfigCommand::Show) => {
            let config = store
                .restore()
                .with_context(|| format!("Failed to read config from {:?}", store.path()))?;
            for key in CONFIG_KEYS {
                println!("{} = {}", key, config.get(key).unwrap_or_default());
            }
        }
        Command::Config(ConfigCommand::Set { key, value }) => {
            store.set(&key, &value)?;
            info!("Configuration written to {:?}", store.path());
        }
        Command::Open(page) => {
            let downloader = HttpDownloader::new(HttpDownloader::default_root(), false);
            let mut session = Session::new(page_scraper(&page)?, downloader, NotionClient::new(), store);
            let state = session.open().await;
            println!("{}", state.status);
            print!("{}", state.preview);
            if let Some(bib) = state.bib_text {
                println!("\n{}", bib);
            }
        }
        Command::Sync {
            page,
            bib,
            yes,
            download_dir,
        } => {
            let downloader = HttpDownloader::new(
                download_dir.unwrap_or_else(HttpDownloader::default_root),
                yes,
            );
            let mut session = Session::new(page_scraper(&page)?, downloader, NotionClient::new(), store);
            let state = session.open().await;
            println!("{}", state.status);
            print!("{}", state.preview);

            let bib_text = match bib {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read BibTeX from {:?}", path))?,
                None => state.bib_text.unwrap_or_default(),
            };

            match session.submit(&bib_text).await {
                ActionOutcome::Published(paper) => {
                    println!("Added \"{}\" to Notion", paper.title.unwrap_or_default());
                }
                ActionOutcome::PublishFailed { error, .. } => {
                    anyhow::bail!("Notion sync failed: {}", error);
                }
                ActionOutcome::Aborted(error) => {
                    anyhow::bail!("Nothing to sync: {}", error);
                }
            }
        }
    }

    Ok(())
}

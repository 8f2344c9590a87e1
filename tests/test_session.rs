use async_trait::async_trait;
use bib2notion::config::{ConfigStore, UserConfig};
use bib2notion::download::Downloader;
use bib2notion::scrape::StaticPageScraper;
use bib2notion::session::{
    ActionOutcome, Phase, Session, PDF_PATH_CANCELED, PDF_PATH_NOT_FOUND, STATUS_DETECTED,
    STATUS_NOT_DETECTED,
};
use bib2notion::{Bib2NotionError, NotionClient, Result};
use mockito::{Matcher, Server};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

const PAGE_WITH_PDF: &str = r#"<html><head>
<meta name="citation_pdf_url" content="https://example.org/foo.pdf">
</head><body>
<textarea>@inproceedings{x,
  title = {Foo Bar},
  booktitle = {Symposium on Operating Systems Principles},
  year = {2021},
  doi = {10.1/abc}
}</textarea>
</body></html>"#;

const PAGE_WITHOUT_PDF: &str = r#"<html><body>
<pre>@article{y,
  title = {No Pdf Here},
  journal = {Journal of Things},
  year = {2019}
}</pre>
</body></html>"#;

#[derive(Clone, Copy)]
enum Behaviour {
    Save,
    Cancel,
    Fail,
}

#[derive(Clone)]
struct FakeDownloader {
    behaviour: Behaviour,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeDownloader {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, filename: &str) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), filename.to_string()));
        match self.behaviour {
            Behaviour::Save => Ok(Path::new("/downloads").join(filename)),
            Behaviour::Cancel => Err(Bib2NotionError::DownloadCanceled),
            Behaviour::Fail => Err(Bib2NotionError::Io(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            ))),
        }
    }
}

fn saved_store(config: &UserConfig) -> (TempDir, ConfigStore) {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("config.json"));
    store.save(config).unwrap();
    (dir, store)
}

fn notion_config() -> UserConfig {
    UserConfig {
        subfolder: "papers".to_string(),
        notion_token: "secret".to_string(),
        notion_db_id: "db123".to_string(),
        field_title: "Paper".to_string(),
        field_conference: "Conference".to_string(),
        ..Default::default()
    }
}

fn pdf_name_matcher(pdf_name: &str) -> Matcher {
    Matcher::PartialJson(json!({
        "properties": {
            "PDF Name": { "rich_text": [{ "text": { "content": pdf_name } }] }
        }
    }))
}

#[tokio::test]
async fn test_open_detects_bibtex() {
    let (_dir, store) = saved_store(&notion_config());
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITH_PDF, None),
        FakeDownloader::new(Behaviour::Save),
        NotionClient::with_base_url("http://127.0.0.1:1"),
        store,
    );

    let state = session.open().await;
    assert_eq!(state.status, STATUS_DETECTED);
    assert!(state.bib_text.unwrap().contains("Foo Bar"));
    assert_eq!(state.info.conference, "SOSP");
    assert_eq!(state.preview.title, "Foo Bar");
    assert_eq!(state.preview.link.as_deref(), Some("https://doi.org/10.1/abc"));
    assert_eq!(state.preview.pdf_link.as_deref(), Some("https://example.org/foo.pdf"));
    assert_eq!(session.config(), &notion_config());
    assert_eq!(session.phase(), Phase::Previewing);
}

#[tokio::test]
async fn test_open_without_bibtex() {
    let (_dir, store) = saved_store(&notion_config());
    let mut session = Session::new(
        StaticPageScraper::new("<html><body><p>nothing</p></body></html>", None),
        FakeDownloader::new(Behaviour::Save),
        NotionClient::with_base_url("http://127.0.0.1:1"),
        store,
    );

    let state = session.open().await;
    assert_eq!(state.status, STATUS_NOT_DETECTED);
    assert_eq!(state.bib_text, None);
    assert_eq!(state.preview.title, "Title not detected");
    assert_eq!(state.preview.link, None);
    assert_eq!(state.preview.pdf_link, None);
}

#[tokio::test]
async fn test_canceled_download_still_publishes_once() {
    let mut server = Server::new_async().await;
    let pages = server
        .mock("POST", "/v1/pages")
        .match_body(pdf_name_matcher(PDF_PATH_CANCELED))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let (_dir, store) = saved_store(&notion_config());
    let downloader = FakeDownloader::new(Behaviour::Cancel);
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITH_PDF, None),
        downloader.clone(),
        NotionClient::with_base_url(server.url()),
        store,
    );

    let state = session.open().await;
    let outcome = session.submit(&state.bib_text.unwrap()).await;

    match outcome {
        ActionOutcome::Published(info) => {
            assert_eq!(info.pdf_path.as_deref(), Some(PDF_PATH_CANCELED));
        }
        other => panic!("expected publish, got {:?}", other),
    }
    assert_eq!(
        downloader.calls(),
        vec![(
            "https://example.org/foo.pdf".to_string(),
            "papers/Foo Bar.pdf".to_string()
        )]
    );
    assert_eq!(session.phase(), Phase::Idle);
    pages.assert_async().await;
}

#[tokio::test]
async fn test_failed_download_is_recorded_as_canceled() {
    let mut server = Server::new_async().await;
    let pages = server
        .mock("POST", "/v1/pages")
        .match_body(pdf_name_matcher(PDF_PATH_CANCELED))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let (_dir, store) = saved_store(&notion_config());
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITH_PDF, None),
        FakeDownloader::new(Behaviour::Fail),
        NotionClient::with_base_url(server.url()),
        store,
    );

    let state = session.open().await;
    let outcome = session.submit(&state.bib_text.unwrap()).await;
    assert!(matches!(outcome, ActionOutcome::Published(_)));
    pages.assert_async().await;
}

#[tokio::test]
async fn test_saved_download_records_filename() {
    let mut server = Server::new_async().await;
    let pages = server
        .mock("POST", "/v1/pages")
        .match_body(Matcher::PartialJson(json!({
            "parent": { "database_id": "db123" },
            "properties": {
                "Paper": { "title": [{ "text": { "content": "Foo Bar" } }] },
                "Conference": { "rich_text": [{ "text": { "content": "SOSP" } }] },
                "PDF Name": { "rich_text": [{ "text": { "content": "papers/Foo Bar.pdf" } }] }
            }
        })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let (_dir, store) = saved_store(&notion_config());
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITH_PDF, None),
        FakeDownloader::new(Behaviour::Save),
        NotionClient::with_base_url(server.url()),
        store,
    );

    let state = session.open().await;
    match session.submit(&state.bib_text.unwrap()).await {
        ActionOutcome::Published(info) => {
            assert_eq!(info.pdf_path.as_deref(), Some("papers/Foo Bar.pdf"));
            assert_eq!(info.pdf_link.as_deref(), Some("https://example.org/foo.pdf"));
        }
        other => panic!("expected publish, got {:?}", other),
    }
    pages.assert_async().await;
}

#[tokio::test]
async fn test_no_pdf_publishes_immediately() {
    let mut server = Server::new_async().await;
    let pages = server
        .mock("POST", "/v1/pages")
        .match_body(pdf_name_matcher(PDF_PATH_NOT_FOUND))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let (_dir, store) = saved_store(&notion_config());
    let downloader = FakeDownloader::new(Behaviour::Save);
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITHOUT_PDF, None),
        downloader.clone(),
        NotionClient::with_base_url(server.url()),
        store,
    );

    let state = session.open().await;
    let outcome = session.submit(&state.bib_text.unwrap()).await;
    assert!(matches!(outcome, ActionOutcome::Published(_)));
    assert!(downloader.calls().is_empty());
    assert_eq!(session.preview().pdf_link, None);
    pages.assert_async().await;
}

#[tokio::test]
async fn test_hand_edited_text_wins() {
    let mut server = Server::new_async().await;
    let pages = server
        .mock("POST", "/v1/pages")
        .match_body(Matcher::PartialJson(json!({
            "properties": {
                "Paper": { "title": [{ "text": { "content": "Edited Title" } }] }
            }
        })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let (_dir, store) = saved_store(&notion_config());
    let downloader = FakeDownloader::new(Behaviour::Save);
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITH_PDF, None),
        downloader.clone(),
        NotionClient::with_base_url(server.url()),
        store,
    );

    session.open().await;
    let outcome = session
        .submit("@misc{z,\n  title = {Edited Title},\n}")
        .await;
    assert!(matches!(outcome, ActionOutcome::Published(_)));
    assert_eq!(downloader.calls()[0].1, "papers/Edited Title.pdf");
    assert_eq!(session.preview().title, "Edited Title");
    assert_eq!(session.preview().pdf_link.as_deref(), Some("https://example.org/foo.pdf"));
    pages.assert_async().await;
}

#[tokio::test]
async fn test_missing_title_aborts_without_requests() {
    let mut server = Server::new_async().await;
    let pages = server
        .mock("POST", "/v1/pages")
        .expect(0)
        .create_async()
        .await;

    let (_dir, store) = saved_store(&notion_config());
    let downloader = FakeDownloader::new(Behaviour::Save);
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITH_PDF, None),
        downloader.clone(),
        NotionClient::with_base_url(server.url()),
        store,
    );

    session.open().await;
    let outcome = session.submit("not bibtex at all").await;
    assert!(matches!(outcome, ActionOutcome::Aborted(Bib2NotionError::Parse(_))));
    assert!(downloader.calls().is_empty());
    assert_eq!(session.phase(), Phase::Idle);
    pages.assert_async().await;
}

#[tokio::test]
async fn test_missing_token_fails_publish_without_requests() {
    let mut server = Server::new_async().await;
    let pages = server
        .mock("POST", "/v1/pages")
        .expect(0)
        .create_async()
        .await;

    let config = UserConfig {
        notion_token: String::new(),
        ..notion_config()
    };
    let (_dir, store) = saved_store(&config);
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITHOUT_PDF, None),
        FakeDownloader::new(Behaviour::Save),
        NotionClient::with_base_url(server.url()),
        store,
    );

    let state = session.open().await;
    let outcome = session.submit(&state.bib_text.unwrap()).await;
    assert!(matches!(
        outcome,
        ActionOutcome::PublishFailed {
            error: Bib2NotionError::Config(_),
            ..
        }
    ));
    pages.assert_async().await;
}

#[tokio::test]
async fn test_update_config_autosaves() {
    let (_dir, store) = saved_store(&UserConfig::default());
    let reader = store.clone();
    let mut session = Session::new(
        StaticPageScraper::new(PAGE_WITHOUT_PDF, None),
        FakeDownloader::new(Behaviour::Save),
        NotionClient::with_base_url("http://127.0.0.1:1"),
        store,
    );

    session.open().await;
    session.update_config("notionToken", " typed ").unwrap();
    assert_eq!(reader.restore().unwrap().notion_token, "typed");
    session.update_config("fieldTitle", "Paper").unwrap();
    let saved = reader.restore().unwrap();
    assert_eq!(saved.notion_token, "typed");
    assert_eq!(saved.field_title, "Paper");
}

use springer_downloader::parser::parse_catalog;
use springer_downloader::{
    filter, plan, AppConfig, CatalogIdentity, CatalogStore, Downloader, DownloaderError,
    FileFormat, HttpFetcher, Layout,
};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog_body(base: &str) -> String {
    format!(
        "Book Title,Author,English Package Name,DOI URL\n\
         A Beginners Guide to Python,Someone,Computer Science,{base}/books/py.pdf\n\
         Biology Basics,Other,Life Sciences,{base}/books/bio.pdf\n\
         Chemistry Now,Third,Chemistry,{base}/books/chem.pdf\n"
    )
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_body(&server.uri())))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_refresh_and_load_over_http() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let app_dir = TempDir::new().unwrap();
    let store = CatalogStore::new(AppConfig::new(app_dir.path()), Arc::new(HttpFetcher::new().unwrap()));
    let identity = CatalogIdentity::FALLBACK;

    let url = format!("{}/catalog", server.uri());
    let refreshed = store.refresh(identity, Some(&url)).await.unwrap();
    let loaded = store.load(identity).await.unwrap();

    let expected = parse_catalog(catalog_body(&server.uri()).as_bytes(), identity).unwrap();
    assert_eq!(refreshed.records, expected);
    assert_eq!(loaded.records, expected);
}

#[tokio::test]
async fn test_refresh_reads_published_workbook() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog.xlsx"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(include_bytes!("fixtures/catalog.xlsx").to_vec()),
        )
        .mount(&server)
        .await;
    let app_dir = TempDir::new().unwrap();
    let store = CatalogStore::new(AppConfig::new(app_dir.path()), Arc::new(HttpFetcher::new().unwrap()));
    let identity = CatalogIdentity::FALLBACK;

    let url = format!("{}/catalog.xlsx", server.uri());
    let refreshed = store.refresh(identity, Some(&url)).await.unwrap();
    let loaded = store.load(identity).await.unwrap();

    assert_eq!(refreshed.records.len(), 2);
    assert_eq!(refreshed.records[1].package, "Life Sciences");
    assert_eq!(loaded.records, refreshed.records);
}

#[tokio::test]
async fn test_failed_refresh_surfaces_status_and_keeps_cache() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let app_dir = TempDir::new().unwrap();
    let store = CatalogStore::new(AppConfig::new(app_dir.path()), Arc::new(HttpFetcher::new().unwrap()));
    let identity = CatalogIdentity::FALLBACK;

    store
        .refresh(identity, Some(&format!("{}/catalog", server.uri())))
        .await
        .unwrap();
    let err = store
        .refresh(identity, Some(&format!("{}/broken", server.uri())))
        .await
        .unwrap_err();

    match err {
        DownloaderError::Fetch(fetch) => assert_eq!(fetch.status, Some(500)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.load(identity).await.unwrap().records.len(), 3);
}

#[tokio::test]
async fn test_resumable_download_with_partial_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books/py.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-python".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/books/bio.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/books/chem.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-chem".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dest = TempDir::new().unwrap();
    let records = parse_catalog(catalog_body(&server.uri()).as_bytes(), CatalogIdentity::FALLBACK).unwrap();
    let planned = plan(&records, FileFormat::Pdf, dest.path(), Layout::ByPackage);
    let downloader = Downloader::new(Arc::new(HttpFetcher::new().unwrap()), dest.path());

    let first = downloader.execute(&planned, false).await;
    assert_eq!(first.succeeded, 2);
    assert_eq!(first.skipped, 0);
    assert_eq!(first.failed.len(), 1);
    assert_eq!(first.failed[0].output_path, planned[1].output_path);
    assert_eq!(
        std::fs::read(dest.path().join("Chemistry").join("Chemistry_Now.pdf")).unwrap(),
        b"%PDF-chem"
    );

    let second = downloader.execute(&planned, false).await;
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.failed.len(), 1);

    let report = std::fs::read_to_string(dest.path().join("DOWNLOAD_ERRORS.txt")).unwrap();
    let lines: Vec<_> = report.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" | HTTP 404 Not Found | "));
    assert!(lines[0].ends_with("/books/bio.pdf"));
}

#[tokio::test]
async fn test_filtered_selection_downloads_only_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books/py.epub"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"epub".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dest = TempDir::new().unwrap();
    let records = parse_catalog(catalog_body(&server.uri()).as_bytes(), CatalogIdentity::FALLBACK).unwrap();
    let selected = filter(&records, Some("python"), None);
    let planned = plan(&selected, FileFormat::Epub, dest.path(), Layout::ByCatalog { with_package: false });
    let downloader = Downloader::new(Arc::new(HttpFetcher::new().unwrap()), dest.path());

    let result = downloader.execute(&planned, false).await;

    assert_eq!(result.succeeded, 1);
    assert!(dest
        .path()
        .join("English/All_Disciplines/A_Beginners_Guide_to_Python.epub")
        .is_file());
    assert!(!dest.path().join("DOWNLOAD_ERRORS.txt").exists());
}

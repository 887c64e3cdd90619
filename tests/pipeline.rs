//! End-to-end pipeline tests against a local mock of the site.
use std::path::Path;
use std::time::Duration;

use nettruyen_downloader::{DownloadSummary, Pipeline};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERIES_PATH: &str = "/truyen-tranh/test-series";

fn index_html(chapters: &[&str]) -> String {
    let links: String = chapters
        .iter()
        .map(|c| format!("<li><a href=\"{c}\">{c}</a></li>"))
        .collect();

    format!(
        "<html><body><h1 class=\"title-detail\">Test: Series</h1>\
         <nav><ul id=\"desc\">{links}</ul></nav></body></html>"
    )
}

fn chapter_html(image_urls: &[&str]) -> String {
    let imgs: String = image_urls
        .iter()
        .map(|u| format!("<img class=\"lozad\" src=\"placeholder.gif\" data-src=\"{u}\"/>"))
        .collect();

    format!(
        "<html><body><div class=\"reading\">\
         <div class=\"reading-detail box_doc\">{imgs}</div>\
         </div></body></html>"
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn run_pipeline(
    server: &MockServer,
    output: &Path,
    sim_downloads: u8,
    queue_size: usize,
) -> anyhow::Result<DownloadSummary> {
    let url = Url::parse(&format!("{}{}", server.uri(), SERIES_PATH)).unwrap();

    Pipeline::new(
        url,
        Some(output.to_path_buf()),
        sim_downloads,
        Duration::from_secs(5),
        queue_size,
    )
    .run()
    .await
}

#[tokio::test]
async fn downloads_every_image_into_per_chapter_dirs() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let img1 = format!("{}/imgs/001.jpg?v=1", server.uri());
    let img2 = format!("{}/imgs/002.jpg", server.uri());
    let series_url = format!("{}{}", server.uri(), SERIES_PATH);

    mount_page(&server, SERIES_PATH, index_html(&["/c1", "/c2"])).await;
    mount_page(&server, "/c1", chapter_html(&[&img1, &img2])).await;
    // One matched image element whose lazy-load attribute is empty.
    mount_page(&server, "/c2", chapter_html(&[""])).await;

    Mock::given(method("GET"))
        .and(path("/imgs/001.jpg"))
        .and(header("Referer", series_url.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first image".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/imgs/002.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second image".to_vec()))
        .mount(&server)
        .await;

    let summary = run_pipeline(&server, tmp.path(), 2, 100).await.unwrap();

    assert_eq!(summary.downloaded, 2);

    let root = tmp.path().join("Test- Series");
    assert_eq!(summary.output_dir, root);

    assert_eq!(
        std::fs::read(root.join("c1/001.jpg")).unwrap(),
        b"first image"
    );
    assert_eq!(
        std::fs::read(root.join("c1/002.jpg")).unwrap(),
        b"second image"
    );

    // The chapter dir exists because an image element was matched, but the empty
    // attribute contributed zero files.
    let c2 = root.join("c2");
    assert!(c2.is_dir());
    assert_eq!(std::fs::read_dir(&c2).unwrap().count(), 0);
}

#[tokio::test]
async fn http_error_on_image_leaves_no_partial_file() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let good = format!("{}/imgs/ok.jpg", server.uri());
    let missing = format!("{}/imgs/missing.jpg", server.uri());

    mount_page(&server, SERIES_PATH, index_html(&["/c1"])).await;
    mount_page(&server, "/c1", chapter_html(&[&good, &missing])).await;

    Mock::given(method("GET"))
        .and(path("/imgs/ok.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/imgs/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let summary = run_pipeline(&server, tmp.path(), 2, 100).await.unwrap();

    assert_eq!(summary.downloaded, 1);

    let chapter = tmp.path().join("Test- Series/c1");
    assert!(chapter.join("ok.jpg").exists());
    assert!(!chapter.join("missing.jpg").exists());
}

#[tokio::test]
async fn index_fetch_failure_aborts_before_any_directory() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(SERIES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = run_pipeline(&server, tmp.path(), 2, 100).await;

    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn index_without_title_aborts() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    mount_page(
        &server,
        SERIES_PATH,
        "<html><body><nav><ul id=\"desc\"><li><a href=\"/c1\">c1</a></li></ul></nav></body></html>"
            .to_string(),
    )
    .await;

    let result = run_pipeline(&server, tmp.path(), 2, 100).await;

    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn failed_chapter_is_skipped_without_stopping_the_run() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let img = format!("{}/imgs/only.jpg", server.uri());

    mount_page(&server, SERIES_PATH, index_html(&["/c1", "/c2"])).await;
    // /c1 is left unmounted: the chapter fetch gets a 404 and is skipped.
    mount_page(&server, "/c2", chapter_html(&[&img])).await;

    Mock::given(method("GET"))
        .and(path("/imgs/only.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .mount(&server)
        .await;

    let summary = run_pipeline(&server, tmp.path(), 2, 100).await.unwrap();

    assert_eq!(summary.downloaded, 1);

    let root = tmp.path().join("Test- Series");
    assert!(!root.join("c1").exists());
    assert!(root.join("c2/only.jpg").exists());
}

#[tokio::test]
async fn full_task_queue_blocks_discovery_without_losing_tasks() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let image_urls: Vec<String> = (0..8)
        .map(|i| format!("{}/imgs/{i:03}.jpg", server.uri()))
        .collect();
    let image_refs: Vec<&str> = image_urls.iter().map(String::as_str).collect();

    mount_page(&server, SERIES_PATH, index_html(&["/c1"])).await;
    mount_page(&server, "/c1", chapter_html(&image_refs)).await;

    for i in 0..8 {
        Mock::given(method("GET"))
            .and(path(format!("/imgs/{i:03}.jpg")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![i as u8]))
            .mount(&server)
            .await;
    }

    // Capacity 1 and a single worker: the relay must block on the full channel
    // instead of dropping tasks.
    let summary = run_pipeline(&server, tmp.path(), 1, 1).await.unwrap();

    assert_eq!(summary.downloaded, 8);

    let chapter = tmp.path().join("Test- Series/c1");
    for i in 0..8 {
        assert!(chapter.join(format!("{i:03}.jpg")).exists());
    }
}

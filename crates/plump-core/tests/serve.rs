//! The static and development servers over real sockets

use plump_core::build::serve::{self, LiveReload};
use std::net::SocketAddr;
use std::path::Path;

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("css")).unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "<html><body><h1>Hi</h1></body></html>",
    )
    .unwrap();
    std::fs::write(dir.path().join("css/style.css"), "h1{color:red}").unwrap();
    dir
}

async fn start(router: axum::Router) -> String {
    let addr = serve::start_server(router, SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    format!("http://{}", addr)
}

async fn get(url: &str) -> (reqwest::StatusCode, String) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

fn router_for(dir: &Path) -> axum::Router {
    serve::static_router(dir.to_path_buf())
}

#[tokio::test]
async fn static_server_serves_files_untouched() {
    let dir = site();
    let base = start(router_for(dir.path())).await;

    let (status, body) = get(&format!("{}/index.html", base)).await;
    assert!(status.is_success());
    assert_eq!(body, "<html><body><h1>Hi</h1></body></html>");

    let (status, body) = get(&format!("{}/css/style.css", base)).await;
    assert!(status.is_success());
    assert_eq!(body, "h1{color:red}");

    let (status, _) = get(&format!("{}/missing.html", base)).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dev_server_injects_livereload_into_html_only() {
    let dir = site();
    let base = start(serve::dev_router(dir.path().to_path_buf(), 35729)).await;

    // Directory requests resolve to index.html
    let (status, body) = get(&format!("{}/", base)).await;
    assert!(status.is_success());
    assert!(body.contains(&serve::snippet(35729)));
    assert!(body.contains(":35729/livereload.js"));
    assert!(body.ends_with("</body></html>"));

    let (_, css) = get(&format!("{}/css/style.css", base)).await;
    assert_eq!(css, "h1{color:red}");
}

#[tokio::test]
async fn livereload_server_serves_its_client() {
    let livereload = LiveReload::new();
    let base = start(livereload.router()).await;

    let response = reqwest::get(format!("{}/livereload.js", base)).await.unwrap();
    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("javascript"));
    assert!(response.text().await.unwrap().contains("/livereload"));
}

//! Static file servers and the live-reload channel
//!
//! `serve` exposes `dist/` as-is. `develop` serves `dev/` with the
//! live-reload client injected into every HTML response; the client connects
//! to a separate live-reload server and reloads the page (or just its
//! stylesheets) when something under `dev/` changes.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

const CLIENT_SCRIPT: &str = r#"(function () {
  var src = new URL(document.currentScript.src);
  var url = (src.protocol === 'https:' ? 'wss://' : 'ws://') + src.host + '/livereload';

  function reloadStyles() {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var href = links[i].href.replace(/[?&]livereload=\d+/, '');
      links[i].href = href + (href.indexOf('?') === -1 ? '?' : '&') + 'livereload=' + Date.now();
    }
  }

  function connect() {
    var socket = new WebSocket(url);
    socket.onmessage = function (event) {
      if (/\.css$/.test(event.data)) {
        reloadStyles();
      } else {
        window.location.reload();
      }
    };
    socket.onclose = function () {
      setTimeout(connect, 1000);
    };
  }

  connect();
})();
"#;

/// Serve a directory, nothing else
pub fn static_router(dir: PathBuf) -> Router {
    Router::new().fallback_service(ServeDir::new(dir))
}

/// Serve a directory, injecting the live-reload client into HTML pages
pub fn dev_router(dir: PathBuf, livereload_port: u16) -> Router {
    static_router(dir).layer(middleware::from_fn_with_state(
        livereload_port,
        inject_livereload,
    ))
}

async fn inject_livereload(State(port): State<u16>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_snippet(&String::from_utf8_lossy(&bytes), port);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Script loading the client from the live-reload server on the page's own host,
/// so a preview opened from another device reloads too
pub fn snippet(port: u16) -> String {
    format!(
        "<script>document.write('<script src=\"//' + (location.hostname || 'localhost') + ':{}/livereload.js\"></' + 'script>')</script>",
        port
    )
}

/// Insert the client before the last `</body>`, or append it
pub fn inject_snippet(html: &str, port: u16) -> String {
    let tag = snippet(port);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => format!("{}{}\n{}", &html[..idx], tag, &html[idx..]),
        None => format!("{}{}\n", html, tag),
    }
}

/// Fan-out of changed output paths to every connected browser
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<String>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Tell connected clients that `path` changed. Returns how many were notified.
    pub fn notify_changed(&self, path: &str) -> usize {
        debug!(path, "live reload");
        self.tx.send(path.to_string()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// `GET /livereload.js` serves the client, `GET /livereload` is its socket
    pub fn router(&self) -> Router {
        Router::new()
            .route("/livereload.js", get(client_script))
            .route("/livereload", get(upgrade))
            .with_state(self.clone())
    }
}

async fn client_script() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/javascript"),
        )],
        CLIENT_SCRIPT,
    )
}

async fn upgrade(ws: WebSocketUpgrade, State(livereload): State<LiveReload>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, livereload))
}

async fn handle_socket(socket: WebSocket, livereload: LiveReload) {
    let (mut sink, mut stream) = socket.split();
    let mut changes = livereload.subscribe();
    debug!("live reload client connected");

    let forward_task = tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(path) => {
                    if sink.send(Message::Text(path.into())).await.is_err() {
                        break;
                    }
                }
                // A reload is a reload; skipped notifications do not matter.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }

    forward_task.abort();
    debug!("live reload client disconnected");
}

/// Bind `addr` and serve `router` in the background, returning the bound address
pub async fn start_server(router: Router, addr: SocketAddr) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {} (is the port already in use?)", addr))?;
    let bound = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(%bound, error = %e, "server stopped");
        }
    });

    Ok(bound)
}

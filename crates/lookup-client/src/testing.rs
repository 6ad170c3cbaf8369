//! Canned HTTP server for exercising lookups.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;

/// Serves the same status and body to every request and records the
/// requests it saw.
pub struct FakeHttp {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: Arc<str>,
    requests: Arc<Mutex<Vec<String>>>,
}

async fn answer(State(canned): State<Canned>, method: Method, uri: Uri) -> impl IntoResponse {
    if let Ok(mut guard) = canned.requests.lock() {
        guard.push(format!("{method} {uri}"));
    }
    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body.to_string(),
    )
}

impl FakeHttp {
    pub async fn respond(status: u16, body: impl Into<String>) -> std::io::Result<Self> {
        let status = StatusCode::from_u16(status)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new().fallback(answer).with_state(Canned {
            status,
            body: Arc::from(body.into()),
            requests: Arc::clone(&requests),
        });
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { base_url, requests })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests received so far, e.g. `GET /api/lookup?titleid=X`.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

//! In-page request execution
//!
//! A tab's requests are resolved against the tab's URL the way a page's
//! own `fetch` would resolve them, then executed by a [`PageFetcher`].

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::time::Duration;
use tabwire_surface::{FetchRequest, FetchResponse, SurfaceError};
use url::Url;

use crate::error::HeadlessError;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Execute `request` from a page located at `page_url`
    async fn fetch(
        &self,
        page_url: &Url,
        request: &FetchRequest,
    ) -> Result<FetchResponse, SurfaceError>;
}

fn resolve(page_url: &Url, raw: &str) -> Result<Url, SurfaceError> {
    page_url
        .join(raw)
        .map_err(|e| SurfaceError::InvalidUrl(format!("{raw}: {e}")))
}

/// Real network requests through `reqwest`
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, HeadlessError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| HeadlessError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn fetch_file(url: &Url) -> Result<FetchResponse, SurfaceError> {
        let path = url
            .to_file_path()
            .map_err(|_| SurfaceError::InvalidUrl(url.to_string()))?;
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SurfaceError::Network(format!("{}: {e}", path.display())))?;

        let response = FetchResponse::new(200, "OK", body);
        Ok(match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => response.with_content_type("application/json"),
            Some("html") | Some("htm") => response.with_content_type("text/html"),
            _ => response,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        page_url: &Url,
        request: &FetchRequest,
    ) -> Result<FetchResponse, SurfaceError> {
        let url = resolve(page_url, &request.url)?;

        if url.scheme() == "file" {
            return Self::fetch_file(&url).await;
        }
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SurfaceError::Network(format!(
                "URL scheme \"{}\" is not supported.",
                url.scheme()
            )));
        }

        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| SurfaceError::Network(format!("Invalid method: {}", request.method)))?;

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        tracing::debug!(url = %url, method = %request.method, "Fetching in page context");

        let resp = builder
            .send()
            .await
            .map_err(|e| SurfaceError::Network(e.to_string()))?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .text()
            .await
            .map_err(|e| SurfaceError::Network(e.to_string()))?;

        Ok(FetchResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body,
        })
    }
}

struct Route {
    response: FetchResponse,
    delay: Option<Duration>,
}

/// Canned responses keyed by absolute URL, for tests and offline use.
///
/// Unrouted URLs answer `404 Not Found`.
#[derive(Default)]
pub struct StaticFetcher {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, response: FetchResponse) -> Self {
        self.insert(url, response, None);
        self
    }

    /// Like [`route`](Self::route), answering only after `delay`
    pub fn route_delayed(self, url: &str, response: FetchResponse, delay: Duration) -> Self {
        self.insert(url, response, Some(delay));
        self
    }

    pub fn insert(&self, url: &str, response: FetchResponse, delay: Option<Duration>) {
        let key = Url::parse(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());
        self.routes.lock().insert(key, Route { response, delay });
    }

    /// Absolute URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(
        &self,
        page_url: &Url,
        request: &FetchRequest,
    ) -> Result<FetchResponse, SurfaceError> {
        let url = resolve(page_url, &request.url)?.to_string();
        self.requests.lock().push(url.clone());

        let (response, delay) = match self.routes.lock().get(&url) {
            Some(route) => (route.response.clone(), route.delay),
            None => (
                FetchResponse::new(404, "Not Found", "").with_content_type("text/plain"),
                None,
            ),
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(response)
    }
}

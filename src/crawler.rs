use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::settings::{ProviderSettings, SettingsError};

const CLOUD_API_URL: &str = "https://api.firecrawl.dev";
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("crawl API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("crawl job {id} ended with status '{status}'")]
    JobFailed { id: String, status: String },
    #[error("crawl job {id} did not finish within {}s", .waited.as_secs())]
    Timeout { id: String, waited: Duration },
    #[error("crawl returned no pages")]
    Empty,
}

/// One crawl of a store's menu: entry URL, path scope and bounds.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub url: String,
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub max_depth: u32,
    pub limit: u32,
}

/// Source of crawled pages. Each page is returned as the provider shaped it;
/// `parser::page_text` pulls the markdown out.
pub trait PageProvider {
    fn crawl(&self, request: &CrawlRequest) -> Result<Vec<Value>, CrawlError>;
}

/// Firecrawl v1 API client, self-hosted or cloud.
pub struct FirecrawlClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    timeout: Duration,
    backoff: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlBody<'a> {
    url: &'a str,
    include_paths: &'a [String],
    exclude_paths: &'a [String],
    max_depth: u32,
    limit: u32,
    scrape_options: ScrapeOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeOptions {
    formats: Vec<&'static str>,
    only_main_content: bool,
}

#[derive(Deserialize)]
struct CrawlStarted {
    id: String,
}

#[derive(Deserialize)]
struct CrawlStatus {
    status: String,
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    next: Option<String>,
}

impl FirecrawlClient {
    /// Pick the access mode: a configured URL means self-hosted (key optional),
    /// otherwise a key means the cloud API.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, SettingsError> {
        let api_key = settings.api_key.clone().filter(|k| !k.trim().is_empty());
        let api_url = settings.api_url.clone().filter(|u| !u.trim().is_empty());

        let base_url = match (&api_url, &api_key) {
            (Some(url), _) => {
                info!("Using self-hosted Firecrawl at {}", url);
                url.trim_end_matches('/').to_string()
            }
            (None, Some(_)) => {
                info!("Using cloud Firecrawl");
                CLOUD_API_URL.to_string()
            }
            (None, None) => return Err(SettingsError::NoProvider),
        };

        Ok(Self {
            http: Client::new(),
            base_url,
            api_key,
            poll_interval: settings.poll_interval(),
            timeout: settings.timeout(),
            backoff: Duration::from_millis(BASE_BACKOFF_MS),
        })
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Send with retry on 429 and 5xx; other failures map to `CrawlError::Api`.
    fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response, CrawlError> {
        let mut attempt = 0;
        loop {
            let response = self.authorize(build()).send()?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if !retryable || attempt == MAX_RETRIES {
                let message = response.text().unwrap_or_default();
                return Err(CrawlError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let backoff = self.backoff * 2u32.pow(attempt);
            warn!(
                "Crawl API returned {} (attempt {}/{}), backing off {:.1}s",
                status,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            thread::sleep(backoff);
            attempt += 1;
        }
    }

    fn start(&self, request: &CrawlRequest) -> Result<String, CrawlError> {
        let body = CrawlBody {
            url: &request.url,
            include_paths: &request.include_paths,
            exclude_paths: &request.exclude_paths,
            max_depth: request.max_depth,
            limit: request.limit,
            scrape_options: ScrapeOptions {
                formats: vec!["markdown"],
                only_main_content: true,
            },
        };
        let endpoint = format!("{}/v1/crawl", self.base_url);
        let started: CrawlStarted = self.send(|| self.http.post(&endpoint).json(&body))?.json()?;
        debug!(job = %started.id, url = %request.url, "Crawl job started");
        Ok(started.id)
    }

    /// Poll the job until it settles, then drain every result page.
    fn wait(&self, id: &str) -> Result<Vec<Value>, CrawlError> {
        let endpoint = format!("{}/v1/crawl/{}", self.base_url, id);
        let started = Instant::now();

        let first = loop {
            let status: CrawlStatus = self.send(|| self.http.get(&endpoint))?.json()?;
            match status.status.as_str() {
                "completed" => break status,
                "failed" | "cancelled" => {
                    return Err(CrawlError::JobFailed {
                        id: id.to_string(),
                        status: status.status,
                    })
                }
                _ => {}
            }
            if started.elapsed() >= self.timeout {
                return Err(CrawlError::Timeout {
                    id: id.to_string(),
                    waited: started.elapsed(),
                });
            }
            thread::sleep(self.poll_interval);
        };

        let mut pages = first.data;
        let mut next = first.next;
        while let Some(url) = next {
            let more: CrawlStatus = self.send(|| self.http.get(&url))?.json()?;
            pages.extend(more.data);
            next = more.next;
        }
        Ok(pages)
    }
}

impl PageProvider for FirecrawlClient {
    fn crawl(&self, request: &CrawlRequest) -> Result<Vec<Value>, CrawlError> {
        let id = self.start(request)?;
        let pages = self.wait(&id)?;
        if pages.is_empty() {
            return Err(CrawlError::Empty);
        }
        Ok(pages)
    }
}

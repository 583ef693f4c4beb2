use super::{Source, SourceError};
use crate::path;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::RANGE;
use std::time::Duration;
use tracing::debug;

/// Files under a remote base URL.
///
/// Uses the blocking client: every request is handled synchronously from
/// source read to cache write.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Remote(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, logical: &str) -> Result<String, SourceError> {
        Ok(format!("{}/{}", self.base_url, path::normalize(logical)?))
    }

    fn check(logical: &str, url: &str, response: Response) -> Result<Response, SourceError> {
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(SourceError::NotFound(logical.to_string()))
            }
            s if s.is_success() => Ok(response),
            s => Err(SourceError::Remote(format!("GET {url} returned {s}"))),
        }
    }

    fn fetch(&self, logical: &str, range: Option<usize>) -> Result<Vec<u8>, SourceError> {
        let url = self.url(logical)?;
        let mut request = self.client.get(&url);
        if let Some(len) = range
            && len > 0
        {
            request = request.header(RANGE, format!("bytes=0-{}", len - 1));
        }
        debug!(%url, ?range, "fetching remote image");
        let response = request
            .send()
            .map_err(|e| SourceError::Remote(format!("GET {url}: {e}")))?;
        let response = Self::check(logical, &url, response)?;
        let bytes = response
            .bytes()
            .map_err(|e| SourceError::Remote(format!("GET {url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

impl Source for HttpSource {
    fn driver(&self) -> &'static str {
        "http"
    }

    fn resolve(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.fetch(path, None)
    }

    fn exists(&self, path: &str) -> bool {
        let Ok(url) = self.url(path) else {
            return false;
        };
        self.client
            .head(&url)
            .send()
            .is_ok_and(|r| r.status().is_success())
    }

    fn read_header(&self, path: &str, len: usize) -> Result<Vec<u8>, SourceError> {
        // Servers that ignore Range answer 200 with the full body.
        let mut bytes = self.fetch(path, Some(len))?;
        bytes.truncate(len);
        Ok(bytes)
    }

    fn locate(&self, path: &str) -> Result<String, SourceError> {
        self.url(path)
    }
}

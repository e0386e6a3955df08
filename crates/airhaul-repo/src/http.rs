//! HTTP client and the local-or-remote opener

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

use crate::config::HttpConfig;
use crate::error::{RepoError, Result};

/// Where a file reference points
///
/// Anything starting with `http` (case-sensitive) is fetched over HTTP;
/// everything else is a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(String),
    Local(PathBuf),
}

impl Location {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http") {
            Location::Remote(location.to_string())
        } else {
            Location::Local(PathBuf::from(location))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }
}

/// Anonymous HTTP client with a request timeout and redirect limit
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    /// Client with default settings
    pub fn public() -> Result<Self> {
        Self::new(HttpConfig::default())
    }

    /// Send a request, following redirects, without judging the final status
    pub async fn send(&self, method: Method, url: &str) -> Result<reqwest::Response> {
        self.client
            .request(method, url)
            .send()
            .await
            .map_err(|e| self.map_error(e))
    }

    /// GET a URL, failing on any non-success status
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.send(Method::GET, url).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(RepoError::AuthRequired {
                url: url.to_string(),
            });
        }
        if status == StatusCode::FORBIDDEN {
            return Err(RepoError::AuthFailed {
                message: format!("Access denied to {}", url),
            });
        }
        if !status.is_success() {
            return Err(RepoError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    /// HEAD a URL and report the final status
    pub async fn head(&self, url: &str) -> Result<StatusCode> {
        Ok(self.send(Method::HEAD, url).await?.status())
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        Ok(bytes.to_vec())
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        response.text().await.map_err(|e| self.map_error(e))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let bytes = self.get_bytes(url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read a local path or fetch an HTTP URL
    pub async fn open(&self, location: &str) -> Result<Vec<u8>> {
        match Location::parse(location) {
            Location::Remote(url) => self.get_bytes(&url).await,
            Location::Local(path) => tokio::fs::read(&path).await.map_err(|source| RepoError::File {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn map_error(&self, e: reqwest::Error) -> RepoError {
        if e.is_timeout() {
            RepoError::Timeout {
                seconds: self.config.timeout.as_secs(),
            }
        } else {
            RepoError::from(e)
        }
    }
}

//! Chart sources
//!
//! A chart is located by name, repository and version:
//! - `oci://registry/path` repositories pull `<path>/<name>:<version>`
//! - `http(s)://` repositories resolve through `index.yaml`
//! - anything else is a local directory (or `.tgz`) at `<repo>/<name>`,
//!   or at `<name>` when the repository is empty

use airhaul_core::{DEFAULT_TAG, LoadedChart};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

use crate::config::RegistryOptions;
use crate::error::{RepoError, Result};
use crate::http::{HttpClient, Location};
use crate::index::{ChartEntry, RepositoryIndex};
use crate::oci::OciRegistry;

/// Loads charts for rendering
#[async_trait]
pub trait ChartSource: Send + Sync {
    async fn load(&self, name: &str, repo_url: &str, version: &str) -> Result<LoadedChart>;
}

/// Chart source backed by HTTP repositories, OCI registries and local paths
pub struct RepositoryChartSource {
    http: HttpClient,
    registry_options: RegistryOptions,
}

impl RepositoryChartSource {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            registry_options: RegistryOptions::default(),
        }
    }

    pub fn with_registry_options(mut self, options: RegistryOptions) -> Self {
        self.registry_options = options;
        self
    }

    async fn load_http(&self, name: &str, repo_url: &str, version: &str) -> Result<LoadedChart> {
        let base = repo_url.trim_end_matches('/');
        let index_url = format!("{}/index.yaml", base);

        tracing::debug!(chart = name, index = %index_url, "fetching repository index");
        let index = RepositoryIndex::from_bytes(&self.http.get_bytes(&index_url).await?)?;
        let entry = index.resolve(name, version, repo_url)?;

        let data = self.download(entry, base).await?;
        Ok(LoadedChart::from_archive(&data)?)
    }

    async fn download(&self, entry: &ChartEntry, base: &str) -> Result<Vec<u8>> {
        let url = entry.download_url().ok_or_else(|| RepoError::ChartNotFound {
            name: entry.name.clone(),
            repo: base.to_string(),
        })?;

        // Index URLs are absolute or relative to the repository
        let full_url = Url::parse(&format!("{}/", base))?.join(url)?;
        let data = self.http.get_bytes(full_url.as_str()).await?;

        if let Some(expected) = &entry.digest {
            let actual = compute_digest(&data);
            if !digest_matches(expected, &actual) {
                return Err(RepoError::IntegrityCheckFailed {
                    name: entry.name.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        Ok(data)
    }

    async fn load_oci(&self, name: &str, repo_url: &str, version: &str) -> Result<LoadedChart> {
        let base = repo_url.trim_end_matches('/');
        let tag = if version.is_empty() { DEFAULT_TAG } else { version };
        let reference = format!("{}/{}:{}", base, name, airhaul_core::reference::tag_compliant(tag));

        let registry = base
            .trim_start_matches("oci://")
            .split('/')
            .next()
            .unwrap_or_default();
        let client = OciRegistry::for_registry(registry, &self.registry_options, None);

        let data = client.pull_chart(&reference).await?;
        Ok(LoadedChart::from_archive(&data)?)
    }
}

#[async_trait]
impl ChartSource for RepositoryChartSource {
    async fn load(&self, name: &str, repo_url: &str, version: &str) -> Result<LoadedChart> {
        if repo_url.starts_with("oci://") {
            return self.load_oci(name, repo_url, version).await;
        }

        match Location::parse(repo_url) {
            Location::Remote(url) => self.load_http(name, &url, version).await,
            Location::Local(repo) => load_local(&local_chart_path(&repo, name)),
        }
    }
}

fn local_chart_path(repo: &Path, name: &str) -> PathBuf {
    if repo.as_os_str().is_empty() {
        PathBuf::from(name)
    } else {
        repo.join(name)
    }
}

fn load_local(path: &Path) -> Result<LoadedChart> {
    if path.is_file() {
        let data = std::fs::read(path).map_err(|source| RepoError::File {
            path: path.display().to_string(),
            source,
        })?;
        return Ok(LoadedChart::from_archive(&data)?);
    }
    Ok(LoadedChart::load_dir(path)?)
}

/// Compute SHA256 digest of data
fn compute_digest(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

/// Check if two digests match, ignoring case and the `sha256:` prefix
fn digest_matches(expected: &str, actual: &str) -> bool {
    let normalize = |d: &str| {
        d.trim()
            .to_lowercase()
            .replace("sha256:", "")
            .replace("sha256-", "")
    };
    normalize(expected) == normalize(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chart_archive(name: &str, version: &str) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let files = [
            (format!("{}/Chart.yaml", name), format!("name: {}\nversion: {}\n", name, version)),
            (format!("{}/templates/pod.yaml", name), "kind: Pod\n".to_string()),
        ];
        for (file, content) in &files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, file, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_digest_matches() {
        assert!(digest_matches("sha256:ABC123", "sha256:abc123"));
        assert!(digest_matches("abc123", "sha256:abc123"));
        assert!(!digest_matches("sha256:abc123", "sha256:def456"));
        assert_eq!(compute_digest(b"hello").len(), 7 + 64);
    }

    #[tokio::test]
    async fn test_load_from_http_repository() {
        let server = MockServer::start().await;
        let archive = chart_archive("web", "1.2.0");
        let index = format!(
            "apiVersion: v1\nentries:\n  web:\n    - name: web\n      version: 1.2.0\n      urls: [charts/web-1.2.0.tgz]\n      digest: \"{}\"\n",
            compute_digest(&archive).trim_start_matches("sha256:")
        );

        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/charts/web-1.2.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&server)
            .await;

        let source = RepositoryChartSource::new(HttpClient::public().unwrap());
        let chart = source.load("web", &server.uri(), "1.2.0").await.unwrap();
        assert_eq!(chart.name(), "web");
        assert!(chart.templates.contains_key("pod.yaml"));

        // Empty version resolves to the latest entry
        let latest = source.load("web", &server.uri(), "").await.unwrap();
        assert_eq!(latest.version(), "1.2.0");
    }

    #[tokio::test]
    async fn test_digest_mismatch_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "entries:\n  web:\n    - name: web\n      version: 1.0.0\n      urls: [web.tgz]\n      digest: deadbeef\n",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/web.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(chart_archive("web", "1.0.0")))
            .mount(&server)
            .await;

        let source = RepositoryChartSource::new(HttpClient::public().unwrap());
        let err = source.load("web", &server.uri(), "1.0.0").await.unwrap_err();
        assert!(matches!(err, RepoError::IntegrityCheckFailed { .. }));
    }

    #[tokio::test]
    async fn test_load_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let chart_dir = dir.path().join("local");
        std::fs::create_dir_all(chart_dir.join("templates")).unwrap();
        std::fs::write(chart_dir.join("Chart.yaml"), "name: local\nversion: 0.0.1\n").unwrap();

        let source = RepositoryChartSource::new(HttpClient::public().unwrap());
        let chart = source
            .load("local", dir.path().to_str().unwrap(), "")
            .await
            .unwrap();
        assert_eq!(chart.name(), "local");

        let direct = source.load(chart_dir.to_str().unwrap(), "", "").await.unwrap();
        assert_eq!(direct.name(), "local");
    }

    #[tokio::test]
    async fn test_missing_chart_in_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("entries: {}\n"))
            .mount(&server)
            .await;

        let source = RepositoryChartSource::new(HttpClient::public().unwrap());
        let err = source.load("ghost", &server.uri(), "").await.unwrap_err();
        assert!(matches!(err, RepoError::ChartNotFound { .. }));
    }
}

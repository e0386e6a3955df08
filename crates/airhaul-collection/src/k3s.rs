//! k3s release bundles
//!
//! A release bundle is the k3s executable for one architecture, the
//! bootstrap script, and every image listed in the release's
//! `k3s-images.txt`.

use airhaul_core::reference::tag_compliant;
use airhaul_core::{Artifact, ArtifactRef, DEFAULT_NAMESPACE, DEFAULT_TAG};
use airhaul_repo::{HttpClient, RepoError};

use crate::channel::ChannelResolver;
use crate::collection::Contents;
use crate::error::{CollectionError, Result};

pub const RELEASE_URL: &str = "https://github.com/k3s-io/k3s/releases/download";
pub const CHANNEL_URL: &str = "https://update.k3s.io/v1-release/channels";
pub const BOOTSTRAP_URL: &str = "https://get.k3s.io";

/// File name the bootstrap script is stored under
pub const BOOTSTRAP_FILE: &str = "k3s-init.sh";
const IMAGES_FILE: &str = "k3s-images.txt";
const EXECUTABLE: &str = "k3s";
const DEFAULT_ARCH: &str = "amd64";

/// Where release assets are fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEndpoints {
    /// Base URL of release assets, `<release_url>/<version>/<asset>`
    /// (default: GitHub releases)
    pub release_url: String,
    /// JSON channel feed (default: update.k3s.io)
    pub channel_url: String,
    /// Bootstrap script (default: get.k3s.io)
    pub bootstrap_url: String,
}

impl Default for ReleaseEndpoints {
    fn default() -> Self {
        Self {
            release_url: RELEASE_URL.to_string(),
            channel_url: CHANNEL_URL.to_string(),
            bootstrap_url: BOOTSTRAP_URL.to_string(),
        }
    }
}

/// k3s release bundle for a version or channel
pub struct K3s {
    version: String,
    arch: Option<String>,
    http: HttpClient,
    endpoints: ReleaseEndpoints,
}

impl K3s {
    pub fn new(version: impl Into<String>, http: HttpClient, endpoints: ReleaseEndpoints) -> Self {
        Self {
            version: version.into(),
            arch: None,
            http,
            endpoints,
        }
    }

    pub fn with_arch(mut self, arch: Option<String>) -> Self {
        self.arch = arch.filter(|a| !a.is_empty());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `k3s` for amd64, `k3s-<arch>` otherwise
    pub fn executable_name(&self) -> String {
        match self.arch.as_deref() {
            None | Some(DEFAULT_ARCH) => EXECUTABLE.to_string(),
            Some(arch) => format!("{}-{}", EXECUTABLE, arch),
        }
    }

    fn asset_url(&self, version: &str, asset: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoints.release_url.trim_end_matches('/'),
            version,
            asset
        )
    }

    pub(crate) async fn compute(&self) -> Result<Contents> {
        let version = ChannelResolver::new(self.http.clone(), &self.endpoints.channel_url)
            .resolve(&self.version)
            .await;

        let mut contents = Contents::new();
        self.images(&version, &mut contents).await?;
        self.executable(&version, &mut contents).await?;
        self.bootstrap(&mut contents)?;

        tracing::info!(version = %version, artifacts = contents.len(), "resolved k3s release");
        Ok(contents)
    }

    async fn images(&self, version: &str, contents: &mut Contents) -> Result<()> {
        let url = self.asset_url(version, IMAGES_FILE);

        let text = self.http.get_text(&url).await.map_err(|e| match e {
            RepoError::HttpError { .. } | RepoError::AuthRequired { .. } | RepoError::AuthFailed { .. } => {
                CollectionError::ImagesNotFound {
                    version: version.to_string(),
                }
            }
            other => CollectionError::FetchFailed {
                message: other.to_string(),
            },
        })?;

        // Every line is an image; a blank one fails to parse
        for line in text.lines() {
            let reference = ArtifactRef::parse(line)?;
            contents.insert(reference.clone(), Artifact::image(reference));
        }
        Ok(())
    }

    async fn executable(&self, version: &str, contents: &mut Contents) -> Result<()> {
        let url = self.asset_url(version, &self.executable_name());

        match self.http.head(&url).await {
            Ok(status) if status.as_u16() == 200 => {}
            Ok(status) => {
                tracing::debug!(url = %url, status = status.as_u16(), "executable check failed");
                return Err(CollectionError::ExecutableNotFound { url });
            }
            Err(e) => {
                tracing::debug!(url = %url, "executable check failed: {}", e);
                return Err(CollectionError::ExecutableNotFound { url });
            }
        }

        let reference = ArtifactRef::parse_local(&format!(
            "{}/{}:{}",
            DEFAULT_NAMESPACE,
            EXECUTABLE,
            tag_compliant(version)
        ))?;
        contents.insert(reference, Artifact::file(url));
        Ok(())
    }

    fn bootstrap(&self, contents: &mut Contents) -> Result<()> {
        let reference = ArtifactRef::parse_local(&format!(
            "{}/{}:{}",
            DEFAULT_NAMESPACE, BOOTSTRAP_FILE, DEFAULT_TAG
        ))?;
        contents.insert(
            reference,
            Artifact::renamed_file(&self.endpoints.bootstrap_url, BOOTSTRAP_FILE),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airhaul_core::CoreError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IMAGES: &str = "docker.io/rancher/klipper-helm:v0.8.3-build20240228\ndocker.io/rancher/mirrored-coredns-coredns:1.10.1\n";

    fn endpoints(server: &MockServer) -> ReleaseEndpoints {
        ReleaseEndpoints {
            release_url: format!("{}/releases", server.uri()),
            channel_url: format!("{}/channels", server.uri()),
            bootstrap_url: format!("{}/install.sh", server.uri()),
        }
    }

    async fn release(server: &MockServer, version: &str, executable: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/releases/{}/k3s-images.txt", version)))
            .respond_with(ResponseTemplate::new(200).set_body_string(IMAGES))
            .mount(server)
            .await;
        Mock::given(method("HEAD"))
            .and(path(format!("/releases/{}/{}", version, executable)))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    fn keys(contents: &Contents) -> Vec<String> {
        contents.keys().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_release_contents() {
        let server = MockServer::start().await;
        release(&server, "v1.29.4+k3s1", "k3s").await;

        let k3s = K3s::new("v1.29.4+k3s1", HttpClient::public().unwrap(), endpoints(&server));
        let contents = k3s.compute().await.unwrap();

        assert_eq!(
            keys(&contents),
            vec![
                "docker.io/rancher/klipper-helm:v0.8.3-build20240228",
                "docker.io/rancher/mirrored-coredns-coredns:1.10.1",
                "airhaul/k3s:v1.29.4-k3s1",
                "airhaul/k3s-init.sh:latest",
            ]
        );

        let bootstrap = ArtifactRef::parse_local("airhaul/k3s-init.sh:latest").unwrap();
        let Some(Artifact::File(file)) = contents.get(&bootstrap) else {
            panic!("expected bootstrap file");
        };
        assert_eq!(file.file_name(), "k3s-init.sh");
    }

    #[tokio::test]
    async fn test_channel_resolved_before_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data":[{"id":"stable","name":"stable","latest":"v1.28.9+k3s1"}]}"#,
            ))
            .mount(&server)
            .await;
        release(&server, "v1.28.9+k3s1", "k3s").await;

        let k3s = K3s::new("stable", HttpClient::public().unwrap(), endpoints(&server));
        let contents = k3s.compute().await.unwrap();
        assert!(contents.contains_key(&ArtifactRef::parse_local("airhaul/k3s:v1.28.9-k3s1").unwrap()));
    }

    #[tokio::test]
    async fn test_unreachable_channel_feed_keeps_literal_version() {
        let server = MockServer::start().await;
        release(&server, "v1.27.1+k3s1", "k3s").await;

        let mut endpoints = endpoints(&server);
        endpoints.channel_url = "http://127.0.0.1:1/channels".to_string();

        let k3s = K3s::new("v1.27.1+k3s1", HttpClient::public().unwrap(), endpoints);
        let contents = k3s.compute().await.unwrap();
        assert!(contents.contains_key(&ArtifactRef::parse_local("airhaul/k3s:v1.27.1-k3s1").unwrap()));
    }

    #[tokio::test]
    async fn test_arch_executable_name() {
        let server = MockServer::start().await;
        release(&server, "v1.29.4+k3s1", "k3s-arm64").await;

        let k3s = K3s::new("v1.29.4+k3s1", HttpClient::public().unwrap(), endpoints(&server))
            .with_arch(Some("arm64".to_string()));
        assert_eq!(k3s.executable_name(), "k3s-arm64");

        let contents = k3s.compute().await.unwrap();
        let executable = ArtifactRef::parse_local("airhaul/k3s:v1.29.4-k3s1").unwrap();
        let Some(Artifact::File(file)) = contents.get(&executable) else {
            panic!("expected executable file");
        };
        assert!(file.url.ends_with("/releases/v1.29.4+k3s1/k3s-arm64"));
    }

    #[tokio::test]
    async fn test_blank_image_line_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases/v1.29.4+k3s1/k3s-images.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("nginx:1.25\n\nredis:7\n"))
            .mount(&server)
            .await;

        let k3s = K3s::new("v1.29.4+k3s1", HttpClient::public().unwrap(), endpoints(&server));
        assert!(matches!(
            k3s.compute().await,
            Err(CollectionError::Core(CoreError::InvalidReference { .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_images_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let k3s = K3s::new("v0.0.0", HttpClient::public().unwrap(), endpoints(&server));
        assert!(matches!(
            k3s.compute().await,
            Err(CollectionError::ImagesNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_release_server() {
        let endpoints = ReleaseEndpoints {
            release_url: "http://127.0.0.1:1/releases".to_string(),
            channel_url: "http://127.0.0.1:1/channels".to_string(),
            bootstrap_url: BOOTSTRAP_URL.to_string(),
        };
        let k3s = K3s::new("v1.29.4+k3s1", HttpClient::public().unwrap(), endpoints);
        assert!(matches!(
            k3s.compute().await,
            Err(CollectionError::FetchFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases/v1.29.4+k3s1/k3s-images.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(IMAGES))
            .mount(&server)
            .await;

        let k3s = K3s::new("v1.29.4+k3s1", HttpClient::public().unwrap(), endpoints(&server));
        assert!(matches!(
            k3s.compute().await,
            Err(CollectionError::ExecutableNotFound { .. })
        ));
    }
}

//! Fetching source content from local files and HTTP

use async_trait::async_trait;
use indexmap::IndexMap;
use renderman_core::template::substitute;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FetchError, Result, SourceError};
use crate::locator::Locator;

/// Default timeout for a single HTTP request
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches the raw bytes behind a locator
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>>;

    /// Substitute `data` into a locator template, then fetch it
    async fn resolve(
        &self,
        template: &str,
        data: &IndexMap<String, serde_yaml::Value>,
    ) -> std::result::Result<Vec<u8>, SourceError> {
        let rendered = substitute(template, data)?;
        let locator = Locator::parse(&rendered);
        tracing::debug!(template, %locator, "Resolved source locator");
        Ok(self.fetch(&locator).await?)
    }
}

/// Fetcher for local paths (relative to the config directory) and URLs
pub struct SourceResolver {
    client: reqwest::Client,
    base_dir: PathBuf,
}

impl SourceResolver {
    /// Create a resolver with the default request timeout
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_timeout(base_dir, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(base_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("renderman/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_dir: base_dir.into(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn get(&self, url: &url::Url) -> Result<Vec<u8>> {
        let locator = url.as_str();
        tracing::debug!(url = locator, "Fetching remote source");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(locator, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(locator, e))?;
        Ok(bytes.to_vec())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        };
        tracing::debug!(path = %path.display(), "Reading local source");

        tokio::fs::read(&path)
            .await
            .map_err(|source| FetchError::Read { path, source })
    }
}

#[async_trait]
impl SourceFetcher for SourceResolver {
    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>> {
        match locator {
            Locator::Path(path) => self.read(path).await,
            Locator::Url(url) => match url.scheme() {
                "http" | "https" => self.get(url).await,
                "file" => {
                    let path = url.to_file_path().map_err(|_| FetchError::UnsupportedScheme {
                        locator: url.to_string(),
                        scheme: "file".to_string(),
                    })?;
                    self.read(&path).await
                }
                other => Err(FetchError::UnsupportedScheme {
                    locator: url.to_string(),
                    scheme: other.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderman_core::TemplateError;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn data(yaml: &str) -> IndexMap<String, serde_yaml::Value> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_transitive_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.2.3/f.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("kind: ConfigMap\n"))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = SourceResolver::new(".").unwrap();
        let data = data(&format!(
            "app_version: v1.2.3\nbase_url: \"{}/{{app_version}}\"\n",
            server.uri()
        ));

        let bytes = resolver.resolve("{base_url}/f.yaml", &data).await.unwrap();
        assert_eq!(bytes, b"kind: ConfigMap\n");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = SourceResolver::new(".").unwrap();
        let locator = Locator::parse(&format!("{}/missing.yaml", server.uri()));
        let err = resolver.fetch(&locator).await.unwrap_err();

        match err {
            FetchError::Http { locator, status } => {
                assert_eq!(status, 404);
                assert!(locator.ends_with("/missing.yaml"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let resolver = SourceResolver::new(".").unwrap();
        let locator = Locator::parse("http://127.0.0.1:9/unreachable.yaml");
        let err = resolver.fetch(&locator).await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[tokio::test]
    async fn test_local_path_relative_to_base_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("crds")).unwrap();
        std::fs::write(dir.path().join("crds/a.yaml"), "kind: A\n").unwrap();

        let resolver = SourceResolver::new(dir.path()).unwrap();
        let bytes = resolver
            .resolve("crds/{file}", &data("file: a.yaml\n"))
            .await
            .unwrap();
        assert_eq!(bytes, b"kind: A\n");
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let dir = TempDir::new().unwrap();
        let resolver = SourceResolver::new(dir.path()).unwrap();
        let err = resolver
            .fetch(&Locator::parse("nope.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Read { ref path, .. } if path.ends_with("nope.yaml")));
    }

    #[tokio::test]
    async fn test_unresolved_placeholder_does_not_fetch() {
        let resolver = SourceResolver::new(".").unwrap();
        let err = resolver
            .resolve("https://example.invalid/{version}/a.yaml", &IndexMap::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::Template(TemplateError::MissingKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let resolver = SourceResolver::new(".").unwrap();
        let err = resolver
            .fetch(&Locator::parse("ftp://example.com/a.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme { ref scheme, .. } if scheme == "ftp"));
    }
}

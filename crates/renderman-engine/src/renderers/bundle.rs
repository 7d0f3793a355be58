use async_trait::async_trait;
use renderman_core::{Bundle, split_documents};
use std::sync::Arc;

use super::{Rendered, Renderer};
use crate::error::RenderError;
use renderman_source::SourceFetcher;

/// Renders bundles by resolving each source in declared order and
/// concatenating their documents.
///
/// A bundle is all-or-nothing: the first failing source fails the unit.
pub struct BundleRenderer {
    fetcher: Arc<dyn SourceFetcher>,
}

impl BundleRenderer {
    pub fn new(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Renderer<Bundle> for BundleRenderer {
    async fn render(&self, bundle: &Bundle) -> Result<Rendered, RenderError> {
        let mut rendered = Rendered::default();

        for source in &bundle.sources {
            let bytes = self.fetcher.resolve(source, &bundle.data).await?;
            let text = String::from_utf8(bytes).map_err(|_| RenderError::SourceEncoding {
                locator: source.clone(),
            })?;

            let documents = split_documents(&text);
            if documents.is_empty() {
                rendered
                    .warnings
                    .push(format!("source {} contains no documents", source));
            }
            rendered.documents.extend(documents);
        }

        tracing::debug!(
            bundle = %bundle.name,
            sources = bundle.sources.len(),
            documents = rendered.documents.len(),
            "Assembled bundle"
        );
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use renderman_source::{FetchError, Locator};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Canned {
        bodies: HashMap<String, Vec<u8>>,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SourceFetcher for Canned {
        async fn fetch(&self, locator: &Locator) -> renderman_source::Result<Vec<u8>> {
            let key = locator.to_string();
            self.fetched.lock().unwrap().push(key.clone());
            self.bodies
                .get(&key)
                .cloned()
                .ok_or(FetchError::Http {
                    locator: key,
                    status: 404,
                })
        }
    }

    fn bundle(sources: &[&str], data: &str) -> Bundle {
        Bundle {
            name: "crds".to_string(),
            data: serde_yaml::from_str::<IndexMap<String, serde_yaml::Value>>(data)
                .unwrap_or_default(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn canned(bodies: &[(&str, &str)]) -> Arc<Canned> {
        Arc::new(Canned {
            bodies: bodies
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_sources_concatenate_in_declared_order() {
        let fetcher = canned(&[
            ("https://example.com/v1/a.yaml", "---\nkind: A\n---\nkind: B\n---\n"),
            ("https://example.com/v1/b.yaml", "kind: C\n"),
        ]);
        let renderer = BundleRenderer::new(fetcher.clone());

        let rendered = renderer
            .render(&bundle(
                &["{base}/a.yaml", "{base}/b.yaml"],
                "version: v1\nbase: https://example.com/{version}\n",
            ))
            .await
            .unwrap();

        let kinds: Vec<&str> = rendered.documents.iter().map(|d| d.raw()).collect();
        assert_eq!(kinds, vec!["kind: A", "kind: B", "kind: C"]);
        assert!(rendered.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_failing_source_fails_whole_bundle() {
        let fetcher = canned(&[("a.yaml", "kind: A\n")]);
        let renderer = BundleRenderer::new(fetcher);

        let err = renderer
            .render(&bundle(&["a.yaml", "b.yaml"], ""))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Fetch(FetchError::Http { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_template_error_skips_fetch() {
        let fetcher = canned(&[]);
        let renderer = BundleRenderer::new(fetcher.clone());

        let err = renderer
            .render(&bundle(&["{missing}/a.yaml"], ""))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
        assert!(fetcher.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_source_warns() {
        let fetcher = canned(&[("empty.yaml", "---\n\n---\n")]);
        let renderer = BundleRenderer::new(fetcher);

        let rendered = renderer.render(&bundle(&["empty.yaml"], "")).await.unwrap();
        assert!(rendered.documents.is_empty());
        assert_eq!(
            rendered.warnings,
            vec!["source empty.yaml contains no documents".to_string()]
        );
    }

    #[tokio::test]
    async fn test_non_utf8_source() {
        let fetcher = Arc::new(Canned {
            bodies: HashMap::from([("bin.yaml".to_string(), vec![0xff, 0xfe, 0x00])]),
            ..Default::default()
        });
        let renderer = BundleRenderer::new(fetcher);

        let err = renderer.render(&bundle(&["bin.yaml"], "")).await.unwrap_err();
        assert!(matches!(err, RenderError::SourceEncoding { ref locator } if locator == "bin.yaml"));
    }
}

//! The render engine: selects units, renders them concurrently and merges
//! the outcomes in declared order

use futures::StreamExt;
use indexmap::IndexMap;
use renderman_core::{Filter, SelectedUnit, StackConfig, UnitId, UnitRef};
use renderman_source::{SourceFetcher, SourceResolver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{RenderError, Result};
use crate::renderers::{
    BundleRenderer, KustomizationRenderer, ReleaseRenderer, Rendered, Renderer, ToolContext,
    ToolPaths,
};
use crate::result::{RenderResult, RenderedUnit, UnitFailure};
use crate::runner::{DEFAULT_TOOL_TIMEOUT, ProcessRunner, ToolRunner};

/// Default number of units rendered at once
pub const DEFAULT_JOBS: usize = 4;

/// Options for a render pass
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Maximum units rendered concurrently (at least 1)
    pub jobs: usize,
    /// Per tool invocation
    pub tool_timeout: Duration,
    /// Overall limit; units not finished by then fail as aborted
    pub deadline: Option<Duration>,
    /// Ask helm and helmfile for debug output
    pub debug: bool,
    /// Pass `--skip-deps` to helmfile
    pub skip_deps: bool,
    pub tools: ToolPaths,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            deadline: None,
            debug: false,
            skip_deps: false,
            tools: ToolPaths::default(),
        }
    }
}

/// Progress notifications emitted while rendering
#[derive(Debug, Clone)]
pub enum RenderEvent<'a> {
    Started { total: usize },
    UnitFinished {
        id: &'a UnitId,
        ok: bool,
        elapsed: Duration,
    },
}

type Observer = Arc<dyn Fn(&RenderEvent<'_>) + Send + Sync>;

/// Render engine builder
#[derive(Default)]
pub struct RenderEngineBuilder {
    options: RenderOptions,
    runner: Option<Arc<dyn ToolRunner>>,
    fetcher: Option<Arc<dyn SourceFetcher>>,
    observer: Option<Observer>,
}

impl RenderEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.options.jobs = jobs;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.options.tool_timeout = timeout;
        self
    }

    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.options.deadline = deadline;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    pub fn skip_deps(mut self, skip_deps: bool) -> Self {
        self.options.skip_deps = skip_deps;
        self
    }

    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.options.tools = tools;
        self
    }

    /// Replace the process runner (tests, dry runs)
    pub fn runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Replace the default file/HTTP source fetcher
    pub fn fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Receive progress events; called from the rendering task
    pub fn on_event<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RenderEvent<'_>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Build the engine
    pub fn build(self) -> RenderEngine {
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(ProcessRunner::new(self.options.tool_timeout)));
        RenderEngine {
            options: self.options,
            runner,
            fetcher: self.fetcher,
            observer: self.observer,
        }
    }
}

/// Renders the units of a stack
pub struct RenderEngine {
    options: RenderOptions,
    runner: Arc<dyn ToolRunner>,
    fetcher: Option<Arc<dyn SourceFetcher>>,
    observer: Option<Observer>,
}

impl RenderEngine {
    /// Create a builder
    pub fn builder() -> RenderEngineBuilder {
        RenderEngineBuilder::new()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render every unit `filter` selects.
    ///
    /// Fails only when the filter names an unknown or disabled app (or the
    /// HTTP client cannot be built). Unit failures are collected in the
    /// result; the remaining units still render. Units run concurrently, up
    /// to `jobs` at a time, but the result is ordered exactly as declared.
    pub async fn render_all(&self, config: &StackConfig, filter: &Filter) -> Result<RenderResult> {
        let selection = config.select(filter)?;
        let total = selection.units.len();
        tracing::info!(units = total, jobs = self.options.jobs, "Rendering");
        self.emit(&RenderEvent::Started { total });

        let fetcher: Arc<dyn SourceFetcher> = match &self.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => Arc::new(SourceResolver::new(&config.base_dir)?),
        };
        let ctx = Arc::new(ToolContext {
            runner: self.runner.clone(),
            tools: self.options.tools.clone(),
            base_dir: config.base_dir.clone(),
            debug: self.options.debug,
            skip_deps: self.options.skip_deps,
        });
        let renderers = Renderers {
            release: ReleaseRenderer::new(ctx.clone()),
            kustomization: KustomizationRenderer::new(ctx),
            bundle: BundleRenderer::new(fetcher),
        };
        let renderers = &renderers;

        let tasks = selection.units.iter().enumerate().map(|(index, selected)| async move {
            let started = Instant::now();
            let outcome = renderers.render(selected).await;
            (index, outcome, started.elapsed())
        });
        let mut pending = futures::stream::iter(tasks).buffer_unordered(self.options.jobs.max(1));

        let deadline = self
            .options
            .deadline
            .map(|limit| (limit, tokio::time::Instant::now() + limit));
        let mut outcomes: Vec<Option<std::result::Result<Rendered, RenderError>>> =
            (0..total).map(|_| None).collect();

        loop {
            let next = match deadline {
                Some((limit, at)) => match tokio::time::timeout_at(at, pending.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::debug!(
                            timeout_secs = limit.as_secs(),
                            "Overall timeout reached, aborting unfinished units"
                        );
                        break;
                    }
                },
                None => pending.next().await,
            };
            let Some((index, outcome, elapsed)) = next else {
                break;
            };

            self.emit(&RenderEvent::UnitFinished {
                id: &selection.units[index].id,
                ok: outcome.is_ok(),
                elapsed,
            });
            outcomes[index] = Some(outcome);
        }
        // Cancels (and kills) anything still running
        drop(pending);

        let mut result = RenderResult {
            units: IndexMap::with_capacity(total),
            failures: Vec::new(),
            scope: selection.scope.clone(),
        };
        for (selected, outcome) in selection.units.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                Err(RenderError::Aborted {
                    timeout: self.options.deadline.unwrap_or_default(),
                })
            });
            match outcome {
                Ok(rendered) => {
                    for warning in &rendered.warnings {
                        tracing::debug!(unit = %selected.id, "{}", warning);
                    }
                    tracing::debug!(
                        unit = %selected.id,
                        documents = rendered.documents.len(),
                        "Rendered unit"
                    );
                    result.units.insert(
                        selected.path.clone(),
                        RenderedUnit {
                            id: selected.id.clone(),
                            documents: rendered.documents,
                            warnings: rendered.warnings,
                        },
                    );
                }
                Err(error) => {
                    tracing::debug!(unit = %selected.id, error = %error, "Unit failed to render");
                    result.failures.push(UnitFailure {
                        id: selected.id.clone(),
                        path: selected.path.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!("{}", result.summary());
        Ok(result)
    }

    fn emit(&self, event: &RenderEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }
}

struct Renderers {
    release: ReleaseRenderer,
    kustomization: KustomizationRenderer,
    bundle: BundleRenderer,
}

impl Renderers {
    async fn render(&self, selected: &SelectedUnit<'_>) -> std::result::Result<Rendered, RenderError> {
        match selected.unit {
            UnitRef::Release(release) => self.release.render(release).await,
            UnitRef::Kustomization(kustomization) => {
                self.kustomization.render(kustomization).await
            }
            UnitRef::Bundle(bundle) => self.bundle.render(bundle).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Invocation, ToolOutput};
    use async_trait::async_trait;
    use renderman_core::{NotFoundError, UnitKind};
    use renderman_source::{FetchError, Locator};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STACK: &str = r#"
renderman:
  apps:
    web:
      releases:
        - name: api
          chart: { name: charts/api, version: 1.0.0 }
        - name: broken
          chart: { name: charts/broken, version: 1.0.0 }
        - name: slow
          chart: { name: charts/slow, version: 1.0.0 }
      kustomizations:
        - name: overlay
          source: ./overlay
      bundles:
        - name: crds
          data: { version: v2 }
          sources: ["crds/{version}.yaml"]
    legacy:
      enabled: false
      releases:
        - name: old
          chart: { name: charts/old, version: 0.1.0 }
"#;

    /// Fake helm/kustomize: behaviour keyed by the chart or source argument
    #[derive(Default)]
    struct FakeTools {
        slow: Duration,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    #[async_trait]
    impl ToolRunner for FakeTools {
        async fn run(&self, invocation: &Invocation) -> std::result::Result<ToolOutput, RenderError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);

            let target = invocation.args[if invocation.tool() == "helm" { 2 } else { 1 }].clone();
            let delay = match target.as_str() {
                "charts/slow" => self.slow,
                // Finish early units last to shake out ordering bugs
                "charts/api" => Duration::from_millis(30),
                _ => Duration::from_millis(1),
            };
            tokio::time::sleep(delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if target == "charts/broken" {
                return Err(RenderError::ToolFailed {
                    tool: "helm".to_string(),
                    exit_code: Some(1),
                    stderr: "Error: chart not found".to_string(),
                });
            }
            Ok(ToolOutput {
                stdout: format!("---\nkind: ConfigMap\nmetadata:\n  name: {}\n", target),
                stderr: String::new(),
            })
        }
    }

    struct FakeSources;

    #[async_trait]
    impl SourceFetcher for FakeSources {
        async fn fetch(&self, locator: &Locator) -> renderman_source::Result<Vec<u8>> {
            match locator.to_string().as_str() {
                "crds/v2.yaml" => Ok(b"kind: CustomResourceDefinition\n".to_vec()),
                other => Err(FetchError::Http {
                    locator: other.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn config() -> StackConfig {
        StackConfig::from_yaml(STACK, "/stack").unwrap()
    }

    fn engine(tools: Arc<FakeTools>) -> RenderEngineBuilder {
        RenderEngine::builder()
            .runner(tools)
            .fetcher(Arc::new(FakeSources))
    }

    fn paths(result: &RenderResult) -> Vec<String> {
        result
            .units
            .keys()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_order_is_declared() {
        let tools = Arc::new(FakeTools::default());
        let result = engine(tools)
            .jobs(8)
            .build()
            .render_all(&config(), &Filter::all())
            .await
            .unwrap();

        assert_eq!(
            paths(&result),
            vec![
                "web/api.release.manifest.yaml",
                "web/slow.release.manifest.yaml",
                "web/overlay.kustomization.manifest.yaml",
                "web/crds.bundle.manifest.yaml",
            ]
        );
        assert_eq!(result.failures.len(), 1);
        assert_eq!(
            result.failures[0].id,
            UnitId::new("web", UnitKind::Release, "broken")
        );
        assert_eq!(result.failures[0].error.kind(), "tool");
        assert!(result.scope.excluded_apps.contains("legacy"));
    }

    #[tokio::test]
    async fn test_render_is_deterministic() {
        let first = engine(Arc::new(FakeTools::default()))
            .build()
            .render_all(&config(), &Filter::all())
            .await
            .unwrap();
        let second = engine(Arc::new(FakeTools::default()))
            .jobs(1)
            .build()
            .render_all(&config(), &Filter::all())
            .await
            .unwrap();

        assert_eq!(paths(&first), paths(&second));
        for (path, unit) in &first.units {
            assert_eq!(unit.to_yaml(), second.units[path].to_yaml());
        }
    }

    #[tokio::test]
    async fn test_jobs_bounds_concurrency() {
        let tools = Arc::new(FakeTools::default());
        engine(tools.clone())
            .jobs(2)
            .build()
            .render_all(&config(), &Filter::all())
            .await
            .unwrap();

        assert!(tools.max_running.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_deadline_aborts_unfinished_units() {
        let tools = Arc::new(FakeTools {
            slow: Duration::from_secs(10),
            ..Default::default()
        });
        let started = std::time::Instant::now();
        let result = engine(tools)
            .jobs(8)
            .deadline(Some(Duration::from_millis(300)))
            .build()
            .render_all(&config(), &Filter::all())
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(result.units.contains_key(&PathBuf::from("web/api.release.manifest.yaml")));
        let aborted: Vec<&UnitFailure> = result
            .failures
            .iter()
            .filter(|f| f.error.kind() == "aborted")
            .collect();
        assert_eq!(aborted.len(), 1);
        assert_eq!(aborted[0].id.name, "slow");
    }

    #[tokio::test]
    async fn test_filter_by_app_and_kind() {
        let result = engine(Arc::new(FakeTools::default()))
            .build()
            .render_all(
                &config(),
                &Filter::app("web").with_kinds([UnitKind::Bundle, UnitKind::Kustomization]),
            )
            .await
            .unwrap();

        assert_eq!(
            paths(&result),
            vec![
                "web/overlay.kustomization.manifest.yaml",
                "web/crds.bundle.manifest.yaml",
            ]
        );
        assert_eq!(
            result.units[0].documents[0].raw(),
            "kind: ConfigMap\nmetadata:\n  name: ./overlay"
        );
    }

    #[tokio::test]
    async fn test_disabled_app_is_not_found() {
        let err = engine(Arc::new(FakeTools::default()))
            .build()
            .render_all(&config(), &Filter::app("legacy"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::error::EngineError::NotFound(NotFoundError::Disabled { .. })
        ));
    }

    #[tokio::test]
    async fn test_progress_events() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let sink = finished.clone();
        engine(Arc::new(FakeTools::default()))
            .on_event(move |event| {
                if let RenderEvent::UnitFinished { id, ok, .. } = event {
                    sink.lock().unwrap().push((id.to_string(), *ok));
                }
            })
            .build()
            .render_all(&config(), &Filter::all())
            .await
            .unwrap();

        let mut finished = finished.lock().unwrap().clone();
        finished.sort();
        assert_eq!(finished.len(), 5);
        assert!(finished.contains(&("web/release/broken".to_string(), false)));
    }
}

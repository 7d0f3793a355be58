use async_trait::async_trait;
use renderman_core::Release;
use std::sync::Arc;

use super::{Rendered, Renderer, ToolContext};
use crate::error::RenderError;
use crate::runner::Invocation;

/// Renders releases with `helm template` (chart mode) or
/// `helmfile template` (helmfile mode)
pub struct ReleaseRenderer {
    ctx: Arc<ToolContext>,
}

impl ReleaseRenderer {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    /// The command that renders `release`
    pub fn invocation(&self, release: &Release) -> Invocation {
        let ctx = &self.ctx;
        match (release.helmfile_path(), &release.chart) {
            (Some(helmfile), _) => Invocation::new(&ctx.tools.helmfile, &ctx.base_dir)
                .arg("template")
                .arg("--file")
                .arg(helmfile.to_string_lossy())
                .arg("--selector")
                .arg(format!("name={}", release.name))
                .flag("--skip-deps", ctx.skip_deps)
                .flag("--debug", ctx.debug),
            (None, chart) => {
                let chart = chart.as_ref();
                let version = chart.filter(|c| c.is_pinned()).map(|c| c.version.as_str());
                Invocation::new(&ctx.tools.helm, &ctx.base_dir)
                    .arg("template")
                    .arg(&release.name)
                    .arg(chart.map(|c| c.name.as_str()).unwrap_or_default())
                    .arg("--namespace")
                    .arg(&release.namespace)
                    .opt("--version", version)
                    .opt("--repo", chart.and_then(|c| c.repository.as_deref()))
                    .opt(
                        "--values",
                        release.values.as_ref().map(|p| p.to_string_lossy()),
                    )
                    .flag("--debug", ctx.debug)
            }
        }
    }
}

#[async_trait]
impl Renderer<Release> for ReleaseRenderer {
    async fn render(&self, release: &Release) -> Result<Rendered, RenderError> {
        let invocation = self.invocation(release);
        let output = self.ctx.runner.run(&invocation).await?;
        let mut rendered = Rendered::from_tool_output(invocation.tool(), output);

        if release.helmfile_path().is_none()
            && let Some(chart) = &release.chart
            && !chart.is_pinned()
        {
            rendered
                .warnings
                .insert(0, format!("chart version is not pinned for {}", chart.name));
        }

        Ok(rendered)
    }
}

use async_trait::async_trait;
use renderman_core::Kustomization;
use std::sync::Arc;

use super::{Rendered, Renderer, ToolContext};
use crate::error::RenderError;
use crate::runner::Invocation;

/// Renders kustomizations with `kustomize build <source>`
pub struct KustomizationRenderer {
    ctx: Arc<ToolContext>,
}

impl KustomizationRenderer {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    /// The source is passed through untouched so kustomize can resolve
    /// remote targets itself; local paths resolve against the working dir.
    pub fn invocation(&self, kustomization: &Kustomization) -> Invocation {
        Invocation::new(&self.ctx.tools.kustomize, &self.ctx.base_dir)
            .arg("build")
            .arg(&kustomization.source)
    }
}

#[async_trait]
impl Renderer<Kustomization> for KustomizationRenderer {
    async fn render(&self, kustomization: &Kustomization) -> Result<Rendered, RenderError> {
        let invocation = self.invocation(kustomization);
        let output = self.ctx.runner.run(&invocation).await?;
        Ok(Rendered::from_tool_output(invocation.tool(), output))
    }
}

//! CLI commands

pub mod apps;
pub mod check;
pub mod outputs;
pub mod preview;
pub mod update;

use renderman_core::{Filter, StackConfig, UnitKind};
use renderman_engine::{RenderEngine, RenderOptions, RenderResult};
use std::path::Path;

use crate::display;
use crate::error::Result;

/// Which units a command works on
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub app: Option<String>,
    pub kinds: Vec<UnitKind>,
}

impl Selection {
    pub fn filter(&self) -> Filter {
        let filter = match &self.app {
            Some(app) => Filter::app(app),
            None => Filter::all(),
        };
        filter.with_kinds(self.kinds.iter().copied())
    }
}

/// Load and validate the stack config
pub fn load_config(path: &Path) -> Result<StackConfig> {
    let config = StackConfig::load(path)?;
    tracing::debug!(
        path = %path.display(),
        apps = config.apps.len(),
        "Loaded config"
    );
    Ok(config)
}

/// Render the selected units, reporting progress unless `quiet`
pub async fn render(
    config: &StackConfig,
    selection: &Selection,
    options: RenderOptions,
    quiet: bool,
) -> Result<RenderResult> {
    let mut builder = RenderEngine::builder().options(options);
    if !quiet {
        builder = builder.on_event(display::display_progress);
    }

    let result = builder.build().render_all(config, &selection.filter()).await?;

    if !quiet {
        display::display_warnings(&result);
    }
    Ok(result)
}

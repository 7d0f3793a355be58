//! Check command - compare rendered output with the output tree

use renderman_engine::RenderOptions;
use renderman_sync::{DiffEngine, DiffReport};
use std::path::Path;

use super::{Selection, load_config, render};
use crate::display;
use crate::error::{CliError, Result};
use crate::exit_codes;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config_file: &Path,
    output_dir: &Path,
    selection: &Selection,
    options: RenderOptions,
    context: usize,
    json: bool,
    quiet: bool,
) -> Result<i32> {
    let config = load_config(config_file)?;
    let result = render(&config, selection, options, quiet || json).await?;
    let report = DiffEngine::new()
        .with_context(context)
        .compare(&result, output_dir)?;

    if json {
        let value = serde_json::json!({
            "in_sync": report.in_sync() && report.is_complete(),
            "summary": report.summary(),
            "files": report.files,
            "skipped": report.skipped,
            "unreadable": report.unreadable,
        });
        let text = serde_json::to_string_pretty(&value).map_err(|e| CliError::Io {
            message: e.to_string(),
        })?;
        println!("{}", text);
    } else {
        display::display_diff_report(&report);
        display::display_skipped(&report.skipped);
        display::display_unreadable(&report);
    }

    Ok(exit_code(&report))
}

/// Render failures take precedence over unreadable outputs, which take
/// precedence over differences
fn exit_code(report: &DiffReport) -> i32 {
    if !report.skipped.is_empty() {
        exit_codes::RENDER_ERROR
    } else if !report.unreadable.is_empty() {
        exit_codes::IO_ERROR
    } else if !report.in_sync() {
        exit_codes::OUT_OF_SYNC
    } else {
        exit_codes::SUCCESS
    }
}

//! Update command - render and write the output tree

use renderman_engine::RenderOptions;
use renderman_sync::WriteReport;
use std::path::Path;

use super::{Selection, load_config, render};
use crate::display;
use crate::error::Result;
use crate::exit_codes;

/// Write everything that rendered; failed units keep their old files
pub async fn run(
    config_file: &Path,
    output_dir: &Path,
    selection: &Selection,
    options: RenderOptions,
    quiet: bool,
) -> Result<i32> {
    let config = load_config(config_file)?;
    let result = render(&config, selection, options, quiet).await?;
    let report = renderman_sync::apply(&result, output_dir)?;

    display::display_write_report(&report);
    display::display_skipped(&report.skipped);

    Ok(exit_code(&report))
}

fn exit_code(report: &WriteReport) -> i32 {
    if !report.skipped.is_empty() {
        exit_codes::RENDER_ERROR
    } else if !report.failed.is_empty() {
        exit_codes::IO_ERROR
    } else {
        exit_codes::SUCCESS
    }
}

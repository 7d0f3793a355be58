//! Preview command - render and print without writing

use renderman_engine::RenderOptions;
use renderman_sync::skipped_units;
use std::io::Write;
use std::path::Path;

use super::{Selection, load_config, render};
use crate::display;
use crate::error::Result;
use crate::exit_codes;

/// Print every rendered unit as one YAML stream, each unit headed by its
/// output path
pub async fn run(
    config_file: &Path,
    selection: &Selection,
    options: RenderOptions,
    quiet: bool,
) -> Result<i32> {
    let config = load_config(config_file)?;
    let result = render(&config, selection, options, quiet).await?;

    {
        let mut out = std::io::stdout().lock();
        for (i, (path, unit)) in result.units.iter().enumerate() {
            if i > 0 {
                writeln!(out, "---")?;
            }
            writeln!(out, "# Output: {}", path.display())?;
            write!(out, "{}", unit.to_yaml())?;
        }
        out.flush()?;
    }

    display::display_skipped(&skipped_units(&result));

    Ok(if result.is_complete() {
        exit_codes::SUCCESS
    } else {
        exit_codes::RENDER_ERROR
    })
}

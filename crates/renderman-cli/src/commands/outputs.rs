//! Outputs command - list the files the config produces

use std::path::Path;

use super::{Selection, load_config};
use crate::error::Result;
use crate::exit_codes;

/// Print output paths, relative to the output directory, in declared order
pub fn run(config_file: &Path, selection: &Selection) -> Result<i32> {
    let config = load_config(config_file)?;
    let selected = config.select(&selection.filter())?;

    for unit in &selected.units {
        println!("{}", unit.path.display());
    }

    Ok(exit_codes::SUCCESS)
}

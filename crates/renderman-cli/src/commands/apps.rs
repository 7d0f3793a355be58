//! Apps command - list enabled apps

use std::path::Path;

use super::load_config;
use crate::error::Result;
use crate::exit_codes;

pub fn run(config_file: &Path) -> Result<i32> {
    let config = load_config(config_file)?;

    for app in config.enabled_apps() {
        println!("{}", app.name);
    }

    Ok(exit_codes::SUCCESS)
}

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

use crate::config::ConfigLoadOption;

use super::SubCommand;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None, disable_help_subcommand = true)]
pub struct Command {
    /// Logging
    #[arg(short = 'l', long, global = true, display_order = 1000)]
    pub logging: bool,

    /// Config file path
    #[arg(long, global = true, display_order = 1000)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub subcommand: SubCommand,
}

impl Command {
    pub fn init() -> Self {
        Self::parse()
    }

    pub fn config_load_option(&self) -> Result<ConfigLoadOption> {
        let option = if let Some(path) = &self.config_file {
            match path.try_exists() {
                Ok(true) => ConfigLoadOption::Path(path.clone()),
                Ok(false) => {
                    eprintln!("Config file not found: {:?}", path);

                    ConfigLoadOption::Default
                }
                Err(err) => {
                    eprintln!("Failed to check config file exists: {}", err);

                    ConfigLoadOption::Default
                }
            }
        } else {
            let path = xdg_config_home()?.join("config.yaml");

            match path.try_exists() {
                Ok(true) => ConfigLoadOption::Path(path),
                Ok(false) => ConfigLoadOption::Default,
                Err(err) => {
                    eprintln!("Failed to check config file exists: {}", err);

                    ConfigLoadOption::Default
                }
            }
        };

        Ok(option)
    }
}

fn xdg_config_home() -> Result<PathBuf> {
    match std::env::var_os("XDG_CONFIG_HOME").map(|s| PathBuf::from(s).join("pandachart")) {
        Some(path) => Ok(path),
        None => dirs::home_dir()
            .map(|home| home.join(".config").join("pandachart"))
            .ok_or_else(|| anyhow!("Failed to get home directory")),
    }
}

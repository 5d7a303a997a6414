use crate::errors::CliError;
use crate::GlobalOpts;
use anyhow::Result;
use clap::Subcommand;
use colored::*;
use luaexport_config::{Config, ConfigError};
use luaexport_logger as logger;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print every setting
    Show,
    /// Print one setting
    Get { key: String },
    /// Change one setting and save the file
    Set { key: String, value: String },
    /// Print the path of the configuration file
    Path,
}

pub fn handle_config(action: ConfigAction, opts: &GlobalOpts) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load().map_err(CliError::Config)?;
            println!("{}", "Configuration:".bold().green());
            if opts.verbosity_level() > 0 {
                println!("  {}: {}", "file".cyan(), Config::path().display());
            }
            for (key, value) in config.values_iter() {
                println!("  {}: {}", key.cyan(), value);
            }
        }
        ConfigAction::Get { key } => {
            let config = Config::load().map_err(CliError::Config)?;
            let value = config
                .get(&key)
                .ok_or_else(|| CliError::Config(ConfigError::UnknownKey(key.clone())))?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().map_err(CliError::Config)?;
            config.set(&key, &value).map_err(CliError::Config)?;
            config.save().map_err(CliError::Config)?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path => {
            let config_path = Config::path();
            logger::debug(&format!("Reading config from: {}", config_path.display()));
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

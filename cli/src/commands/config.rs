//! Config commands

use crate::config::Config;
use crate::output;
use crate::ConfigCommands;

const KEYS: [&str; 3] = ["api_url", "token", "default_format"];

pub fn handle(action: ConfigCommands, profile: Option<&str>) -> Result<(), String> {
    match action {
        ConfigCommands::Init => {
            let path = Config::config_path(profile)?;
            if path.exists() {
                return Err(format!("Configuration already exists at {}", path.display()));
            }
            Config::default().save(profile)?;
            output::success(&format!("Configuration initialized at {}", path.display()));
        }
        ConfigCommands::Set { key, value } => {
            if key == "default_format" && output::OutputFormat::parse(&value).is_none() {
                return Err(format!("Unknown output format: {}", value));
            }
            let mut config = Config::load(profile)?;
            config.set(&key, value)?;
            config.save(profile)?;
            output::success(&format!("Set {} successfully", key));
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(profile)?;
            let value = config.display(&key)?;
            println!("{}: {}", key, value.unwrap_or_else(|| "(not set)".into()));
        }
        ConfigCommands::List => {
            let config = Config::load(profile)?;
            for key in KEYS {
                let value = config.display(key)?;
                println!("{}: {}", key, value.unwrap_or_else(|| "(not set)".into()));
            }
        }
    }
    Ok(())
}

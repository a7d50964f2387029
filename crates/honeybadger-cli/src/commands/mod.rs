pub mod config;
pub mod notify;

pub use config::ConfigCommand;
pub use notify::NotifyCommand;

use clap::Args;
use honeybadger_core::{properties, ConfigOverrides};

/// Settings shared by every command. Anything left unset falls back to `honeybadger.*`
/// properties and `HONEYBADGER_*` environment variables.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Honeybadger API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Notices endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Process property to set before loading, as key=value (repeatable)
    #[arg(long = "property", short = 'D', value_parser = parse_property)]
    pub properties: Vec<(String, String)>,
}

impl SettingsArgs {
    /// Applies `--property` values to the registry and returns the explicit overrides
    pub fn apply(&self) -> ConfigOverrides {
        for (key, value) in &self.properties {
            properties::set_property(key.clone(), value.clone());
        }
        ConfigOverrides {
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            ..Default::default()
        }
    }
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_property() {
        assert_eq!(
            parse_property("honeybadger.priority=3"),
            Ok(("honeybadger.priority".to_string(), "3".to_string()))
        );
        assert_eq!(
            parse_property("url=http://x?a=b"),
            Ok(("url".to_string(), "http://x?a=b".to_string()))
        );
        assert!(parse_property("missing").is_err());
        assert!(parse_property("=value").is_err());
    }
}

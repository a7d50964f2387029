use super::SettingsArgs;
use clap::Args;
use colored::Colorize;
use honeybadger_core::{mask_sensitive, DispatchConfig};
use std::collections::BTreeSet;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(flatten)]
    pub settings: SettingsArgs,
}

impl ConfigCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = DispatchConfig::load(self.settings.apply())?;

        let api_key = if config.api_key.is_empty() {
            "(not set)".bright_red().to_string()
        } else {
            mask_sensitive(&config.api_key).bright_yellow().to_string()
        };
        let queue_capacity = if config.queue_capacity == usize::MAX {
            "unbounded".to_string()
        } else {
            config.queue_capacity.to_string()
        };

        println!();
        println!("{}", "Honeybadger notifier configuration".bright_white().bold());
        println!();
        print_row("API key", &api_key);
        print_row("Endpoint", &config.endpoint.to_string().bright_cyan().to_string());
        print_row("Async", &config.async_enabled.to_string());
        print_row("Workers", &config.worker_count.to_string());
        print_row("Worker priority", &config.worker_priority.to_string());
        print_row("Queue capacity", &queue_capacity);
        print_set("Excluded exceptions", &config.excluded_exception_prefixes);
        print_set("Excluded frames", &config.excluded_frame_prefixes);
        print_set("Excluded properties", &config.excluded_metadata_keys);
        println!();

        Ok(())
    }
}

fn print_row(label: &str, value: &str) {
    let label = if label.is_empty() {
        String::new()
    } else {
        format!("{}:", label)
    };
    println!("  {} {}", format!("{:<22}", label).bright_white().bold(), value);
}

fn print_set(label: &str, values: &BTreeSet<String>) {
    if values.is_empty() {
        print_row(label, "(none)");
        return;
    }
    for (index, value) in values.iter().enumerate() {
        print_row(if index == 0 { label } else { "" }, value);
    }
}

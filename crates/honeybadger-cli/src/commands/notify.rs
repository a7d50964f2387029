use super::SettingsArgs;
use clap::Args;
use colored::Colorize;
use honeybadger_client::{DispatchStatus, HoneybadgerClient};
use honeybadger_core::{mask_sensitive, DispatchConfig, ErrorRecord, Fault, StackFrame};
use tracing::{debug, info};

/// Type name of the faults sent by this command
const TEST_FAULT_TYPE: &str = "honeybadger_cli::TestNotice";

#[derive(Args)]
pub struct NotifyCommand {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Message of the test notice
    #[arg(long, short, default_value = "Test notice from the honeybadger CLI")]
    pub message: String,

    /// Reporter name, prefixed to the error class
    #[arg(long, default_value = "honeybadger-cli")]
    pub reporter: String,

    /// Submit through the background worker pool instead of inline
    #[arg(long = "async")]
    pub use_async: bool,
}

impl NotifyCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let mut overrides = self.settings.apply();
        overrides.async_enabled = Some(self.use_async);

        let config = DispatchConfig::load(overrides)?;
        if config.api_key.trim().is_empty() {
            anyhow::bail!("No API key configured, pass --api-key or set HONEYBADGER_API_KEY");
        }
        info!(
            "Sending test notice to {} with key {}",
            config.endpoint,
            mask_sensitive(&config.api_key)
        );

        let client = HoneybadgerClient::new(config)?;
        let submission = client.report(self.test_record());
        // drains the queue when running async
        client.shutdown();
        let status = submission.wait();
        debug!("Test notice finished: {:?}", status);

        print_status(&status);
        match status {
            DispatchStatus::Delivered { .. } => Ok(()),
            other => Err(anyhow::anyhow!("Test notice was not delivered: {}", other)),
        }
    }

    fn test_record(&self) -> ErrorRecord {
        let fault = Fault::new(TEST_FAULT_TYPE)
            .with_message(self.message.clone())
            .with_frame(
                StackFrame::new("honeybadger_cli::commands::notify::NotifyCommand", "execute")
                    .with_file(file!())
                    .with_line(line!()),
            );
        ErrorRecord::new(fault).with_reporter(self.reporter.clone())
    }
}

fn print_status(status: &DispatchStatus) {
    println!();
    if status.is_delivered() {
        println!("{} {}", "✓".bright_green().bold(), status.to_string().bright_white());
    } else {
        println!("{} {}", "✗".bright_red().bold(), status.to_string().bright_white());
    }
    println!();
}

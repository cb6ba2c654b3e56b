mod join;
mod logging;
mod report;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use wifiqr_core::Credential;

use report::{credential_json, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "wifiqr")]
#[command(about = "Join WiFi networks from scanned QR payloads", version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode a WIFI: payload and print the network details
    Parse(ParseArgs),
    /// Join networks from payloads given inline or one per line on stdin
    Join(JoinArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    payload: String,

    /// Print the password instead of masking it
    #[arg(long)]
    reveal: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct JoinArgs {
    /// Payload to join; stdin is read when absent
    #[arg(long)]
    pub payload: Option<String>,

    /// Stop after the first network joined
    #[arg(long)]
    pub once: bool,

    /// Print progress as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Scan/associate cycles per attempt
    #[arg(long, default_value_t = 5)]
    pub max_retries: u32,

    /// Backoff before the first retry, e.g. "500ms"
    #[arg(long, value_parser = humantime::parse_duration, default_value = "500ms")]
    pub initial_backoff: Duration,

    /// WiFi device to use, e.g. wlan0
    #[arg(long)]
    pub ifname: Option<String>,
}

impl JoinArgs {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Parse(args) => run_parse(&args),
        Commands::Join(args) => join::run(args).await,
    }
}

fn run_parse(args: &ParseArgs) -> Result<()> {
    let credential: Credential = args
        .payload
        .parse()
        .with_context(|| format!("not a WiFi payload: {:?}", args.payload))?;

    if args.json {
        println!("{}", credential_json(&credential, args.reveal));
    } else {
        println!("{}", credential.summary(args.reveal));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_join_defaults() {
        let cli = Cli::parse_from(["wifiqr", "join", "--once"]);
        let Commands::Join(args) = cli.command else {
            panic!("expected join");
        };
        assert!(args.once);
        assert_eq!(args.max_retries, 5);
        assert_eq!(args.initial_backoff, Duration::from_millis(500));
        assert_eq!(args.format(), OutputFormat::Human);
    }

    #[test]
    fn test_join_has_no_permission_flag() {
        let result = Cli::try_parse_from(["wifiqr", "join", "--on-denied", "settings"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_non_payload() {
        let args = ParseArgs {
            payload: "http://example.com".into(),
            reveal: false,
            json: false,
        };
        assert!(run_parse(&args).is_err());
    }
}

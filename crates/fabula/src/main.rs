mod api;
mod config;
mod server;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use fabula_logging::{init_tracing, LogFormat};

use crate::config::{AppConfig, Overrides};

#[derive(Parser, Debug)]
#[command(
    name = "fabula",
    about = "Interactive fiction server backed by a generative text model",
    version,
    author
)]
struct Cli {
    /// Path to a config file (default: ./fabula.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "FABULA_BIND")]
    bind: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model id
    #[arg(short, long, env = "FABULA_MODEL")]
    model: Option<String>,

    /// Directory holding saved stories
    #[arg(long, env = "FABULA_STORIES_DIR")]
    stories_dir: Option<PathBuf>,

    /// Parts a session story may hold before it must be ended
    #[arg(long)]
    max_story_parts: Option<usize>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Console log format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also write JSON logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            stories_dir: self.stories_dir.clone(),
            bind: self.bind.clone(),
            max_story_parts: self.max_story_parts,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env values become ordinary environment variables for clap to read
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _guard = init_tracing(&cli.log_level, cli.log_format.into(), cli.log_file.as_deref())
        .context("Failed to initialize logging")?;

    let config = AppConfig::load(cli.config.as_deref(), cli.overrides())?;
    server::serve(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "fabula",
            "--bind",
            "0.0.0.0:9000",
            "--max-story-parts",
            "4",
            "--log-format",
            "json",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.bind.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(overrides.max_story_parts, Some(4));
        assert!(matches!(cli.log_format, LogFormatChoice::Json));
        assert_eq!(cli.log_level, "info");
    }
}

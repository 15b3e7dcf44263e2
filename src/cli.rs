//! Command-line interface definitions for the protest monitor.
//!
//! All options can be provided via command-line flags or environment
//! variables; the API key is environment-only in practice since the binary
//! runs from cron.

use clap::Parser;

/// Command-line arguments for the protest monitor.
///
/// # Examples
///
/// ```sh
/// # Default run against ./protests.json
/// protest_monitor
///
/// # Custom ledger location and a pinned reference date
/// protest_monitor -l /var/lib/protests/protests.json --reference-date 2025-03-01
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the JSON event ledger (read at start, rewritten at end)
    #[arg(short, long, default_value = "protests.json")]
    pub ledger_path: String,

    /// API key for the extraction model endpoint
    #[arg(long, env = "ZHIPU_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible chat completions endpoint
    #[arg(long, env = "ZHIPU_API_BASE", default_value = "https://open.bigmodel.cn/api/paas/v4")]
    pub api_base_url: String,

    /// Model used for event extraction
    #[arg(long, env = "ZHIPU_MODEL", default_value = "glm-4.5-flash")]
    pub model: String,

    /// Reference date override (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub reference_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["protest_monitor"]);
        assert_eq!(cli.ledger_path, "protests.json");
        assert_eq!(cli.model, "glm-4.5-flash");
        assert!(cli.reference_date.is_none());
    }

    #[test]
    fn test_cli_short_ledger_flag() {
        let cli = Cli::parse_from(["protest_monitor", "-l", "/tmp/protests.json"]);
        assert_eq!(cli.ledger_path, "/tmp/protests.json");
    }

    #[test]
    fn test_cli_reference_date() {
        let cli = Cli::parse_from(["protest_monitor", "--reference-date", "2025-03-01"]);
        assert_eq!(cli.reference_date.as_deref(), Some("2025-03-01"));
    }
}

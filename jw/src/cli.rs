//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// jobwatch - progress tracking and next-step guidance for remote jobs
#[derive(Parser, Debug)]
#[command(
    name = "jw",
    about = "Wait on multi-phase remote jobs with a monotonic progress bar",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Block until a job reaches a terminal state, drawing progress on stderr
    Wait {
        /// Job ID (or session ID for table-maker runs)
        job_id: String,

        /// Give up after this many seconds and print the last known state
        #[arg(short, long)]
        timeout_secs: Option<u64>,

        /// Seconds between poll cycles
        #[arg(short, long)]
        poll_interval_secs: Option<u64>,

        /// Do not draw the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Block until the AI finishes its conversation turn
    WaitConversation {
        /// Conversation ID
        conversation_id: String,

        /// Session the conversation belongs to
        #[arg(short, long)]
        session: String,

        /// Typical AI response time in seconds
        #[arg(short, long)]
        expected_secs: Option<u64>,

        #[arg(short, long)]
        timeout_secs: Option<u64>,

        #[arg(short, long)]
        poll_interval_secs: Option<u64>,

        #[arg(short, long)]
        quiet: bool,
    },

    /// Fetch a job's status once
    Status {
        /// Job ID
        job_id: String,
    },

    /// Fetch a job's progress messages once
    Messages {
        /// Job ID
        job_id: String,

        /// Only messages after this sequence number
        #[arg(short, long)]
        since: Option<u64>,
    },

    /// Recommend the next call for an operation's response
    Recommend {
        /// Operation that produced the response (e.g. get_job_status)
        operation: String,

        /// Response JSON; read from stdin when omitted
        #[arg(short, long)]
        payload: Option<String>,
    },
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "plain" => Ok(Self::Text),
            _ => Err(format!("Unknown format: {}. Use 'json' or 'text'", s)),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobwatch")
        .join("logs")
        .join("jobwatch.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("plain".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parse_wait_command() {
        let cli = Cli::try_parse_from(["jw", "wait", "job-1", "--timeout-secs", "30", "-f", "text"]).unwrap();

        assert_eq!(cli.format, OutputFormat::Text);
        match cli.command {
            Command::Wait {
                job_id,
                timeout_secs,
                poll_interval_secs,
                quiet,
            } => {
                assert_eq!(job_id, "job-1");
                assert_eq!(timeout_secs, Some(30));
                assert_eq!(poll_interval_secs, None);
                assert!(!quiet);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_wait_conversation_requires_session() {
        assert!(Cli::try_parse_from(["jw", "wait-conversation", "c1"]).is_err());

        let cli = Cli::try_parse_from(["jw", "wait-conversation", "c1", "--session", "s1"]).unwrap();
        assert!(matches!(cli.command, Command::WaitConversation { ref session, .. } if session == "s1"));
    }
}

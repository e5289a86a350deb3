use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use jobwatch::cli::{Cli, Command, OutputFormat};
use jobwatch::config::Config;
use jobwatch::guidance::{Operation, recommend, recommend_named};
use jobwatch::output;
use jobwatch::progress::{NoopSink, ProgressSink, TerminalSink};
use jobwatch::source::{HttpSource, JobSource};
use jobwatch::wait::{ConversationWaitOptions, ConversationWaiter, JobWaiter, WaitOptions};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobwatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("jobwatch.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    let value = match cli.command {
        Command::Wait {
            job_id,
            timeout_secs,
            poll_interval_secs,
            quiet,
        } => {
            debug!(%job_id, ?timeout_secs, ?poll_interval_secs, quiet, "main: matched Wait command");
            cmd_wait(&config, &job_id, timeout_secs, poll_interval_secs, quiet).await?
        }
        Command::WaitConversation {
            conversation_id,
            session,
            expected_secs,
            timeout_secs,
            poll_interval_secs,
            quiet,
        } => {
            debug!(%conversation_id, %session, "main: matched WaitConversation command");
            let mut options = ConversationWaitOptions::from(&config.conversation);
            if let Some(secs) = expected_secs {
                options.expected = Duration::from_secs(secs);
            }
            if let Some(secs) = timeout_secs {
                options.timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = poll_interval_secs {
                options.poll_interval = Duration::from_secs(secs);
            }
            cmd_wait_conversation(&config, &conversation_id, &session, options, quiet).await?
        }
        Command::Status { job_id } => {
            debug!(%job_id, "main: matched Status command");
            cmd_status(&config, &job_id).await?
        }
        Command::Messages { job_id, since } => {
            debug!(%job_id, ?since, "main: matched Messages command");
            cmd_messages(&config, &job_id, since).await?
        }
        Command::Recommend { operation, payload } => {
            debug!(%operation, "main: matched Recommend command");
            cmd_recommend(&operation, payload)?
        }
    };

    let rendered = match cli.format {
        OutputFormat::Json => output::render_json(&value),
        OutputFormat::Text => output::render_text(&value),
    };
    println!("{}", rendered);
    Ok(())
}

fn progress_sink(label: &str, quiet: bool) -> Arc<dyn ProgressSink> {
    if quiet {
        Arc::new(NoopSink)
    } else {
        Arc::new(TerminalSink::new(label))
    }
}

fn http_source(config: &Config) -> Result<Arc<HttpSource>> {
    let source = HttpSource::from_config(&config.api).context("Failed to create API client")?;
    info!(base_url = %source.base_url(), "Using API");
    Ok(Arc::new(source))
}

/// Wait for a job to finish
async fn cmd_wait(
    config: &Config,
    job_id: &str,
    timeout_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
    quiet: bool,
) -> Result<Value> {
    debug!(%job_id, "cmd_wait: called");
    let mut options = WaitOptions::from(&config.wait);
    if let Some(secs) = timeout_secs {
        options.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = poll_interval_secs {
        options.poll_interval = Duration::from_secs(secs);
    }

    let waiter = JobWaiter::new(http_source(config)?, progress_sink(job_id, quiet), &config.wait).with_options(options);
    let outcome = waiter.wait(job_id).await;
    Ok(outcome.to_value())
}

/// Wait for an AI conversation turn to finish
async fn cmd_wait_conversation(
    config: &Config,
    conversation_id: &str,
    session_id: &str,
    options: ConversationWaitOptions,
    quiet: bool,
) -> Result<Value> {
    debug!(%conversation_id, %session_id, "cmd_wait_conversation: called");
    let waiter = ConversationWaiter::new(http_source(config)?, progress_sink(conversation_id, quiet), options);
    let outcome = waiter.wait(conversation_id, session_id).await;
    Ok(outcome.to_value())
}

/// Fetch job status once
async fn cmd_status(config: &Config, job_id: &str) -> Result<Value> {
    debug!(%job_id, "cmd_status: called");
    let source = http_source(config)?;
    let state = source.get_status(job_id).await.context("Failed to fetch job status")?;
    let value = state.to_value();
    let guidance = recommend(Operation::GetJobStatus, &value);
    Ok(output::annotate(value, &guidance, None))
}

/// Fetch job messages once
async fn cmd_messages(config: &Config, job_id: &str, since: Option<u64>) -> Result<Value> {
    debug!(%job_id, ?since, "cmd_messages: called");
    let source = http_source(config)?;
    let batch = source
        .get_messages(job_id, since)
        .await
        .context("Failed to fetch job messages")?;

    let mut value = serde_json::to_value(&batch).context("Failed to serialize messages")?;
    value["job_id"] = Value::String(job_id.to_string());
    let guidance = recommend(Operation::GetJobMessages, &value);
    Ok(output::annotate(value, &guidance, None))
}

/// Recommend the next call without touching the network
fn cmd_recommend(operation: &str, payload: Option<String>) -> Result<Value> {
    debug!(%operation, "cmd_recommend: called");
    let raw = match payload {
        Some(raw) => raw,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read payload from stdin")?;
            buf
        }
    };
    let response: Value = serde_json::from_str(&raw).context("Payload is not valid JSON")?;
    Ok(recommend_named(operation, &response).to_value())
}

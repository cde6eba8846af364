//! Command-line front end.
//!
//! ```ignore
//! use hostchat::cli::{parse_args, run_cli_command};
//!
//! let args = parse_args(std::env::args());
//! let ok = run_cli_command(args).await?;
//! ```

pub mod args;

pub use args::{parse_args, CliArgs, CliCommand, USAGE};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use std::io::Write;
use std::time::{Duration, Instant};

use crate::adapters::ReqwestHttpClient;
use crate::config::ClientConfig;
use crate::host::{ConversationRequest, HostClient, InterruptRequest};
use crate::render::{Projector, Verbosity};
use crate::session::SessionState;
use crate::turn::{cancellation, TurnDriver, TurnOptions};

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file and environment, then the command-line flags.
pub fn resolve_config(args: &CliArgs) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(url) = &args.base_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(verbosity) = args.verbosity {
        config = config.with_verbosity(verbosity);
    }
    if let Some(host) = &args.host {
        config = config.with_host(host.clone());
    }
    Ok(config)
}

/// Run the parsed command. `Ok(false)` means the command ran but the turn
/// did not complete, so the process should exit non-zero.
pub async fn run_cli_command(args: CliArgs) -> Result<bool> {
    match &args.command {
        CliCommand::Version => {
            println!("hostchat {}", VERSION);
            Ok(true)
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(true)
        }
        CliCommand::Invalid(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            Ok(false)
        }
        CliCommand::Health => {
            let host = client(&resolve_config(&args)?)?;
            let body = host.health().await.wrap_err("Health check failed")?;
            print_json(&body)?;
            Ok(true)
        }
        CliCommand::Status => {
            let host = client(&resolve_config(&args)?)?;
            let body = host.status().await.wrap_err("Status request failed")?;
            print_json(&body)?;
            Ok(true)
        }
        CliCommand::Interrupt { stream_id } => {
            let host = client(&resolve_config(&args)?)?;
            let body = host
                .interrupt(stream_id, &InterruptRequest::default())
                .await
                .wrap_err_with(|| format!("Could not interrupt stream {}", stream_id))?;
            print_json(&body)?;
            Ok(true)
        }
        CliCommand::Ask { prompt } => {
            let config = resolve_config(&args)?;
            ask(&config, prompt).await
        }
    }
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn client(config: &ClientConfig) -> Result<HostClient> {
    let http = ReqwestHttpClient::with_connect_timeout(CONNECT_TIMEOUT)?;
    Ok(HostClient::with_http(config.base_url.clone(), http)
        .with_timeout_secs(config.request_timeout.as_secs()))
}

fn print_json(body: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(body)?);
    Ok(())
}

/// Build the request for `prompt` from the configured routing fields.
pub fn build_request(config: &ClientConfig, prompt: &str) -> ConversationRequest {
    let mut request = ConversationRequest::prompt(prompt);
    if let Some(host) = &config.host {
        request = request.with_host(host.clone());
    }
    if let Some(backstory) = &config.backstory {
        request = request.with_backstory(backstory.clone());
    }
    if let Some(guidance) = &config.guidance {
        request = request.with_guidance(guidance.clone());
    }
    request
}

/// Stream one turn to stdout. Ctrl-C cancels it.
async fn ask(config: &ClientConfig, prompt: &str) -> Result<bool> {
    let driver = TurnDriver::new(client(config)?, TurnOptions::from_config(config));
    let projector =
        Projector::new(config.verbosity).with_long_running_after(config.long_running_after);
    let request = build_request(config, prompt);

    let (handle, signal) = cancellation();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel("Cancelled by user");
        }
    });

    let mut seen = 0;
    let mut stdout = std::io::stdout();
    let session = driver
        .run(&request, signal, |session| {
            let projection = projector.project(session, Instant::now());
            for fragment in projection.fragments_since(seen) {
                // A closed stdout is not worth failing the turn over
                let _ = writeln!(stdout, "{}", fragment.text);
            }
            seen = projection.fragments.len();
            if config.verbosity != Verbosity::Minimal {
                if let Some(line) = projection.still_working {
                    eprintln!("{}", line);
                }
            }
            let _ = stdout.flush();
        })
        .await;
    ctrl_c.abort();

    let projection = projector.project(&session, Instant::now());
    let summary = projection
        .summary
        .ok_or_else(|| eyre!("Turn ended without reaching a final state"))?;
    eprintln!("\n{}", summary.text());
    if let Some(stream_id) = session.stream_id() {
        tracing::debug!(stream_id, "Turn finished");
    }
    Ok(session.state() == SessionState::Completed)
}

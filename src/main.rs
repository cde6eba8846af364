use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use hostchat::cli::{parse_args, run_cli_command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Logs go to stderr so they never interleave with the answer on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args());
    if !run_cli_command(args).await? {
        std::process::exit(1);
    }
    Ok(())
}

//! Command-line argument parsing.
//!
//! Flags are matched by hand; anything that is not a flag becomes part of
//! the prompt, so `hostchat how many orders today` needs no quoting.

use std::path::PathBuf;

use crate::render::Verbosity;

/// What the binary should do.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Print the version
    Version,
    /// Print usage
    Help,
    /// `GET /health`
    Health,
    /// `GET /status`
    Status,
    /// Ask the host to stop a running stream
    Interrupt { stream_id: String },
    /// Stream one prompt
    Ask { prompt: String },
    /// The arguments could not be understood
    Invalid(String),
}

/// Parsed command plus the flags that layer over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub command: CliCommand,
    pub base_url: Option<String>,
    pub verbosity: Option<Verbosity>,
    pub host: Option<String>,
    pub config: Option<PathBuf>,
}

pub const USAGE: &str = "\
Usage: hostchat [OPTIONS] <prompt...>
       hostchat --health | --status | --interrupt <stream_id> | --version

Options:
  --base-url <URL>       Agent host API root
  --verbosity <LEVEL>    minimal, normal or detailed
  -q, --quiet            Same as --verbosity minimal
  -v, --verbose          Same as --verbosity detailed
  --host <NAME>          Route the conversation to a named host
  --config <PATH>        Read configuration from PATH
  -h, --help             Show this message
  -V, --version          Show the version";

/// Parse `std::env::args()`-style arguments. The first item is the program
/// name and is skipped.
///
/// ```
/// use hostchat::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["hostchat".to_string(), "--health".to_string()];
/// assert_eq!(parse_args(args.into_iter()).command, CliCommand::Health);
/// ```
pub fn parse_args<I>(args: I) -> CliArgs
where
    I: Iterator<Item = String>,
{
    let mut parsed = CliArgs {
        command: CliCommand::Help,
        base_url: None,
        verbosity: None,
        host: None,
        config: None,
    };
    let mut command = None;
    let mut words: Vec<String> = Vec::new();
    let mut args = args.skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return with_command(parsed, CliCommand::Version),
            "--help" | "-h" => return with_command(parsed, CliCommand::Help),
            "--health" => command = Some(CliCommand::Health),
            "--status" => command = Some(CliCommand::Status),
            "--quiet" | "-q" => parsed.verbosity = Some(Verbosity::Minimal),
            "--verbose" | "-v" => parsed.verbosity = Some(Verbosity::Detailed),
            "--interrupt" | "--base-url" | "--verbosity" | "--host" | "--config" => {
                let Some(value) = args.next() else {
                    return invalid(parsed, format!("{} needs a value", arg));
                };
                match arg.as_str() {
                    "--interrupt" => command = Some(CliCommand::Interrupt { stream_id: value }),
                    "--base-url" => parsed.base_url = Some(value),
                    "--host" => parsed.host = Some(value),
                    "--config" => parsed.config = Some(PathBuf::from(value)),
                    _ => match value.parse() {
                        Ok(verbosity) => parsed.verbosity = Some(verbosity),
                        Err(e) => return invalid(parsed, format!("{}", e)),
                    },
                }
            }
            "--" => {
                words.extend(args.by_ref());
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return invalid(parsed, format!("Unknown option: {}", flag));
            }
            _ => words.push(arg),
        }
    }

    let command = match command {
        Some(command) if words.is_empty() => command,
        Some(_) => CliCommand::Invalid("A prompt cannot be combined with that option".to_string()),
        None if words.is_empty() => CliCommand::Help,
        None => CliCommand::Ask {
            prompt: words.join(" "),
        },
    };
    with_command(parsed, command)
}

fn with_command(mut args: CliArgs, command: CliCommand) -> CliArgs {
    args.command = command;
    args
}

fn invalid(args: CliArgs, message: String) -> CliArgs {
    with_command(args, CliCommand::Invalid(message))
}

use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};

/// Options that take a separate value word when written without `=`.
const VALUE_FLAGS: &[&str] = &["--rc", "--rc-file", "--data"];

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tasklists",
    version,
    about = "Named task lists with check-off and local persistence",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Override a setting for this run; repeatable.
    #[arg(long = "rc", value_name = "KEY=VALUE", value_parser = parse_override, action = ArgAction::Append)]
    pub rc_overrides: Vec<(String, String)>,

    #[arg(long = "rc-file")]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

/// `key=value` or `key:value`, with an optional `rc.` prefix. The first
/// separator wins so values may contain either character.
pub fn parse_override(raw: &str) -> anyhow::Result<(String, String)> {
    let body = raw.strip_prefix("rc.").unwrap_or(raw);
    let (key, value) = body
        .split_once(['=', ':'])
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {raw}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("missing setting name in: {raw}"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

pub fn log_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        _ => "trace",
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level(verbose, quiet)))
        .map_err(|e| anyhow!("invalid RUST_LOG filter: {e}"))?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = installed {
        debug!(error = %err, "tracing subscriber already set");
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

/// Pulls `rc.key=value` words that appear before the command word. Everything
/// from the command word on belongs to the command, so `add rc.x=y` keeps
/// `rc.x=y` as part of the task name.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides = Vec::new();

    let mut words = raw.iter();
    cleaned.extend(words.next().cloned());

    while let Some(word) = words.next() {
        let text = word.to_string_lossy();
        if text.starts_with("rc.") {
            let (key, value) = parse_override(&text)?;
            debug!(%key, %value, "captured positional override");
            overrides.push((key, value));
            continue;
        }

        cleaned.push(word.clone());
        if text == "--" {
            break;
        }
        if VALUE_FLAGS.iter().any(|flag| *flag == text) {
            cleaned.extend(words.next().cloned());
        } else if !text.starts_with('-') {
            break;
        }
    }
    cleaned.extend(words.cloned());

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    /// No command word means `show`.
    #[tracing::instrument(skip(rest))]
    pub fn parse(rest: Vec<OsString>) -> anyhow::Result<Self> {
        let mut tokens = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned());

        let Some(first) = tokens.next() else {
            return Ok(Self {
                command: "show".to_string(),
                command_args: vec![],
            });
        };

        let known = known_command_names();
        let command = expand_command_abbrev(&first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?;
        debug!(token = %first, %command, "resolved command");

        Ok(Self {
            command: command.to_string(),
            command_args: tokens.collect(),
        })
    }
}

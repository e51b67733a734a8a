mod commands;
mod config;

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::fmt::{format::Format as FmtFormat, writer::MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;
use vaultmq_core::MessageType;

use crate::config::{CliConfig, CliOverrides, LogFormat, UnknownTypePolicy};

#[derive(Parser, Debug)]
#[command(
    name = "vaultmq",
    version,
    about = "Inspect and encode vault transaction outcome messages"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Args, Debug, Default, Clone)]
struct ConfigArgs {
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
    #[arg(long, global = true)]
    unknown_types: Option<UnknownTypePolicy>,
    #[arg(long, global = true)]
    pretty: Option<bool>,
}

impl ConfigArgs {
    fn into_overrides(self) -> CliOverrides {
        CliOverrides {
            log_format: self.log_format,
            unknown_types: self.unknown_types,
            pretty: self.pretty,
        }
    }
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// List every message type with its wire value.
    Types,
    /// Decode newline-delimited envelopes and print one record per envelope.
    Inspect {
        /// Input file; reads stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Wrap a payload object into an envelope after validating its shape.
    Encode {
        /// Message type name, e.g. vault_invest or token-transfer.
        #[arg(long = "type")]
        kind: MessageType,
        /// Input file; reads stdin when omitted.
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load()?;
    config.apply_overrides(&cli.config.clone().into_overrides());

    init_tracing(&config);
    run_command(&config, cli.command)
}

fn run_command(config: &CliConfig, command: CliCommand) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        CliCommand::Types => commands::list_types(&mut out, config)?,
        CliCommand::Inspect { file } => {
            commands::inspect(open_input(file.as_ref())?, &mut out, config)?;
        }
        CliCommand::Encode { kind, file } => {
            commands::encode(kind, open_input(file.as_ref())?, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn init_tracing(config: &CliConfig) {
    // Respect RUST_LOG if set, otherwise default to info for our crates.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vaultmq=info,vaultmq_core=info"));

    let json = matches!(config.log_format, LogFormat::Json);
    let subscriber = build_subscriber(json, env_filter, io::stderr);

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {err}");
    }
}

fn build_subscriber<W>(
    json: bool,
    env_filter: EnvFilter,
    make_writer: W,
) -> Box<dyn tracing::Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    if json {
        let format = FmtFormat::default()
            .with_target(true)
            .with_level(true)
            .json();

        Box::new(
            tracing_subscriber::registry().with(env_filter).with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .event_format(format)
                    .with_writer(make_writer),
            ),
        )
    } else {
        let format = FmtFormat::default().with_target(true).with_level(true);

        Box::new(
            tracing_subscriber::registry().with(env_filter).with(
                tracing_subscriber::fmt::layer()
                    .event_format(format)
                    .with_writer(make_writer),
            ),
        )
    }
}

//! REWIND CLI
//!
//! Replays a trace file and dumps what every entity saw.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use rewind_core::{BaseOperation, DumpOptions};
use rewind_replay::{Driver, ReplayConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rewind")]
#[command(about = "REWIND - post-mortem trace replay", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace and dump every entity
    Replay {
        /// Path to the trace file
        #[arg(short, long)]
        input: PathBuf,
        /// Output file; defaults to the input path with `_out` appended
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Registry configuration (JSON); supplies the message classes
        #[arg(short, long)]
        config: PathBuf,
        /// Replay only, write no dump
        #[arg(long)]
        no_dump: bool,
        /// Dump option passed to every capability, as `key=value`
        #[arg(short = 'O', long = "dump-option", value_parser = parse_option)]
        dump_options: Vec<(String, String)>,
    },
    /// Compose every configured kind and print the result
    Check {
        /// Registry configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn parse_option(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push("_out");
    PathBuf::from(name)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ReplayConfig> {
    match path {
        Some(path) => ReplayConfig::load(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display())),
        None => Ok(ReplayConfig::default()),
    }
}

fn replay(
    input: &Path,
    output: Option<PathBuf>,
    config: &Path,
    no_dump: bool,
    options: DumpOptions,
) -> Result<()> {
    let mut driver: Driver = load_config(Some(config))?.build()?;
    driver.open_trace(input)?;
    let summary = driver
        .read_trace()
        .wrap_err_with(|| format!("replay of {} aborted", input.display()))?;
    println!("{}", summary);
    for (kind, count) in &summary.stats.dropped_by_kind {
        println!("  dropped {}: {}", kind, count);
    }

    if no_dump {
        return driver.close().map_err(Into::into);
    }

    // Opened only now so an aborted replay leaves no dump behind
    let output = output.unwrap_or_else(|| default_output_path(input));
    driver.open_output(&output)?;
    driver.dump_all(&options)?;
    driver.close()?;
    info!(output = %output.display(), "dump written");
    println!("Dump written to {}", output.display());
    Ok(())
}

fn check(config: Option<&Path>) -> Result<()> {
    let driver = load_config(config)?.build()?;
    let registry = driver.registry();
    if registry.is_empty() {
        return Err(eyre!("no entity kinds configured"));
    }

    for kind in registry.kinds() {
        println!("{} {}", kind.code(), kind.label());
        for op in BaseOperation::ALL {
            println!("  {}: {}", op.name(), kind.contributor_names(op).join(", "));
        }
        for (name, symbol) in kind.symbols() {
            println!("  {} = {} (from {})", name, symbol.value, symbol.owner);
        }
    }
    println!("{} message classes", driver.classifier().len());
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Replay {
            input,
            output,
            config,
            no_dump,
            dump_options,
        } => replay(
            &input,
            output,
            &config,
            no_dump,
            dump_options.into_iter().collect(),
        ),
        Commands::Check { config } => check(config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/run.trace")),
            PathBuf::from("/tmp/run.trace_out")
        );
    }

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("limit=10").unwrap(),
            ("limit".to_string(), "10".to_string())
        );
        assert!(parse_option("limit").is_err());
        assert!(parse_option("=3").is_err());
    }

    #[test]
    fn test_cli_parses_replay() {
        let cli = Cli::try_parse_from([
            "rewind", "-vv", "replay", "--input", "t.log", "--config", "r.json", "--no-dump", "-O",
            "limit=2",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Replay {
                input,
                output,
                config,
                no_dump,
                dump_options,
            } => {
                assert_eq!(input, PathBuf::from("t.log"));
                assert_eq!(config, PathBuf::from("r.json"));
                assert!(output.is_none());
                assert!(no_dump);
                assert_eq!(dump_options, vec![("limit".to_string(), "2".to_string())]);
            }
            Commands::Check { .. } => panic!("expected replay"),
        }
    }

    #[test]
    fn test_replay_requires_config() {
        let err = Cli::try_parse_from(["rewind", "replay", "--input", "t.log"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_replay_writes_default_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run.trace");
        let config = dir.path().join("replay.json");
        std::fs::write(&input, "10 : T 3 0x1(3) -> 0x2(4) hello\n").unwrap();
        std::fs::write(&config, r#"{ "messages": [ { "kind": "3", "class": "spawn" } ] }"#).unwrap();

        replay(&input, None, &config, false, DumpOptions::new()).unwrap();

        let dump = std::fs::read_to_string(dir.path().join("run.trace_out")).unwrap();
        assert!(dump.contains("--- ENTITY 0x2 ---"));
        assert!(dump.contains("spawn(kind=3"));
    }

    #[test]
    fn test_aborted_replay_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.trace");
        let config = dir.path().join("replay.json");
        std::fs::write(&input, "garbage\n").unwrap();
        std::fs::write(&config, r#"{ "messages": [ { "kind": "3", "class": "spawn" } ] }"#).unwrap();

        assert!(replay(&input, None, &config, false, DumpOptions::new()).is_err());
        assert!(!dir.path().join("bad.trace_out").exists());
    }
}

//! `bpa-stepper` command-line tooling: payload normalization, account diffs
//! and configuration checks.

use anyhow::{bail, Context, Result};
use bpa_model::{AccountSet, RecordKind};
use bpa_normalize::{changed_slots, Normalizer};
use bpa_stepper::StepperConfig;
use clap::{value_parser, Arg, ArgMatches, Command};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Command::new("bpa-stepper")
        .version(bpa_stepper::VERSION)
        .about("Build Partner Asset wizard tooling")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Stepper configuration file (TOML)"),
        )
        .subcommand(
            Command::new("normalize")
                .about("Print the form shape of a wire payload")
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .value_parser(value_parser!(RecordKind))
                        .help("Record kind, e.g. details, account, payment-plan"),
                )
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file holding one record or a list"),
                ),
        )
        .subcommand(
            Command::new("diff-accounts")
                .about("Print the account slots that differ between two payloads")
                .arg(
                    Arg::new("current")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("persisted")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate a stepper configuration file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("normalize", args)) => {
            let normalizer = normalizer(args)?;
            let kind = *required::<RecordKind>(args, "kind")?;
            let wire = read_json(required::<PathBuf>(args, "file")?)?;
            let form = normalize(&normalizer, kind, &wire)?;
            println!("{}", serde_json::to_string_pretty(&form)?);
        }
        Some(("diff-accounts", args)) => {
            let normalizer = normalizer(args)?;
            let current = read_accounts(&normalizer, required::<PathBuf>(args, "current")?)?;
            let persisted = read_accounts(&normalizer, required::<PathBuf>(args, "persisted")?)?;

            let changed = changed_slots(&current, &persisted);
            if changed.is_empty() {
                println!("no changes");
            }
            for slot in changed {
                println!("{slot}");
            }
        }
        Some(("check-config", args)) => {
            let path = required::<PathBuf>(args, "file")?;
            let config = StepperConfig::from_file(path)
                .with_context(|| format!("invalid configuration {}", path.display()))?;
            println!("{}: ok", path.display());
            println!("  language: {}", config.language);
            println!("  error notices: {}ms", config.error_notice_ttl_ms);
            println!("  success notices: {}ms", config.success_notice_ttl_ms);
            println!("  draft cache key: {}", config.draft_cache_key);
            println!("  utc offset: {}min", config.utc_offset_minutes);
        }
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("no command given"),
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, id: &str) -> Result<&'a T> {
    args.get_one::<T>(id)
        .with_context(|| format!("missing argument {id}"))
}

fn normalizer(args: &ArgMatches) -> Result<Normalizer> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => StepperConfig::from_file(path)
            .with_context(|| format!("invalid configuration {}", path.display()))?,
        None => StepperConfig::default(),
    };
    Ok(Normalizer::new(config.offset()?))
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn read_accounts(normalizer: &Normalizer, path: &Path) -> Result<AccountSet> {
    let wire = read_json(path)?;
    normalizer
        .accounts_to_form(&wire)
        .with_context(|| format!("{} is not an account list", path.display()))
}

/// Form shape of a payload as JSON, dispatching on kind and payload shape
fn normalize(normalizer: &Normalizer, kind: RecordKind, wire: &Value) -> Result<Value> {
    let form = match kind {
        RecordKind::Account => serde_json::to_value(normalizer.accounts_to_form(wire)?)?,
        RecordKind::FinancialSummary => serde_json::to_value(normalizer.summary_to_form(wire)?)?,
        _ if wire.is_object() && !wire.get("content").is_some_and(Value::is_array) => {
            serde_json::to_value(normalizer.to_form(kind, wire)?)?
        }
        _ => serde_json::to_value(normalizer.rows_to_form(kind, wire)?)?,
    };
    Ok(form)
}

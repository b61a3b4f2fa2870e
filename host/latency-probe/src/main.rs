// Licensed under the Apache-2.0 license

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use latency_probe::transports::LoopbackClient;
use latency_probe::{measure_performance, OutputFormat, ProbeConfig, Report, Scenario};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use syscounter::ArchCounter;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// In-process trusted application.
    Loopback,
    /// System TEE through libteec.
    Teec,
}

impl Backend {
    const fn native() -> Self {
        if cfg!(feature = "optee") {
            Backend::Teec
        } else {
            Backend::Loopback
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "latency-probe",
    author,
    version,
    about = "Measure the latency of crossings into a trusted application"
)]
struct Cli {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scenario to run; repeat to select several (default: all)
    #[arg(short = 's', long = "scenario", value_enum)]
    scenarios: Vec<Scenario>,

    /// Report format
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormat>,

    /// Trusted application UUID
    #[arg(long)]
    uuid: Option<Uuid>,

    /// TEE to talk to
    #[arg(short = 'b', long, value_enum, default_value_t = Backend::native())]
    backend: Backend,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(short = 'l', long)]
    log_level: Option<LevelFilter>,
}

impl Cli {
    fn resolve_config(&self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::load(path)?,
            None => ProbeConfig::default(),
        };
        if !self.scenarios.is_empty() {
            config.scenarios = self.scenarios.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(uuid) = self.uuid {
            config.ta_uuid = uuid;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    SimpleLogger::new()
        .with_level(config.log_level)
        .init()
        .context("Failed to initialize logger")?;

    let counter = ArchCounter::new();
    let report = match cli.backend {
        Backend::Loopback => {
            measure_performance(&mut LoopbackClient::new(counter), &counter, &config)?
        }
        Backend::Teec => run_teec(&counter, &config)?,
    };

    match config.format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!(
            "{}",
            report.to_json().context("Failed to serialize report")?
        ),
    }
    Ok(())
}

#[cfg(feature = "optee")]
fn run_teec(counter: &ArchCounter, config: &ProbeConfig) -> Result<Report> {
    let mut client = latency_probe::transports::TeecClient::new();
    Ok(measure_performance(&mut client, counter, config)?)
}

#[cfg(not(feature = "optee"))]
fn run_teec(_counter: &ArchCounter, _config: &ProbeConfig) -> Result<Report> {
    anyhow::bail!("the teec backend needs the `optee` feature")
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("latency-probe: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latency_probe::LATENCY_TA_UUID;
    use std::io::Write;

    fn config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
scenarios = ["open-session"]
format = "text"
log_level = "warn"
"#
        )
        .unwrap();
        file
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(["latency-probe"].iter().chain(args)).unwrap()
    }

    #[test]
    fn test_file_values_without_flags() {
        let file = config_file();
        let path = file.path().to_str().unwrap();
        let config = parse(&["--config", path]).resolve_config().unwrap();
        assert_eq!(config.scenarios, [Scenario::OpenSession]);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.log_level, LevelFilter::Warn);
        assert_eq!(config.ta_uuid, LATENCY_TA_UUID);
    }

    #[test]
    fn test_flags_override_file() {
        let file = config_file();
        let path = file.path().to_str().unwrap();
        let cli = parse(&[
            "--config",
            path,
            "--scenario",
            "nested-syscall",
            "-s",
            "invoke-command",
            "--format",
            "json",
            "--uuid",
            "00000000-0000-0000-0000-000000001234",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(
            config.scenarios,
            [Scenario::NestedSyscall, Scenario::InvokeCommand]
        );
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.ta_uuid, Uuid::from_u128(0x1234));
        // Not given on the command line, so the file's value stands.
        assert_eq!(config.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_flags_without_file() {
        let config = parse(&["-l", "debug"]).resolve_config().unwrap();
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.scenarios, Scenario::ALL);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let cli = parse(&["--config", "/nonexistent/latency-probe.toml"]);
        assert!(cli.resolve_config().is_err());
    }
}

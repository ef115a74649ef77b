//! OpenVox ENC - External node classifier for OpenVox/Puppet servers
//!
//! Invoked by the Puppet server with a certname; prints the node's
//! classification (environment, classes, parameters) as YAML on stdout.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use openvox_enc::config::{LogFormat, LogTarget, LoggingConfig};
use openvox_enc::db::{HierarchySeed, HierarchyStore, InMemoryStore};
use openvox_enc::models::Classification;
use openvox_enc::services::{
    render, ClassificationService, ClassificationStrategy, FactProvider, NoFacts,
    PuppetDbClient, PuppetDbFactProvider,
};
use openvox_enc::AppConfig;

/// Output format for the classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Yaml,
    Json,
}

/// Parsed command line
#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Version,
    Classify(ClassifyArgs),
}

#[derive(Debug, PartialEq)]
struct ClassifyArgs {
    certname: String,
    format: OutputFormat,
    explain: bool,
    config: Option<PathBuf>,
}

impl ClassifyArgs {
    /// A broken discovered config still yields the default classification.
    /// An explicit `--config` or `--explain` run reports the error instead.
    fn serves_default_on_config_error(&self) -> bool {
        !self.explain && self.config.is_none()
    }
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut certname = None;
    let mut format = OutputFormat::Yaml;
    let mut explain = false;
    let mut config = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--explain" => explain = true,
            "--format" | "-f" => {
                let value = iter.next().context("--format requires a value")?;
                format = match value.as_str() {
                    "yaml" => OutputFormat::Yaml,
                    "json" => OutputFormat::Json,
                    other => anyhow::bail!("Unknown output format: {}", other),
                };
            }
            "--config" | "-c" => {
                let value = iter.next().context("--config requires a path")?;
                config = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') => anyhow::bail!("Unknown option: {}", other),
            other => {
                if certname.replace(other.to_string()).is_some() {
                    anyhow::bail!("Only one certname may be given");
                }
            }
        }
    }

    let certname = certname.context("Missing certname (see --help)")?;
    Ok(Command::Classify(ClassifyArgs {
        certname,
        format,
        explain,
        config,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let args = match parse_args(&args)? {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("OpenVox ENC {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Classify(args) => args,
    };

    // Load configuration first (before logging, so we know log format)
    let config = match args.config.clone() {
        Some(path) => AppConfig::load_from(Some(path)),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) if args.serves_default_on_config_error() => {
            // No logging yet; the agent run must still get a classification
            eprintln!("openvox-enc: failed to load configuration: {:#}", e);
            return emit(&Classification::default(), args.format);
        }
        Err(e) => return Err(e.context("Failed to load configuration")),
    };

    // The guard must be kept alive so buffered file logs get flushed
    let _log_guard = init_logging(&config.logging);

    info!(
        "Classifying {} (strategy: {})",
        args.certname, config.classification.strategy
    );

    let service = match build_service(&config).await {
        Ok(service) => service,
        Err(e) if config.classification.fail_open && !args.explain => {
            error!("Classifier unavailable, serving the default classification: {:#}", e);
            return emit(&Classification::default(), args.format);
        }
        Err(e) => return Err(e),
    };

    if args.explain {
        let report = service.explain(&args.certname).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let classification = if config.classification.fail_open {
        service.resolve_or_default(&args.certname).await
    } else {
        service.resolve(&args.certname).await?
    };

    emit(&classification, args.format)
}

/// Build the classifier from configuration: seeded store plus fact source
async fn build_service(config: &AppConfig) -> Result<ClassificationService> {
    let store = Arc::new(InMemoryStore::new());

    match config.hierarchy_path.clone().or_else(HierarchySeed::find_file) {
        Some(path) => {
            info!("Loading hierarchy from {:?}", path);
            HierarchySeed::load(&path)?
                .apply(store.as_ref())
                .await
                .context("Failed to load hierarchy definitions")?;
        }
        None => info!("No hierarchy file found, only the default classification is available"),
    }

    let facts: Arc<dyn FactProvider> = match (&config.classification.strategy, &config.puppetdb) {
        (ClassificationStrategy::FactRules, Some(puppetdb_config)) => {
            let client = PuppetDbClient::new(puppetdb_config)
                .context("Failed to initialize PuppetDB client")?;
            Arc::new(PuppetDbFactProvider::new(client))
        }
        (ClassificationStrategy::FactRules, None) => {
            info!("PuppetDB not configured, classification rules will not match");
            Arc::new(NoFacts)
        }
        (ClassificationStrategy::Hierarchical, _) => Arc::new(NoFacts),
    };

    let store: Arc<dyn HierarchyStore> = store;
    Ok(ClassificationService::new(store, facts)
        .with_strategy(config.classification.strategy)
        .with_timeout(Duration::from_secs(config.classification.timeout_secs)))
}

/// Print a classification on stdout in the requested format
fn emit(classification: &Classification, format: OutputFormat) -> Result<()> {
    let output = match format {
        OutputFormat::Yaml => {
            render::to_yaml(classification).unwrap_or_else(|_| render::fallback_yaml())
        }
        OutputFormat::Json => render::to_json(classification)?,
    };
    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Initialize logging based on configuration
///
/// Console output goes to stderr; stdout carries the classification.
fn init_logging(log_config: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    match log_config.target {
        LogTarget::Console => {
            init_layers(subscriber, &log_config.format, Some(std::io::stderr), None);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            init_layers(
                subscriber,
                &log_config.format,
                None::<fn() -> std::io::Stderr>,
                Some(writer),
            );
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            init_layers(subscriber, &log_config.format, Some(std::io::stderr), Some(writer));
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Install the console and/or file layers in the requested format
fn init_layers<S, W>(
    subscriber: S,
    format: &LogFormat,
    console: Option<W>,
    file: Option<tracing_appender::non_blocking::NonBlocking>,
) where
    S: tracing::Subscriber
        + for<'a> tracing_subscriber::registry::LookupSpan<'a>
        + Send
        + Sync
        + 'static,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::fmt;

    match format {
        LogFormat::Json => subscriber
            .with(console.map(|w| fmt::layer().json().with_target(true).with_writer(w)))
            .with(file.map(|w| fmt::layer().json().with_target(true).with_writer(w)))
            .init(),
        LogFormat::Compact => subscriber
            .with(console.map(|w| fmt::layer().compact().with_target(false).with_writer(w)))
            .with(file.map(|w| {
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(w)
            }))
            .init(),
        LogFormat::Pretty => subscriber
            .with(console.map(|w| fmt::layer().with_target(true).with_writer(w)))
            .with(file.map(|w| fmt::layer().with_target(true).with_ansi(false).with_writer(w)))
            .init(),
    }
}

fn print_help() {
    println!(
        r#"OpenVox ENC {}

USAGE:
    openvox-enc [OPTIONS] <CERTNAME>

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    -f, --format <FORMAT>   Output format: yaml (default) or json
    -c, --config <PATH>     Path to configuration file; if it cannot be loaded
                            the classifier exits with an error instead of
                            serving the default classification
    --explain               Print the layers that produced the classification
                            as JSON instead of the classification itself

ENVIRONMENT:
    OPENVOX_ENC_CONFIG      Path to configuration file (default: config.yaml)
    OPENVOX_ENC_HIERARCHY   Path to the hierarchy definitions file
    OPENVOX_ENC_STRATEGY    Classification strategy: hierarchical or factrules
    PUPPETDB_URL            PuppetDB URL used to look up facts

CONFIGURATION:
    The classifier looks for configuration files in the following order:
    1. Path given with --config
    2. Path specified by OPENVOX_ENC_CONFIG environment variable
    3. ./config.yaml
    4. /etc/openvox-enc/config.yaml

PUPPET SERVER SETUP (puppet.conf):
    [server]
    node_terminus = exec
    external_nodes = /usr/bin/openvox-enc"#,
        env!("CARGO_PKG_VERSION")
    );
}

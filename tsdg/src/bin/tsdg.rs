use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};
use tsdg::{
    analyze::{self, Analysis},
    config::{self, Config},
    generator::{self, Generator},
};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("Generator returned an error: {0}")]
    Generator(#[from] generator::Error),
    #[error("Analyzer returned an error: {0}")]
    Analyze(#[from] analyze::Error),
    #[error("Failed to install prometheus exporter: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
    #[error("{0} shards failed, output is incomplete")]
    FailedShards(usize),
}

fn default_config_path() -> String {
    "./config.yaml".to_string()
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate time-series files from the specified configuration
    Run(RunCommand),
    /// Validate configuration file and exit
    ConfigCheck(ConfigCheckCommand),
    /// Report metrics, label keys and label values of a Prometheus exposition
    Analyze(AnalyzeCommand),
}

#[derive(Args)]
struct RunCommand {
    /// path on disk to the configuration file
    #[clap(long, default_value_t = default_config_path())]
    config_path: String,
    /// prefix of output files, each written as `<promout>-<index>.bin`
    #[clap(long)]
    promout: PathBuf,
    /// number of concurrent shards, overrides the configuration
    #[clap(long)]
    parallelism: Option<NonZeroUsize>,
    /// address to bind prometheus exporter to
    #[clap(long)]
    prometheus_addr: Option<SocketAddr>,
}

#[derive(Args)]
struct ConfigCheckCommand {
    /// path on disk to the configuration file
    #[clap(long, default_value_t = default_config_path())]
    config_path: String,
}

#[derive(Args)]
struct AnalyzeCommand {
    /// http(s) URL of an exporter, or path to a file holding an exposition
    source: String,
    /// write the observed series as a base metrics file
    #[clap(long)]
    base_out: Option<PathBuf>,
}

fn load_config(config_path: &str) -> Result<Config, Error> {
    Config::load(Path::new(config_path)).map_err(|err| {
        error!("Could not load config file '{config_path}': {err}");
        Error::Config(err)
    })
}

async fn inner_run(cmd: RunCommand, config: Config) -> Result<(), Error> {
    if let Some(addr) = cmd.prometheus_addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!("prometheus exporter listening on {addr}");
    }

    let generator = Generator::new(&config, cmd.promout, cmd.parallelism)?;
    let summary = generator.spin().await;
    if summary.is_success() {
        Ok(())
    } else {
        Err(Error::FailedShards(summary.failures.len()))
    }
}

async fn inner_analyze(cmd: AnalyzeCommand) -> Result<(), Error> {
    let text = analyze::fetch(&cmd.source).await?;
    let analysis = Analysis::new(&text);
    print!("{analysis}");
    if let Some(path) = cmd.base_out {
        analysis.write_base(&path).await?;
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .finish()
        .init();

    let cli = Cli::parse();
    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;

    match cli.command {
        Commands::ConfigCheck(cmd) => {
            let config = load_config(&cmd.config_path)?;
            config.validate().map_err(|err| {
                error!("Configuration validation failed: {err}");
                Error::Config(err)
            })?;
            info!("Configuration file is valid");
            Ok(())
        }
        Commands::Run(cmd) => {
            let version = env!("CARGO_PKG_VERSION");
            info!("Starting tsdg {version} run.");
            let config = load_config(&cmd.config_path)?;
            let res = runtime.block_on(inner_run(cmd, config));
            info!("Bye. :)");
            res
        }
        Commands::Analyze(cmd) => runtime.block_on(inner_analyze(cmd)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_requires_an_output_prefix() {
        assert!(Cli::try_parse_from(["tsdg", "run", "--config-path", "c.yaml"]).is_err());
        let cli = Cli::try_parse_from([
            "tsdg",
            "run",
            "--promout",
            "/tmp/out",
            "--parallelism",
            "4",
        ])
        .expect("valid arguments");
        let Commands::Run(cmd) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(cmd.config_path, "./config.yaml");
        assert_eq!(cmd.promout, PathBuf::from("/tmp/out"));
        assert_eq!(cmd.parallelism.map(NonZeroUsize::get), Some(4));
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        assert!(
            Cli::try_parse_from(["tsdg", "run", "--promout", "out", "--parallelism", "0"]).is_err()
        );
    }

    #[test]
    fn analyze_takes_a_source_and_optional_base_out() {
        let cli = Cli::try_parse_from(["tsdg", "analyze", "metrics.txt", "--base-out", "base.yaml"])
            .expect("valid arguments");
        let Commands::Analyze(cmd) = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(cmd.source, "metrics.txt");
        assert_eq!(cmd.base_out, Some(PathBuf::from("base.yaml")));
    }
}

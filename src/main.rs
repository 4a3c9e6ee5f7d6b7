//! Awair Exporter Binary
//!
//! Serves the latest readings of the configured Awair sensors for Prometheus.

use awair_exporter::{
    render_directory, render_prometheus, sensors::client::DEFAULT_SENSOR_TIMEOUT,
    start_web_server, Aggregator, ExporterConfig, SensorClient, SensorTable, WebConfig,
    DEFAULT_BIND_ADDR,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "awair_exporter")]
#[command(about = "Prometheus exporter for Awair air-quality sensors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls Awair sensors over their local HTTP API and serves the readings in the Prometheus text format")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// The http server bind address (e.g. `127.0.0.1:8081`)
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// TOML configuration file with the sensor table and timeouts
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sensor to poll as NAME=ADDRESS; may be repeated
    #[arg(short, long = "sensor", value_name = "NAME=ADDRESS")]
    sensors: Vec<String>,

    /// Deadline for a whole scrape request in milliseconds
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Upper bound on each sensor request in milliseconds
    #[arg(long)]
    sensor_timeout_ms: Option<u64>,

    /// Suppress all log output
    #[arg(long)]
    hide_log: bool,

    /// Omit the date from log output
    #[arg(long)]
    hide_log_date: bool,

    /// Omit the source file from log output
    #[arg(long)]
    hide_log_file: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the exporter (default)
    Serve,

    /// Scrape every sensor once, print the result and exit
    Scrape(ScrapeArgs),

    /// Print the configured sensor directory as JSON
    Sensors,
}

#[derive(Args)]
struct ScrapeArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = ScrapeFormat::Prometheus)]
    format: ScrapeFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ScrapeFormat {
    Prometheus,
    Json,
}

/// Effective settings after merging flags, environment and config file.
struct Settings {
    bind_addr: String,
    request_timeout: Option<Duration>,
    sensor_timeout: Duration,
    sensors: SensorTable,
}

impl Settings {
    fn resolve(cli: &Cli) -> awair_exporter::Result<Self> {
        let file = match &cli.config {
            Some(path) => ExporterConfig::load(path)?,
            None => ExporterConfig::default(),
        };

        let mut sensors = file.sensors.clone();
        for entry in &cli.sensors {
            let (name, address) = SensorTable::parse_entry(entry)?;
            sensors.insert(name, address);
        }
        if sensors.is_empty() {
            sensors = SensorTable::home_defaults();
        }

        let bind_addr = cli
            .bind_addr
            .clone()
            .filter(|addr| !addr.is_empty())
            .or_else(|| file.bind_addr.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            bind_addr,
            request_timeout: cli
                .request_timeout_ms
                .map(Duration::from_millis)
                .or(file.request_timeout()),
            sensor_timeout: cli
                .sensor_timeout_ms
                .map(Duration::from_millis)
                .or(file.sensor_timeout())
                .unwrap_or(DEFAULT_SENSOR_TIMEOUT),
            sensors,
        })
    }

    fn aggregator(&self) -> awair_exporter::Result<Aggregator<SensorClient>> {
        let client = SensorClient::with_timeout(self.sensor_timeout)?;
        Ok(Aggregator::new(client, self.sensors.clone()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let settings = Settings::resolve(&cli)?;

    match &cli.command {
        Some(Commands::Serve) | None => serve_command(&settings).await?,
        Some(Commands::Scrape(args)) => scrape_command(&settings, args).await?,
        Some(Commands::Sensors) => sensors_command(&settings)?,
    }

    Ok(())
}

/// Info unless `--debug` is set.
fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.hide_log {
        return Ok(());
    }

    let filter = EnvFilter::from_default_env().add_directive(log_level(cli).into());

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(!cli.hide_log_file)
        .with_line_number(!cli.hide_log_file)
        .compact();

    if cli.hide_log_date {
        tracing::subscriber::set_global_default(builder.without_time().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}

async fn serve_command(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Awair exporter v{}", env!("CARGO_PKG_VERSION"));
    for (name, address) in settings.sensors.iter() {
        info!("  - sensor {:?} at {}", name, address);
    }
    info!("  - sensor timeout: {:?}", settings.sensor_timeout);
    if let Some(timeout) = settings.request_timeout {
        info!("  - request timeout: {:?}", timeout);
    }

    let web_config = WebConfig::new(&settings.bind_addr).with_request_timeout(settings.request_timeout);
    start_web_server(web_config, settings.aggregator()?).await?;

    Ok(())
}

async fn scrape_command(
    settings: &Settings,
    args: &ScrapeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let aggregator = settings.aggregator()?;

    let batch = match aggregator.aggregate().await {
        Ok(batch) => batch,
        Err(failure) => {
            error!("error fetching data; {}", failure);
            return Err(failure.into());
        }
    };

    match args.format {
        ScrapeFormat::Prometheus => print!("{}", render_prometheus(&batch)),
        ScrapeFormat::Json => {
            let readings: BTreeMap<_, _> = batch.readings.iter().collect();
            println!("{}", serde_json::to_string_pretty(&readings)?);
        }
    }

    Ok(())
}

fn sensors_command(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let directory = render_directory(&settings.sensors);
    println!("{}", serde_json::to_string_pretty(&directory)?);
    Ok(())
}

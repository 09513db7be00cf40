//! kapstat - Track Norwegian grid capacity tariffs from power sample logs

use clap::Parser;
use kapstat::{
    aggregation::Aggregator,
    cli::{Cli, Command, parse_date_filter},
    data_loader::DataLoader,
    error::Result,
    filters::SampleFilter,
    live_monitor::LiveMonitor,
    output::get_formatter,
    timezone::TimezoneConfig,
    types::MeterId,
};
use kapstat_tariff::{TariffOptions, TierTable};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolve the effective tier table: tariff file merged over the defaults
fn load_tier_table(cli: &Cli) -> Result<TierTable> {
    let mut options = match &cli.tariff {
        Some(path) => {
            info!("Using tariff file {}", path.display());
            TariffOptions::load(path)?
        }
        None => match default_tariff_path() {
            Some(path) => {
                info!("Using tariff file {}", path.display());
                TariffOptions::load(&path)?
            }
            None => TariffOptions::default(),
        },
    };
    options.merge_defaults(&TariffOptions::defaults());
    options.to_table()
}

/// The conventional tariff file location, if present
fn default_tariff_path() -> Option<std::path::PathBuf> {
    let path = dirs::config_dir()?.join("kapstat").join("tariff.json");
    path.exists().then_some(path)
}

/// Build the sample filter from the global CLI flags
fn build_filter(cli: &Cli) -> Result<SampleFilter> {
    let mut filter = SampleFilter::new();
    if let Some(since) = &cli.since {
        filter = filter.with_since(parse_date_filter(since)?);
    }
    if let Some(until) = &cli.until {
        filter = filter.with_until(parse_date_filter(until)?);
    }
    if let Some(meter) = &cli.meter {
        filter = filter.with_meter(MeterId::new(meter.clone()));
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("kapstat=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kapstat=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let tz_config = TimezoneConfig::from_cli(cli.timezone.as_deref(), cli.utc)?;
    let table = load_tier_table(&cli)?;

    match cli.command.clone() {
        Command::Report { paths } => {
            info!("Running capacity report (timezone: {})", tz_config.display_name());

            let show_progress = !cli.json && is_terminal::is_terminal(std::io::stdout());
            let loader = DataLoader::new(paths)?;
            let aggregator = Aggregator::new(tz_config, table).with_progress(show_progress);
            let sample_filter = build_filter(&cli)?;

            let report = aggregator
                .aggregate(loader.load_samples(), &sample_filter)
                .await?;
            println!("{}", get_formatter(cli.json).format_report(&report));
            Ok(())
        }

        Command::Watch { paths, interval } => {
            info!("Starting watch mode (refresh every {interval}s)");

            let loader = Arc::new(DataLoader::new(paths)?);
            let aggregator = Arc::new(Aggregator::new(tz_config, table));
            let sample_filter = build_filter(&cli)?;

            let monitor =
                LiveMonitor::new(loader, aggregator, sample_filter, cli.json, interval);
            monitor.run().await
        }

        Command::Tiers => {
            println!("{}", get_formatter(cli.json).format_tiers(&table));
            Ok(())
        }
    }
}

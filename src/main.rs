use clap::Parser;
use rulescan::cli::{Cli, Commands};
use rulescan::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    rulescan::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Scan(args) => {
            tracing::info!("Starting scan");
            args.execute(&config).await?;
        }
        Commands::Extract(args) => {
            tracing::info!("Extracting parameters");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Scan: atr_period={} rel_volume_period={} rolling_window={}",
                config.scan.atr_period, config.scan.rel_volume_period, config.scan.rolling_window
            );
            println!(
                "  Jobs: max_running={} rate_limit={}/{}s workers={}",
                config.jobs.max_running,
                config.jobs.rate_limit_max,
                config.jobs.rate_limit_window_secs,
                config.jobs.worker_pool
            );
            println!(
                "  Classifier: ambiguity_threshold={}",
                config.classifier.ambiguity_threshold
            );
            println!(
                "  Telemetry: log_level={} log_format={:?}",
                config.telemetry.log_level, config.telemetry.log_format
            );
        }
    }

    Ok(())
}

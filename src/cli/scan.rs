//! Scan command implementation

use chrono::NaiveDate;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

use crate::bars::{CsvBarProvider, DateRange};
use crate::config::Config;
use crate::jobs::{JobStatus, ScanJobManager, ScanRequest, SymbolUniverse};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory of per-symbol CSV bar files
    #[arg(short, long)]
    pub data_dir: String,

    /// Path to the scanner source file
    #[arg(short, long)]
    pub patterns: String,

    /// Comma-separated symbols (defaults to every symbol in the data dir)
    #[arg(short, long)]
    pub symbols: Option<String>,

    /// First session to scan (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last session to scan (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Emit results as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl ScanArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let source = std::fs::read_to_string(&self.patterns)?;
        let range = DateRange::new(self.start, self.end)
            .ok_or_else(|| anyhow::anyhow!("start date is after end date"))?;
        let universe = match &self.symbols {
            Some(list) => SymbolUniverse::List(
                list.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            None => SymbolUniverse::All,
        };

        let provider = Arc::new(CsvBarProvider::new(&self.data_dir));
        let manager = ScanJobManager::new(
            config.jobs.clone(),
            config.scan.clone(),
            provider,
        );

        let id = manager
            .submit(ScanRequest {
                caller: "cli".to_string(),
                range,
                universe,
                pattern_source: source,
            })
            .await?;
        tracing::info!(job_id = %id, "scan submitted");

        let snapshot = loop {
            let Some(snapshot) = manager.status(id).await else {
                anyhow::bail!("job {id} disappeared while polling");
            };
            if snapshot.status.is_terminal() {
                break snapshot;
            }
            tracing::debug!(progress = snapshot.progress_percent, "scanning");
            tokio::time::sleep(Duration::from_millis(200)).await;
        };

        for warning in &snapshot.warnings {
            tracing::warn!("{warning}");
        }
        match snapshot.status {
            JobStatus::Completed => {}
            JobStatus::Cancelled => {
                anyhow::bail!(
                    "scan cancelled: {}",
                    snapshot.error.as_deref().unwrap_or("no reason recorded")
                );
            }
            _ => {
                anyhow::bail!(
                    "scan failed: {}",
                    snapshot.error.as_deref().unwrap_or("no reason recorded")
                );
            }
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&snapshot.results)?);
        } else {
            println!("{} signals", snapshot.results.len());
            for signal in &snapshot.results {
                let score = signal
                    .score
                    .map(|s| format!("{s:.2}"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {:<8} {}  [{}]",
                    signal.date,
                    signal.symbol,
                    score,
                    signal.matched.join(", ")
                );
            }
        }
        Ok(())
    }
}

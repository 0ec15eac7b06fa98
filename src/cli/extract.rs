//! Extract command implementation

use clap::Args;

use crate::config::Config;
use crate::params::{extract_parameters, Classifier, ParamClass};
use crate::pattern::Value;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Path to the scanner source file
    #[arg(short, long)]
    pub patterns: String,

    /// Emit results as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl ExtractArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let source = std::fs::read_to_string(&self.patterns)?;
        let candidates = extract_parameters(&source);
        let classifier = Classifier::rule_based(config.classifier.ambiguity_threshold);
        let classified = classifier.classify_all(candidates).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&classified)?);
            return Ok(());
        }

        println!("{} parameter candidates", classified.len());
        for parameter in &classified {
            let class = match parameter.class {
                ParamClass::TradingFilter => "trading_filter",
                ParamClass::InfraConfig => "infra_config",
                ParamClass::Ambiguous => "ambiguous",
            };
            let value = match &parameter.candidate.value {
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
            };
            println!(
                "{:<24} = {:<12} {class:<14} confidence {:.2}  ({} occurrence{})",
                parameter.candidate.name,
                value,
                parameter.confidence,
                parameter.candidate.occurrences.len(),
                if parameter.candidate.occurrences.len() == 1 {
                    ""
                } else {
                    "s"
                }
            );
        }
        Ok(())
    }
}

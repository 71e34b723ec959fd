use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qai_controller::{
    telemetry::ControllerTelemetry, ControllerConfig, ControllerError, RealAiController,
};
use serde::Serialize;
use serde_json::json;
use shared_event_bus::MemoryEventBus;
use shared_logging::LogLevel;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "qai", version, about = "GAIA QAI decision controller")]
struct Cli {
    /// Controller configuration (TOML). Defaults apply when the file is missing.
    #[arg(long, global = true, default_value = "config/qai/controller.toml")]
    config: PathBuf,
    /// Emit debug-level tracing output.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initializes the controller, runs a batch of decisions and one adaptation,
    /// then prints a JSON summary.
    Demo {
        /// Number of decisions to run.
        #[arg(long, default_value_t = 10)]
        decisions: usize,
        /// Length of each synthetic context vector.
        #[arg(long, default_value_t = 256)]
        context_len: usize,
        /// Optional JSON-lines log file.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Maximum time to wait for the awareness window to fill.
        #[arg(long, default_value_t = 2_000)]
        warmup_ms: u64,
    },
    /// Prints the effective configuration as JSON.
    Config,
}

#[derive(Debug, Serialize)]
struct DecisionSummary {
    id: String,
    latency_us: f64,
    real_time_compliant: bool,
    safety_validated: bool,
    violations: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = ControllerConfig::load_or_default(&cli.config)?;
    match cli.command {
        Commands::Demo {
            decisions,
            context_len,
            log,
            warmup_ms,
        } => {
            let runtime = Runtime::new().context("starting tokio runtime")?;
            runtime.block_on(run_demo(
                config,
                decisions,
                context_len,
                log.as_deref(),
                Duration::from_millis(warmup_ms),
            ))
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_demo(
    config: ControllerConfig,
    decisions: usize,
    context_len: usize,
    log: Option<&Path>,
    warmup: Duration,
) -> Result<()> {
    let bus = Arc::new(MemoryEventBus::new(1_024));
    let mut telemetry = ControllerTelemetry::builder("controller").event_publisher(bus.clone());
    if let Some(path) = log {
        telemetry = telemetry.log_path(path).min_level(LogLevel::Info);
    }
    let controller = RealAiController::with_stub_core(config)?.with_telemetry(telemetry.build()?);
    controller.initialize().await?;

    let window = controller.config().monitor.awareness_window;
    let deadline = Instant::now() + warmup;
    while controller.monitor().len() < window && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut summaries = Vec::with_capacity(decisions);
    let mut rejected = Vec::new();
    let mut last = None;
    for step in 0..decisions {
        let context = synthetic_context(step, context_len);
        match controller.make_decision(&context, None).await {
            Ok(decision) => {
                summaries.push(DecisionSummary {
                    id: decision.id.to_string(),
                    latency_us: decision.latency_us,
                    real_time_compliant: decision.real_time_compliant,
                    safety_validated: decision.safety_validated,
                    violations: decision.violations.clone(),
                });
                last = Some(decision);
            }
            Err(err @ ControllerError::InsufficientConsciousness { .. }) => {
                tracing::warn!(step, error = %err, "decision rejected");
                rejected.push(err.to_string());
            }
            Err(err) => {
                controller.shutdown().await;
                return Err(err.into());
            }
        }
    }

    let adapted = match &last {
        Some(decision) => {
            let outcome: Vec<f32> = decision.decision_vector.iter().map(|d| -d).collect();
            controller.adapt_from_outcome(decision, &outcome, None).await?
        }
        None => false,
    };

    let summary = json!({
        "core": controller.core_name(),
        "functional": controller.is_functional(),
        "adapted": adapted,
        "decisions": summaries,
        "rejected": rejected,
        "metrics": controller.metrics(),
        "consciousness": controller.consciousness_state(),
        "embodied": controller.embodied_scores(),
        "health_warnings": controller.health_warnings(),
    });
    controller.shutdown().await;

    let events = bus.snapshot();
    let mut output = summary;
    output["events"] = json!(events.len());
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Deterministic low-amplitude context so stub decisions stay within the safety limits.
#[allow(clippy::cast_precision_loss)]
fn synthetic_context(step: usize, len: usize) -> Vec<f32> {
    (0..len)
        .map(|idx| ((step * len + idx) as f32 * 0.37).sin() * 0.05)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_demo_arguments() {
        let cli = Cli::try_parse_from(["qai", "demo", "--decisions", "3", "--config", "qai.toml"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("qai.toml"));
        assert!(matches!(cli.command, Commands::Demo { decisions: 3, .. }));
    }

    #[test]
    fn synthetic_context_is_bounded() {
        let context = synthetic_context(2, 64);
        assert_eq!(context.len(), 64);
        assert!(context.iter().all(|v| v.abs() <= 0.05));
        assert_ne!(synthetic_context(0, 8), synthetic_context(1, 8));
    }
}

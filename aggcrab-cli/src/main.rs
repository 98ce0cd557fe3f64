use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use aggcrab_core::settings::{
    KEY_ADDITIONAL_SETTINGS, KEY_FUNCTION, KEY_PROCEED_ONLY_ON_EMIT, KEY_RESET_TIMER_ON_SAMPLE,
    KEY_RESOLUTION, KEY_WINDOW_SIZE, KEY_WINDOW_TYPE,
};
use aggcrab_core::time::IntervalTimerService;
use aggcrab_core::{
    AggregateActivity, AggregateError, AggregateSettings, Emission, EmissionSink, FlowContext,
    Value,
};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "aggcrab")]
#[command(about = "Windowed aggregation over samples read from stdin", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate one sample per stdin line, printing one JSON line per report.
    Run {
        #[command(flatten)]
        settings: SettingsArgs,
        /// Close the current time window when input ends.
        #[arg(long)]
        flush_on_eof: bool,
    },
    /// Resolve and validate settings, then print them as JSON.
    Validate {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// JSON settings file (camelCase keys). Replaces the per-key flags.
    #[arg(
        long,
        conflicts_with_all = ["function", "window_type", "window_size", "resolution", "additional_settings"]
    )]
    config: Option<PathBuf>,
    /// sum, avg, min, max or count
    #[arg(long)]
    function: Option<String>,
    /// tumbling, sliding, timeTumbling or timeSliding
    #[arg(long)]
    window_type: Option<String>,
    /// Samples for count windows, milliseconds for time windows
    #[arg(long)]
    window_size: Option<u64>,
    /// Slot length in milliseconds (timeSliding only)
    #[arg(long)]
    resolution: Option<u64>,
    #[arg(long)]
    proceed_only_on_emit: bool,
    #[arg(long)]
    reset_timer_on_sample: bool,
    /// k=v,k=v
    #[arg(long)]
    additional_settings: Option<String>,
}

impl SettingsArgs {
    fn resolve(self) -> anyhow::Result<AggregateSettings> {
        if let Some(path) = self.config {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let mut settings: AggregateSettings = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            settings.proceed_only_on_emit |= self.proceed_only_on_emit;
            settings.reset_timer_on_sample |= self.reset_timer_on_sample;
            return Ok(settings);
        }

        let mut values = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                values.insert(key.to_string(), value);
            }
        };
        put(KEY_FUNCTION, self.function);
        put(KEY_WINDOW_TYPE, self.window_type);
        put(KEY_WINDOW_SIZE, self.window_size.map(|v| v.to_string()));
        put(KEY_RESOLUTION, self.resolution.map(|v| v.to_string()));
        put(KEY_PROCEED_ONLY_ON_EMIT, Some(self.proceed_only_on_emit.to_string()));
        put(KEY_RESET_TIMER_ON_SAMPLE, Some(self.reset_timer_on_sample.to_string()));
        put(KEY_ADDITIONAL_SETTINGS, self.additional_settings);
        Ok(AggregateSettings::from_map(&values)?)
    }
}

/// Writes each report to stdout as one JSON line.
struct JsonLinesSink {
    emitting_only: bool,
}

impl EmissionSink for JsonLinesSink {
    fn report(&self, emission: &Emission) {
        if self.emitting_only && !emission.emit {
            return;
        }
        let mut out = std::io::stdout().lock();
        let written = serde_json::to_writer(&mut out, emission)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(out))
            .and_then(|()| out.flush());
        if let Err(err) = written {
            warn!(error = %err, "failed to write emission");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            settings,
            flush_on_eof,
        } => run(settings.resolve()?, flush_on_eof).await?,
        Commands::Validate { settings } => {
            let settings = settings.resolve()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

async fn run(settings: AggregateSettings, flush_on_eof: bool) -> anyhow::Result<()> {
    info!(
        function = %settings.function,
        window_type = %settings.window_type,
        size = settings.window_size,
        "aggregating stdin"
    );
    let window_type = settings.window_type;
    let sink = Arc::new(JsonLinesSink {
        emitting_only: settings.proceed_only_on_emit,
    });
    let activity = AggregateActivity::new(settings)?;
    let ctx = FlowContext::new(sink).with_timer(Arc::new(IntervalTimerService::try_current()?));

    let mut samples = 0usize;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let sample: Value = line.parse()?;
        match activity.eval(&ctx, sample) {
            Ok(_) => samples += 1,
            Err(err @ AggregateError::UnsupportedType { .. }) => {
                warn!(sample = line, error = %err, "sample skipped");
            }
            Err(err) => return Err(err.into()),
        }
    }

    if flush_on_eof && window_type.is_time_based() {
        activity.next_block(&ctx)?;
    }
    ctx.teardown()?;
    info!(samples, "input exhausted");
    Ok(())
}

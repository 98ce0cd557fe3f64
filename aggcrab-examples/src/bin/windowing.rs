use std::sync::Arc;
use std::time::Duration;

use aggcrab_core::time::IntervalTimerService;
use aggcrab_core::{
    AggregateActivity, AggregateKind, AggregateSettings, CollectingSink, FlowContext, Value,
    WindowType,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Requests per 200ms, reported every 100ms.
    let activity = AggregateActivity::new(
        AggregateSettings::new(AggregateKind::Count, WindowType::TimeSliding, 200).with_resolution(100),
    )?;
    let sink = Arc::new(CollectingSink::new());
    let ctx = FlowContext::new(sink.clone())
        .with_timer(Arc::new(IntervalTimerService::try_current()?));

    // (arrival offset in ms, latency in ms)
    let requests: [(u64, i64); 8] = [
        (10, 12),
        (20, 40),
        (60, 9),
        (130, 15),
        (180, 22),
        (240, 31),
        (390, 18),
        (410, 11),
    ];

    let start = tokio::time::Instant::now();
    for (offset, latency) in requests {
        tokio::time::sleep_until(start + Duration::from_millis(offset)).await;
        activity.eval(&ctx, Value::Int(latency))?;
    }
    tokio::time::sleep_until(start + Duration::from_millis(650)).await;
    ctx.teardown()?;

    for (tick, emission) in sink.take().into_iter().filter(|e| e.emit).enumerate() {
        println!(
            "tick={} requests={}",
            tick + 1,
            emission.result.unwrap_or(Value::Int(0))
        );
    }
    Ok(())
}

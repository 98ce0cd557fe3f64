use std::sync::Arc;

use aggcrab_core::{
    AggregateActivity, AggregateKind, AggregateSettings, CollectingSink, FlowContext, Value,
    WindowType,
};

fn main() -> anyhow::Result<()> {
    let readings = [21.5, 22.0, 22.5, 30.0, 23.0, 22.0];

    // Moving average of the last three readings.
    let sink = Arc::new(CollectingSink::new());
    let ctx = FlowContext::new(sink.clone());
    let moving_avg =
        AggregateActivity::new(AggregateSettings::new(AggregateKind::Avg, WindowType::Sliding, 3))?;
    for reading in readings {
        let out = moving_avg.eval(&ctx, Value::from(reading))?;
        println!(
            "reading={reading} avg={} full={}",
            out.emission.result.map_or("-".to_string(), |v| v.to_string()),
            out.emission.emit
        );
    }

    // Peak per batch of two; only boundaries continue the flow.
    let ctx = FlowContext::new(sink.clone());
    let peaks = AggregateActivity::new(
        AggregateSettings::new(AggregateKind::Max, WindowType::Tumbling, 2)
            .with_proceed_only_on_emit(true),
    )?;
    sink.take();
    for reading in readings {
        let out = peaks.eval(&ctx, Value::from(reading))?;
        if out.done {
            println!("batch peak={}", out.emission.result.unwrap_or(Value::Int(0)));
        }
    }
    println!("{} emissions reported", sink.emissions().len());

    Ok(())
}

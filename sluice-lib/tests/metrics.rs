use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::metrics::MeterProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Registry, TextEncoder};
use sluice_lib::rate_limit::{Burst, FnCallback, Rate, RateLimiter};
use sluice_lib::runtime::ClockedExecutor;
use sluice_lib::telemetry::Metrics;

fn sample(text: &str, name: &str) -> Option<u64> {
    text.lines()
        .filter(|line| line.starts_with(&format!("{name}{{")))
        .find(|line| line.contains("limiter=\"metered\""))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

#[test]
fn limiter_records_admission_counters() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Registry::new();
    let exporter = opentelemetry_prometheus::exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
    let metrics = Arc::new(Metrics::new(provider.meter("sluice-test")));

    let clocked = Arc::new(ClockedExecutor::new());
    let limiter = RateLimiter::named(
        "metered",
        clocked.clone(),
        clocked.clone(),
        clocked.clone(),
        VecDeque::new(),
        1,
        Rate::new(2, Duration::from_millis(100), Burst::Unlimited)?,
    );
    limiter.set_metrics(metrics);
    assert_eq!(limiter.name(), "metered");

    for _ in 0..3 {
        limiter.submit(FnCallback::new(|_| {}))?;
    }
    assert!(limiter.submit(FnCallback::new(|_| {})).is_err());
    clocked.run_for(Duration::from_millis(100));
    limiter.set_rate(Rate::per_second(1)?);

    let text = TextEncoder::new().encode_to_string(&registry.gather())?;
    assert_eq!(sample(&text, "sluice_admitted_total"), Some(3));
    assert_eq!(sample(&text, "sluice_queued_total"), Some(1));
    assert_eq!(sample(&text, "sluice_rejected_total"), Some(1));
    assert_eq!(sample(&text, "sluice_replenishments_total"), Some(1));
    assert_eq!(sample(&text, "sluice_rate_changes_total"), Some(1));
    Ok(())
}

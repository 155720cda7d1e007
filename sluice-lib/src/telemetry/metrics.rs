use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::error::{Result, SluiceError};

pub mod labels {
    pub const LIMITER: &str = "limiter";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

#[derive(Clone)]
pub struct Metrics {
    // Admission outcomes, labelled by limiter name
    pub admitted_total: Counter<u64>,
    pub queued_total: Counter<u64>,
    pub rejected_total: Counter<u64>,
    pub cancelled_total: Counter<u64>,

    // Scheduler activity
    pub replenishments_total: Counter<u64>,
    pub rate_changes_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            admitted_total: meter
                .u64_counter("sluice_admitted_total")
                .with_description("Total number of callbacks granted a permit")
                .build(),
            queued_total: meter
                .u64_counter("sluice_queued_total")
                .with_description("Total number of callbacks buffered while waiting for a permit")
                .build(),
            rejected_total: meter
                .u64_counter("sluice_rejected_total")
                .with_description("Total number of submissions rejected because the buffer was full")
                .build(),
            cancelled_total: meter
                .u64_counter("sluice_cancelled_total")
                .with_description("Total number of buffered callbacks failed by cancel_all")
                .build(),

            replenishments_total: meter
                .u64_counter("sluice_replenishments_total")
                .with_description("Total number of permit replenishment ticks")
                .build(),
            rate_changes_total: meter
                .u64_counter("sluice_rate_changes_total")
                .with_description("Total number of rate updates")
                .build(),

            build_info: meter
                .u64_gauge("sluice_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }
}

/// Install a Prometheus-backed global meter provider and build the metrics on it.
///
/// The returned registry is what an exporter endpoint should gather from.
pub fn init_metrics() -> Result<(Arc<Metrics>, Registry)> {
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|e| SluiceError::Runtime(format!("Failed to build Prometheus exporter: {e}")))?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("sluice");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}

use lazy_static::lazy_static;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};

lazy_static! {
    // Registry for holding metric state
    pub static ref REGISTRY: Registry = Registry::new();
    // Observation counter by outcome
    pub static ref OBSERVATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("observations", "The number of observations read, by outcome"),
        &["outcome"]
    ).unwrap();
    // Bin counter by stage
    pub static ref BINS: IntCounterVec = IntCounterVec::new(
        Opts::new("bins", "The number of bins produced by each stage"),
        &["stage"]
    ).unwrap();
    // Failed partition counter
    pub static ref PARTITIONS_FAILED: IntCounter = IntCounter::new(
        "partitions_failed", "The number of input partitions that could not be processed"
    ).unwrap();
    // Partition histogram by processing time
    pub static ref PARTITION_TIME_COLLECTOR: Histogram = Histogram::with_opts(
        HistogramOpts::new("partition_time", "The time taken to bin each input partition")
    ).unwrap();
}

pub fn register_metrics() {
    REGISTRY.register(Box::new(OBSERVATIONS.clone())).unwrap();
    REGISTRY.register(Box::new(BINS.clone())).unwrap();
    REGISTRY
        .register(Box::new(PARTITIONS_FAILED.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(PARTITION_TIME_COLLECTOR.clone()))
        .unwrap();
}

/// Returns the registered metrics in the prometheus text format.
pub fn render() -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!("failed to encode metrics: {}", error);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record the outcome of one spatial binning pass.
pub fn record_partition(observations: u64, skipped: u64, bins: u64, seconds: f64) {
    OBSERVATIONS
        .with_label_values(&["accepted"])
        .inc_by(observations.saturating_sub(skipped));
    OBSERVATIONS.with_label_values(&["skipped"]).inc_by(skipped);
    BINS.with_label_values(&["spatial"]).inc_by(bins);
    PARTITION_TIME_COLLECTOR.observe(seconds);
}

/// Record bins produced by a reduce stage.
pub fn record_bins(stage: &str, bins: usize) {
    BINS.with_label_values(&[stage]).inc_by(bins as u64);
}

use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref FRAMES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_frames_total",
        "Total non-empty lines received from the sensor link"
    ))
    .unwrap();
    pub static ref READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_readings_total",
        "Total readings applied to the live state"
    ))
    .unwrap();
    pub static ref PARSE_ERRORS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_parse_errors_total",
        "Total malformed or unrecognized frames skipped"
    ))
    .unwrap();
    pub static ref DEVICE_ERRORS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_device_errors_total",
        "Total error frames reported by the sensor firmware"
    ))
    .unwrap();
    pub static ref APPEND_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_append_failures_total",
        "Total failed log table appends"
    ))
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(FRAMES_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(READINGS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(PARSE_ERRORS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(DEVICE_ERRORS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(APPEND_FAILURES_TOTAL.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

mod clock;
mod server;


use lazy_static::lazy_static;
use prometheus::{Encoder, Registry, TextEncoder};

pub use clock::*;
pub use server::ServerBuilder;

lazy_static! {
    pub static ref BEACON_METRIC_REGISTRY: Registry =
        Registry::new_custom(Some("beacon".to_string()), None).unwrap();
}

/// Encode every metric of the beacon registry using the prometheus text format.
pub fn gather_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let metric_families = BEACON_METRIC_REGISTRY.gather();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

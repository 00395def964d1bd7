#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

use coincount::{CounterConfig, DetectedCircle};

/// Default configuration without resizing, calibrated for the fixture coins
pub fn fixture_config() -> CounterConfig {
    let mut config = CounterConfig::default();
    config.scale_percent = 100;
    config.reference_radius = CENT_RADIUS as f64;
    config
}

pub fn radii(values: &[f64]) -> Vec<DetectedCircle> {
    values.iter().map(|r| DetectedCircle::from_radius(*r)).collect()
}

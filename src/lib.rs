//! Count coins in a photo by their size.
//!
//! Circles found in the image are compared against a reference radius (the
//! pixel radius of the smallest coin at the current scale). The ratio of
//! each radius to the reference picks the denomination.

pub mod classifier;
pub mod config;
pub mod counter;
pub mod detection;
pub mod error;
pub mod frames;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod session;

pub use classifier::{
    ClassificationResult, Classifier, CoinMatch, Denomination, DenominationTable, MatchPolicy,
    classify_radii,
};
pub use config::{CounterConfig, DetectionConfig};
pub use counter::{CoinCounter, CountReport};
pub use detection::{CircleDetector, ContourCircleDetector, Detection};
pub use error::{CoinError, Result};
pub use models::{Contour, DetectedCircle, ReferenceRadius};
pub use pipeline::{MetadataValue, Pipeline, PipelineContext, PipelineData, PipelineStep};

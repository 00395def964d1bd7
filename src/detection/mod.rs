pub mod preprocessing;
pub mod contours;
pub mod circles;
pub mod steps;

use anyhow::Result;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::DetectionConfig;
use crate::models::DetectedCircle;
use crate::pipeline::Pipeline;
use steps::*;

/// Padding around each candidate crop in debug output
const CANDIDATE_PADDING: u32 = 10;

/// Source of circles for classification
pub trait CircleDetector {
    /// Circles found in `frame`, in coordinates of the resized frame.
    ///
    /// Returns the resized frame alongside so callers can annotate it.
    fn detect(&self, frame: &DynamicImage) -> Result<Detection>;
}

pub struct Detection {
    /// Frame the circle coordinates refer to
    pub frame: DynamicImage,
    pub circles: Vec<DetectedCircle>,
}

/// Circle detector built from Canny edges and connected components
pub struct ContourCircleDetector {
    pipeline: Pipeline,
    scale_percent: u32,
}

impl ContourCircleDetector {
    pub fn new(config: &DetectionConfig, scale_percent: u32) -> Self {
        Self {
            pipeline: build_detection_pipeline(config, scale_percent),
            scale_percent,
        }
    }

    /// Dump every step's images into `output_dir` (must be empty)
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl CircleDetector for ContourCircleDetector {
    fn detect(&self, frame: &DynamicImage) -> Result<Detection> {
        let results = self.pipeline.run(frame.clone())?;

        let circles: Vec<DetectedCircle> = results
            .iter()
            .filter(|item| item.get_bool("is_circle") == Some(true))
            .filter_map(|item| item.circle)
            .collect();
        let frame = match results.first() {
            Some(item) => item.original.as_ref().clone(),
            None => preprocessing::resize_percent(frame, self.scale_percent),
        };

        log::info!(
            "detected {} circles in {}x{} frame",
            circles.len(),
            frame.width(),
            frame.height()
        );
        Ok(Detection { frame, circles })
    }
}

/// Build the standard coin detection pipeline
pub fn build_detection_pipeline(config: &DetectionConfig, scale_percent: u32) -> Pipeline {
    Pipeline::new()
        .add_step(Arc::new(ResizeStep { scale_percent }))
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(BlurStep { sigma: config.blur_sigma }))
        .add_step(Arc::new(EdgeDetectionStep {
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
        }))
        .add_step(Arc::new(ContourDetectionStep {
            min_area: config.min_edge_pixels,
            padding: CANDIDATE_PADDING,
        }))
        .add_step(Arc::new(CircleFilterStep {
            min_radius: config.min_radius,
            max_radius: config.max_radius,
            circularity_threshold: config.circularity_threshold,
        }))
        .add_step(Arc::new(DedupStep {
            min_center_distance: config.min_center_distance,
        }))
}

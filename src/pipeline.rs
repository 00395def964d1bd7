use anyhow::Result;
use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::DetectedCircle;

/// Data that flows through the pipeline
/// Each PipelineData is either the whole frame or one candidate region of it
#[derive(Clone)]
pub struct PipelineData {
    /// The image data (whole frame or a crop around a candidate)
    pub image: DynamicImage,

    /// Frame the pipeline was started with, after resizing
    pub original: Arc<DynamicImage>,

    /// Candidate circle in `original` coordinates (None means whole frame)
    pub circle: Option<DetectedCircle>,

    /// Metadata for tracking properties (e.g., "circularity", "edge_pixels")
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Bool(bool),
    Float(f32),
    Int(i32),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            circle: None,
            metadata: HashMap::new(),
        }
    }

    /// Create PipelineData for a candidate circle cropped from `original`
    pub fn from_candidate(
        image: DynamicImage,
        original: Arc<DynamicImage>,
        circle: DetectedCircle,
    ) -> Self {
        Self {
            image,
            original,
            circle: Some(circle),
            metadata: HashMap::new(),
        }
    }

    /// Same region and metadata, new pixels
    pub fn with_image(&self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original.clone(),
            circle: self.circle,
            metadata: self.metadata.clone(),
        }
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get metadata as bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.metadata.get(key) {
            Some(MetadataValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Get metadata as float
    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directory names)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order on `input`
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        if let Some(debug_config) = &self.context.debug {
            let input_dir = debug_config.output_dir.join("00_input");
            std::fs::create_dir_all(&input_dir)?;
            input
                .save(input_dir.join("01.png"))
                .map_err(|e| anyhow::anyhow!("Failed to save debug input: {}", e))?;
            log::debug!("Debug: saved 00_input/01.png");
        }

        let mut data = vec![PipelineData::from_image(input)];

        for (step_idx, step) in self.steps.iter().enumerate() {
            log::debug!("Running step: {} (processing {} items)", step.name(), data.len());
            data = step.process(data, &self.context)?;
            self.save_debug_output(step_idx, step.name(), &data)?;
            log::debug!("  → {} items", data.len());
        }

        Ok(data)
    }

    fn save_debug_output(&self, step_idx: usize, step_name: &str, data: &[PipelineData]) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        let step_dir_name = format!(
            "{:02}_{}",
            step_idx + 1,
            step_name.to_lowercase().replace(' ', "_")
        );
        let step_dir = debug_config.output_dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;

        for (idx, item) in data.iter().enumerate() {
            let output_path = step_dir.join(format!("{:02}.png", idx + 1));
            item.image
                .save(&output_path)
                .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        }

        log::debug!("Debug: saved {} images to {}/", data.len(), step_dir_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountStep;

    impl PipelineStep for CountStep {
        fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
            Ok(data
                .into_iter()
                .map(|item| {
                    let n = item.get_int("count").unwrap_or(0);
                    item.with_metadata("count", MetadataValue::Int(n + 1))
                })
                .collect())
        }

        fn name(&self) -> &str {
            "Count Step"
        }
    }

    #[test]
    fn test_run_applies_steps_in_order() {
        let pipeline = Pipeline::new()
            .add_step(Arc::new(CountStep))
            .add_step(Arc::new(CountStep));

        let out = pipeline.run(DynamicImage::new_luma8(4, 4)).unwrap();
        assert_eq!(out[0].get_int("count"), Some(2));
        assert_eq!(out[0].circle, None);
        assert_eq!(pipeline.step_names(), vec!["Count Step", "Count Step"]);
    }

    #[test]
    fn test_debug_dir_must_be_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("stale.txt"), b"x").unwrap();
        assert!(Pipeline::new().with_debug(dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn test_debug_output_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("debug");
        let pipeline = Pipeline::new()
            .add_step(Arc::new(CountStep))
            .with_debug(out.clone())
            .unwrap();
        pipeline.run(DynamicImage::new_luma8(4, 4)).unwrap();

        assert!(out.join("00_input/01.png").exists());
        assert!(out.join("01_count_step/01.png").exists());
    }
}

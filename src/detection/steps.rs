use anyhow::Result;
use image::DynamicImage;

use crate::detection::{circles, contours, preprocessing};
use crate::models::DetectedCircle;
use crate::pipeline::{MetadataValue, PipelineContext, PipelineData, PipelineStep};

/// Resize frames by a percentage of their size
pub struct ResizeStep {
    pub scale_percent: u32,
}

impl PipelineStep for ResizeStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        // Resizing changes the coordinate system, so `original` is replaced too
        Ok(data
            .into_iter()
            .map(|item| PipelineData::from_image(preprocessing::resize_percent(&item.image, self.scale_percent)))
            .collect())
    }

    fn name(&self) -> &str {
        "Resize"
    }
}

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = preprocessing::to_grayscale(&item.image);
                item.with_image(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Apply Gaussian blur
pub struct BlurStep {
    pub sigma: f32,
}

impl PipelineStep for BlurStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                let blurred = preprocessing::apply_blur(&gray, self.sigma);
                item.with_image(DynamicImage::ImageLuma8(blurred))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Detect edges using Canny
pub struct EdgeDetectionStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl PipelineStep for EdgeDetectionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                let edges = preprocessing::detect_edges(&gray, self.low_threshold, self.high_threshold);
                item.with_image(DynamicImage::ImageLuma8(edges))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Edge Detection"
    }
}

/// Find edge regions - splits one frame into one item per candidate circle
pub struct ContourDetectionStep {
    pub min_area: u32,
    pub padding: u32,
}

impl PipelineStep for ContourDetectionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let gray = item.image.to_luma8();
            let detected = contours::find_contours(&gray, self.min_area);
            let (img_width, img_height) = (item.original.width(), item.original.height());
            log::debug!("{} edge regions", detected.len());

            for contour in detected {
                // Crop around the region, clamped to the frame, for debug output
                let x = contour.min_x.saturating_sub(self.padding);
                let y = contour.min_y.saturating_sub(self.padding);
                let max_x = (contour.max_x + self.padding).min(img_width.saturating_sub(1));
                let max_y = (contour.max_y + self.padding).min(img_height.saturating_sub(1));
                let cropped = item.original.crop_imm(x, y, max_x - x + 1, max_y - y + 1);

                let candidate = PipelineData::from_candidate(cropped, item.original.clone(), contour.to_circle())
                    .with_metadata("edge_pixels", MetadataValue::Int(contour.area() as i32))
                    .with_metadata("circularity", MetadataValue::Float(contour.circularity()))
                    .with_metadata("aspect_ratio", MetadataValue::Float(contour.aspect_ratio()));
                result.push(candidate);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Contour Detection"
    }
}

/// Keep only candidates shaped and sized like a coin
pub struct CircleFilterStep {
    pub min_radius: f32,
    pub max_radius: f32,
    pub circularity_threshold: f32,
}

impl PipelineStep for CircleFilterStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let Some(circle) = item.circle else {
                continue;
            };
            let circularity = item.get_float("circularity").unwrap_or(999.0);
            let aspect_ratio = item.get_float("aspect_ratio").unwrap_or(0.0);

            if circles::has_coin_shape(
                circularity,
                aspect_ratio,
                circle.radius as f32,
                self.min_radius,
                self.max_radius,
                self.circularity_threshold,
            ) {
                result.push(item.with_metadata("is_circle", MetadataValue::Bool(true)));
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Circle Filtering"
    }
}

/// Merge candidates with nearby centres into the largest one
pub struct DedupStep {
    pub min_center_distance: f32,
}

impl PipelineStep for DedupStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let candidates: Vec<(DetectedCircle, PipelineData)> = data
            .into_iter()
            .filter_map(|item| item.circle.map(|c| (c, item)))
            .collect();
        let found: Vec<DetectedCircle> = candidates.iter().map(|(c, _)| *c).collect();

        let kept = circles::suppress_close(&found, self.min_center_distance as f64);
        let mut slots: Vec<Option<PipelineData>> = candidates.into_iter().map(|(_, item)| Some(item)).collect();

        Ok(kept.into_iter().filter_map(|i| slots[i].take()).collect())
    }

    fn name(&self) -> &str {
        "Proximity Dedup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn candidate(x: f64, y: f64, radius: f64, circularity: f32, aspect_ratio: f32) -> PipelineData {
        let original = Arc::new(DynamicImage::new_luma8(8, 8));
        PipelineData::from_candidate(
            DynamicImage::new_luma8(2, 2),
            original,
            DetectedCircle::new(x, y, radius),
        )
        .with_metadata("circularity", MetadataValue::Float(circularity))
        .with_metadata("aspect_ratio", MetadataValue::Float(aspect_ratio))
    }

    #[test]
    fn test_resize_step_replaces_original() {
        let data = vec![PipelineData::from_image(DynamicImage::new_rgb8(100, 50))];
        let out = ResizeStep { scale_percent: 50 }
            .process(data, &PipelineContext::default())
            .unwrap();
        assert_eq!(out[0].image.width(), 50);
        assert_eq!(out[0].original.width(), 50);
    }

    #[test]
    fn test_circle_filter_step() {
        let data = vec![
            candidate(10.0, 10.0, 60.0, 1.27, 1.0),
            candidate(10.0, 10.0, 60.0, 3.5, 1.0),
            candidate(10.0, 10.0, 20.0, 1.27, 1.0),
            candidate(10.0, 10.0, 60.0, 1.27, 1.6),
        ];
        let step = CircleFilterStep {
            min_radius: 50.0,
            max_radius: 2000.0,
            circularity_threshold: 2.0,
        };
        let out = step.process(data, &PipelineContext::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_bool("is_circle"), Some(true));
    }

    #[test]
    fn test_dedup_step() {
        let data = vec![
            candidate(300.0, 100.0, 70.0, 1.27, 1.0),
            candidate(100.0, 100.0, 45.0, 1.27, 1.0),
            candidate(100.0, 100.0, 60.0, 1.27, 1.0),
        ];
        let out = DedupStep { min_center_distance: 120.0 }
            .process(data, &PipelineContext::default())
            .unwrap();
        let radii: Vec<f64> = out.iter().filter_map(|d| d.circle).map(|c| c.radius).collect();
        assert_eq!(radii, vec![60.0, 70.0]);
    }
}

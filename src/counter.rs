use image::{DynamicImage, RgbImage};
use serde::Serialize;
use std::io::{self, Write};

use crate::classifier::{ClassificationResult, Classifier};
use crate::config::CounterConfig;
use crate::detection::{CircleDetector, ContourCircleDetector};
use crate::error::Result;
use crate::models::{DetectedCircle, ReferenceRadius};
use crate::render;

/// Outcome of counting the coins in one frame
#[derive(Debug, Clone, Serialize)]
pub struct CountReport {
    pub reference_radius: f64,
    pub circles: Vec<DetectedCircle>,
    pub result: ClassificationResult,
}

impl CountReport {
    pub fn total(&self) -> f64 {
        self.result.total
    }

    /// Print one line per counted coin, then the total.
    ///
    /// With `detail`, every detected circle is listed with its radius and
    /// ratio, including those that matched nothing.
    pub fn write_text<W: Write>(&self, out: &mut W, currency_symbol: &str, detail: bool) -> io::Result<()> {
        if detail {
            for (index, circle) in self.circles.iter().enumerate() {
                let values = self.result.values_for(index);
                writeln!(
                    out,
                    "circle {} at ({:.0}, {:.0}) radius {:.1} ratio {:.3}: {}",
                    index + 1,
                    circle.x,
                    circle.y,
                    circle.radius,
                    circle.radius / self.reference_radius,
                    if values.is_empty() {
                        "no match".to_string()
                    } else {
                        values.iter().map(|v| format!("{:.2}", v)).collect::<Vec<_>>().join(", ")
                    }
                )?;
            }
        }

        writeln!(out, "Detected coins:")?;
        for m in &self.result.matches {
            writeln!(out, "  {} {:.2} ({})", currency_symbol, m.value, m.denomination)?;
        }
        writeln!(out, "Total: {} {:.2}", currency_symbol, self.result.total)
    }
}

/// Detection followed by classification
pub struct CoinCounter<D: CircleDetector = ContourCircleDetector> {
    detector: D,
    classifier: Classifier,
}

impl CoinCounter<ContourCircleDetector> {
    pub fn from_config(config: &CounterConfig) -> Result<Self> {
        let classifier = Classifier::from_config(config)?;
        let detector = ContourCircleDetector::new(&config.detection, config.scale_percent);
        Ok(Self::new(detector, classifier))
    }
}

impl<D: CircleDetector> CoinCounter<D> {
    pub fn new(detector: D, classifier: Classifier) -> Self {
        Self { detector, classifier }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn set_reference_radius(&mut self, reference_radius: ReferenceRadius) {
        self.classifier = self.classifier.clone().with_reference_radius(reference_radius);
    }

    /// Count coins in `frame`.
    ///
    /// Returns the resized frame the coordinates refer to, and `None` in place
    /// of a report when no circle was detected (nothing is classified then).
    pub fn count(&self, frame: &DynamicImage) -> anyhow::Result<(DynamicImage, Option<CountReport>)> {
        let detection = self.detector.detect(frame)?;
        if detection.circles.is_empty() {
            return Ok((detection.frame, None));
        }

        let result = self.classifier.classify(&detection.circles);
        let report = CountReport {
            reference_radius: self.classifier.reference_radius().pixels(),
            circles: detection.circles,
            result,
        };
        Ok((detection.frame, Some(report)))
    }

    pub fn annotate(&self, frame: &DynamicImage, report: &CountReport) -> RgbImage {
        render::annotate(frame, &report.circles, &report.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;

    struct FixedDetector(Vec<DetectedCircle>);

    impl CircleDetector for FixedDetector {
        fn detect(&self, frame: &DynamicImage) -> anyhow::Result<Detection> {
            Ok(Detection {
                frame: frame.clone(),
                circles: self.0.clone(),
            })
        }
    }

    fn counter(circles: Vec<DetectedCircle>) -> CoinCounter<FixedDetector> {
        let classifier = Classifier::from_config(&CounterConfig::default()).unwrap();
        CoinCounter::new(FixedDetector(circles), classifier)
    }

    #[test]
    fn test_no_circles_skips_classification() {
        let (_, report) = counter(vec![]).count(&DynamicImage::new_rgb8(10, 10)).unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn test_count_classifies_detected_circles() {
        let circles = vec![
            DetectedCircle::new(50.0, 50.0, 141.7),
            DetectedCircle::new(400.0, 50.0, 141.7 * 27.0 / 17.0),
            DetectedCircle::new(800.0, 50.0, 10.0),
        ];
        let (_, report) = counter(circles).count(&DynamicImage::new_rgb8(10, 10)).unwrap();
        let report = report.unwrap();
        assert_eq!(report.circles.len(), 3);
        assert_eq!(report.result.values, vec![0.01, 1.0]);
        assert_eq!(report.total(), 1.01);
    }

    #[test]
    fn test_write_text() {
        let circles = vec![
            DetectedCircle::new(10.0, 20.0, 141.7),
            DetectedCircle::new(30.0, 20.0, 50.0),
        ];
        let (_, report) = counter(circles).count(&DynamicImage::new_rgb8(10, 10)).unwrap();
        let report = report.unwrap();

        let mut out = Vec::new();
        report.write_text(&mut out, "R$", false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Detected coins:\n  R$ 0.01 (1_cent)\nTotal: R$ 0.01\n");

        let mut out = Vec::new();
        report.write_text(&mut out, "R$", true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("circle 1 at (10, 20) radius 141.7 ratio 1.000: 0.01"));
        assert!(text.contains("circle 2 at (30, 20) radius 50.0 ratio 0.353: no match"));
    }

    #[test]
    fn test_unmatched_circles_total_zero() {
        let (_, report) = counter(vec![DetectedCircle::new(30.0, 20.0, 50.0)])
            .count(&DynamicImage::new_rgb8(10, 10))
            .unwrap();
        let report = report.unwrap();

        let mut out = Vec::new();
        report.write_text(&mut out, "R$", false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Detected coins:\nTotal: R$ 0.00\n");

        let json = serde_json::to_value(&report.result).unwrap();
        assert_eq!(json["total"].to_string(), "0.0");
    }

    #[test]
    fn test_reference_radius_override() {
        let mut counter = counter(vec![DetectedCircle::new(0.0, 0.0, 36.0)]);
        let frame = DynamicImage::new_rgb8(10, 10);
        assert!(counter.count(&frame).unwrap().1.unwrap().result.values.is_empty());

        counter.set_reference_radius(ReferenceRadius::new(36.0).unwrap());
        let report = counter.count(&frame).unwrap().1.unwrap();
        assert_eq!(report.result.values, vec![0.01]);
        assert_eq!(report.reference_radius, 36.0);
    }
}

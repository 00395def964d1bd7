use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoinError, Result};

/// Connected edge region found in an edge map
#[derive(Debug, Clone)]
pub struct Contour {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u32 {
        self.pixel_count
    }

    pub fn perimeter(&self) -> f32 {
        // Approximate perimeter from bounding box
        2.0 * (self.width() as f32 + self.height() as f32)
    }

    /// perimeter² / (4π × bbox area); a disk's bounding box gives 4/π
    pub fn circularity(&self) -> f32 {
        let perimeter = self.perimeter();
        let area = (self.width() * self.height()) as f32;

        if area == 0.0 {
            return 0.0;
        }

        (perimeter * perimeter) / (4.0 * std::f32::consts::PI * area)
    }

    pub fn aspect_ratio(&self) -> f32 {
        let w = self.width() as f32;
        let h = self.height() as f32;
        if h == 0.0 {
            return 0.0;
        }
        w / h
    }

    pub fn radius(&self) -> f32 {
        // Edge pixels sit on the rim, so the bbox spans the diameter plus one pixel
        (self.width() + self.height() - 2) as f32 / 4.0
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) as f32 / 2.0,
            (self.min_y + self.max_y) as f32 / 2.0,
        )
    }

    pub fn to_circle(&self) -> DetectedCircle {
        let (x, y) = self.center();
        DetectedCircle::new(x as f64, y as f64, self.radius() as f64)
    }
}

/// A circle reported by circle detection, in pixel units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedCircle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl DetectedCircle {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    /// Circle known only by its radius (centre at the origin)
    pub fn from_radius(radius: f64) -> Self {
        Self::new(0.0, 0.0, radius)
    }
}

/// Pixel radius of the smallest denomination at the current image scale.
///
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ReferenceRadius(f64);

impl ReferenceRadius {
    pub fn new(pixels: f64) -> Result<Self> {
        if !pixels.is_finite() {
            return Err(CoinError::invalid_config(format!(
                "reference radius must be a finite number, got {}",
                pixels
            )));
        }
        if pixels <= 0.0 {
            return Err(CoinError::invalid_config(format!(
                "reference radius must be positive, got {}",
                pixels
            )));
        }
        Ok(Self(pixels))
    }

    pub fn pixels(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ReferenceRadius {
    type Error = CoinError;

    fn try_from(pixels: f64) -> Result<Self> {
        Self::new(pixels)
    }
}

impl From<ReferenceRadius> for f64 {
    fn from(radius: ReferenceRadius) -> Self {
        radius.0
    }
}

impl FromStr for ReferenceRadius {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self> {
        let pixels: f64 = s.trim().parse().map_err(|_| {
            CoinError::invalid_config(format!("reference radius is not a number: {:?}", s.trim()))
        })?;
        Self::new(pixels)
    }
}

impl fmt::Display for ReferenceRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Counter configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `COINCOUNT_*` environment variables. The CLI applies its own flags on top
//! and calls [`CounterConfig::validate`] before anything is classified.
//!
//! ```toml
//! reference_radius = 141.7
//! tolerance = 0.035
//! match_policy = "closest"
//!
//! [detection]
//! min_radius = 40.0
//!
//! [[denominations]]
//! name = "1_cent"
//! value = 0.01
//! physical_size_mm = 17.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classifier::{
    DEFAULT_REFERENCE_SIZE_MM, DEFAULT_TOLERANCE, Denomination, DenominationTable, MatchPolicy,
    default_denominations,
};
use crate::error::{CoinError, Result};
use crate::models::ReferenceRadius;

/// 1 centavo radius for still photos resized to `DEFAULT_SCALE_PERCENT`
pub const DEFAULT_REFERENCE_RADIUS: f64 = 141.7;
pub const DEFAULT_SCALE_PERCENT: u32 = 80;
pub const DEFAULT_CURRENCY_SYMBOL: &str = "R$";

pub const ENV_REFERENCE_RADIUS: &str = "COINCOUNT_REFERENCE_RADIUS";
pub const ENV_TOLERANCE: &str = "COINCOUNT_TOLERANCE";
pub const ENV_SCALE_PERCENT: &str = "COINCOUNT_SCALE_PERCENT";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterConfig {
    /// Pixel radius of the smallest denomination at `scale_percent`
    pub reference_radius: f64,
    pub tolerance: f64,
    pub reference_physical_size_mm: f64,
    pub denominations: Vec<Denomination>,
    pub match_policy: MatchPolicy,
    pub currency_symbol: String,
    /// Resize applied to every frame before detection
    pub scale_percent: u32,
    pub detection: DetectionConfig,
}

/// Parameters for the edge/contour circle detector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionConfig {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Edge regions with fewer pixels are ignored
    pub min_edge_pixels: u32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub circularity_threshold: f32,
    /// Circles whose centres are closer than this collapse into the largest
    pub min_center_distance: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 3.0,
            canny_low: 20.0,
            canny_high: 53.0,
            min_edge_pixels: 20,
            min_radius: 50.0,
            max_radius: 2000.0,
            circularity_threshold: 2.0,
            min_center_distance: 120.0,
        }
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            reference_radius: DEFAULT_REFERENCE_RADIUS,
            tolerance: DEFAULT_TOLERANCE,
            reference_physical_size_mm: DEFAULT_REFERENCE_SIZE_MM,
            denominations: default_denominations(),
            match_policy: MatchPolicy::default(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            scale_percent: DEFAULT_SCALE_PERCENT,
            detection: DetectionConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CounterConfigFile {
    reference_radius: Option<f64>,
    tolerance: Option<f64>,
    reference_physical_size_mm: Option<f64>,
    denominations: Option<Vec<Denomination>>,
    match_policy: Option<MatchPolicy>,
    currency_symbol: Option<String>,
    scale_percent: Option<u32>,
    detection: Option<DetectionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    blur_sigma: Option<f32>,
    canny_low: Option<f32>,
    canny_high: Option<f32>,
    min_edge_pixels: Option<u32>,
    min_radius: Option<f32>,
    max_radius: Option<f32>,
    circularity_threshold: Option<f32>,
    min_center_distance: Option<f32>,
}

impl CounterConfig {
    /// Defaults, then `path` if given, then the environment. Validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoinError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            CoinError::ConfigLoad { message, .. } => CoinError::ConfigLoad {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Missing keys keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: CounterConfigFile = toml::from_str(raw).map_err(|e| CoinError::ConfigLoad {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: CounterConfigFile) -> Self {
        let defaults = Self::default();
        let detection_file = file.detection.unwrap_or_default();
        let d = defaults.detection;
        let detection = DetectionConfig {
            blur_sigma: detection_file.blur_sigma.unwrap_or(d.blur_sigma),
            canny_low: detection_file.canny_low.unwrap_or(d.canny_low),
            canny_high: detection_file.canny_high.unwrap_or(d.canny_high),
            min_edge_pixels: detection_file.min_edge_pixels.unwrap_or(d.min_edge_pixels),
            min_radius: detection_file.min_radius.unwrap_or(d.min_radius),
            max_radius: detection_file.max_radius.unwrap_or(d.max_radius),
            circularity_threshold: detection_file
                .circularity_threshold
                .unwrap_or(d.circularity_threshold),
            min_center_distance: detection_file
                .min_center_distance
                .unwrap_or(d.min_center_distance),
        };

        Self {
            reference_radius: file.reference_radius.unwrap_or(defaults.reference_radius),
            tolerance: file.tolerance.unwrap_or(defaults.tolerance),
            reference_physical_size_mm: file
                .reference_physical_size_mm
                .unwrap_or(defaults.reference_physical_size_mm),
            denominations: file.denominations.unwrap_or(defaults.denominations),
            match_policy: file.match_policy.unwrap_or(defaults.match_policy),
            currency_symbol: file.currency_symbol.unwrap_or(defaults.currency_symbol),
            scale_percent: file.scale_percent.unwrap_or(defaults.scale_percent),
            detection,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(value) = env_value(ENV_REFERENCE_RADIUS) {
            self.reference_radius = value.parse::<ReferenceRadius>()?.pixels();
        }
        if let Some(value) = env_value(ENV_TOLERANCE) {
            self.tolerance = value.parse().map_err(|_| {
                CoinError::invalid_config(format!("{} must be a number", ENV_TOLERANCE))
            })?;
        }
        if let Some(value) = env_value(ENV_SCALE_PERCENT) {
            self.scale_percent = value.parse().map_err(|_| {
                CoinError::invalid_config(format!("{} must be an integer percentage", ENV_SCALE_PERCENT))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ReferenceRadius::new(self.reference_radius)?;
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CoinError::invalid_config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        DenominationTable::new(&self.denominations, self.reference_physical_size_mm)?;
        if self.scale_percent == 0 {
            return Err(CoinError::invalid_config("scale_percent must be greater than zero"));
        }

        let d = &self.detection;
        if d.min_radius < 0.0 || d.min_radius > d.max_radius {
            return Err(CoinError::invalid_config(format!(
                "detection radius range is empty: {}..{}",
                d.min_radius, d.max_radius
            )));
        }
        if d.canny_low > d.canny_high {
            return Err(CoinError::invalid_config(format!(
                "canny_low ({}) exceeds canny_high ({})",
                d.canny_low, d.canny_high
            )));
        }
        if d.blur_sigma <= 0.0 {
            return Err(CoinError::invalid_config("blur_sigma must be positive"));
        }
        Ok(())
    }

    pub fn reference(&self) -> Result<ReferenceRadius> {
        ReferenceRadius::new(self.reference_radius)
    }

    /// Format an amount with the configured currency symbol
    pub fn format_amount(&self, amount: f64) -> String {
        format!("{} {:.2}", self.currency_symbol, amount)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = CounterConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.reference_radius, 141.7);
        assert_eq!(cfg.tolerance, 0.035);
        assert_eq!(cfg.denominations.len(), 6);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = CounterConfig::from_toml_str(
            r#"
            reference_radius = 36.0
            match_policy = "closest"

            [detection]
            min_radius = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.reference_radius, 36.0);
        assert_eq!(cfg.match_policy, MatchPolicy::Closest);
        assert_eq!(cfg.detection.min_radius, 20.0);
        assert_eq!(cfg.detection.max_radius, 2000.0);
        assert_eq!(cfg.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(cfg.denominations, default_denominations());
    }

    #[test]
    fn test_custom_denominations() {
        let cfg = CounterConfig::from_toml_str(
            r#"
            reference_physical_size_mm = 19.05
            currency_symbol = "$"

            [[denominations]]
            name = "penny"
            value = 0.01
            physical_size_mm = 19.05

            [[denominations]]
            name = "quarter"
            value = 0.25
            physical_size_mm = 24.26
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.denominations[1].name, "quarter");
        assert_eq!(cfg.format_amount(0.26), "$ 0.26");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = CounterConfig::from_toml_str("refrence_radius = 10.0").unwrap_err();
        assert!(matches!(err, CoinError::ConfigLoad { .. }));
    }

    #[test]
    fn test_validate_rejections() {
        let mut cfg = CounterConfig::default();
        cfg.reference_radius = 0.0;
        assert!(cfg.validate().unwrap_err().is_invalid_configuration());

        let mut cfg = CounterConfig::default();
        cfg.reference_radius = -5.0;
        assert!(cfg.validate().unwrap_err().is_invalid_configuration());

        let mut cfg = CounterConfig::default();
        cfg.tolerance = -0.01;
        assert!(cfg.validate().is_err());

        let mut cfg = CounterConfig::default();
        cfg.denominations.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = CounterConfig::default();
        cfg.scale_percent = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = CounterConfig::default();
        cfg.detection.min_radius = 300.0;
        cfg.detection.max_radius = 100.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tolerance = 0.05\nscale_percent = 60").unwrap();
        let cfg = CounterConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(cfg.tolerance, 0.05);
        assert_eq!(cfg.scale_percent, 60);

        let err = CounterConfig::from_toml_file(Path::new("/nonexistent/coincount.toml")).unwrap_err();
        assert!(matches!(err, CoinError::ConfigLoad { .. }));
    }

    #[test]
    fn test_bad_file_error_names_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tolerance = \"wide\"").unwrap();
        match CounterConfig::from_toml_file(file.path()).unwrap_err() {
            CoinError::ConfigLoad { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error {:?}", other),
        }
    }
}

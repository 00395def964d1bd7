//! Denomination classification by radius ratio.
//!
//! Each detected circle's radius is divided by the reference radius (the
//! pixel radius of the smallest denomination) and compared against the
//! expected ratio of every denomination in the table. A circle within
//! `tolerance` of an entry is counted as that coin.
//!
//! ```
//! use coincount::{Classifier, CounterConfig, DetectedCircle};
//!
//! let classifier = Classifier::from_config(&CounterConfig::default())?;
//! let result = classifier.classify(&[DetectedCircle::from_radius(141.7)]);
//! assert_eq!(result.values, vec![0.01]);
//! # Ok::<(), coincount::CoinError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::config::CounterConfig;
use crate::error::{CoinError, Result};
use crate::models::{DetectedCircle, ReferenceRadius};

/// Physical diameter of the 1 centavo coin in millimetres
pub const DEFAULT_REFERENCE_SIZE_MM: f64 = 17.0;

/// Maximum allowed distance between observed and expected ratio
pub const DEFAULT_TOLERANCE: f64 = 0.035;

/// One coin of the currency: monetary value and physical diameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Denomination {
    pub name: String,
    pub value: f64,
    pub physical_size_mm: f64,
}

impl Denomination {
    pub fn new(name: impl Into<String>, value: f64, physical_size_mm: f64) -> Self {
        Self {
            name: name.into(),
            value,
            physical_size_mm,
        }
    }
}

/// Brazilian Real coin set, smallest first
pub fn default_denominations() -> Vec<Denomination> {
    vec![
        Denomination::new("1_cent", 0.01, 17.0),
        Denomination::new("5_cents", 0.05, 22.0),
        Denomination::new("10_cents", 0.10, 20.0),
        Denomination::new("25_cents", 0.25, 25.0),
        Denomination::new("50_cents", 0.50, 23.0),
        Denomination::new("1_brl", 1.00, 27.0),
    ]
}

/// How to treat a circle that is within tolerance of several entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Count every entry within tolerance, in table order
    #[default]
    All,
    /// Count only the entry with the smallest deviation
    Closest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    pub denomination: Denomination,
    pub expected_ratio: f64,
}

/// Ordered denomination table with precomputed expected ratios
#[derive(Debug, Clone, PartialEq)]
pub struct DenominationTable {
    entries: Vec<TableEntry>,
    reference_size_mm: f64,
}

impl DenominationTable {
    pub fn new(denominations: &[Denomination], reference_size_mm: f64) -> Result<Self> {
        if !reference_size_mm.is_finite() || reference_size_mm <= 0.0 {
            return Err(CoinError::invalid_config(format!(
                "reference physical size must be positive, got {}",
                reference_size_mm
            )));
        }
        if denominations.is_empty() {
            return Err(CoinError::invalid_config("denomination table is empty"));
        }

        let mut entries: Vec<TableEntry> = Vec::with_capacity(denominations.len());
        for denomination in denominations {
            if entries
                .iter()
                .any(|e| e.denomination.name == denomination.name)
            {
                return Err(CoinError::invalid_config(format!(
                    "duplicate denomination {:?}",
                    denomination.name
                )));
            }
            if !denomination.physical_size_mm.is_finite() || denomination.physical_size_mm <= 0.0 {
                return Err(CoinError::invalid_config(format!(
                    "denomination {:?} has non-positive size {}",
                    denomination.name, denomination.physical_size_mm
                )));
            }
            if !denomination.value.is_finite() || denomination.value < 0.0 {
                return Err(CoinError::invalid_config(format!(
                    "denomination {:?} has invalid value {}",
                    denomination.name, denomination.value
                )));
            }
            entries.push(TableEntry {
                denomination: denomination.clone(),
                expected_ratio: denomination.physical_size_mm / reference_size_mm,
            });
        }

        Ok(Self {
            entries,
            reference_size_mm,
        })
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn reference_size_mm(&self) -> f64 {
        self.reference_size_mm
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DenominationTable {
    fn default() -> Self {
        let entries = default_denominations()
            .into_iter()
            .map(|denomination| TableEntry {
                expected_ratio: denomination.physical_size_mm / DEFAULT_REFERENCE_SIZE_MM,
                denomination,
            })
            .collect();
        Self {
            entries,
            reference_size_mm: DEFAULT_REFERENCE_SIZE_MM,
        }
    }
}

/// A circle counted as a denomination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinMatch {
    /// Index of the circle in the classified input
    pub circle_index: usize,
    pub denomination: String,
    pub value: f64,
    pub observed_ratio: f64,
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ClassificationResult {
    /// `sum(values)` rounded to two decimals
    pub total: f64,
    pub values: Vec<f64>,
    pub matches: Vec<CoinMatch>,
}

impl ClassificationResult {
    /// Values matched for one input circle
    pub fn values_for(&self, circle_index: usize) -> Vec<f64> {
        self.matches
            .iter()
            .filter(|m| m.circle_index == circle_index)
            .map(|m| m.value)
            .collect()
    }

    pub fn is_classified(&self, circle_index: usize) -> bool {
        self.matches.iter().any(|m| m.circle_index == circle_index)
    }
}

/// Round to two decimals. Zero always comes out as `+0.0`.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0 + 0.0
}

#[derive(Debug, Clone)]
pub struct Classifier {
    table: DenominationTable,
    reference_radius: ReferenceRadius,
    tolerance: f64,
    policy: MatchPolicy,
}

impl Classifier {
    pub fn new(table: DenominationTable, reference_radius: ReferenceRadius, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(CoinError::invalid_config(format!(
                "tolerance must be a non-negative number, got {}",
                tolerance
            )));
        }
        Ok(Self {
            table,
            reference_radius,
            tolerance,
            policy: MatchPolicy::default(),
        })
    }

    pub fn from_config(config: &CounterConfig) -> Result<Self> {
        config.validate()?;
        let table = DenominationTable::new(&config.denominations, config.reference_physical_size_mm)?;
        let reference_radius = ReferenceRadius::new(config.reference_radius)?;
        Ok(Self::new(table, reference_radius, config.tolerance)?.with_policy(config.match_policy))
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reference_radius(mut self, reference_radius: ReferenceRadius) -> Self {
        self.reference_radius = reference_radius;
        self
    }

    pub fn table(&self) -> &DenominationTable {
        &self.table
    }

    pub fn reference_radius(&self) -> ReferenceRadius {
        self.reference_radius
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Classify every circle against the table.
    ///
    /// Values come out in input order; several matches for one circle follow
    /// table order. Circles with no entry within tolerance are left out.
    pub fn classify(&self, circles: &[DetectedCircle]) -> ClassificationResult {
        let reference = self.reference_radius.pixels();
        log::debug!(
            "classifying {} circles (reference radius {}, tolerance {})",
            circles.len(),
            reference,
            self.tolerance
        );

        let mut matches = Vec::new();
        for (circle_index, circle) in circles.iter().enumerate() {
            let observed_ratio = circle.radius / reference;
            let mut circle_matches: Vec<CoinMatch> = self
                .table
                .entries
                .iter()
                .filter_map(|entry| {
                    let deviation = (observed_ratio - entry.expected_ratio).abs();
                    (deviation <= self.tolerance).then(|| CoinMatch {
                        circle_index,
                        denomination: entry.denomination.name.clone(),
                        value: entry.denomination.value,
                        observed_ratio,
                        deviation,
                    })
                })
                .collect();

            if self.policy == MatchPolicy::Closest && circle_matches.len() > 1 {
                // min_by keeps the first of equal elements, so ties go to table order
                let best = circle_matches
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| a.deviation.total_cmp(&b.deviation))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                circle_matches = vec![circle_matches.swap_remove(best)];
            }

            if circle_matches.is_empty() {
                log::debug!(
                    "circle {} (radius {:.1}, ratio {:.3}) matched nothing",
                    circle_index,
                    circle.radius,
                    observed_ratio
                );
            }
            for m in &circle_matches {
                log::debug!(
                    "circle {} (radius {:.1}, ratio {:.3}) -> {} ({})",
                    circle_index,
                    circle.radius,
                    observed_ratio,
                    m.denomination,
                    m.value
                );
            }
            matches.extend(circle_matches);
        }

        let values: Vec<f64> = matches.iter().map(|m| m.value).collect();
        let total = round_cents(values.iter().fold(0.0, |acc, v| acc + v));
        ClassificationResult {
            total,
            values,
            matches,
        }
    }
}

/// Classify `circles` against the default table.
///
/// Returns `(total, values)`; fails with `InvalidConfiguration` when
/// `reference_radius` is not a positive number.
pub fn classify_radii(reference_radius: f64, circles: &[DetectedCircle]) -> Result<(f64, Vec<f64>)> {
    let reference_radius = ReferenceRadius::new(reference_radius)?;
    let classifier = Classifier::new(DenominationTable::default(), reference_radius, DEFAULT_TOLERANCE)?;
    let result = classifier.classify(circles);
    Ok((result.total, result.values))
}

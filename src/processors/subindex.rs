use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ProcessingError, Result};
use crate::models::Pollutant;
use crate::utils::constants::{
    MAX_GRADE, NO2_THRESHOLDS, O3_THRESHOLDS, PM10_THRESHOLDS, PM2_5_THRESHOLDS, SO2_THRESHOLDS,
};

/// Ascending upper bounds mapping a concentration to a grade in 1..=10.
///
/// A value equal to bound `i` (1-based) grades `i`; a value above every
/// bound grades 10.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    pollutant: Pollutant,
    bounds: [f64; 9],
}

impl ThresholdTable {
    pub fn new(pollutant: Pollutant, bounds: [f64; 9]) -> Result<Self> {
        let invalid = |message: String| ProcessingError::InvalidThresholds {
            pollutant: pollutant.column_name().to_string(),
            message,
        };

        if let Some(bound) = bounds.iter().find(|b| !b.is_finite() || **b < 0.0) {
            return Err(invalid(format!(
                "bound {} is not a finite non-negative number",
                bound
            )));
        }

        if let Some(pair) = bounds.windows(2).find(|w| w[0] >= w[1]) {
            return Err(invalid(format!(
                "bounds must be strictly ascending ({} >= {})",
                pair[0], pair[1]
            )));
        }

        Ok(Self { pollutant, bounds })
    }

    /// Build from a configuration list, which must hold exactly nine bounds
    pub fn from_slice(pollutant: Pollutant, bounds: &[f64]) -> Result<Self> {
        let bounds: [f64; 9] =
            bounds
                .try_into()
                .map_err(|_| ProcessingError::InvalidThresholds {
                    pollutant: pollutant.column_name().to_string(),
                    message: format!("expected 9 bounds, got {}", bounds.len()),
                })?;
        Self::new(pollutant, bounds)
    }

    /// The regulatory table for a pollutant
    pub fn default_for(pollutant: Pollutant) -> Self {
        let bounds = match pollutant {
            Pollutant::Pm10 => PM10_THRESHOLDS,
            Pollutant::Pm2_5 => PM2_5_THRESHOLDS,
            Pollutant::NitrogenDioxide => NO2_THRESHOLDS,
            Pollutant::Ozone => O3_THRESHOLDS,
            Pollutant::SulphurDioxide => SO2_THRESHOLDS,
        };
        Self { pollutant, bounds }
    }

    pub fn pollutant(&self) -> Pollutant {
        self.pollutant
    }

    pub fn bounds(&self) -> &[f64; 9] {
        &self.bounds
    }

    /// Grade a daily concentration.
    ///
    /// Negative and non-finite values are rejected rather than graded.
    pub fn grade(&self, value: f64) -> Result<u8> {
        if !value.is_finite() || value < 0.0 {
            return Err(ProcessingError::InvalidConcentration {
                pollutant: self.pollutant.column_name().to_string(),
                value,
            });
        }

        Ok(self
            .bounds
            .iter()
            .position(|bound| value <= *bound)
            .map_or(MAX_GRADE, |rank| rank as u8 + 1))
    }
}

/// One threshold table per pollutant, built once and shared read-only
#[derive(Debug, Clone, PartialEq)]
pub struct IndexTables {
    tables: [ThresholdTable; 5],
}

impl IndexTables {
    pub fn new() -> Self {
        Self {
            tables: Pollutant::ALL.map(ThresholdTable::default_for),
        }
    }

    /// Replace the table of the table's own pollutant
    pub fn with_table(mut self, table: ThresholdTable) -> Self {
        let slot = table.pollutant().index();
        self.tables[slot] = table;
        self
    }

    pub fn table(&self, pollutant: Pollutant) -> &ThresholdTable {
        &self.tables[pollutant.index()]
    }

    pub fn grade(&self, pollutant: Pollutant, value: f64) -> Result<u8> {
        self.table(pollutant).grade(value)
    }

    /// Grade a possibly missing value; missing stays missing
    pub fn grade_optional(&self, pollutant: Pollutant, value: Option<f64>) -> Result<Option<u8>> {
        value.map(|v| self.grade(pollutant, v)).transpose()
    }
}

impl Default for IndexTables {
    fn default() -> Self {
        Self::new()
    }
}

pub fn subindex_pm10(value: f64) -> Result<u8> {
    ThresholdTable::default_for(Pollutant::Pm10).grade(value)
}

pub fn subindex_pm2_5(value: f64) -> Result<u8> {
    ThresholdTable::default_for(Pollutant::Pm2_5).grade(value)
}

pub fn subindex_no2(value: f64) -> Result<u8> {
    ThresholdTable::default_for(Pollutant::NitrogenDioxide).grade(value)
}

pub fn subindex_o3(value: f64) -> Result<u8> {
    ThresholdTable::default_for(Pollutant::Ozone).grade(value)
}

pub fn subindex_so2(value: f64) -> Result<u8> {
    ThresholdTable::default_for(Pollutant::SulphurDioxide).grade(value)
}

/// How missing sub-indices affect the composite index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Max over the sub-indices that are present; missing only if all are
    #[default]
    #[serde(rename = "skip", alias = "skip_missing")]
    SkipMissing,
    /// Any missing sub-index makes the composite missing
    #[serde(rename = "propagate")]
    Propagate,
}

impl FromStr for MissingPolicy {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "skip_missing" | "skip-missing" => Ok(MissingPolicy::SkipMissing),
            "propagate" => Ok(MissingPolicy::Propagate),
            other => Err(ProcessingError::Config(format!(
                "Unsupported missing-value policy: {}",
                other
            ))),
        }
    }
}

/// Composite ATMO grade: the worst of the sub-indices
pub fn composite_index(subindices: &[Option<u8>], policy: MissingPolicy) -> Option<u8> {
    match policy {
        MissingPolicy::SkipMissing => subindices.iter().flatten().copied().max(),
        MissingPolicy::Propagate => subindices
            .iter()
            .copied()
            .collect::<Option<Vec<u8>>>()
            .and_then(|grades| grades.into_iter().max()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_boundaries_for_every_pollutant() {
        let tables = IndexTables::new();
        for pollutant in Pollutant::ALL {
            let table = tables.table(pollutant);
            assert_eq!(table.grade(0.0).unwrap(), 1);

            for (i, bound) in table.bounds().iter().enumerate() {
                let rank = i as u8 + 1;
                assert_eq!(table.grade(*bound).unwrap(), rank, "{} at {}", pollutant, bound);
                assert_eq!(
                    table.grade(bound - EPS).unwrap(),
                    rank,
                    "{} just below {}",
                    pollutant,
                    bound
                );
                assert_eq!(
                    table.grade(bound + EPS).unwrap(),
                    rank + 1,
                    "{} just above {}",
                    pollutant,
                    bound
                );
            }
        }
    }

    #[test]
    fn test_named_lookups() {
        assert_eq!(subindex_pm10(6.0).unwrap(), 1);
        assert_eq!(subindex_pm10(7.0).unwrap(), 2);
        assert_eq!(subindex_pm2_5(75.0).unwrap(), 9);
        assert_eq!(subindex_pm2_5(75.1).unwrap(), 10);
        assert_eq!(subindex_no2(100.0).unwrap(), 4);
        assert_eq!(subindex_o3(60.0).unwrap(), 3);
        assert_eq!(subindex_so2(500.0).unwrap(), 10);
    }

    #[test]
    fn test_monotonic_grades() {
        let tables = IndexTables::new();
        for pollutant in Pollutant::ALL {
            let mut previous = 1;
            for step in 0..6000 {
                let grade = tables.grade(pollutant, step as f64 * 0.1).unwrap();
                assert!(grade >= previous);
                assert!((1..=10).contains(&grade));
                previous = grade;
            }
        }
    }

    #[test]
    fn test_rejects_out_of_domain_values() {
        assert!(matches!(
            subindex_pm10(-0.5),
            Err(ProcessingError::InvalidConcentration { .. })
        ));
        assert!(subindex_o3(f64::NAN).is_err());
        assert!(subindex_so2(f64::INFINITY).is_err());
    }

    #[test]
    fn test_missing_value_stays_missing() {
        let tables = IndexTables::new();
        assert_eq!(tables.grade_optional(Pollutant::Ozone, None).unwrap(), None);
        assert_eq!(
            tables.grade_optional(Pollutant::Ozone, Some(60.0)).unwrap(),
            Some(3)
        );
    }

    #[test]
    fn test_table_validation() {
        assert!(ThresholdTable::new(Pollutant::Pm10, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).is_ok());
        assert!(ThresholdTable::new(Pollutant::Pm10, [1.0, 2.0, 2.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).is_err());
        assert!(ThresholdTable::new(Pollutant::Pm10, [-1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).is_err());
        assert!(ThresholdTable::from_slice(Pollutant::Pm10, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_table_override() {
        let custom = ThresholdTable::from_slice(
            Pollutant::Ozone,
            &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0],
        )
        .unwrap();
        let tables = IndexTables::new().with_table(custom);

        assert_eq!(tables.grade(Pollutant::Ozone, 60.0).unwrap(), 6);
        assert_eq!(tables.grade(Pollutant::Pm10, 60.0).unwrap(), 8);
    }

    #[test]
    fn test_composite_policies() {
        let grades = [Some(2), None, Some(7), Some(3), Some(1)];
        assert_eq!(composite_index(&grades, MissingPolicy::SkipMissing), Some(7));
        assert_eq!(composite_index(&grades, MissingPolicy::Propagate), None);

        let complete = [Some(2), Some(4), Some(4), Some(3), Some(1)];
        assert_eq!(composite_index(&complete, MissingPolicy::Propagate), Some(4));

        assert_eq!(composite_index(&[None; 5], MissingPolicy::SkipMissing), None);
    }

    #[test]
    fn test_missing_policy_parsing() {
        assert_eq!("skip".parse::<MissingPolicy>().unwrap(), MissingPolicy::SkipMissing);
        assert_eq!("Propagate".parse::<MissingPolicy>().unwrap(), MissingPolicy::Propagate);
        assert!("ignore".parse::<MissingPolicy>().is_err());
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::models::{AtmoCategory, ClimateVariable, Pollutant};

/// Aggregation key: one calendar day in one region
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub day: NaiveDate,
    pub region: String,
}

impl GroupKey {
    pub fn new(day: NaiveDate, region: impl Into<String>) -> Self {
        Self {
            day,
            region: region.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.region, self.day)
    }
}

/// One row of the daily index table.
///
/// Field names are the output column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DailyRegionSummary {
    pub day: NaiveDate,
    pub region: String,

    // Daily pollutant values (ozone is the max of 8-hour rolling means)
    pub pm10: Option<f64>,
    pub pm2_5: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub ozone: Option<f64>,
    pub sulphur_dioxide: Option<f64>,

    // Daily climate means
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub precipitation: Option<f64>,
    pub surface_pressure: Option<f64>,
    pub wind_speed_10m: Option<f64>,

    #[validate(range(min = 1, max = 10))]
    pub subindex_pm10: Option<u8>,

    #[validate(range(min = 1, max = 10))]
    pub subindex_pm2_5: Option<u8>,

    #[validate(range(min = 1, max = 10))]
    pub subindex_no2: Option<u8>,

    #[validate(range(min = 1, max = 10))]
    pub subindex_o3: Option<u8>,

    #[validate(range(min = 1, max = 10))]
    pub subindex_so2: Option<u8>,

    #[validate(range(min = 1, max = 10))]
    pub indice_atmo: Option<u8>,
}

impl DailyRegionSummary {
    /// A row for a key with no aggregated data, every value missing
    pub fn empty(key: GroupKey) -> Self {
        Self {
            day: key.day,
            region: key.region,
            pm10: None,
            pm2_5: None,
            nitrogen_dioxide: None,
            ozone: None,
            sulphur_dioxide: None,
            temperature_2m: None,
            relative_humidity_2m: None,
            precipitation: None,
            surface_pressure: None,
            wind_speed_10m: None,
            subindex_pm10: None,
            subindex_pm2_5: None,
            subindex_no2: None,
            subindex_o3: None,
            subindex_so2: None,
            indice_atmo: None,
        }
    }

    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.day, self.region.clone())
    }

    pub fn pollutant(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::Pm10 => self.pm10,
            Pollutant::Pm2_5 => self.pm2_5,
            Pollutant::NitrogenDioxide => self.nitrogen_dioxide,
            Pollutant::Ozone => self.ozone,
            Pollutant::SulphurDioxide => self.sulphur_dioxide,
        }
    }

    pub fn pollutant_mut(&mut self, pollutant: Pollutant) -> &mut Option<f64> {
        match pollutant {
            Pollutant::Pm10 => &mut self.pm10,
            Pollutant::Pm2_5 => &mut self.pm2_5,
            Pollutant::NitrogenDioxide => &mut self.nitrogen_dioxide,
            Pollutant::Ozone => &mut self.ozone,
            Pollutant::SulphurDioxide => &mut self.sulphur_dioxide,
        }
    }

    pub fn climate(&self, variable: ClimateVariable) -> Option<f64> {
        match variable {
            ClimateVariable::Temperature2m => self.temperature_2m,
            ClimateVariable::RelativeHumidity2m => self.relative_humidity_2m,
            ClimateVariable::Precipitation => self.precipitation,
            ClimateVariable::SurfacePressure => self.surface_pressure,
            ClimateVariable::WindSpeed10m => self.wind_speed_10m,
        }
    }

    pub fn climate_mut(&mut self, variable: ClimateVariable) -> &mut Option<f64> {
        match variable {
            ClimateVariable::Temperature2m => &mut self.temperature_2m,
            ClimateVariable::RelativeHumidity2m => &mut self.relative_humidity_2m,
            ClimateVariable::Precipitation => &mut self.precipitation,
            ClimateVariable::SurfacePressure => &mut self.surface_pressure,
            ClimateVariable::WindSpeed10m => &mut self.wind_speed_10m,
        }
    }

    pub fn subindex(&self, pollutant: Pollutant) -> Option<u8> {
        match pollutant {
            Pollutant::Pm10 => self.subindex_pm10,
            Pollutant::Pm2_5 => self.subindex_pm2_5,
            Pollutant::NitrogenDioxide => self.subindex_no2,
            Pollutant::Ozone => self.subindex_o3,
            Pollutant::SulphurDioxide => self.subindex_so2,
        }
    }

    pub fn subindex_mut(&mut self, pollutant: Pollutant) -> &mut Option<u8> {
        match pollutant {
            Pollutant::Pm10 => &mut self.subindex_pm10,
            Pollutant::Pm2_5 => &mut self.subindex_pm2_5,
            Pollutant::NitrogenDioxide => &mut self.subindex_no2,
            Pollutant::Ozone => &mut self.subindex_o3,
            Pollutant::SulphurDioxide => &mut self.subindex_so2,
        }
    }

    /// Sub-indices in `Pollutant::ALL` order
    pub fn subindices(&self) -> [Option<u8>; 5] {
        Pollutant::ALL.map(|p| self.subindex(p))
    }

    /// Pollutants whose sub-index equals the composite index.
    ///
    /// Several pollutants can tie; the table itself only keeps the grade.
    pub fn driving_pollutants(&self) -> Vec<Pollutant> {
        match self.indice_atmo {
            Some(index) => Pollutant::ALL
                .into_iter()
                .filter(|p| self.subindex(*p) == Some(index))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn category(&self) -> Option<AtmoCategory> {
        self.indice_atmo.and_then(AtmoCategory::from_grade)
    }

    pub fn has_index(&self) -> bool {
        self.indice_atmo.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> DailyRegionSummary {
        let key = GroupKey::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), "Occitanie");
        let mut row = DailyRegionSummary::empty(key);
        row.subindex_pm10 = Some(3);
        row.subindex_pm2_5 = Some(5);
        row.subindex_no2 = Some(2);
        row.subindex_o3 = Some(5);
        row.subindex_so2 = None;
        row.indice_atmo = Some(5);
        row
    }

    #[test]
    fn test_driving_pollutants_keeps_ties() {
        assert_eq!(
            summary().driving_pollutants(),
            vec![Pollutant::Pm2_5, Pollutant::Ozone]
        );
    }

    #[test]
    fn test_empty_row_has_no_index() {
        let key = GroupKey::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), "Corse");
        let row = DailyRegionSummary::empty(key.clone());
        assert!(!row.has_index());
        assert!(row.driving_pollutants().is_empty());
        assert_eq!(row.key(), key);
    }

    #[test]
    fn test_grade_validation() {
        let mut row = summary();
        assert!(row.validate().is_ok());
        assert_eq!(row.category(), Some(AtmoCategory::Moderate));

        row.indice_atmo = Some(11);
        assert!(row.validate().is_err());
    }
}

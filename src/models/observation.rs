use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{ClimateVariable, GroupKey, Pollutant};

/// One hourly row of pollution and climate data for a region.
///
/// Every measure is optional: a missing reading stays `None` all the way
/// through aggregation instead of being replaced by a sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HourlyObservation {
    pub day: NaiveDate,

    #[validate(length(min = 1))]
    pub region: String,

    /// Position of the reading within its day, used to order the ozone window
    pub hour: u32,

    // Pollutant concentrations (µg/m³)
    #[validate(range(min = 0.0))]
    pub pm10: Option<f64>,

    #[validate(range(min = 0.0))]
    pub pm2_5: Option<f64>,

    #[validate(range(min = 0.0))]
    pub nitrogen_dioxide: Option<f64>,

    #[validate(range(min = 0.0))]
    pub ozone: Option<f64>,

    #[validate(range(min = 0.0))]
    pub sulphur_dioxide: Option<f64>,

    // Climate covariates
    pub temperature_2m: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub relative_humidity_2m: Option<f64>,

    #[validate(range(min = 0.0))]
    pub precipitation: Option<f64>,

    #[validate(range(exclusive_min = 0.0))]
    pub surface_pressure: Option<f64>,

    #[validate(range(min = 0.0))]
    pub wind_speed_10m: Option<f64>,
}

impl HourlyObservation {
    /// Create an observation with every measure missing
    pub fn new(day: NaiveDate, region: impl Into<String>, hour: u32) -> Self {
        Self {
            day,
            region: region.into(),
            hour,
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
        }
    }

    pub fn with_pollutant(mut self, pollutant: Pollutant, value: Option<f64>) -> Self {
        *self.pollutant_mut(pollutant) = value;
        self
    }

    pub fn with_climate(mut self, variable: ClimateVariable, value: Option<f64>) -> Self {
        *self.climate_mut(variable) = value;
        self
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

    pub fn has_pollutant_data(&self) -> bool {
        Pollutant::ALL.iter().any(|p| self.pollutant(*p).is_some())
    }

    /// Measures holding NaN or an infinity
    pub fn non_finite_measures(&self) -> Vec<&'static str> {
        let pollutants = Pollutant::ALL
            .iter()
            .filter(|p| self.pollutant(**p).is_some_and(|v| !v.is_finite()))
            .map(|p| p.column_name());
        let climate = ClimateVariable::ALL
            .iter()
            .filter(|c| self.climate(**c).is_some_and(|v| !v.is_finite()))
            .map(|c| c.column_name());
        pollutants.chain(climate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_builder_setters() {
        let obs = HourlyObservation::new(day(), "Bretagne", 3)
            .with_pollutant(Pollutant::Ozone, Some(42.0))
            .with_climate(ClimateVariable::WindSpeed10m, Some(12.5));

        assert_eq!(obs.ozone, Some(42.0));
        assert_eq!(obs.pollutant(Pollutant::Ozone), Some(42.0));
        assert_eq!(obs.climate(ClimateVariable::WindSpeed10m), Some(12.5));
        assert_eq!(obs.pm10, None);
        assert!(obs.has_pollutant_data());
        assert_eq!(obs.key(), GroupKey::new(day(), "Bretagne"));
    }

    #[test]
    fn test_range_validation() {
        let valid = HourlyObservation::new(day(), "Bretagne", 0)
            .with_pollutant(Pollutant::Pm10, Some(12.0))
            .with_climate(ClimateVariable::RelativeHumidity2m, Some(80.0));
        assert!(valid.validate().is_ok());

        let negative = HourlyObservation::new(day(), "Bretagne", 0)
            .with_pollutant(Pollutant::Pm10, Some(-1.0));
        assert!(negative.validate().is_err());

        let humid = HourlyObservation::new(day(), "Bretagne", 0)
            .with_climate(ClimateVariable::RelativeHumidity2m, Some(101.0));
        assert!(humid.validate().is_err());

        let unnamed = HourlyObservation::new(day(), "", 0);
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_non_finite_measures() {
        let obs = HourlyObservation::new(day(), "Bretagne", 0)
            .with_pollutant(Pollutant::Ozone, Some(f64::INFINITY))
            .with_climate(ClimateVariable::Temperature2m, Some(f64::NAN));

        assert_eq!(obs.non_finite_measures(), vec!["ozone", "temperature_2m"]);
    }
}

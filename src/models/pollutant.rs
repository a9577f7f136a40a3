use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProcessingError;

/// The five pollutants that contribute to the ATMO index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "pm10")]
    Pm10,
    #[serde(rename = "pm2_5")]
    Pm2_5,
    #[serde(rename = "nitrogen_dioxide", alias = "no2")]
    NitrogenDioxide,
    #[serde(rename = "ozone", alias = "o3")]
    Ozone,
    #[serde(rename = "sulphur_dioxide", alias = "so2")]
    SulphurDioxide,
}

impl Pollutant {
    pub const ALL: [Pollutant; 5] = [
        Pollutant::Pm10,
        Pollutant::Pm2_5,
        Pollutant::NitrogenDioxide,
        Pollutant::Ozone,
        Pollutant::SulphurDioxide,
    ];

    /// Column name of the concentration in hourly and daily tables
    pub fn column_name(&self) -> &'static str {
        match self {
            Pollutant::Pm10 => "pm10",
            Pollutant::Pm2_5 => "pm2_5",
            Pollutant::NitrogenDioxide => "nitrogen_dioxide",
            Pollutant::Ozone => "ozone",
            Pollutant::SulphurDioxide => "sulphur_dioxide",
        }
    }

    /// Column name of the pollutant's sub-index in the daily table
    pub fn subindex_column(&self) -> &'static str {
        match self {
            Pollutant::Pm10 => "subindex_pm10",
            Pollutant::Pm2_5 => "subindex_pm2_5",
            Pollutant::NitrogenDioxide => "subindex_no2",
            Pollutant::Ozone => "subindex_o3",
            Pollutant::SulphurDioxide => "subindex_so2",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm2_5 => "PM2.5",
            Pollutant::NitrogenDioxide => "NO2",
            Pollutant::Ozone => "O3",
            Pollutant::SulphurDioxide => "SO2",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Pollutant {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pm10" => Ok(Pollutant::Pm10),
            "pm2_5" | "pm2.5" | "pm25" => Ok(Pollutant::Pm2_5),
            "nitrogen_dioxide" | "no2" => Ok(Pollutant::NitrogenDioxide),
            "ozone" | "o3" => Ok(Pollutant::Ozone),
            "sulphur_dioxide" | "sulfur_dioxide" | "so2" => Ok(Pollutant::SulphurDioxide),
            other => Err(ProcessingError::UnknownPollutant(other.to_string())),
        }
    }
}

/// Climate covariates carried through to the daily table as plain means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateVariable {
    #[serde(rename = "temperature_2m")]
    Temperature2m,
    #[serde(rename = "relative_humidity_2m")]
    RelativeHumidity2m,
    Precipitation,
    SurfacePressure,
    #[serde(rename = "wind_speed_10m")]
    WindSpeed10m,
}

impl ClimateVariable {
    pub const ALL: [ClimateVariable; 5] = [
        ClimateVariable::Temperature2m,
        ClimateVariable::RelativeHumidity2m,
        ClimateVariable::Precipitation,
        ClimateVariable::SurfacePressure,
        ClimateVariable::WindSpeed10m,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            ClimateVariable::Temperature2m => "temperature_2m",
            ClimateVariable::RelativeHumidity2m => "relative_humidity_2m",
            ClimateVariable::Precipitation => "precipitation",
            ClimateVariable::SurfacePressure => "surface_pressure",
            ClimateVariable::WindSpeed10m => "wind_speed_10m",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ClimateVariable::Temperature2m => "°C",
            ClimateVariable::RelativeHumidity2m => "%",
            ClimateVariable::Precipitation => "mm",
            ClimateVariable::SurfacePressure => "hPa",
            ClimateVariable::WindSpeed10m => "km/h",
        }
    }
}

impl fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pollutant_parsing() {
        assert_eq!("pm10".parse::<Pollutant>().unwrap(), Pollutant::Pm10);
        assert_eq!("PM2.5".parse::<Pollutant>().unwrap(), Pollutant::Pm2_5);
        assert_eq!("no2".parse::<Pollutant>().unwrap(), Pollutant::NitrogenDioxide);
        assert_eq!("ozone".parse::<Pollutant>().unwrap(), Pollutant::Ozone);
        assert_eq!(" SO2 ".parse::<Pollutant>().unwrap(), Pollutant::SulphurDioxide);
        assert!("co".parse::<Pollutant>().is_err());
    }

    #[test]
    fn test_column_names_round_trip() {
        for pollutant in Pollutant::ALL {
            assert_eq!(pollutant.column_name().parse::<Pollutant>().unwrap(), pollutant);
        }
        assert_eq!(Pollutant::Ozone.subindex_column(), "subindex_o3");
    }

    #[test]
    fn test_index_matches_declaration_order() {
        for (i, pollutant) in Pollutant::ALL.iter().enumerate() {
            assert_eq!(pollutant.index(), i);
        }
    }
}

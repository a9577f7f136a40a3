use crate::models::{ClimateVariable, GroupKey, HourlyObservation, Pollutant};
use crate::utils::constants::OZONE_WINDOW_HOURS;
use std::collections::HashMap;

/// Daily values for one (day, region) group before grading
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailyAggregate {
    pub pm10: Option<f64>,
    pub pm2_5: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub ozone: Option<f64>,
    pub sulphur_dioxide: Option<f64>,
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub precipitation: Option<f64>,
    pub surface_pressure: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    /// Number of hourly rows in the group
    pub hours: usize,
}

impl DailyAggregate {
    pub fn pollutant(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::Pm10 => self.pm10,
            Pollutant::Pm2_5 => self.pm2_5,
            Pollutant::NitrogenDioxide => self.nitrogen_dioxide,
            Pollutant::Ozone => self.ozone,
            Pollutant::SulphurDioxide => self.sulphur_dioxide,
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
}

/// Hourly rows grouped by key, in order of first appearance
pub type GroupedObservations<'a> = Vec<(GroupKey, Vec<&'a HourlyObservation>)>;

pub struct DailyAggregator {
    ozone_window: usize,
}

impl DailyAggregator {
    pub fn new() -> Self {
        Self {
            ozone_window: OZONE_WINDOW_HOURS,
        }
    }

    /// Group hourly rows by (day, region).
    ///
    /// Groups come out in the order their key first appears in the input,
    /// rows within a group in input order. Duplicates are kept.
    pub fn group<'a>(&self, observations: &'a [HourlyObservation]) -> GroupedObservations<'a> {
        let mut positions: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: GroupedObservations<'a> = Vec::new();

        for observation in observations {
            let key = observation.key();
            match positions.get(&key) {
                Some(&slot) => groups[slot].1.push(observation),
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push((key, vec![observation]));
                }
            }
        }

        groups
    }

    /// Aggregate every group sequentially
    pub fn aggregate(&self, observations: &[HourlyObservation]) -> HashMap<GroupKey, DailyAggregate> {
        self.group(observations)
            .into_iter()
            .map(|(key, rows)| {
                let aggregate = self.aggregate_group(&rows);
                (key, aggregate)
            })
            .collect()
    }

    /// Collapse one group's hourly rows into daily values.
    ///
    /// Means skip missing readings and are `None` when nothing is present.
    /// Ozone is the maximum of the rolling means taken in hour order.
    pub fn aggregate_group(&self, rows: &[&HourlyObservation]) -> DailyAggregate {
        let mut ordered: Vec<&HourlyObservation> = rows.to_vec();
        ordered.sort_by_key(|r| r.hour); // stable: equal hours keep input order

        let ozone: Vec<Option<f64>> = ordered.iter().map(|r| r.ozone).collect();
        let mean_of = |value: fn(&HourlyObservation) -> Option<f64>| {
            mean_present(ordered.iter().map(|r| value(r)))
        };

        DailyAggregate {
            pm10: mean_of(|r| r.pm10),
            pm2_5: mean_of(|r| r.pm2_5),
            nitrogen_dioxide: mean_of(|r| r.nitrogen_dioxide),
            ozone: rolling_max_mean(&ozone, self.ozone_window),
            sulphur_dioxide: mean_of(|r| r.sulphur_dioxide),
            temperature_2m: mean_of(|r| r.temperature_2m),
            relative_humidity_2m: mean_of(|r| r.relative_humidity_2m),
            precipitation: mean_of(|r| r.precipitation),
            surface_pressure: mean_of(|r| r.surface_pressure),
            wind_speed_10m: mean_of(|r| r.wind_speed_10m),
            hours: ordered.len(),
        }
    }
}

impl Default for DailyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Arithmetic mean of the present values
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Maximum over positions of the mean of the trailing `window` readings.
///
/// The first `window - 1` positions use the shorter prefix available.
/// Missing readings are skipped inside a window; a window with nothing
/// present contributes no mean.
pub fn rolling_max_mean(values: &[Option<f64>], window: usize) -> Option<f64> {
    let window = window.max(1);

    (0..values.len())
        .filter_map(|end| {
            let start = (end + 1).saturating_sub(window);
            mean_present(values[start..=end].iter().copied())
        })
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn ozone_row(region: &str, d: u32, hour: u32, ozone: Option<f64>) -> HourlyObservation {
        HourlyObservation::new(day(d), region, hour).with_pollutant(Pollutant::Ozone, ozone)
    }

    #[test]
    fn test_rolling_ozone_reference_case() {
        let readings: Vec<Option<f64>> = (1..=10).map(|i| Some(i as f64 * 10.0)).collect();
        assert_eq!(rolling_max_mean(&readings, 8), Some(60.0));
    }

    #[test]
    fn test_rolling_short_group_uses_growing_window() {
        let readings = [Some(40.0), Some(10.0), Some(10.0)];
        // prefix means: 40, 25, 20
        assert_eq!(rolling_max_mean(&readings, 8), Some(40.0));
    }

    #[test]
    fn test_rolling_skips_missing_readings() {
        let readings = [None, Some(30.0), None, Some(50.0)];
        assert_eq!(rolling_max_mean(&readings, 2), Some(50.0));
        assert_eq!(rolling_max_mean(&[None, None], 8), None);
        assert_eq!(rolling_max_mean(&[], 8), None);
    }

    #[test]
    fn test_mean_present() {
        assert_eq!(mean_present([Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean_present([None, None]), None);
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let rows = vec![
            ozone_row("B", 2, 0, Some(1.0)),
            ozone_row("A", 1, 0, Some(1.0)),
            ozone_row("B", 2, 1, Some(1.0)),
            ozone_row("A", 2, 0, Some(1.0)),
        ];

        let aggregator = DailyAggregator::new();
        let keys: Vec<GroupKey> = aggregator.group(&rows).into_iter().map(|(k, _)| k).collect();

        assert_eq!(
            keys,
            vec![
                GroupKey::new(day(2), "B"),
                GroupKey::new(day(1), "A"),
                GroupKey::new(day(2), "A"),
            ]
        );
    }

    #[test]
    fn test_ozone_window_follows_hour_order() {
        // Out of order in the input; in hour order the peak block is hours 0-7
        let mut rows: Vec<HourlyObservation> = (0..16)
            .map(|h| ozone_row("A", 1, h, Some(if h < 8 { 100.0 } else { 0.0 })))
            .collect();
        rows.reverse();

        let aggregator = DailyAggregator::new();
        let aggregates = aggregator.aggregate(&rows);
        let daily = &aggregates[&GroupKey::new(day(1), "A")];

        assert_eq!(daily.ozone, Some(100.0));
        assert_eq!(daily.hours, 16);
    }

    #[test]
    fn test_duplicates_count_as_extra_samples() {
        let rows = vec![
            HourlyObservation::new(day(1), "A", 0).with_pollutant(Pollutant::Pm10, Some(10.0)),
            HourlyObservation::new(day(1), "A", 0).with_pollutant(Pollutant::Pm10, Some(10.0)),
            HourlyObservation::new(day(1), "A", 1).with_pollutant(Pollutant::Pm10, Some(40.0)),
        ];

        let aggregates = DailyAggregator::new().aggregate(&rows);
        assert_eq!(aggregates[&GroupKey::new(day(1), "A")].pm10, Some(20.0));
    }

    #[test]
    fn test_all_missing_pollutant_is_missing() {
        let rows = vec![
            HourlyObservation::new(day(1), "A", 0)
                .with_climate(ClimateVariable::Temperature2m, Some(12.0)),
            HourlyObservation::new(day(1), "A", 1)
                .with_climate(ClimateVariable::Temperature2m, Some(14.0)),
        ];

        let aggregates = DailyAggregator::new().aggregate(&rows);
        let daily = &aggregates[&GroupKey::new(day(1), "A")];
        assert_eq!(daily.sulphur_dioxide, None);
        assert_eq!(daily.ozone, None);
        assert_eq!(daily.temperature_2m, Some(13.0));
    }
}

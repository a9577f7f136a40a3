use crate::models::{GroupKey, HourlyObservation, Pollutant};
use crate::processors::daily_aggregator::DailyAggregator;
use crate::utils::constants::OZONE_WINDOW_HOURS;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use validator::Validate;

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub total_rows: usize,
    pub total_groups: usize,
    pub complete_groups: usize,
    pub violations: Vec<ObservationViolation>,
    pub region_statistics: BTreeMap<String, RegionStatistics>,
}

impl IntegrityReport {
    pub fn count(&self, violation_type: ViolationType) -> usize {
        self.violations
            .iter()
            .filter(|v| v.violation_type == violation_type)
            .count()
    }

    /// Violations that will make index computation fail: negative or
    /// non-finite pollutant readings. Climate fields are never graded.
    pub fn has_blocking_violations(&self) -> bool {
        self.violations.iter().any(|v| {
            v.pollutant.is_some()
                && matches!(
                    v.violation_type,
                    ViolationType::NegativeConcentration | ViolationType::NonFiniteValue
                )
        })
    }
}

#[derive(Debug, Clone)]
pub struct ObservationViolation {
    pub region: String,
    pub day: NaiveDate,
    pub violation_type: ViolationType,
    /// Pollutant the violation concerns, if any
    pub pollutant: Option<Pollutant>,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationType {
    NegativeConcentration,
    NonFiniteValue,
    OutOfRange,
    MissingPollutant,
    ShortDay,
    DuplicateHour,
}

#[derive(Debug, Clone, Default)]
pub struct RegionStatistics {
    pub hourly_rows: usize,
    pub days: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    /// Missing hourly readings per pollutant, in `Pollutant::ALL` order
    pub missing_readings: [usize; 5],
}

impl RegionStatistics {
    fn record_day(&mut self, day: NaiveDate) {
        self.days += 1;
        self.first_day = Some(self.first_day.map_or(day, |d| d.min(day)));
        self.last_day = Some(self.last_day.map_or(day, |d| d.max(day)));
    }
}

pub struct IntegrityChecker {
    min_hours: usize,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            min_hours: OZONE_WINDOW_HOURS,
        }
    }

    pub fn with_min_hours(min_hours: usize) -> Self {
        Self { min_hours }
    }

    /// Check hourly observations; problems are reported, never raised
    pub fn check_observations(&self, observations: &[HourlyObservation]) -> IntegrityReport {
        let mut report = IntegrityReport {
            total_rows: observations.len(),
            total_groups: 0,
            complete_groups: 0,
            violations: Vec::new(),
            region_statistics: BTreeMap::new(),
        };

        for observation in observations {
            self.check_row(observation, &mut report);

            let stats = report
                .region_statistics
                .entry(observation.region.clone())
                .or_default();
            stats.hourly_rows += 1;
            for pollutant in Pollutant::ALL {
                if observation.pollutant(pollutant).is_none() {
                    stats.missing_readings[pollutant.index()] += 1;
                }
            }
        }

        let groups = DailyAggregator::new().group(observations);
        report.total_groups = groups.len();

        for (key, rows) in &groups {
            if self.check_group(key, rows, &mut report) {
                report.complete_groups += 1;
            }
            report
                .region_statistics
                .entry(key.region.clone())
                .or_default()
                .record_day(key.day);
        }

        report
    }

    /// Row-level checks: domain of concentrations and climate ranges
    fn check_row(&self, observation: &HourlyObservation, report: &mut IntegrityReport) {
        let mut push =
            |violation_type: ViolationType, pollutant: Option<Pollutant>, details: String| {
                report.violations.push(ObservationViolation {
                    region: observation.region.clone(),
                    day: observation.day,
                    violation_type,
                    pollutant,
                    details,
                });
            };

        for measure in observation.non_finite_measures() {
            push(
                ViolationType::NonFiniteValue,
                measure.parse::<Pollutant>().ok(),
                format!("{} is not finite at hour {}", measure, observation.hour),
            );
        }

        for pollutant in Pollutant::ALL {
            if let Some(value) = observation.pollutant(pollutant).filter(|v| *v < 0.0) {
                push(
                    ViolationType::NegativeConcentration,
                    Some(pollutant),
                    format!(
                        "{} concentration {} at hour {} is negative",
                        pollutant, value, observation.hour
                    ),
                );
            }
        }

        // Pollutant ranges are reported above; only climate fields remain
        if let Err(errors) = observation.validate() {
            let pollutant_fields: HashSet<&str> =
                Pollutant::ALL.iter().map(|p| p.column_name()).collect();

            for field in errors.field_errors().keys() {
                let field = field.to_string();
                if !pollutant_fields.contains(field.as_str()) {
                    push(
                        ViolationType::OutOfRange,
                        None,
                        format!("{} out of range at hour {}", field, observation.hour),
                    );
                }
            }
        }
    }

    /// Group-level checks; returns true when the group raised nothing
    fn check_group(
        &self,
        key: &GroupKey,
        rows: &[&HourlyObservation],
        report: &mut IntegrityReport,
    ) -> bool {
        let before = report.violations.len();
        let mut push =
            |violation_type: ViolationType, pollutant: Option<Pollutant>, details: String| {
                report.violations.push(ObservationViolation {
                    region: key.region.clone(),
                    day: key.day,
                    violation_type,
                    pollutant,
                    details,
                });
            };

        for pollutant in Pollutant::ALL {
            if rows.iter().all(|r| r.pollutant(pollutant).is_none()) {
                push(
                    ViolationType::MissingPollutant,
                    Some(pollutant),
                    format!("no {} readings; its sub-index will be missing", pollutant),
                );
            }
        }

        if rows.len() < self.min_hours {
            push(
                ViolationType::ShortDay,
                None,
                format!(
                    "only {} hourly rows (ozone window is {} hours)",
                    rows.len(),
                    self.min_hours
                ),
            );
        }

        let mut hours = HashSet::new();
        let mut duplicates: Vec<u32> = rows
            .iter()
            .map(|r| r.hour)
            .filter(|h| !hours.insert(*h))
            .collect();
        duplicates.sort_unstable();
        duplicates.dedup();

        if !duplicates.is_empty() {
            push(
                ViolationType::DuplicateHour,
                None,
                format!(
                    "hours {:?} appear more than once and are averaged as extra samples",
                    duplicates
                ),
            );
        }

        report.violations.len() == before
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let percent = |n: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                100.0 * n as f64 / total as f64
            }
        };

        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Hourly Rows: {}\n", report.total_rows));
        summary.push_str(&format!("Daily Groups: {}\n", report.total_groups));
        summary.push_str(&format!(
            "Complete Groups: {} ({:.1}%)\n",
            report.complete_groups,
            percent(report.complete_groups, report.total_groups)
        ));

        summary.push_str("\nViolations by type:\n");
        for violation_type in [
            ViolationType::NegativeConcentration,
            ViolationType::NonFiniteValue,
            ViolationType::OutOfRange,
            ViolationType::MissingPollutant,
            ViolationType::ShortDay,
            ViolationType::DuplicateHour,
        ] {
            summary.push_str(&format!(
                "  {:?}: {}\n",
                violation_type,
                report.count(violation_type)
            ));
        }

        if !report.region_statistics.is_empty() {
            summary.push_str("\nRegions:\n");
            for (region, stats) in &report.region_statistics {
                let missing: Vec<String> = Pollutant::ALL
                    .iter()
                    .filter(|p| stats.missing_readings[p.index()] > 0)
                    .map(|p| format!("{} {}", p, stats.missing_readings[p.index()]))
                    .collect();

                summary.push_str(&format!(
                    "  {}: {} rows, {} days ({} to {}){}\n",
                    region,
                    stats.hourly_rows,
                    stats.days,
                    stats.first_day.map_or("-".to_string(), |d| d.to_string()),
                    stats.last_day.map_or("-".to_string(), |d| d.to_string()),
                    if missing.is_empty() {
                        String::new()
                    } else {
                        format!(", missing readings: {}", missing.join(", "))
                    }
                ));
            }
        }

        if !report.violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {} on {}: {}\n",
                    i + 1,
                    violation.region,
                    violation.day,
                    violation.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

use crate::error::{ProcessingError, Result};
use crate::models::{ClimateVariable, DailyRegionSummary, GroupKey, HourlyObservation, Pollutant};
use crate::processors::daily_aggregator::{DailyAggregate, DailyAggregator};
use crate::processors::subindex::{composite_index, IndexTables, MissingPolicy};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Turns hourly observations into the daily ATMO table
pub struct AtmoCalculator {
    tables: IndexTables,
    missing_policy: MissingPolicy,
    aggregator: DailyAggregator,
}

impl AtmoCalculator {
    pub fn new() -> Self {
        Self {
            tables: IndexTables::new(),
            missing_policy: MissingPolicy::default(),
            aggregator: DailyAggregator::new(),
        }
    }

    pub fn with_tables(mut self, tables: IndexTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_missing_policy(mut self, missing_policy: MissingPolicy) -> Self {
        self.missing_policy = missing_policy;
        self
    }

    pub fn tables(&self) -> &IndexTables {
        &self.tables
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing_policy
    }

    pub fn aggregator(&self) -> &DailyAggregator {
        &self.aggregator
    }

    /// Daily index table restricted to `regions`.
    ///
    /// Rows follow the first appearance of each (day, region) in the input.
    /// Regions in the allow-list with no data simply yield no rows.
    pub fn compute<S: AsRef<str>>(
        &self,
        observations: &[HourlyObservation],
        regions: &[S],
    ) -> Result<Vec<DailyRegionSummary>> {
        let summaries = self.summarize(observations)?;
        Ok(filter_regions(summaries, regions))
    }

    /// Daily index table for every (day, region) in the input
    pub fn summarize(&self, observations: &[HourlyObservation]) -> Result<Vec<DailyRegionSummary>> {
        let aggregates = self.aggregator.aggregate(observations);
        debug!(
            "Aggregated {} hourly rows into {} daily groups",
            observations.len(),
            aggregates.len()
        );

        self.assemble(distinct_keys(observations), &aggregates)
    }

    /// Grade the aggregates and left-join them onto `keys`.
    ///
    /// A key without an aggregate becomes a row of missing values.
    pub fn assemble(
        &self,
        keys: Vec<GroupKey>,
        aggregates: &HashMap<GroupKey, DailyAggregate>,
    ) -> Result<Vec<DailyRegionSummary>> {
        keys.into_iter()
            .map(|key| match aggregates.get(&key) {
                Some(aggregate) => self.grade(key, aggregate),
                None => Ok(DailyRegionSummary::empty(key)),
            })
            .collect()
    }

    /// Build one output row: daily values, sub-indices and composite index
    pub fn grade(&self, key: GroupKey, aggregate: &DailyAggregate) -> Result<DailyRegionSummary> {
        let mut summary = DailyRegionSummary::empty(key);

        for variable in ClimateVariable::ALL {
            *summary.climate_mut(variable) = aggregate.climate(variable);
        }

        for pollutant in Pollutant::ALL {
            let value = aggregate.pollutant(pollutant);
            let grade = self
                .tables
                .grade_optional(pollutant, value)
                .map_err(|e| ProcessingError::Grading {
                    day: summary.day,
                    region: summary.region.clone(),
                    source: Box::new(e),
                })?;

            *summary.pollutant_mut(pollutant) = value;
            *summary.subindex_mut(pollutant) = grade;
        }

        summary.indice_atmo = composite_index(&summary.subindices(), self.missing_policy);
        Ok(summary)
    }
}

impl Default for AtmoCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct (day, region) pairs in order of first appearance
pub fn distinct_keys(observations: &[HourlyObservation]) -> Vec<GroupKey> {
    let mut seen = HashSet::new();
    observations
        .iter()
        .map(HourlyObservation::key)
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Keep rows whose region is in the allow-list
pub fn filter_regions<S: AsRef<str>>(
    summaries: Vec<DailyRegionSummary>,
    regions: &[S],
) -> Vec<DailyRegionSummary> {
    let allowed: HashSet<&str> = regions.iter().map(|r| r.as_ref()).collect();
    let total = summaries.len();

    let kept: Vec<DailyRegionSummary> = summaries
        .into_iter()
        .filter(|s| allowed.contains(s.region.as_str()))
        .collect();

    if kept.len() < total {
        info!(
            "Region filter kept {} of {} daily rows ({} regions allowed)",
            kept.len(),
            total,
            allowed.len()
        );
    }

    kept
}

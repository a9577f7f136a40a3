use crate::error::{ProcessingError, Result};
use crate::models::Pollutant;
use crate::processors::daily_aggregator::mean_present;
use crate::readers::PollutantSeries;
use serde::Serialize;
use tracing::debug;

/// Root mean squared error over positions where both series have a value
pub fn rmse(forecast: &[Option<f64>], observed: &[Option<f64>]) -> Result<f64> {
    if forecast.len() != observed.len() {
        return Err(ProcessingError::Evaluation(format!(
            "forecast has {} values but observed has {}",
            forecast.len(),
            observed.len()
        )));
    }

    let (sum, count) = forecast
        .iter()
        .zip(observed)
        .filter_map(|(f, o)| Some(f.as_ref()? - o.as_ref()?))
        .fold((0.0, 0usize), |(sum, count), e| (sum + e * e, count + 1));

    if count == 0 {
        return Err(ProcessingError::Evaluation(
            "no paired forecast and observed values".to_string(),
        ));
    }

    Ok((sum / count as f64).sqrt())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantError {
    pub pollutant: Pollutant,
    pub rmse: f64,
    pub historical_mean: f64,
    /// RMSE divided by the historical mean
    pub normalized_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEvaluation {
    pub skill_index: f64,
    pub pollutants: Vec<PollutantError>,
}

impl ForecastEvaluation {
    pub fn summary(&self) -> String {
        let mut summary = format!("Forecast skill index: {:.4}\n", self.skill_index);
        for error in &self.pollutants {
            summary.push_str(&format!(
                "- {}: RMSE {:.3}, historical mean {:.3}, normalised {:.4}\n",
                error.pollutant.symbol(),
                error.rmse,
                error.historical_mean,
                error.normalized_error
            ));
        }
        summary
    }
}

/// Scores forecasts against observations, weighting each pollutant by the
/// inverse of its historical mean concentration.
///
/// `index = Σ (RMSE_p / mean_p) / Σ (1 / mean_p)`, so pollutants with very
/// different magnitudes contribute comparably.
pub struct ForecastEvaluator {
    pollutants: Vec<Pollutant>,
}

impl ForecastEvaluator {
    pub fn new(pollutants: Vec<Pollutant>) -> Self {
        Self { pollutants }
    }

    pub fn all_pollutants() -> Self {
        Self::new(Pollutant::ALL.to_vec())
    }

    pub fn evaluate(
        &self,
        forecast: &PollutantSeries,
        observed: &PollutantSeries,
        history: &PollutantSeries,
    ) -> Result<ForecastEvaluation> {
        if self.pollutants.is_empty() {
            return Err(ProcessingError::Evaluation(
                "no pollutants to evaluate".to_string(),
            ));
        }

        let mut weighted_errors = 0.0;
        let mut weights = 0.0;
        let mut pollutants = Vec::with_capacity(self.pollutants.len());

        for &pollutant in &self.pollutants {
            let error = rmse(forecast.require(pollutant)?, observed.require(pollutant)?)?;

            let historical_mean = mean_present(history.require(pollutant)?.iter().copied())
                .filter(|m| m.is_finite() && *m != 0.0)
                .ok_or_else(|| {
                    ProcessingError::Evaluation(format!(
                        "historical mean of {} is missing or zero",
                        pollutant
                    ))
                })?;

            weighted_errors += error / historical_mean;
            weights += 1.0 / historical_mean;

            debug!(
                "{}: rmse {:.3}, historical mean {:.3}",
                pollutant, error, historical_mean
            );
            pollutants.push(PollutantError {
                pollutant,
                rmse: error,
                historical_mean,
                normalized_error: error / historical_mean,
            });
        }

        Ok(ForecastEvaluation {
            skill_index: weighted_errors / weights,
            pollutants,
        })
    }

    pub fn skill_index(
        &self,
        forecast: &PollutantSeries,
        observed: &PollutantSeries,
        history: &PollutantSeries,
    ) -> Result<f64> {
        Ok(self.evaluate(forecast, observed, history)?.skill_index)
    }
}

impl Default for ForecastEvaluator {
    fn default() -> Self {
        Self::all_pollutants()
    }
}

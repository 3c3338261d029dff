//! Earliest burned day of year.
//!
//! Burned area products encode each pixel as a day of year with a detection confidence. Days
//! within the processing window mark a burn, 0 marks unburned land and negative values are
//! sentinels for pixels that could not be classified, e.g. -1 for cloud and -2 for water.
//!
//! The aggregation keeps the earliest burn. Without any burn it keeps the most negative
//! sentinel. When two burns share the same day the first one folded in wins, so the result
//! depends on the order of aggregation.

use time::{Date, Month};

use crate::aggregator::{feature_names, Aggregator, Parameters};
use crate::error::BinningError;

/// Burned day aggregator (`JD`).
///
/// Spatial, temporal and output vectors are all `[day, confidence]`.
#[derive(Debug)]
pub struct BurnedDay {
    day_index: usize,
    confidence_index: Option<usize>,
    min_doy: i32,
    max_doy: i32,
    names: Vec<String>,
}

impl BurnedDay {
    pub const NAME: &'static str = "JD";

    /// Returns a new aggregator.
    ///
    /// # Arguments
    ///
    /// * `variable`: Name of the day of year variable
    /// * `day_index`: Index of the day of year variable in observation samples
    /// * `confidence_index`: Index of the confidence variable. Burns have confidence 1 if not
    ///   set.
    /// * `min_doy`: First day of year of the window, inclusive
    /// * `max_doy`: Last day of year of the window, inclusive
    pub fn new(
        variable: &str,
        day_index: usize,
        confidence_index: Option<usize>,
        min_doy: i32,
        max_doy: i32,
    ) -> Self {
        Self {
            day_index,
            confidence_index,
            min_doy,
            max_doy,
            names: feature_names(variable, &["jd", "cl"]),
        }
    }

    pub(crate) fn from_parameters(
        variable: &str,
        day_index: usize,
        confidence_index: Option<usize>,
        params: &Parameters,
    ) -> Result<Self, BinningError> {
        params.check_known(&[
            "confidence_variable",
            "year",
            "month",
            "min_doy",
            "max_doy",
        ])?;
        let year: Option<i32> = params.get("year")?;
        let month: Option<u8> = params.get("month")?;
        let (min_doy, max_doy) = match (year, month) {
            (Some(year), Some(month)) => month_window(year, month)
                .ok_or_else(|| params.error("month", "not a valid calendar month"))?,
            (Some(_), None) => return Err(params.error("month", "required with year")),
            (None, Some(_)) => return Err(params.error("year", "required with month")),
            (None, None) => (
                params.get_or("min_doy", 1)?,
                params.get_or("max_doy", 366)?,
            ),
        };
        if min_doy < 1 || min_doy > max_doy || max_doy > 366 {
            return Err(params.error(
                "min_doy",
                "window must satisfy 1 <= min_doy <= max_doy <= 366",
            ));
        }
        Ok(Self::new(
            variable,
            day_index,
            confidence_index,
            min_doy,
            max_doy,
        ))
    }

    fn is_burned(&self, day: f32) -> bool {
        day >= self.min_doy as f32 && day <= self.max_doy as f32
    }

    /// Fold a `(day, confidence)` pair into a state vector.
    fn fold(&self, day: f32, confidence: f32, state: &mut [f32]) {
        let current = state[0];
        if self.is_burned(day) {
            if !self.is_burned(current) || day < current {
                state[0] = day;
                state[1] = confidence;
            }
        } else if day < 0.0 && !self.is_burned(current) && day < current {
            state[0] = day;
            state[1] = 0.0;
        }
    }
}

/// Returns the day of year window `(first, last)` of a calendar month.
fn month_window(year: i32, month: u8) -> Option<(i32, i32)> {
    let month = Month::try_from(month).ok()?;
    let first = Date::from_calendar_date(year, month, 1).ok()?;
    let last = match month {
        Month::December => Date::from_calendar_date(year, month, 31).ok()?,
        _ => Date::from_calendar_date(year, month.next(), 1)
            .ok()?
            .previous_day()?,
    };
    Some((i32::from(first.ordinal()), i32::from(last.ordinal())))
}

impl Aggregator for BurnedDay {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn spatial_feature_names(&self) -> &[String] {
        &self.names
    }

    fn temporal_feature_names(&self) -> &[String] {
        &self.names
    }

    fn output_feature_names(&self) -> &[String] {
        &self.names
    }

    fn init_spatial(&self, vector: &mut [f32]) {
        vector[0] = 0.0;
        vector[1] = 0.0;
    }

    fn aggregate_spatial(&self, values: &[f32], vector: &mut [f32]) {
        let day = values[self.day_index];
        let confidence = match self.confidence_index {
            Some(index) => values[index],
            None => 1.0,
        };
        self.fold(day, confidence, vector)
    }

    fn complete_spatial(&self, _num_obs: i32, _vector: &mut [f32]) {}

    fn init_temporal(&self, vector: &mut [f32]) {
        vector[0] = 0.0;
        vector[1] = 0.0;
    }

    fn aggregate_temporal(&self, spatial: &[f32], _num_spatial_obs: i32, vector: &mut [f32]) {
        self.fold(spatial[0], spatial[1], vector)
    }

    fn complete_temporal(&self, _num_temporal_obs: i32, _vector: &mut [f32]) {}

    fn compute_output(&self, temporal: &[f32], output: &mut [f32]) {
        output[0] = temporal[0];
        output[1] = temporal[1];
    }
}

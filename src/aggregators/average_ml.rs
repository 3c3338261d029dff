//! Maximum likelihood mean of log-normally distributed samples.

use crate::aggregator::{feature_names, Aggregator, Parameters};
use crate::error::BinningError;

/// Log-normal average aggregator (`AVG_ML`).
///
/// Samples are accumulated as `ln(x)`. Spatial sums are divided by `sqrt(num_obs)` and the
/// temporal sum of weights uses `sqrt(num_spatial_obs)`, so that the temporal estimate weights
/// each spatial bin by its observation count. The output describes the log-normal distribution
/// with log-mean `m` and log-variance `s²`:
///
/// * mean: `exp(m + s²/2)`
/// * sigma: `mean * sqrt(exp(s²) - 1)`
/// * median: `exp(m)`
/// * mode: `exp(m - s²)`
///
/// Non-positive samples have no logarithm, so observations holding one are not accepted.
#[derive(Debug)]
pub struct AverageMl {
    variable_index: usize,
    spatial_names: Vec<String>,
    temporal_names: Vec<String>,
    output_names: Vec<String>,
}

impl AverageMl {
    pub const NAME: &'static str = "AVG_ML";

    pub fn new(variable: &str, variable_index: usize) -> Self {
        Self {
            variable_index,
            spatial_names: feature_names(variable, &["sum_x", "sum_xx"]),
            temporal_names: feature_names(variable, &["sum_x", "sum_xx", "sum_w"]),
            output_names: feature_names(variable, &["mean", "sigma", "median", "mode"]),
        }
    }

    pub(crate) fn from_parameters(
        variable: &str,
        variable_index: usize,
        params: &Parameters,
    ) -> Result<Self, BinningError> {
        params.check_known(&[])?;
        Ok(Self::new(variable, variable_index))
    }
}

impl Aggregator for AverageMl {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn spatial_feature_names(&self) -> &[String] {
        &self.spatial_names
    }

    fn temporal_feature_names(&self) -> &[String] {
        &self.temporal_names
    }

    fn output_feature_names(&self) -> &[String] {
        &self.output_names
    }

    fn accepts(&self, values: &[f32]) -> bool {
        values.get(self.variable_index).is_some_and(|x| *x > 0.0)
    }

    fn init_spatial(&self, vector: &mut [f32]) {
        vector[0] = 0.0;
        vector[1] = 0.0;
    }

    fn aggregate_spatial(&self, values: &[f32], vector: &mut [f32]) {
        let ln_x = values[self.variable_index].ln();
        vector[0] += ln_x;
        vector[1] += ln_x * ln_x;
    }

    fn complete_spatial(&self, num_obs: i32, vector: &mut [f32]) {
        if num_obs > 0 {
            let n = (num_obs as f32).sqrt();
            vector[0] /= n;
            vector[1] /= n;
        }
    }

    fn init_temporal(&self, vector: &mut [f32]) {
        vector[0] = 0.0;
        vector[1] = 0.0;
        vector[2] = 0.0;
    }

    fn aggregate_temporal(&self, spatial: &[f32], num_spatial_obs: i32, vector: &mut [f32]) {
        vector[0] += spatial[0];
        vector[1] += spatial[1];
        vector[2] += (num_spatial_obs.max(0) as f32).sqrt();
    }

    fn complete_temporal(&self, _num_temporal_obs: i32, _vector: &mut [f32]) {}

    fn compute_output(&self, temporal: &[f32], output: &mut [f32]) {
        let sum_w = temporal[2];
        if sum_w > 0.0 {
            let m = temporal[0] / sum_w;
            let s2 = (temporal[1] / sum_w - m * m).max(0.0);
            let mean = (m + 0.5 * s2).exp();
            output[0] = mean;
            output[1] = mean * (s2.exp() - 1.0).sqrt();
            output[2] = m.exp();
            output[3] = (m - s2).exp();
        } else {
            output[..4].fill(self.output_fill_value());
        }
    }
}

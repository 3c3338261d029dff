//! Weighted arithmetic mean.

use crate::aggregator::{feature_names, Aggregator, Parameters};
use crate::error::BinningError;

/// Average aggregator (`AVG`).
///
/// The spatial phase accumulates `sum(x)` and `sum(x²)` and divides both by the number of
/// observations on completion. The temporal phase accumulates the spatial means weighted by
/// `num_spatial_obs ^ weight_coeff`, along with the sum of weights. The output is the weighted
/// mean and standard deviation.
#[derive(Debug)]
pub struct Average {
    variable_index: usize,
    weight_coeff: f64,
    spatial_names: Vec<String>,
    temporal_names: Vec<String>,
    output_names: Vec<String>,
    fill_value: f32,
}

impl Average {
    pub const NAME: &'static str = "AVG";

    /// Returns a new aggregator.
    ///
    /// # Arguments
    ///
    /// * `variable`: Name of the input variable
    /// * `variable_index`: Index of the input variable in observation samples
    /// * `weight_coeff`: Exponent applied to spatial observation counts to weight the temporal
    ///   mean. 0 weights every spatial bin equally, 1 weights every observation equally.
    pub fn new(variable: &str, variable_index: usize, weight_coeff: f64) -> Self {
        Self {
            variable_index,
            weight_coeff,
            spatial_names: feature_names(variable, &["sum_x", "sum_xx"]),
            temporal_names: feature_names(variable, &["sum_x", "sum_xx", "sum_w"]),
            output_names: feature_names(variable, &["mean", "sigma"]),
            fill_value: f32::NAN,
        }
    }

    pub(crate) fn from_parameters(
        variable: &str,
        variable_index: usize,
        params: &Parameters,
    ) -> Result<Self, BinningError> {
        params.check_known(&["weight_coeff", "fill_value"])?;
        let weight_coeff: f64 = params.get_or("weight_coeff", 0.0)?;
        if !weight_coeff.is_finite() {
            return Err(params.error("weight_coeff", "must be finite"));
        }
        let mut aggregator = Self::new(variable, variable_index, weight_coeff);
        aggregator.fill_value = params.get_or("fill_value", f32::NAN)?;
        Ok(aggregator)
    }
}

impl Aggregator for Average {
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

    fn output_fill_value(&self) -> f32 {
        self.fill_value
    }

    fn init_spatial(&self, vector: &mut [f32]) {
        vector[0] = 0.0;
        vector[1] = 0.0;
    }

    fn aggregate_spatial(&self, values: &[f32], vector: &mut [f32]) {
        let x = values[self.variable_index];
        vector[0] += x;
        vector[1] += x * x;
    }

    fn complete_spatial(&self, num_obs: i32, vector: &mut [f32]) {
        if num_obs > 0 {
            vector[0] /= num_obs as f32;
            vector[1] /= num_obs as f32;
        }
    }

    fn init_temporal(&self, vector: &mut [f32]) {
        vector[0] = 0.0;
        vector[1] = 0.0;
        vector[2] = 0.0;
    }

    fn aggregate_temporal(&self, spatial: &[f32], num_spatial_obs: i32, vector: &mut [f32]) {
        // powf(0.0) is 1 for every base, including 0.
        let w = (num_spatial_obs as f64).powf(self.weight_coeff) as f32;
        vector[0] += spatial[0] * w;
        vector[1] += spatial[1] * w;
        vector[2] += w;
    }

    fn complete_temporal(&self, _num_temporal_obs: i32, _vector: &mut [f32]) {}

    fn compute_output(&self, temporal: &[f32], output: &mut [f32]) {
        let sum_w = temporal[2];
        if sum_w > 0.0 {
            let mean = temporal[0] / sum_w;
            // Rounding can make the variance slightly negative.
            let variance = (temporal[1] / sum_w - mean * mean).max(0.0);
            output[0] = mean;
            output[1] = variance.sqrt();
        } else {
            output[0] = self.fill_value;
            output[1] = self.fill_value;
        }
    }
}

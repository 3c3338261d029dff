//! Plain sum.

use crate::aggregator::{feature_names, Aggregator, Parameters};
use crate::error::BinningError;

/// Sum aggregator (`SUM`).
///
/// The spatial phase sums samples. The temporal phase sums the spatial sums and counts the
/// observations that contributed. Output is `[sum, count]`.
#[derive(Debug)]
pub struct Sum {
    variable_index: usize,
    spatial_names: Vec<String>,
    temporal_names: Vec<String>,
}

impl Sum {
    pub const NAME: &'static str = "SUM";

    pub fn new(variable: &str, variable_index: usize) -> Self {
        Self {
            variable_index,
            spatial_names: feature_names(variable, &["sum"]),
            temporal_names: feature_names(variable, &["sum", "count"]),
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

impl Aggregator for Sum {
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
        &self.temporal_names
    }

    fn init_spatial(&self, vector: &mut [f32]) {
        vector[0] = 0.0;
    }

    fn aggregate_spatial(&self, values: &[f32], vector: &mut [f32]) {
        vector[0] += values[self.variable_index];
    }

    fn complete_spatial(&self, _num_obs: i32, _vector: &mut [f32]) {}

    fn init_temporal(&self, vector: &mut [f32]) {
        vector[0] = 0.0;
        vector[1] = 0.0;
    }

    fn aggregate_temporal(&self, spatial: &[f32], num_spatial_obs: i32, vector: &mut [f32]) {
        vector[0] += spatial[0];
        vector[1] += num_spatial_obs as f32;
    }

    fn complete_temporal(&self, _num_temporal_obs: i32, _vector: &mut [f32]) {}

    fn compute_output(&self, temporal: &[f32], output: &mut [f32]) {
        output[0] = temporal[0];
        output[1] = temporal[1];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum() {
        let agg = Sum::new("n", 0);
        assert_eq!("SUM", agg.name());
        assert_eq!(["n_sum"], agg.spatial_feature_names());
        assert_eq!(["n_sum", "n_count"], agg.output_feature_names());

        let mut first = [f32::NAN; 1];
        agg.init_spatial(&mut first);
        agg.aggregate_spatial(&[1.0], &mut first);
        agg.aggregate_spatial(&[2.0], &mut first);
        agg.complete_spatial(2, &mut first);
        assert_eq!([3.0f32], first);

        let mut tvec = [f32::NAN; 2];
        agg.init_temporal(&mut tvec);
        agg.aggregate_temporal(&first, 2, &mut tvec);
        agg.aggregate_temporal(&[4.0], 1, &mut tvec);
        agg.complete_temporal(3, &mut tvec);

        let mut out = [f32::NAN; 2];
        agg.compute_output(&tvec, &mut out);
        assert_eq!([7.0f32, 3.0], out);
    }
}

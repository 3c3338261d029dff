//! Minimum and maximum.

use crate::aggregator::{feature_names, Aggregator, Parameters};
use crate::error::BinningError;

/// Min/max aggregator (`MIN_MAX`).
///
/// Both phases keep `[min, max]`, starting from `[+inf, -inf]` so that a bin without data is
/// recognisable. Such bins produce the fill value.
#[derive(Debug)]
pub struct MinMax {
    variable_index: usize,
    names: Vec<String>,
    fill_value: f32,
}

impl MinMax {
    pub const NAME: &'static str = "MIN_MAX";

    pub fn new(variable: &str, variable_index: usize) -> Self {
        Self {
            variable_index,
            names: feature_names(variable, &["min", "max"]),
            fill_value: f32::NAN,
        }
    }

    pub(crate) fn from_parameters(
        variable: &str,
        variable_index: usize,
        params: &Parameters,
    ) -> Result<Self, BinningError> {
        params.check_known(&["fill_value"])?;
        let mut aggregator = Self::new(variable, variable_index);
        aggregator.fill_value = params.get_or("fill_value", f32::NAN)?;
        Ok(aggregator)
    }
}

fn init(vector: &mut [f32]) {
    vector[0] = f32::INFINITY;
    vector[1] = f32::NEG_INFINITY;
}

fn fold(min: f32, max: f32, vector: &mut [f32]) {
    vector[0] = vector[0].min(min);
    vector[1] = vector[1].max(max);
}

impl Aggregator for MinMax {
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

    fn output_fill_value(&self) -> f32 {
        self.fill_value
    }

    fn init_spatial(&self, vector: &mut [f32]) {
        init(vector)
    }

    fn aggregate_spatial(&self, values: &[f32], vector: &mut [f32]) {
        let x = values[self.variable_index];
        fold(x, x, vector)
    }

    fn complete_spatial(&self, _num_obs: i32, _vector: &mut [f32]) {}

    fn init_temporal(&self, vector: &mut [f32]) {
        init(vector)
    }

    fn aggregate_temporal(&self, spatial: &[f32], _num_spatial_obs: i32, vector: &mut [f32]) {
        fold(spatial[0], spatial[1], vector)
    }

    fn complete_temporal(&self, _num_temporal_obs: i32, _vector: &mut [f32]) {}

    fn compute_output(&self, temporal: &[f32], output: &mut [f32]) {
        if temporal[0] <= temporal[1] {
            output[0] = temporal[0];
            output[1] = temporal[1];
        } else {
            output[0] = self.fill_value;
            output[1] = self.fill_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        let agg = MinMax::new("a", 0);
        assert_eq!("MIN_MAX", agg.name());
        assert_eq!(["a_min", "a_max"], agg.spatial_feature_names());
        assert_eq!(["a_min", "a_max"], agg.temporal_feature_names());
        assert_eq!(["a_min", "a_max"], agg.output_feature_names());
    }

    #[test]
    fn spatial_and_temporal() {
        let agg = MinMax::new("a", 0);
        let mut svec = [f32::NAN; 2];
        agg.init_spatial(&mut svec);
        assert_eq!([f32::INFINITY, f32::NEG_INFINITY], svec);
        for x in [7.3, 5.5, -0.1, 2.0] {
            agg.aggregate_spatial(&[x], &mut svec);
        }
        agg.complete_spatial(4, &mut svec);
        assert_eq!([-0.1f32, 7.3], svec);

        let mut tvec = [f32::NAN; 2];
        agg.init_temporal(&mut tvec);
        assert_eq!([f32::INFINITY, f32::NEG_INFINITY], tvec);
        agg.aggregate_temporal(&[0.9, 1.0], 3, &mut tvec);
        agg.aggregate_temporal(&[0.1, 5.1], 5, &mut tvec);
        agg.aggregate_temporal(&[0.6, 2.0], 9, &mut tvec);
        agg.aggregate_temporal(&[0.2, 1.5], 2, &mut tvec);
        agg.complete_temporal(19, &mut tvec);
        assert_eq!([0.1f32, 5.1], tvec);

        let mut out = [f32::NAN; 2];
        agg.compute_output(&tvec, &mut out);
        assert_eq!([0.1f32, 5.1], out);
    }

    #[test]
    fn output_fill_without_data() {
        let agg = MinMax::new("a", 0);
        let mut tvec = [0.0f32; 2];
        agg.init_temporal(&mut tvec);
        let mut out = [0.0f32; 2];
        agg.compute_output(&tvec, &mut out);
        assert!(out[0].is_nan() && out[1].is_nan());
    }
}

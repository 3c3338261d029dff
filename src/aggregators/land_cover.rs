//! Land cover class histogram.

use crate::aggregator::{Aggregator, Parameters};
use crate::error::BinningError;

/// Upper bound on the number of land cover classes.
pub const MAX_CLASSES: usize = 256;

/// Land cover class aggregator (`LC_CLASS`).
///
/// Samples are class numbers in `[0, num_classes)`. Both phases count samples per class, the
/// temporal phase summing the spatial counts. The output is the majority class followed by the
/// fraction of samples in each class. Ties resolve to the lower class number.
#[derive(Debug)]
pub struct LandCover {
    variable_index: usize,
    num_classes: usize,
    count_names: Vec<String>,
    output_names: Vec<String>,
}

impl LandCover {
    pub const NAME: &'static str = "LC_CLASS";

    pub fn new(variable: &str, variable_index: usize, num_classes: usize) -> Self {
        let count_names = (0..num_classes)
            .map(|class| format!("{}_class_{}", variable, class))
            .collect();
        let output_names = std::iter::once(format!("{}_majority_class", variable))
            .chain((0..num_classes).map(|class| format!("{}_class_{}_fraction", variable, class)))
            .collect();
        Self {
            variable_index,
            num_classes,
            count_names,
            output_names,
        }
    }

    pub(crate) fn from_parameters(
        variable: &str,
        variable_index: usize,
        params: &Parameters,
    ) -> Result<Self, BinningError> {
        params.check_known(&["num_classes"])?;
        let num_classes: usize = params.require("num_classes")?;
        if num_classes == 0 || num_classes > MAX_CLASSES {
            return Err(params.error("num_classes", "must be between 1 and 256"));
        }
        Ok(Self::new(variable, variable_index, num_classes))
    }

    fn class_of(&self, x: f32) -> Option<usize> {
        let class = x.round();
        if class >= 0.0 && class < self.num_classes as f32 {
            Some(class as usize)
        } else {
            None
        }
    }
}

impl Aggregator for LandCover {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn spatial_feature_names(&self) -> &[String] {
        &self.count_names
    }

    fn temporal_feature_names(&self) -> &[String] {
        &self.count_names
    }

    fn output_feature_names(&self) -> &[String] {
        &self.output_names
    }

    fn init_spatial(&self, vector: &mut [f32]) {
        vector[..self.num_classes].fill(0.0);
    }

    fn aggregate_spatial(&self, values: &[f32], vector: &mut [f32]) {
        if let Some(class) = self.class_of(values[self.variable_index]) {
            vector[class] += 1.0;
        }
    }

    fn complete_spatial(&self, _num_obs: i32, _vector: &mut [f32]) {}

    fn init_temporal(&self, vector: &mut [f32]) {
        vector[..self.num_classes].fill(0.0);
    }

    fn aggregate_temporal(&self, spatial: &[f32], _num_spatial_obs: i32, vector: &mut [f32]) {
        for (total, count) in vector[..self.num_classes].iter_mut().zip(spatial) {
            *total += count;
        }
    }

    fn complete_temporal(&self, _num_temporal_obs: i32, _vector: &mut [f32]) {}

    fn compute_output(&self, temporal: &[f32], output: &mut [f32]) {
        let counts = &temporal[..self.num_classes];
        let total: f32 = counts.iter().sum();
        if total <= 0.0 {
            output[0] = self.output_fill_value();
            output[1..=self.num_classes].fill(0.0);
            return;
        }
        let mut majority = 0;
        for (class, count) in counts.iter().enumerate() {
            if *count > counts[majority] {
                majority = class;
            }
        }
        output[0] = majority as f32;
        for (fraction, count) in output[1..=self.num_classes].iter_mut().zip(counts) {
            *fraction = count / total;
        }
    }
}

//! Composition of several aggregators into one bin.
//!
//! Each aggregator owns a contiguous slice of the spatial, temporal and output feature vectors
//! of a bin. The [BinManager] keeps the offsets of those slices and drives every aggregator
//! through the bin lifecycle.

use std::ops::Range;

use crate::aggregator::Aggregator;
use crate::bins::{SpatialBin, TemporalBin};

/// Drives a list of aggregators over concatenated feature vectors.
#[derive(Debug)]
pub struct BinManager {
    aggregators: Vec<Box<dyn Aggregator>>,
    spatial_ranges: Vec<Range<usize>>,
    temporal_ranges: Vec<Range<usize>>,
    output_ranges: Vec<Range<usize>>,
    spatial_feature_names: Vec<String>,
    temporal_feature_names: Vec<String>,
    output_feature_names: Vec<String>,
}

/// Returns the slice ranges of consecutive lengths, and the concatenated names.
fn layout<'a>(names: impl Iterator<Item = &'a [String]>) -> (Vec<Range<usize>>, Vec<String>) {
    let mut ranges = vec![];
    let mut all_names = vec![];
    for names in names {
        let start = all_names.len();
        all_names.extend_from_slice(names);
        ranges.push(start..all_names.len());
    }
    (ranges, all_names)
}

impl BinManager {
    pub fn new(aggregators: Vec<Box<dyn Aggregator>>) -> Self {
        let (spatial_ranges, spatial_feature_names) =
            layout(aggregators.iter().map(|a| a.spatial_feature_names()));
        let (temporal_ranges, temporal_feature_names) =
            layout(aggregators.iter().map(|a| a.temporal_feature_names()));
        let (output_ranges, output_feature_names) =
            layout(aggregators.iter().map(|a| a.output_feature_names()));
        Self {
            aggregators,
            spatial_ranges,
            temporal_ranges,
            output_ranges,
            spatial_feature_names,
            temporal_feature_names,
            output_feature_names,
        }
    }

    pub fn aggregators(&self) -> &[Box<dyn Aggregator>] {
        &self.aggregators
    }

    pub fn spatial_feature_names(&self) -> &[String] {
        &self.spatial_feature_names
    }

    pub fn temporal_feature_names(&self) -> &[String] {
        &self.temporal_feature_names
    }

    pub fn output_feature_names(&self) -> &[String] {
        &self.output_feature_names
    }

    pub fn spatial_feature_count(&self) -> usize {
        self.spatial_feature_names.len()
    }

    pub fn temporal_feature_count(&self) -> usize {
        self.temporal_feature_names.len()
    }

    pub fn output_feature_count(&self) -> usize {
        self.output_feature_names.len()
    }

    /// Returns a new spatial bin in its neutral state.
    pub fn create_spatial_bin(&self, index: i64) -> SpatialBin {
        let mut bin = SpatialBin::new(index, self.spatial_feature_count());
        for (aggregator, range) in self.aggregators.iter().zip(&self.spatial_ranges) {
            aggregator.init_spatial(&mut bin.features[range.clone()]);
        }
        bin
    }

    /// Whether every aggregator accepts an observation's samples.
    pub fn accepts(&self, values: &[f32]) -> bool {
        self.aggregators.iter().all(|aggregator| aggregator.accepts(values))
    }

    /// Fold an accepted observation's samples into a spatial bin.
    pub fn aggregate_spatial_bin(&self, values: &[f32], bin: &mut SpatialBin) {
        for (aggregator, range) in self.aggregators.iter().zip(&self.spatial_ranges) {
            aggregator.aggregate_spatial(values, &mut bin.features[range.clone()]);
        }
        bin.num_obs += 1;
    }

    pub fn complete_spatial_bin(&self, bin: &mut SpatialBin) {
        for (aggregator, range) in self.aggregators.iter().zip(&self.spatial_ranges) {
            aggregator.complete_spatial(bin.num_obs, &mut bin.features[range.clone()]);
        }
    }

    /// Returns a new temporal bin in its neutral state.
    pub fn create_temporal_bin(&self, index: i64) -> TemporalBin {
        let mut bin = TemporalBin::new(index, self.temporal_feature_count());
        for (aggregator, range) in self.aggregators.iter().zip(&self.temporal_ranges) {
            aggregator.init_temporal(&mut bin.features[range.clone()]);
        }
        bin
    }

    /// Fold a completed spatial bin into a temporal bin.
    pub fn aggregate_temporal_bin(&self, spatial: &SpatialBin, bin: &mut TemporalBin) {
        let ranges = self.spatial_ranges.iter().zip(&self.temporal_ranges);
        for (aggregator, (spatial_range, temporal_range)) in self.aggregators.iter().zip(ranges) {
            aggregator.aggregate_temporal(
                &spatial.features[spatial_range.clone()],
                spatial.num_obs,
                &mut bin.features[temporal_range.clone()],
            );
        }
        bin.num_obs += spatial.num_obs;
        bin.num_passes += 1;
    }

    pub fn complete_temporal_bin(&self, bin: &mut TemporalBin) {
        for (aggregator, range) in self.aggregators.iter().zip(&self.temporal_ranges) {
            aggregator.complete_temporal(bin.num_obs, &mut bin.features[range.clone()]);
        }
    }

    /// Project a completed temporal bin to an output vector.
    ///
    /// # Arguments
    ///
    /// * `bin`: Completed temporal bin
    /// * `output`: Output vector of length [output_feature_count](Self::output_feature_count)
    pub fn compute_output(&self, bin: &TemporalBin, output: &mut [f32]) {
        let ranges = self.temporal_ranges.iter().zip(&self.output_ranges);
        for (aggregator, (temporal_range, output_range)) in self.aggregators.iter().zip(ranges) {
            aggregator.compute_output(
                &bin.features[temporal_range.clone()],
                &mut output[output_range.clone()],
            );
        }
    }

    /// Returns an output vector filled with each aggregator's fill value.
    pub fn output_fill_vector(&self) -> Vec<f32> {
        let mut output = vec![f32::NAN; self.output_feature_count()];
        for (aggregator, range) in self.aggregators.iter().zip(&self.output_ranges) {
            output[range.clone()].fill(aggregator.output_fill_value());
        }
        output
    }
}

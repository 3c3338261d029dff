//! Spatial binning of one partition's observations.

use hashbrown::HashMap;

use crate::aggregator::VariableContext;
use crate::bin_manager::BinManager;
use crate::bins::{Observation, SpatialBin};
use crate::grid::SeaGrid;

/// Counters describing one spatial binning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpatialStats {
    /// Observations offered to the binner
    pub observations: u64,
    /// Observations skipped because of an invalid sample or position
    pub skipped: u64,
    /// Distinct bins produced
    pub bins: u64,
}

/// Accumulates observations into spatial bins keyed by grid bin index.
///
/// A binner is owned by a single partition task. Bins are initialised on first use, and
/// completed with their observation count by [complete](Self::complete), which consumes the
/// binner.
pub struct SpatialBinner<'a> {
    grid: &'a SeaGrid,
    manager: &'a BinManager,
    variables: &'a VariableContext,
    bins: HashMap<i64, SpatialBin>,
    stats: SpatialStats,
}

impl<'a> SpatialBinner<'a> {
    pub fn new(grid: &'a SeaGrid, manager: &'a BinManager, variables: &'a VariableContext) -> Self {
        Self {
            grid,
            manager,
            variables,
            bins: HashMap::new(),
            stats: SpatialStats::default(),
        }
    }

    /// Add one observation.
    ///
    /// Returns whether the observation was accepted.
    pub fn process(&mut self, observation: &Observation) -> bool {
        self.stats.observations += 1;
        if !observation.lat.is_finite()
            || !observation.lon.is_finite()
            || self.variables.is_rejected(&observation.values)
            || !self.manager.accepts(&observation.values)
        {
            self.stats.skipped += 1;
            return false;
        }
        let index = self.grid.bin_index(observation.lat, observation.lon);
        let manager = self.manager;
        let bin = self
            .bins
            .entry(index)
            .or_insert_with(|| manager.create_spatial_bin(index));
        manager.aggregate_spatial_bin(&observation.values, bin);
        true
    }

    /// Number of bins touched so far.
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Complete every bin and return them with the pass counters.
    ///
    /// Bins are returned in ascending index order.
    pub fn complete(self) -> (Vec<SpatialBin>, SpatialStats) {
        let mut stats = self.stats;
        let mut bins: Vec<SpatialBin> = self.bins.into_values().collect();
        for bin in bins.iter_mut() {
            self.manager.complete_spatial_bin(bin);
        }
        bins.sort_unstable_by_key(|bin| bin.index);
        stats.bins = bins.len() as u64;
        (bins, stats)
    }
}

/// Bin a complete sequence of observations.
///
/// # Arguments
///
/// * `grid`: Grid
/// * `manager`: Aggregators
/// * `variables`: Variables of the observations
/// * `observations`: Observations of one partition
pub fn bin_observations<'o>(
    grid: &SeaGrid,
    manager: &BinManager,
    variables: &VariableContext,
    observations: impl IntoIterator<Item = &'o Observation>,
) -> (Vec<SpatialBin>, SpatialStats) {
    let mut binner = SpatialBinner::new(grid, manager, variables);
    for observation in observations {
        binner.process(observation);
    }
    binner.complete()
}

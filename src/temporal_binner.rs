//! Temporal merging of spatial bins sharing a bin index.

use crate::bin_manager::BinManager;
use crate::bins::{SpatialBin, TemporalBin};

/// Merges groups of spatial bins into temporal bins.
///
/// The caller is responsible for grouping: every spatial bin passed to one call of
/// [merge](Self::merge) must have the same index. For commutative aggregators the result
/// depends only on the multiset of spatial bins. Order sensitive aggregators see the bins in
/// iteration order.
pub struct TemporalBinner<'a> {
    manager: &'a BinManager,
}

impl<'a> TemporalBinner<'a> {
    pub fn new(manager: &'a BinManager) -> Self {
        Self { manager }
    }

    /// Merge one group of spatial bins.
    ///
    /// # Arguments
    ///
    /// * `index`: Bin index shared by the group
    /// * `spatial_bins`: Completed spatial bins, in arrival order
    pub fn merge<'b>(
        &self,
        index: i64,
        spatial_bins: impl IntoIterator<Item = &'b SpatialBin>,
    ) -> TemporalBin {
        let mut bin = self.manager.create_temporal_bin(index);
        for spatial in spatial_bins {
            debug_assert_eq!(index, spatial.index, "spatial bin grouped under wrong index");
            self.manager.aggregate_temporal_bin(spatial, &mut bin);
        }
        self.manager.complete_temporal_bin(&mut bin);
        bin
    }
}

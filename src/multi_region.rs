//! Fan-out of merged bins to regions, and the ordering contract of the region shuffle.

use std::cmp::Ordering;

use crate::bins::{MultiRegionBin, MultiRegionKey, TemporalBin};
use crate::error::BinningError;
use crate::grid::SeaGrid;
use crate::region::Region;

/// Routes completed temporal bins to every region containing their centre.
#[derive(Debug)]
pub struct RegionFanOut<'a> {
    grid: &'a SeaGrid,
    regions: &'a [Region],
}

impl<'a> RegionFanOut<'a> {
    /// Returns a new fan-out over an ordered list of regions.
    ///
    /// Fails if there are more regions than a region index can address.
    pub fn new(grid: &'a SeaGrid, regions: &'a [Region]) -> Result<Self, BinningError> {
        i32::try_from(regions.len())?;
        Ok(Self { grid, regions })
    }

    /// Returns one independent copy of a bin per region containing its centre, in region order.
    ///
    /// A bin inside no region yields nothing.
    pub fn fan_out(&self, bin: &TemporalBin) -> Vec<MultiRegionBin> {
        let (lat, lon) = self.grid.center_lat_lon(bin.index);
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, region)| region.contains(lat, lon))
            // The region count was checked to fit in i32.
            .map(|(index, _)| MultiRegionBin::new(index as i32, bin.clone()))
            .collect()
    }
}

/// Sort comparator of the region shuffle: `(region_index, bin_index)` ascending.
pub fn sort_cmp(a: &MultiRegionBin, b: &MultiRegionBin) -> Ordering {
    a.key.cmp(&b.key)
}

/// Group comparator of the region shuffle: equal when bins share a region.
pub fn group_cmp(a: &MultiRegionBin, b: &MultiRegionBin) -> Ordering {
    a.key.group_cmp(&b.key)
}

/// Sort bins with [sort_cmp].
pub fn sort_bins(bins: &mut [MultiRegionBin]) {
    bins.sort_by(sort_cmp);
}

/// Split sorted bins into contiguous runs of one region each.
pub fn region_groups(bins: &[MultiRegionBin]) -> impl Iterator<Item = &[MultiRegionBin]> {
    bins.chunk_by(|a, b| group_cmp(a, b) == Ordering::Equal)
}

/// Returns the key of a multi-region bin, for shuffling.
pub fn shuffle_key(bin: &MultiRegionBin) -> MultiRegionKey {
    bin.key
}

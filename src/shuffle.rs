//! In-process shuffle between pipeline stages.
//!
//! A [GroupedMerge] is the barrier between a map stage, whose partitions run independently and
//! emit keyed records, and a reduce stage, whose partitions each receive every record for a
//! disjoint set of keys. Records are routed to reduce partitions by a [Partitioner], grouped by
//! key and ordered within each group by originating map partition id, then by emission order
//! within that map partition. This arrival order is deterministic for a given set of map
//! outputs, which keeps order sensitive aggregators reproducible.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::bins::MultiRegionKey;
use crate::grid::SeaGrid;

/// Trait for routing keys to reduce partitions.
pub trait Partitioner<K>: Send + Sync {
    /// Number of reduce partitions.
    fn num_partitions(&self) -> usize;

    /// Reduce partition for a key, in `[0, num_partitions)`.
    fn partition(&self, key: &K) -> usize;
}

/// Routes bin indices to reduce partitions by contiguous ranges of grid rows.
///
/// Only rows between `min_row` and `max_row` are expected to carry bins, e.g. the rows covered by
/// the union of the configured regions. Rows outside the range are clamped to the first or last
/// partition.
#[derive(Debug)]
pub struct BinRowPartitioner<'a> {
    grid: &'a SeaGrid,
    num_partitions: usize,
    min_row: usize,
    max_row: usize,
}

impl<'a> BinRowPartitioner<'a> {
    /// Returns a partitioner covering every row of the grid.
    pub fn new(grid: &'a SeaGrid, num_partitions: usize) -> Self {
        Self::with_rows(grid, num_partitions, 0, grid.num_rows() - 1)
    }

    /// Returns a partitioner covering a range of rows.
    ///
    /// # Arguments
    ///
    /// * `grid`: Grid
    /// * `num_partitions`: Number of reduce partitions. Values below 1 are treated as 1.
    /// * `min_row`: First row expected to carry bins
    /// * `max_row`: Last row expected to carry bins
    pub fn with_rows(
        grid: &'a SeaGrid,
        num_partitions: usize,
        min_row: usize,
        max_row: usize,
    ) -> Self {
        let max_row = max_row.min(grid.num_rows() - 1);
        Self {
            grid,
            num_partitions: num_partitions.max(1),
            min_row: min_row.min(max_row),
            max_row,
        }
    }

    /// Returns a partitioner covering the rows between two latitudes.
    pub fn with_lat_range(
        grid: &'a SeaGrid,
        num_partitions: usize,
        min_lat: f64,
        max_lat: f64,
    ) -> Self {
        // Row 0 is the northernmost.
        let min_row = grid.row_index_for_lat(max_lat);
        let max_row = grid.row_index_for_lat(min_lat);
        Self::with_rows(grid, num_partitions, min_row, max_row)
    }

    /// Reduce partition for a grid row.
    pub fn partition_for_row(&self, row: usize) -> usize {
        let num_rows = self.max_row - self.min_row + 1;
        let row = row.clamp(self.min_row, self.max_row) - self.min_row;
        (row * self.num_partitions / num_rows).min(self.num_partitions - 1)
    }
}

impl Partitioner<i64> for BinRowPartitioner<'_> {
    fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn partition(&self, bin_index: &i64) -> usize {
        self.partition_for_row(self.grid.row_index(*bin_index))
    }
}

/// Routes region keys to reduce partitions by region index.
#[derive(Debug)]
pub struct RegionPartitioner {
    num_partitions: usize,
}

impl RegionPartitioner {
    pub fn new(num_partitions: usize) -> Self {
        Self {
            num_partitions: num_partitions.max(1),
        }
    }
}

impl Partitioner<MultiRegionKey> for RegionPartitioner {
    fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn partition(&self, key: &MultiRegionKey) -> usize {
        key.region_index.rem_euclid(self.num_partitions as i32) as usize
    }
}

/// Records emitted by one map partition, in emission order.
#[derive(Debug)]
pub struct MapOutput<V> {
    /// Originating map partition id
    pub partition_id: usize,
    pub records: Vec<V>,
}

impl<V> MapOutput<V> {
    pub fn new(partition_id: usize, records: Vec<V>) -> Self {
        Self {
            partition_id,
            records,
        }
    }
}

/// Every record routed to one reduce partition, grouped by key in ascending key order.
#[derive(Debug)]
pub struct ReducePartition<K, V> {
    pub id: usize,
    pub groups: BTreeMap<K, Vec<V>>,
}

impl<K, V> ReducePartition<K, V> {
    /// Number of records in the partition.
    pub fn num_records(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Barrier-synchronised grouping step between two stages.
pub struct GroupedMerge<'p, K, F> {
    partitioner: &'p dyn Partitioner<K>,
    key_fn: F,
}

impl<'p, K, F> GroupedMerge<'p, K, F>
where
    K: Ord + Send,
{
    /// Returns a new grouped merge.
    ///
    /// # Arguments
    ///
    /// * `partitioner`: Routes keys to reduce partitions
    /// * `key_fn`: Extracts the grouping key of a record
    pub fn new(partitioner: &'p dyn Partitioner<K>, key_fn: F) -> Self {
        Self {
            partitioner,
            key_fn,
        }
    }

    /// Route every map output record to its reduce partition.
    ///
    /// Must only be called once every map partition has completed. Returns one reduce partition
    /// per partitioner partition, including empty ones, in partition id order.
    pub fn shuffle<V>(&self, mut outputs: Vec<MapOutput<V>>) -> Vec<ReducePartition<K, V>>
    where
        F: Fn(&V) -> K,
    {
        // Stable, so outputs sharing an id keep their relative order.
        outputs.sort_by_key(|output| output.partition_id);
        let mut partitions: Vec<ReducePartition<K, V>> = (0..self.partitioner.num_partitions())
            .map(|id| ReducePartition {
                id,
                groups: BTreeMap::new(),
            })
            .collect();
        for output in outputs {
            for record in output.records {
                let key = (self.key_fn)(&record);
                let partition = self.partitioner.partition(&key);
                partitions[partition]
                    .groups
                    .entry(key)
                    .or_default()
                    .push(record);
            }
        }
        partitions
    }

    /// Shuffle, then merge each key group in parallel over reduce partitions.
    ///
    /// Returns the merge results of each reduce partition, in partition id order, each in
    /// ascending key order.
    pub fn run<V, R>(
        &self,
        outputs: Vec<MapOutput<V>>,
        merge_fn: impl Fn(&K, Vec<V>) -> R + Send + Sync,
    ) -> Vec<Vec<R>>
    where
        F: Fn(&V) -> K,
        V: Send,
        R: Send,
    {
        self.shuffle(outputs)
            .into_par_iter()
            .map(|partition| {
                partition
                    .groups
                    .into_iter()
                    .map(|(key, values)| merge_fn(&key, values))
                    .collect()
            })
            .collect()
    }
}

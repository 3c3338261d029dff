//! Observation and bin data model.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A single measurement at a position in time and space.
///
/// `values` holds one sample per configured variable, in configuration order.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Observation {
    /// Observation time, e.g. as a modified Julian date
    pub time: f64,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Sample values
    pub values: Vec<f32>,
}

impl Observation {
    pub fn new(time: f64, lat: f64, lon: f64, values: Vec<f32>) -> Self {
        Self {
            time,
            lat,
            lon,
            values,
        }
    }
}

/// Per-partition accumulator for one grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialBin {
    /// Grid bin index
    pub index: i64,
    /// Number of accepted observations
    pub num_obs: i32,
    /// Spatial feature vector
    pub features: Vec<f32>,
}

impl SpatialBin {
    /// Returns a new bin with a zeroed feature vector.
    pub fn new(index: i64, num_features: usize) -> Self {
        Self {
            index,
            num_obs: 0,
            features: vec![0.0; num_features],
        }
    }
}

/// A bin merged across all partitions that touched its grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalBin {
    /// Grid bin index
    pub index: i64,
    /// Total number of observations over all contributing spatial bins
    pub num_obs: i32,
    /// Number of contributing spatial bins
    pub num_passes: i32,
    /// Temporal feature vector
    pub features: Vec<f32>,
}

impl TemporalBin {
    /// Returns a new bin with a zeroed feature vector.
    pub fn new(index: i64, num_features: usize) -> Self {
        Self {
            index,
            num_obs: 0,
            num_passes: 0,
            features: vec![0.0; num_features],
        }
    }
}

/// Composite key used to route and order bins by region.
///
/// The derived ordering is lexicographic on `(region_index, bin_index)`, which relies on the
/// field declaration order below.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MultiRegionKey {
    pub region_index: i32,
    pub bin_index: i64,
}

impl MultiRegionKey {
    pub fn new(region_index: i32, bin_index: i64) -> Self {
        Self {
            region_index,
            bin_index,
        }
    }

    /// Group comparator: keys are in the same group when they share a region.
    pub fn group_cmp(&self, other: &Self) -> Ordering {
        self.region_index.cmp(&other.region_index)
    }
}

/// A temporal bin tagged with the region it was routed to.
///
/// Each copy owns its feature vector, so copies made for different regions are independent.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiRegionBin {
    pub key: MultiRegionKey,
    pub bin: TemporalBin,
}

impl MultiRegionBin {
    pub fn new(region_index: i32, bin: TemporalBin) -> Self {
        Self {
            key: MultiRegionKey::new(region_index, bin.index),
            bin,
        }
    }

    pub fn region_index(&self) -> i32 {
        self.key.region_index
    }

    pub fn bin_index(&self) -> i64 {
        self.key.bin_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_is_region_then_bin() {
        let mut keys = vec![
            MultiRegionKey::new(1, 3),
            MultiRegionKey::new(0, 7),
            MultiRegionKey::new(1, 1),
            MultiRegionKey::new(0, 2),
        ];
        keys.sort();
        assert_eq!(
            vec![
                MultiRegionKey::new(0, 2),
                MultiRegionKey::new(0, 7),
                MultiRegionKey::new(1, 1),
                MultiRegionKey::new(1, 3),
            ],
            keys
        );
    }

    #[test]
    fn group_cmp_ignores_bin() {
        assert_eq!(
            Ordering::Equal,
            MultiRegionKey::new(2, 5).group_cmp(&MultiRegionKey::new(2, 100))
        );
        assert_eq!(
            Ordering::Less,
            MultiRegionKey::new(1, 500).group_cmp(&MultiRegionKey::new(2, 0))
        );
    }

    #[test]
    fn multi_region_bin_copies_are_independent() {
        let mut bin = TemporalBin::new(42, 2);
        bin.features.copy_from_slice(&[1.0, 2.0]);
        let first = MultiRegionBin::new(0, bin.clone());
        let mut second = MultiRegionBin::new(1, bin);
        second.bin.features[0] = 99.0;
        assert_eq!(vec![1.0, 2.0], first.bin.features);
        assert_eq!(42, second.bin_index());
        assert_eq!(1, second.region_index());
    }

    #[test]
    fn deserialise_observation() {
        let observation: Observation =
            serde_json::from_str(r#"{"time": 1.5, "lat": 10.0, "lon": -20.0, "values": [3.0]}"#)
                .unwrap();
        assert_eq!(Observation::new(1.5, 10.0, -20.0, vec![3.0]), observation);
    }
}

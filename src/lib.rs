//! This crate bins sparse, irregularly located observations onto a fixed global equal-area grid.
//!
//! Observations are first aggregated per input partition (the spatial pass), then merged across
//! every partition that touched the same grid cell (the temporal pass). Merged bins are finally
//! fanned out to named geographic regions and handed, in a deterministic order, to a writer that
//! produces one product per region.
//!
//! Binning is built on a small set of open source components.
//!
//! * [rayon] runs partitions and reduce stages in parallel.
//! * [Serde](serde) and [validator] deserialise and check job configuration.
//! * [bytes] and [zerocopy] implement the binary bin codec used between stages.
//! * [geo] and [wkt] provide region geometry.
//! * [tracing] and [prometheus] provide logging and metrics.
//!
//! The main entry points are [pipeline::Job] for running a complete job, and the
//! [spatial_binner], [temporal_binner] and [multi_region] modules for driving the stages
//! individually.

pub mod aggregator;
pub mod aggregators;
pub mod bin_manager;
pub mod bins;
pub mod cli;
pub mod codec;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod models;
pub mod multi_region;
pub mod pipeline;
pub mod region;
pub mod shuffle;
pub mod source;
pub mod spatial_binner;
pub mod temporal_binner;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod types;
pub mod writer;

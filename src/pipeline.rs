//! End-to-end binning job.
//!
//! A [Job] is built from a validated [JobConfig]. Every configuration error is reported by
//! [Job::new], so a job that has been built only fails on partition I/O or corrupted spill data.
//!
//! Running a job proceeds in stages separated by barriers:
//!
//! 1. Spatial pass. Each input partition is binned independently and in parallel. Its spatial
//!    bins are encoded with the bin codec and spilled to memory or disk.
//! 2. Temporal pass. Spilled bins are shuffled by bin index to reduce partitions covering
//!    contiguous grid rows, and each group is merged into one temporal bin.
//! 3. Region pass. Temporal bins are fanned out to the regions containing them, encoded,
//!    shuffled by region and handed to a [RegionProductWriter] in `(region, bin)` order.

use std::path::PathBuf;
use std::time::Instant;

use bytes::Bytes;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;
use validator::Validate;

use crate::aggregator::VariableContext;
use crate::aggregators::create_aggregator;
use crate::bin_manager::BinManager;
use crate::bins::{MultiRegionBin, MultiRegionKey, Observation, SpatialBin, TemporalBin};
use crate::codec::BinCodec;
use crate::error::BinningError;
use crate::grid::SeaGrid;
use crate::metrics;
use crate::models::{JobConfig, TimeRange};
use crate::multi_region::{region_groups, shuffle_key, RegionFanOut};
use crate::region::{lat_extent, regions_from_config, Region};
use crate::shuffle::{BinRowPartitioner, GroupedMerge, MapOutput, RegionPartitioner};
use crate::spatial_binner::{SpatialBinner, SpatialStats};
use crate::temporal_binner::TemporalBinner;

/// Observations of one partition.
pub type Observations<'a> = Box<dyn Iterator<Item = Result<Observation, BinningError>> + 'a>;

/// Trait for providers of input observations.
///
/// A partition is identified by a string, e.g. a file path. Opening the same partition twice
/// must yield the same sequence.
pub trait ObservationSource: Sync {
    /// Open a partition for reading.
    ///
    /// Errors opening or reading a partition fail the partition, and with it the job.
    fn open(&self, partition: &str) -> Result<Observations<'_>, BinningError>;
}

/// Job level metadata of one region product.
#[derive(Clone, Debug, Serialize)]
pub struct RegionMetadata<'a> {
    pub job_id: String,
    pub region_index: i32,
    pub region_name: &'a str,
    /// Region geometry as configured
    pub region_wkt: &'a str,
    pub time_range: Option<&'a TimeRange>,
    /// Number of grid rows
    pub num_rows: usize,
    /// Names of the output features of each bin
    pub feature_names: &'a [String],
}

/// Trait for consumers of region products.
///
/// Calls for one region are `begin_region`, `write_bin` once per bin in ascending bin index
/// order, then `end_region`. Regions are visited one at a time.
pub trait RegionProductWriter {
    fn begin_region(&mut self, metadata: &RegionMetadata) -> Result<(), BinningError>;

    /// Write one bin with its output features.
    fn write_bin(&mut self, bin: &MultiRegionBin, output: &[f32]) -> Result<(), BinningError>;

    fn end_region(&mut self) -> Result<(), BinningError>;
}

/// Counters describing a completed job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    /// Input partitions binned
    pub partitions: usize,
    /// Observations read
    pub observations: u64,
    /// Observations skipped
    pub skipped_observations: u64,
    /// Spatial bins summed over partitions
    pub spatial_bins: u64,
    /// Distinct bin indices merged
    pub temporal_bins: u64,
    /// Bins written summed over regions
    pub region_bins: u64,
    /// Region products written
    pub regions: usize,
}

/// Spatial bins of one partition, encoded.
#[derive(Debug)]
enum Spill {
    Memory(Bytes),
    File(PathBuf),
}

#[derive(Debug)]
struct SpilledPartition {
    partition_id: usize,
    spill: Spill,
}

/// Release a spill, removing its file if it has one.
fn discard(spill: Spill) {
    if let Spill::File(path) = spill {
        if let Err(err) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), "failed to remove spill file: {}", err);
        }
    }
}

/// A configured binning job.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    config: JobConfig,
    grid: SeaGrid,
    variables: VariableContext,
    manager: BinManager,
    regions: Vec<Region>,
    spatial_codec: BinCodec,
    region_codec: BinCodec,
    spill_dir: Option<PathBuf>,
}

impl Job {
    /// Build a job, checking the whole configuration.
    ///
    /// # Arguments
    ///
    /// * `config`: Job configuration
    pub fn new(config: JobConfig) -> Result<Self, BinningError> {
        config.validate()?;
        let grid = SeaGrid::new(config.num_rows)?;
        let mut variables = VariableContext::new();
        for variable in &config.variables {
            variables.add(&variable.name, variable.missing.clone());
        }
        let aggregators = config
            .aggregators
            .iter()
            .enumerate()
            .map(|(index, aggregator)| create_aggregator(index, aggregator, &variables))
            .collect::<Result<Vec<_>, _>>()?;
        let manager = BinManager::new(aggregators);
        let regions = regions_from_config(&grid, &config.regions)?;
        // Region indices are i32 on the wire.
        i32::try_from(regions.len())?;
        let spatial_codec = BinCodec::new(config.byte_order, manager.spatial_feature_count());
        let region_codec = BinCodec::new(config.byte_order, manager.temporal_feature_count());
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            grid,
            variables,
            manager,
            regions,
            spatial_codec,
            region_codec,
            spill_dir: None,
        })
    }

    /// Spill encoded spatial bins to files in a directory instead of memory.
    ///
    /// The directory must exist. Spill files are removed once read back.
    pub fn with_spill_dir(mut self, spill_dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(spill_dir.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn grid(&self) -> &SeaGrid {
        &self.grid
    }

    pub fn manager(&self) -> &BinManager {
        &self.manager
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Run the job to completion.
    ///
    /// Spatial binning of partitions and merging of reduce partitions run on the current rayon
    /// thread pool. The writer is called from the calling thread.
    ///
    /// # Arguments
    ///
    /// * `source`: Provider of observations
    /// * `partitions`: Partition identifiers. A partition's position in this list is its id,
    ///   which fixes the order in which its bins are merged with those of other partitions.
    /// * `writer`: Consumer of region products
    pub fn run(
        &self,
        source: &dyn ObservationSource,
        partitions: &[String],
        writer: &mut dyn RegionProductWriter,
    ) -> Result<JobSummary, BinningError> {
        info!(job_id = %self.id, partitions = partitions.len(), "starting binning job");
        let mut summary = JobSummary {
            job_id: self.id.to_string(),
            partitions: partitions.len(),
            ..Default::default()
        };

        let results: Vec<Result<(SpilledPartition, SpatialStats), BinningError>> = partitions
            .par_iter()
            .enumerate()
            .map(|(id, partition)| self.spatial_partition(source, id, partition))
            .collect();
        let mut spilled = Vec::with_capacity(results.len());
        let mut failure = None;
        for result in results {
            match result {
                Ok(partition) => spilled.push(partition),
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        if let Some(err) = failure {
            spilled.into_iter().for_each(|(partition, _)| discard(partition.spill));
            return Err(err);
        }

        let mut outputs = Vec::with_capacity(spilled.len());
        let mut spilled = spilled.into_iter();
        while let Some((partition, stats)) = spilled.next() {
            summary.observations += stats.observations;
            summary.skipped_observations += stats.skipped;
            summary.spatial_bins += stats.bins;
            match self.unspill(partition) {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    spilled.for_each(|(partition, _)| discard(partition.spill));
                    return Err(err);
                }
            }
        }

        let temporal = self.temporal_pass(outputs);
        summary.temporal_bins = temporal.iter().map(|bins| bins.len() as u64).sum();
        metrics::record_bins("temporal", summary.temporal_bins as usize);

        let region_partitions = self.region_pass(temporal)?;
        summary.region_bins = region_partitions.iter().map(|bins| bins.len() as u64).sum();
        metrics::record_bins("region", summary.region_bins as usize);

        summary.regions = self.format(region_partitions, writer)?;
        info!(
            job_id = %self.id,
            observations = summary.observations,
            skipped = summary.skipped_observations,
            temporal_bins = summary.temporal_bins,
            region_bins = summary.region_bins,
            "binning job complete"
        );
        Ok(summary)
    }

    /// Bin one partition and spill its bins.
    fn spatial_partition(
        &self,
        source: &dyn ObservationSource,
        id: usize,
        partition: &str,
    ) -> Result<(SpilledPartition, SpatialStats), BinningError> {
        let _span = info_span!("spatial", partition = id).entered();
        let start = Instant::now();
        let (bins, stats) = match self.bin_partition(source, partition) {
            Ok(result) => result,
            Err(err) => {
                metrics::PARTITIONS_FAILED.inc();
                error!(partition, "failed to bin partition: {}", err);
                return Err(err);
            }
        };
        let seconds = start.elapsed().as_secs_f64();
        metrics::record_partition(stats.observations, stats.skipped, stats.bins, seconds);
        info!(
            observations = stats.observations,
            skipped = stats.skipped,
            bins = stats.bins,
            seconds,
            "binned partition {}",
            partition
        );
        let spill = self.spill(id, &bins)?;
        Ok((
            SpilledPartition {
                partition_id: id,
                spill,
            },
            stats,
        ))
    }

    fn bin_partition(
        &self,
        source: &dyn ObservationSource,
        partition: &str,
    ) -> Result<(Vec<SpatialBin>, SpatialStats), BinningError> {
        let mut binner = SpatialBinner::new(&self.grid, &self.manager, &self.variables);
        for observation in source.open(partition)? {
            binner.process(&observation?);
        }
        Ok(binner.complete())
    }

    fn spill(&self, id: usize, bins: &[SpatialBin]) -> Result<Spill, BinningError> {
        let data = self.spatial_codec.encode_spatial_bins(bins)?;
        match &self.spill_dir {
            Some(dir) => {
                let path = dir.join(format!("{}-{:05}.bin", self.id, id));
                debug!(path = %path.display(), bytes = data.len(), "spilling spatial bins");
                std::fs::write(&path, &data)?;
                Ok(Spill::File(path))
            }
            None => Ok(Spill::Memory(data)),
        }
    }

    fn unspill(&self, spilled: SpilledPartition) -> Result<MapOutput<SpatialBin>, BinningError> {
        let data = match spilled.spill {
            Spill::Memory(data) => data,
            Spill::File(path) => {
                let data = std::fs::read(&path);
                discard(Spill::File(path));
                Bytes::from(data?)
            }
        };
        let bins = self.spatial_codec.decode_spatial_bins(data)?;
        Ok(MapOutput::new(spilled.partition_id, bins))
    }

    /// Merge spatial bins by index. Returns the temporal bins of each reduce partition.
    fn temporal_pass(&self, outputs: Vec<MapOutput<SpatialBin>>) -> Vec<Vec<TemporalBin>> {
        let (south, north) = lat_extent(&self.regions).unwrap_or((-90.0, 90.0));
        let partitioner =
            BinRowPartitioner::with_lat_range(&self.grid, self.config.num_reducers, south, north);
        let merge = GroupedMerge::<i64, _>::new(&partitioner, |bin: &SpatialBin| bin.index);
        let binner = TemporalBinner::new(&self.manager);
        merge
            .shuffle(outputs)
            .into_par_iter()
            .map(|partition| {
                let _span = info_span!("temporal", partition = partition.id).entered();
                let bins: Vec<TemporalBin> = partition
                    .groups
                    .into_iter()
                    .map(|(index, group)| binner.merge(index, &group))
                    .collect();
                debug!(bins = bins.len(), "merged reduce partition");
                bins
            })
            .collect()
    }

    /// Fan temporal bins out to regions and shuffle them by region.
    ///
    /// Returns the bins of each region reduce partition, sorted by `(region, bin)`.
    fn region_pass(
        &self,
        temporal: Vec<Vec<TemporalBin>>,
    ) -> Result<Vec<Vec<MultiRegionBin>>, BinningError> {
        let fan_out = RegionFanOut::new(&self.grid, &self.regions)?;
        let encoded = temporal
            .par_iter()
            .map(|bins| {
                let copies: Vec<MultiRegionBin> =
                    bins.iter().flat_map(|bin| fan_out.fan_out(bin)).collect();
                self.region_codec.encode_multi_region_bins(&copies)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = encoded
            .into_iter()
            .enumerate()
            .map(|(id, data)| {
                let bins = self.region_codec.decode_multi_region_bins(data)?;
                Ok(MapOutput::new(id, bins))
            })
            .collect::<Result<Vec<_>, BinningError>>()?;

        let partitioner = RegionPartitioner::new(self.config.num_region_partitions);
        let merge = GroupedMerge::<MultiRegionKey, _>::new(&partitioner, shuffle_key);
        Ok(merge
            .shuffle(outputs)
            .into_iter()
            .map(|partition| {
                // Fan-out emits one copy per region and bin, so groups hold a single bin.
                partition.groups.into_values().flatten().collect()
            })
            .collect())
    }

    /// Hand every region's bins to the writer. Returns the number of region products.
    fn format(
        &self,
        partitions: Vec<Vec<MultiRegionBin>>,
        writer: &mut dyn RegionProductWriter,
    ) -> Result<usize, BinningError> {
        let mut written = vec![false; self.regions.len()];
        let mut output = self.manager.output_fill_vector();
        for (id, bins) in partitions.iter().enumerate() {
            let _span = info_span!("format", partition = id).entered();
            for group in region_groups(bins) {
                let region_index = group[0].region_index();
                writer.begin_region(&self.metadata(region_index))?;
                for bin in group {
                    self.manager.compute_output(&bin.bin, &mut output);
                    writer.write_bin(bin, &output)?;
                }
                writer.end_region()?;
                written[region_index as usize] = true;
                debug!(region_index, bins = group.len(), "wrote region");
            }
        }
        // Regions without data still get an (empty) product.
        for (index, _) in written.iter().enumerate().filter(|(_, written)| !**written) {
            let region_index = index as i32;
            info!(region = self.regions[index].name(), "region contains no bins");
            writer.begin_region(&self.metadata(region_index))?;
            writer.end_region()?;
        }
        Ok(self.regions.len())
    }

    fn metadata(&self, region_index: i32) -> RegionMetadata<'_> {
        let region = &self.regions[region_index as usize];
        RegionMetadata {
            job_id: self.id.to_string(),
            region_index,
            region_name: region.name(),
            region_wkt: region.wkt(),
            time_range: self.config.time_range.as_ref(),
            num_rows: self.grid.num_rows(),
            feature_names: self.manager.output_feature_names(),
        }
    }
}

//! JSON lines region product writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::bins::MultiRegionBin;
use crate::error::BinningError;
use crate::grid::SeaGrid;
use crate::pipeline::{RegionMetadata, RegionProductWriter};

/// One line of a region product per bin.
#[derive(Debug, Serialize)]
struct BinRecord<'a> {
    bin_index: i64,
    lat: f64,
    lon: f64,
    num_obs: i32,
    num_passes: i32,
    /// Output features, in the order named by the header. Non-finite values are written as null.
    features: &'a [f32],
}

/// Region product currently being written.
struct OpenProduct {
    region: String,
    path: PathBuf,
    grid: SeaGrid,
    out: BufWriter<File>,
}

/// Writes one `<index>-<region>.jsonl` file per region into an output directory.
///
/// The first line of each file holds the region metadata, and each following line one bin.
pub struct JsonLinesWriter {
    output_dir: PathBuf,
    current: Option<OpenProduct>,
    written: Vec<PathBuf>,
}

impl JsonLinesWriter {
    /// Returns a new writer. The output directory is created if necessary.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, BinningError> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            current: None,
            written: vec![],
        })
    }

    /// Paths of the completed products, in the order they were written.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn current(&mut self) -> Result<&mut OpenProduct, BinningError> {
        self.current.as_mut().ok_or_else(|| BinningError::Output {
            region: String::new(),
            source: std::io::Error::other("no region product is open"),
        })
    }
}

/// File name of a region's product.
///
/// Characters of the name other than ASCII alphanumerics, `-` and `_` are replaced by `_`. The
/// region index prefix keeps names distinct when sanitised names collide.
pub fn product_file_name(region_index: i32, region: &str) -> String {
    let stem: String = region
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}.jsonl", region_index, stem)
}

fn write_line(out: &mut impl Write, value: &impl Serialize) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")
}

fn output_error(region: &str, source: std::io::Error) -> BinningError {
    BinningError::Output {
        region: region.to_string(),
        source,
    }
}

impl RegionProductWriter for JsonLinesWriter {
    fn begin_region(&mut self, metadata: &RegionMetadata) -> Result<(), BinningError> {
        if self.current.is_some() {
            self.end_region()?;
        }
        let region = metadata.region_name;
        let path = self.output_dir.join(product_file_name(metadata.region_index, region));
        let file = File::create(&path).map_err(|source| output_error(region, source))?;
        let mut out = BufWriter::new(file);
        write_line(&mut out, metadata).map_err(|source| output_error(region, source))?;
        self.current = Some(OpenProduct {
            region: region.to_string(),
            path,
            grid: SeaGrid::new(metadata.num_rows)?,
            out,
        });
        Ok(())
    }

    fn write_bin(&mut self, bin: &MultiRegionBin, output: &[f32]) -> Result<(), BinningError> {
        let product = self.current()?;
        let (lat, lon) = product.grid.center_lat_lon(bin.bin_index());
        let record = BinRecord {
            bin_index: bin.bin_index(),
            lat,
            lon,
            num_obs: bin.bin.num_obs,
            num_passes: bin.bin.num_passes,
            features: output,
        };
        write_line(&mut product.out, &record)
            .map_err(|source| output_error(&product.region, source))
    }

    fn end_region(&mut self) -> Result<(), BinningError> {
        let mut product = match self.current.take() {
            Some(product) => product,
            None => return Ok(()),
        };
        product
            .out
            .flush()
            .map_err(|source| output_error(&product.region, source))?;
        tracing::debug!(path = %product.path.display(), "wrote region product");
        self.written.push(product.path);
        Ok(())
    }
}

/// Read a product back as its header and bin lines.
pub fn read_product(
    path: &Path,
) -> Result<(serde_json::Value, Vec<serde_json::Value>), BinningError> {
    let text = std::fs::read_to_string(path)?;
    let mut lines = text.lines().map(serde_json::from_str::<serde_json::Value>);
    let header = match lines.next() {
        Some(header) => header?,
        None => serde_json::Value::Null,
    };
    let bins = lines.collect::<Result<Vec<_>, _>>()?;
    Ok((header, bins))
}

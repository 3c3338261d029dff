//! Sinusoidal equal-area (SEA) grid.
//!
//! The globe is divided into `num_rows` latitude rows of equal height. Row 0 is the
//! northernmost row. Each row is divided into a number of columns proportional to the cosine of
//! its centre latitude, so that cells have approximately equal area. Columns are numbered by
//! increasing longitude starting at -180 degrees. Bin indices are assigned row by row, so the
//! first bin of a row is the total number of columns in all rows north of it.

use crate::error::BinningError;

/// Default number of rows, giving cells of roughly 9.28 km.
pub const DEFAULT_NUM_ROWS: usize = 2160;

/// An immutable SEA grid.
#[derive(Clone, Debug, PartialEq)]
pub struct SeaGrid {
    num_rows: usize,
    num_cols: Vec<usize>,
    base_bin: Vec<i64>,
    num_bins: i64,
}

impl SeaGrid {
    /// Returns a new grid.
    ///
    /// # Arguments
    ///
    /// * `num_rows`: Number of latitude rows. Must be positive and even.
    pub fn new(num_rows: usize) -> Result<Self, BinningError> {
        if num_rows == 0 {
            return Err(BinningError::InvalidGrid {
                reason: "number of rows must be positive".to_string(),
            });
        }
        if num_rows % 2 != 0 {
            return Err(BinningError::InvalidGrid {
                reason: format!("number of rows must be even, got {}", num_rows),
            });
        }
        let mut num_cols = Vec::with_capacity(num_rows);
        let mut base_bin = Vec::with_capacity(num_rows);
        let mut num_bins: i64 = 0;
        for row in 0..num_rows {
            let lat = row_center_lat(num_rows, row);
            // Round half up, as the cell widths are defined.
            let cols = (2.0 * num_rows as f64 * lat.to_radians().cos() + 0.5).floor() as usize;
            let cols = cols.max(1);
            base_bin.push(num_bins);
            num_cols.push(cols);
            num_bins += i64::try_from(cols)?;
        }
        Ok(Self {
            num_rows,
            num_cols,
            base_bin,
            num_bins,
        })
    }

    /// Number of latitude rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Total number of bins addressable by the grid.
    pub fn num_bins(&self) -> i64 {
        self.num_bins
    }

    /// Number of columns in a row. Out of range rows are clamped.
    pub fn num_cols(&self, row: usize) -> usize {
        self.num_cols[self.clamp_row(row)]
    }

    /// Index of the first bin in a row. Out of range rows are clamped.
    pub fn first_bin_index(&self, row: usize) -> i64 {
        self.base_bin[self.clamp_row(row)]
    }

    /// Centre latitude of a row in degrees.
    pub fn center_lat(&self, row: usize) -> f64 {
        row_center_lat(self.num_rows, self.clamp_row(row))
    }

    /// Latitude bounds `(south, north)` of a row in degrees.
    pub fn row_lat_bounds(&self, row: usize) -> (f64, f64) {
        let row = self.clamp_row(row);
        let height = 180.0 / self.num_rows as f64;
        let north = 90.0 - row as f64 * height;
        (north - height, north)
    }

    /// Row containing a latitude.
    ///
    /// Latitudes outside [-90, 90] are clamped to the polar rows. The south pole itself falls in
    /// the southernmost row.
    pub fn row_index_for_lat(&self, lat: f64) -> usize {
        let row = (90.0 - lat) * self.num_rows as f64 / 180.0;
        // Float to int casts saturate, and map NaN to 0.
        self.clamp_row(row.max(0.0) as usize)
    }

    /// Returns the bin index containing a position.
    ///
    /// # Arguments
    ///
    /// * `lat`: Latitude in degrees. Clamped to [-90, 90].
    /// * `lon`: Longitude in degrees. Clamped to [-180, 180].
    pub fn bin_index(&self, lat: f64, lon: f64) -> i64 {
        let row = self.row_index_for_lat(lat);
        let cols = self.num_cols[row];
        let col = ((lon + 180.0) * cols as f64 / 360.0).max(0.0) as usize;
        let col = col.min(cols - 1);
        // Columns per row are bounded by 2 * num_rows, which fits comfortably in i64.
        self.base_bin[row] + col as i64
    }

    /// Returns the row containing a bin index.
    ///
    /// Indices outside the grid are clamped to the first or last row.
    pub fn row_index(&self, bin_index: i64) -> usize {
        // Index of the last row whose first bin is <= bin_index.
        match self.base_bin.binary_search(&bin_index) {
            Ok(row) => row,
            Err(0) => 0,
            Err(insert) => insert - 1,
        }
    }

    /// Returns the cell centre `(lat, lon)` of a bin in degrees.
    pub fn center_lat_lon(&self, bin_index: i64) -> (f64, f64) {
        let bin_index = bin_index.clamp(0, self.num_bins - 1);
        let row = self.row_index(bin_index);
        let col = (bin_index - self.base_bin[row]) as f64;
        let cols = self.num_cols[row] as f64;
        let lon = 360.0 * (col + 0.5) / cols - 180.0;
        (self.center_lat(row), lon)
    }

    /// Longitude width of a cell in a row in degrees.
    pub fn cell_width(&self, row: usize) -> f64 {
        360.0 / self.num_cols(row) as f64
    }

    fn clamp_row(&self, row: usize) -> usize {
        row.min(self.num_rows - 1)
    }
}

fn row_center_lat(num_rows: usize, row: usize) -> f64 {
    90.0 - (row as f64 + 0.5) * 180.0 / num_rows as f64
}

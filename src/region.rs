//! Named geographic regions and buffered bin membership.
//!
//! A bin belongs to a region when its centre lies inside the region's polygon, or close enough
//! that the cell footprint overlaps the polygon. The tolerance is the longitude width of a grid
//! cell at the region's latitude extremes, taking the larger of the two.

use geo::{coord, BoundingRect, Contains, Intersects, Line, MultiPolygon, Point, Rect};
use wkt::TryFromWkt;

use crate::error::BinningError;
use crate::grid::SeaGrid;
use crate::models::RegionConfig;

/// A named region with its buffered envelope.
#[derive(Clone, Debug)]
pub struct Region {
    name: String,
    wkt: String,
    geometry: MultiPolygon<f64>,
    envelope: Rect<f64>,
    buffer: f64,
}

impl Region {
    /// Returns a new region.
    ///
    /// # Arguments
    ///
    /// * `grid`: Grid whose cell widths determine the longitude buffer
    /// * `name`: Region name
    /// * `wkt`: WKT `POLYGON` or `MULTIPOLYGON` text, with x as longitude and y as latitude
    pub fn new(grid: &SeaGrid, name: &str, wkt: &str) -> Result<Self, BinningError> {
        let invalid = |reason: String| BinningError::InvalidRegion {
            name: name.to_string(),
            reason,
        };
        let geometry = match geo::Geometry::<f64>::try_from_wkt_str(wkt) {
            Ok(geo::Geometry::Polygon(polygon)) => MultiPolygon::new(vec![polygon]),
            Ok(geo::Geometry::MultiPolygon(multi_polygon)) => multi_polygon,
            Ok(_) => return Err(invalid("expected POLYGON or MULTIPOLYGON".to_string())),
            Err(error) => return Err(invalid(error.to_string())),
        };
        let envelope = geometry
            .bounding_rect()
            .ok_or_else(|| invalid("geometry is empty".to_string()))?;
        let coords_finite = |c: geo::Coord<f64>| c.x.is_finite() && c.y.is_finite();
        if !coords_finite(envelope.min()) || !coords_finite(envelope.max()) {
            return Err(invalid("coordinates must be finite".to_string()));
        }
        let south = grid.row_index_for_lat(envelope.min().y);
        let north = grid.row_index_for_lat(envelope.max().y);
        let buffer = grid.cell_width(south).max(grid.cell_width(north));
        Ok(Self {
            name: name.to_string(),
            wkt: wkt.to_string(),
            geometry,
            envelope,
            buffer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Geometry as configured.
    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Bounding envelope of the geometry, before buffering.
    pub fn envelope(&self) -> Rect<f64> {
        self.envelope
    }

    /// Longitude buffer in degrees.
    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    /// Latitude extent `(south, north)` of the region in degrees.
    pub fn lat_range(&self) -> (f64, f64) {
        (self.envelope.min().y, self.envelope.max().y)
    }

    /// Whether a bin centre belongs to the region.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let min = self.envelope.min();
        let max = self.envelope.max();
        if lat < min.y || lat > max.y || lon < min.x - self.buffer || lon > max.x + self.buffer {
            return false;
        }
        if self.geometry.contains(&Point::new(lon, lat)) {
            return true;
        }
        // Centres within one buffer width of the polygon in longitude.
        let reach = Line::new(
            coord! { x: lon - self.buffer, y: lat },
            coord! { x: lon + self.buffer, y: lat },
        );
        self.geometry.intersects(&reach)
    }
}

/// Build the regions of a job, preserving their configured order.
///
/// Fails if the list is empty or any geometry is unusable.
pub fn regions_from_config(
    grid: &SeaGrid,
    configs: &[RegionConfig],
) -> Result<Vec<Region>, BinningError> {
    if configs.is_empty() {
        return Err(BinningError::EmptyRegionList);
    }
    configs
        .iter()
        .map(|config| Region::new(grid, &config.name, &config.wkt))
        .collect()
}

/// Latitude extent `(south, north)` covered by a list of regions.
pub fn lat_extent(regions: &[Region]) -> Option<(f64, f64)> {
    regions
        .iter()
        .map(Region::lat_range)
        .reduce(|(south, north), (s, n)| (south.min(s), north.max(n)))
}

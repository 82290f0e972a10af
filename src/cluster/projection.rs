use std::f64::consts::PI;

use super::point::Point;

/// Coefficient to translate from degrees to radians
pub const DEGREE_RAD: f64 = PI / 180.0;

/// A point in zoom-relative pixel space
///
/// `x` and `y` are degrees scaled to pixels at the projection zoom. The
/// longitude axis is not yet compressed: `cos_lat` is kept so that a pair of
/// points can be compressed by their mean latitude when measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
    pub cos_lat: f64,
}

/// Pixels spanned by one degree at the equator for the given zoom
pub fn pixels_per_degree(zoom: f64, tile_size: f64) -> f64 {
    tile_size * zoom.exp2() / 360.0
}

/// Projects a geographic point into pixel space at `zoom`
///
/// Latitudes outside [-90, 90] are used as given.
pub fn project<P>(point: &Point<P>, zoom: f64, tile_size: f64) -> PlanarPoint {
    let scale = pixels_per_degree(zoom, tile_size);
    PlanarPoint {
        x: point.lng * scale,
        y: point.lat * scale,
        cos_lat: (point.lat * DEGREE_RAD).cos(),
    }
}

/// Squared pixel distance between two projected points
///
/// The longitude delta is compressed by the cosine of the mean latitude,
/// approximated by the mean of both cosines.
pub fn planar_sq_dist(a: &PlanarPoint, b: &PlanarPoint) -> f64 {
    let dx = (a.x - b.x) * (a.cos_lat + b.cos_lat) / 2.0;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Pixel distance between two projected points
pub fn planar_distance(a: &PlanarPoint, b: &PlanarPoint) -> f64 {
    planar_sq_dist(a, b).sqrt()
}

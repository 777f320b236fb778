//! Web Mercator (EPSG:3857) projection, for turning longitude/latitude
//! input into the planar coordinates the clustering engine operates on.

use glyphs_core::geom::Point;

/// Earth radius used by the Web Mercator spherical approximation, in
/// metres (matches the value used by most web map tile servers).
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitudes beyond this clamp project to infinity; tile servers clamp
/// here too (`85.051_128_77` degrees).
const MAX_LATITUDE_DEG: f64 = 85.051_128_77;

/// Project `(longitude, latitude)` in degrees to Web Mercator metres.
#[must_use]
pub fn project(lon_deg: f64, lat_deg: f64) -> Point {
    let lat_deg = lat_deg.clamp(-MAX_LATITUDE_DEG, MAX_LATITUDE_DEG);
    let x = EARTH_RADIUS_M * lon_deg.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat_deg.to_radians() / 2.0).tan().ln();
    Point::new(x, y)
}

/// Inverse of [`project`]: Web Mercator metres back to `(longitude,
/// latitude)` in degrees.
#[must_use]
pub fn unproject(p: Point) -> (f64, f64) {
    let lon = (p.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (p.y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_origin() {
        let p = project(0.0, 0.0);
        assert!(p.x.abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn project_then_unproject_round_trips() {
        let (lon, lat) = (-122.4194, 37.7749);
        let p = project(lon, lat);
        let (lon2, lat2) = unproject(p);
        assert!((lon - lon2).abs() < 1e-6);
        assert!((lat - lat2).abs() < 1e-6);
    }

    #[test]
    fn latitude_beyond_clamp_does_not_produce_infinity() {
        let p = project(0.0, 89.9);
        assert!(p.y.is_finite());
    }
}

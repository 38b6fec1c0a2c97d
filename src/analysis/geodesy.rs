/// Great-circle distance on a spherical Earth.
///
/// Site clustering compares distances against thresholds of tens of metres,
/// where the haversine formula on the mean Earth radius is accurate to well
/// under a millimetre per metre.

use crate::model::Coordinate;

/// IUGG mean Earth radius.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates, in metres.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Coordinate `north_m` metres north and `east_m` metres east of `origin`.
///
/// Flat-Earth offset, good enough for the few hundred metres a pond spans.
pub fn offset_m(origin: &Coordinate, north_m: f64, east_m: f64) -> Coordinate {
    let metres_per_degree = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
    let dlat = north_m / metres_per_degree;
    let dlon = east_m / (metres_per_degree * origin.latitude.to_radians().cos());
    Coordinate::new(origin.latitude + dlat, origin.longitude + dlon)
}

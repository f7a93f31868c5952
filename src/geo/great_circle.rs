// src/geo/great_circle.rs
// Spherical great-circle distance, bearing and forward position
// RELEVANT FILES: src/geo/projection.rs, src/drape/geodesic.rs

use std::f64::consts::PI;

/// Mean earth radius in metres used by every spherical computation.
pub const SPHEROID_RADIUS: f64 = 6_371_000.0;

const DTR: f64 = PI / 180.0;
const RTD: f64 = 180.0 / PI;

/// Half-angle terms shared by the distance and bearing formulas.
#[inline]
fn half_angle_terms(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> (f64, f64) {
    let t1 = (0.5 * (DTR * lon1 - DTR * lon2)).sin();
    let t2 = (0.5 * (DTR * lat1 - DTR * lat2)).sin();
    (t1, t2)
}

#[inline]
fn central_angle(lat1: f64, lat2: f64, t1: f64, t2: f64) -> f64 {
    let h = t2 * t2 + (DTR * lat1).cos() * (DTR * lat2).cos() * t1 * t1;
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Great-circle distance in metres between two lon/lat positions (degrees).
pub fn distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (t1, t2) = half_angle_terms(lon1, lat1, lon2, lat2);
    SPHEROID_RADIUS * central_angle(lat1, lat2, t1, t2)
}

/// Initial bearing (degrees clockwise from north, `[0, 360)`) and distance
/// in metres from the first position to the second.
///
/// At a pole the bearing is fixed: 180 leaving the north pole, 0 leaving the
/// south pole.
pub fn distance_bearing(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> (f64, f64) {
    let (t1, t2) = half_angle_terms(lon1, lat1, lon2, lat2);
    let dd = central_angle(lat1, lat2, t1, t2);
    let dist = SPHEROID_RADIUS * dd;

    let rlat1 = DTR * lat1;
    let rlat2 = DTR * lat2;
    if (1.0 - rlat1.sin().abs()).abs() < 1e-6 {
        let bearing = if lat1 > 0.0 { 180.0 } else { 0.0 };
        return (bearing, dist);
    }

    let denom = dd.sin() * rlat1.cos();
    let t3 = if denom.abs() > 0.0 {
        (rlat2.sin() - rlat1.sin() * dd.cos()) / denom
    } else {
        1.0
    };
    let rbearing = t3.clamp(-1.0, 1.0).acos();
    let mut bearing = if t1 <= 0.0 {
        RTD * rbearing
    } else {
        360.0 - RTD * rbearing
    };
    if bearing < 0.0 {
        bearing += 360.0;
    }
    if bearing >= 360.0 {
        bearing -= 360.0;
    }
    (bearing, dist)
}

/// Position reached after travelling `dist` metres from (lon1, lat1) along
/// the great circle with initial `bearing` (degrees).
pub fn end_position(lon1: f64, lat1: f64, bearing: f64, dist: f64) -> (f64, f64) {
    let rd = dist / SPHEROID_RADIUS;
    let rbearing = DTR * (360.0 - bearing);
    let rlon1 = DTR * lon1;
    let rlat1 = DTR * lat1;

    let sin_lat2 = rlat1.sin() * rd.cos() + rlat1.cos() * rd.sin() * rbearing.cos();
    let rlat2 = sin_lat2.clamp(-1.0, 1.0).asin();
    let lat2 = RTD * rlat2;

    if rlat2.cos() < 1e-6 {
        return (lon1, lat2);
    }
    let dlon = (rbearing.sin() * rd.sin() / rlat2.cos()).clamp(-1.0, 1.0).asin();
    // f64 `%` keeps the dividend's sign, matching C fmod
    let lon2 = RTD * ((rlon1 - dlon + PI) % (2.0 * PI) - PI);
    (lon2, lat2)
}

/// Degrees of longitude and latitude per metre at a latitude, using the
/// WGS84 series expansion of the meridian and parallel arc lengths.
pub fn degrees_per_metre(lat: f64) -> (f64, f64) {
    const C1: f64 = 111_412.84;
    const C2: f64 = -93.5;
    const C3: f64 = 0.118;
    const C4: f64 = 111_132.92;
    const C5: f64 = -559.82;
    const C6: f64 = 1.175;
    const C7: f64 = 0.0023;

    let radlat = DTR * lat;
    let per_lon = (C1 * radlat.cos() + C2 * (3.0 * radlat).cos() + C3 * (5.0 * radlat).cos()).abs();
    let per_lat = (C4
        + C5 * (2.0 * radlat).cos()
        + C6 * (4.0 * radlat).cos()
        + C7 * (6.0 * radlat).cos())
    .abs();
    // guard against the degenerate parallel at the poles
    let per_lon = per_lon.max(1e-6);
    (1.0 / per_lon, 1.0 / per_lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_one_degree_equator() {
        let d = distance(0.0, 0.0, 1.0, 0.0);
        let expected = SPHEROID_RADIUS * DTR;
        assert!((d - expected).abs() < 1e-6, "got {}", d);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let (north, _) = distance_bearing(0.0, 0.0, 0.0, 1.0);
        let (east, _) = distance_bearing(0.0, 0.0, 1.0, 0.0);
        let (south, _) = distance_bearing(0.0, 1.0, 0.0, 0.0);
        let (west, _) = distance_bearing(1.0, 0.0, 0.0, 0.0);
        assert!(north.abs() < 1e-6 || (north - 360.0).abs() < 1e-6, "north {}", north);
        assert!((east - 90.0).abs() < 1e-6, "east {}", east);
        assert!((south - 180.0).abs() < 1e-6, "south {}", south);
        assert!((west - 270.0).abs() < 1e-6, "west {}", west);
    }

    #[test]
    fn test_bearing_at_poles() {
        let (b, _) = distance_bearing(10.0, 90.0, 20.0, 80.0);
        assert_eq!(b, 180.0);
        let (b, _) = distance_bearing(10.0, -90.0, 20.0, -80.0);
        assert_eq!(b, 0.0);
    }

    #[test]
    fn test_end_position_inverts_distance_bearing() {
        let (lon1, lat1, lon2, lat2) = (-122.0, 36.5, -121.2, 37.1);
        let (bearing, dist) = distance_bearing(lon1, lat1, lon2, lat2);
        let (lon, lat) = end_position(lon1, lat1, bearing, dist);
        assert!((lon - lon2).abs() < 1e-6, "lon {} vs {}", lon, lon2);
        assert!((lat - lat2).abs() < 1e-6, "lat {} vs {}", lat, lat2);
    }

    #[test]
    fn test_degrees_per_metre_equator() {
        let (dlon, dlat) = degrees_per_metre(0.0);
        assert!((1.0 / dlon - 111_319.458).abs() < 0.01);
        assert!((1.0 / dlat - 110_574.27).abs() < 0.1);
    }
}

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Wrap a longitude into [-180, 180)
#[inline(always)]
pub fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Format a coordinate pair as `12.3°N, 45.6°W`
pub fn hemisphere_coords(lon: f64, lat: f64) -> String {
    format!(
        "{:.1}°{}, {:.1}°{}",
        lat.abs(),
        if lat >= 0.0 { "N" } else { "S" },
        lon.abs(),
        if lon >= 0.0 { "E" } else { "W" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_lon() {
        assert_eq!(wrap_lon(0.0), 0.0);
        assert_eq!(wrap_lon(190.0), -170.0);
        assert_eq!(wrap_lon(-190.0), 170.0);
        assert_eq!(wrap_lon(180.0), -180.0);
    }

    #[test]
    fn test_hemisphere_coords() {
        assert_eq!(hemisphere_coords(-73.96, 40.78), "40.8°N, 74.0°W");
        assert_eq!(hemisphere_coords(151.2, -33.9), "33.9°S, 151.2°E");
    }
}

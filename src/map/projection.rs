use std::f64::consts::PI;

use crate::geo::wrap_lon;

/// Zoom bounds for the flat map (1.0 = whole world across the view)
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 64.0;

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Whole-world view
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 0.0, 1.0, width, height)
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width.max(1) as f64);
        self.center_lon = wrap_lon(self.center_lon + dx as f64 * scale);
        self.center_lat = (self.center_lat - dy as f64 * scale * 0.5).clamp(-85.0, 85.0);
    }

    /// Move the center to a point, keeping the zoom
    pub fn center_on(&mut self, lon: f64, lat: f64) {
        self.center_lon = wrap_lon(lon);
        self.center_lat = lat.clamp(-85.0, 85.0);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor keeping the geographic point under the cursor fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Normalized Web Mercator y for a latitude (0 = north edge, 1 = south edge)
    fn mercator_y(lat: f64) -> f64 {
        let lat_rad = lat.clamp(-85.0511, 85.0511) * PI / 180.0;
        (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.zoom * self.width.max(1) as f64;

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = Self::mercator_y(self.center_lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        let lon = x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI;

        (lon, lat)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon + 180.0) / 360.0;
        let y = Self::mercator_y(lat);

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = Self::mercator_y(self.center_lat);

        let scale = self.zoom * self.width as f64;

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Project using the world copy nearest the view center, so a point just
    /// across the antimeridian lands next to the center instead of a world away.
    pub fn project_nearest(&self, lon: f64, lat: f64) -> (i32, i32) {
        let offset = wrap_lon(lon - self.center_lon);
        self.project(self.center_lon + offset, lat)
    }

    /// (west, south, east, north) of the visible area. Longitudes are not
    /// wrapped: a view across the antimeridian reports west < -180 or east > 180.
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let (west, north) = self.unproject(0, 0);
        let (east, south) = self.unproject(self.width as i32, self.height as i32);
        (west, south.max(-90.0), east, north.min(90.0))
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        assert_eq!(vp.project(0.0, 0.0), (50, 50));
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
    }

    #[test]
    fn test_pan_wraps_longitude() {
        let mut vp = Viewport::new(175.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0); // +36 degrees
        assert!((vp.center_lon - (-149.0)).abs() < 1e-9);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(30.0, 20.0, 4.0, 400, 200);
        let (px, py) = vp.project(35.0, 25.0);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 35.0).abs() < 0.5);
        assert!((lat - 25.0).abs() < 0.5);
    }

    #[test]
    fn test_center_on_keeps_zoom() {
        let mut vp = Viewport::new(0.0, 0.0, 3.0, 100, 100);
        vp.center_on(-120.0, 51.6);
        assert_eq!(vp.zoom, 3.0);
        assert_eq!(vp.project(-120.0, 51.6), (50, 50));
    }

    #[test]
    fn test_project_nearest_crosses_antimeridian() {
        let vp = Viewport::new(179.0, 0.0, 4.0, 400, 200);
        let (px, _) = vp.project_nearest(-179.0, 0.0);
        // 2 degrees east of center, not 358 degrees west
        assert!(px > 200 && px < 220);
    }

    #[test]
    fn test_visible_bounds_unwrapped() {
        let vp = Viewport::new(170.0, 0.0, 2.0, 400, 200);
        let (west, south, east, north) = vp.visible_bounds();
        assert!(west < 170.0 && east > 180.0);
        assert!(south < 0.0 && north > 0.0);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vp = Viewport::world(100, 100);
        for _ in 0..50 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for _ in 0..50 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
    }
}

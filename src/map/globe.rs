use glam::DVec3;
use std::f64::consts::PI;

/// Sphere radius at zoom 1.0, as a fraction of the smaller canvas side
const BASE_RADIUS_FRACTION: f64 = 0.45;
const MAX_ZOOM: f64 = 40.0;

/// Globe viewport using orthographic projection of a rotating sphere.
/// Orientation is stored as an orthonormal basis so points transform with
/// three dot products.
#[derive(Clone, Debug)]
pub struct GlobeViewport {
    /// Direction from the globe center towards the camera
    forward: DVec3,
    /// Screen right
    right: DVec3,
    /// Screen up
    up: DVec3,
    /// Sphere radius in braille pixels (controls zoom)
    pub radius: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl GlobeViewport {
    /// Build a globe viewport centered on (lon, lat) with given radius.
    pub fn new(center_lon: f64, center_lat: f64, radius: f64, width: usize, height: usize) -> Self {
        let (forward, right, up) = basis_facing(center_lon, center_lat);
        Self {
            forward,
            right,
            up,
            radius,
            width,
            height,
        }
    }

    /// Whole-globe view centered on (lon, lat)
    pub fn fitted(center_lon: f64, center_lat: f64, width: usize, height: usize) -> Self {
        let radius = base_radius(width, height);
        Self::new(center_lon, center_lat, radius, width, height)
    }

    /// Turn the globe so (lon, lat) faces the camera, keeping the zoom
    pub fn look_at(&mut self, lon: f64, lat: f64) {
        let (forward, right, up) = basis_facing(lon, lat);
        self.forward = forward;
        self.right = right;
        self.up = up;
    }

    /// Center lon/lat the globe is looking at
    pub fn center_lonlat(&self) -> (f64, f64) {
        let lat = self.forward.z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = self.forward.y.atan2(self.forward.x).to_degrees();
        (lon, lat)
    }

    /// Project a surface point to screen pixels.
    /// Returns `None` for back-face points.
    pub fn project(&self, lon: f64, lat: f64) -> Option<(i32, i32)> {
        let p = lonlat_to_vec3(lon, lat);
        if p.dot(self.forward) < 0.0 {
            return None;
        }
        Some(self.to_screen(p.dot(self.right), p.dot(self.up)))
    }

    /// Project a point `ratio` Earth radii above the surface.
    /// Returns `None` only when the sphere hides it, so a point just past the
    /// limb stays visible.
    pub fn project_elevated(&self, lon: f64, lat: f64, ratio: f64) -> Option<(i32, i32)> {
        let p = lonlat_to_vec3(lon, lat) * (1.0 + ratio.max(0.0));
        let sx = p.dot(self.right);
        let sy = p.dot(self.up);
        if p.dot(self.forward) < 0.0 && sx * sx + sy * sy < 1.0 {
            return None;
        }
        Some(self.to_screen(sx, sy))
    }

    #[inline(always)]
    fn to_screen(&self, sx: f64, sy: f64) -> (i32, i32) {
        let px = (self.width as f64 / 2.0 + sx * self.radius) as i32;
        let py = (self.height as f64 / 2.0 - sy * self.radius) as i32;
        (px, py)
    }

    /// Screen center in pixels
    pub fn center_px(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Unproject screen pixels back to lon/lat.
    /// Returns `None` if the point is outside the sphere disk.
    pub fn unproject(&self, px: i32, py: i32) -> Option<(f64, f64)> {
        let sx = (px as f64 - self.width as f64 / 2.0) / self.radius;
        let sy = -(py as f64 - self.height as f64 / 2.0) / self.radius;

        let r2 = sx * sx + sy * sy;
        if r2 > 1.0 {
            return None;
        }

        let sz = (1.0 - r2).sqrt();
        let p = self.right * sx + self.up * sy + self.forward * sz;

        let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = p.y.atan2(p.x).to_degrees();

        Some((lon, lat))
    }

    /// Rotate the globe by a pixel drag delta.
    /// Positive dx turns the globe center east.
    pub fn rotate_drag(&mut self, dx: i32, dy: i32) {
        let radius = self.radius.max(1.0);
        self.yaw(dx as f64 / radius);
        self.pitch(-(dy as f64) / radius);
    }

    /// Rotate around the up axis
    fn yaw(&mut self, angle: f64) {
        if angle.abs() > 1e-10 {
            let (sin_a, cos_a) = angle.sin_cos();
            let new_forward = self.forward * cos_a + self.right * sin_a;
            let new_right = self.right * cos_a - self.forward * sin_a;
            self.forward = new_forward.normalize();
            self.right = new_right.normalize();
        }
    }

    /// Rotate around the right axis
    fn pitch(&mut self, angle: f64) {
        if angle.abs() > 1e-10 {
            let (sin_a, cos_a) = angle.sin_cos();
            let new_forward = self.forward * cos_a + self.up * sin_a;
            let new_up = self.up * cos_a - self.forward * sin_a;
            self.forward = new_forward.normalize();
            self.up = new_up.normalize();
        }
    }

    fn radius_bounds(&self) -> (f64, f64) {
        let base = base_radius(self.width, self.height);
        (base * 0.5, base * MAX_ZOOM)
    }

    pub fn zoom_in(&mut self) {
        let (_, max_r) = self.radius_bounds();
        self.radius = (self.radius * 1.5).min(max_r);
    }

    pub fn zoom_out(&mut self) {
        let (min_r, _) = self.radius_bounds();
        self.radius = (self.radius / 1.5).max(min_r);
    }

    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor towards a pixel, keeping the geographic point under the cursor fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let target = self.unproject(px, py);

        let (min_r, max_r) = self.radius_bounds();
        self.radius = (self.radius * factor).clamp(min_r, max_r);

        if let Some((lon, lat)) = target {
            let target_vec = lonlat_to_vec3(lon, lat);
            let sx_now = target_vec.dot(self.right);
            let sy_now = target_vec.dot(self.up);
            let sx_want = (px as f64 - self.width as f64 / 2.0) / self.radius;
            let sy_want = -(py as f64 - self.height as f64 / 2.0) / self.radius;

            self.yaw(-(sx_want - sx_now));
            self.pitch(-(sy_want - sy_now));
        }
    }

    /// Conservative lon/lat bounding box of the visible hemisphere, for
    /// spatial index queries. Samples the disk edge.
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let (clon, clat) = self.center_lonlat();
        let mut min_lon = clon;
        let mut max_lon = clon;
        let mut min_lat = clat;
        let mut max_lat = clat;

        for i in 0..32 {
            let angle = (i as f64 / 32.0) * 2.0 * PI;
            let p = self.right * angle.cos() + self.up * angle.sin();
            let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
            let lon = p.y.atan2(p.x).to_degrees();

            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        }

        // A hemisphere spanning more than 180 degrees of longitude wraps
        if max_lon - min_lon > 180.0 {
            min_lon = -180.0;
            max_lon = 180.0;
        }

        // A visible pole pulls in every longitude
        if self.forward.z > 0.05 {
            max_lat = 90.0;
            min_lon = -180.0;
            max_lon = 180.0;
        }
        if self.forward.z < -0.05 {
            min_lat = -90.0;
            min_lon = -180.0;
            max_lon = 180.0;
        }

        (min_lon.max(-180.0), min_lat.max(-90.0), max_lon.min(180.0), max_lat.min(90.0))
    }

    /// Zoom normalized so 1.0 shows the whole globe
    pub fn effective_zoom(&self) -> f64 {
        self.radius / base_radius(self.width, self.height)
    }

    /// Set viewport dimensions, keeping the zoom
    pub fn set_size(&mut self, width: usize, height: usize) {
        let zoom = self.effective_zoom();
        self.width = width;
        self.height = height;
        self.radius = base_radius(width, height) * zoom;
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

/// Sphere radius that fits the globe in the canvas at zoom 1.0
fn base_radius(width: usize, height: usize) -> f64 {
    (width.min(height) as f64 * BASE_RADIUS_FRACTION).max(1.0)
}

/// Orthonormal (forward, right, up) basis looking at (lon, lat) with north up
fn basis_facing(lon: f64, lat: f64) -> (DVec3, DVec3, DVec3) {
    let lon_rad = lon.to_radians();
    let lat_rad = lat.clamp(-89.999, 89.999).to_radians();

    let forward = lonlat_to_vec3(lon, lat);

    // Derivative of forward w.r.t. latitude: points north
    let raw_up = DVec3::new(
        -lat_rad.sin() * lon_rad.cos(),
        -lat_rad.sin() * lon_rad.sin(),
        lat_rad.cos(),
    );

    let right = raw_up.cross(forward).normalize();
    let up = forward.cross(right).normalize();
    (forward, right, up)
}

/// Convert lon/lat (degrees) to a unit sphere vector
#[inline(always)]
pub fn lonlat_to_vec3(lon: f64, lat: f64) -> DVec3 {
    let lon_rad = lon.to_radians();
    let lat_rad = lat.to_radians();
    DVec3::new(
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    )
}

/// Walk a great circle arc in ~2 degree steps, calling the visitor for every
/// point after the start.
#[inline]
pub fn walk_great_circle(lon0: f64, lat0: f64, lon1: f64, lat1: f64, mut visitor: impl FnMut(f64, f64)) {
    let a = lonlat_to_vec3(lon0, lat0);
    let b = lonlat_to_vec3(lon1, lat1);

    let angle = a.dot(b).clamp(-1.0, 1.0).acos();
    let steps = ((angle.to_degrees() / 2.0).ceil() as usize).max(1);

    let sin_angle = angle.sin();
    if steps == 1 || sin_angle.abs() < 1e-10 {
        visitor(lon1, lat1);
        return;
    }

    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let sa = ((1.0 - t) * angle).sin() / sin_angle;
        let sb = (t * angle).sin() / sin_angle;
        let p = a * sa + b * sb;

        let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = p.y.atan2(p.x).to_degrees();
        visitor(lon, lat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_center_projects_to_middle() {
        let g = GlobeViewport::fitted(-45.0, 30.0, 200, 100);
        assert_eq!(g.project(-45.0, 30.0), Some((100, 50)));
    }

    #[test]
    fn test_far_side_is_hidden() {
        let g = GlobeViewport::fitted(0.0, 0.0, 200, 100);
        assert_eq!(g.project(180.0, 0.0), None);
        assert!(g.project(60.0, 0.0).is_some());
    }

    #[test]
    fn test_east_is_right_and_north_is_up() {
        let g = GlobeViewport::fitted(0.0, 0.0, 200, 100);
        let (ex, _) = g.project(30.0, 0.0).unwrap();
        let (_, ny) = g.project(0.0, 30.0).unwrap();
        assert!(ex > 100);
        assert!(ny < 50);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let g = GlobeViewport::fitted(10.0, 20.0, 400, 400);
        let (px, py) = g.project(25.0, 35.0).unwrap();
        let (lon, lat) = g.unproject(px, py).unwrap();
        assert!(close(lon, 25.0, 1.0));
        assert!(close(lat, 35.0, 1.0));
        assert!(g.unproject(0, 0).is_none());
    }

    #[test]
    fn test_look_at_keeps_radius() {
        let mut g = GlobeViewport::fitted(0.0, 0.0, 200, 200);
        g.zoom_in();
        let r = g.radius;
        g.look_at(120.0, -40.0);
        let (lon, lat) = g.center_lonlat();
        assert!(close(lon, 120.0, 1e-6));
        assert!(close(lat, -40.0, 1e-6));
        assert_eq!(g.radius, r);
    }

    #[test]
    fn test_rotate_drag_moves_center_east() {
        let mut g = GlobeViewport::fitted(0.0, 0.0, 200, 200);
        g.rotate_drag(10, 0);
        let (lon, lat) = g.center_lonlat();
        assert!(lon > 0.0);
        assert!(close(lat, 0.0, 1e-6));
    }

    #[test]
    fn test_elevated_point_past_limb_is_visible() {
        let g = GlobeViewport::fitted(0.0, 0.0, 200, 200);
        // Just behind the limb: hidden on the surface, visible when raised
        assert!(g.project(91.0, 0.0).is_none());
        assert!(g.project_elevated(91.0, 0.0, 0.07).is_some());
        // Directly behind the globe stays hidden
        assert!(g.project_elevated(180.0, 0.0, 0.07).is_none());
    }

    #[test]
    fn test_zoom_bounds() {
        let mut g = GlobeViewport::fitted(0.0, 0.0, 100, 100);
        for _ in 0..30 {
            g.zoom_in();
        }
        assert!(close(g.effective_zoom(), MAX_ZOOM, 1e-9));
        for _ in 0..30 {
            g.zoom_out();
        }
        assert!(close(g.effective_zoom(), 0.5, 1e-9));
    }

    #[test]
    fn test_set_size_keeps_zoom() {
        let mut g = GlobeViewport::fitted(0.0, 0.0, 100, 100);
        g.zoom_in();
        let zoom = g.effective_zoom();
        g.set_size(300, 120);
        assert!(close(g.effective_zoom(), zoom, 1e-9));
    }

    #[test]
    fn test_great_circle_ends_at_target() {
        let mut points = Vec::new();
        walk_great_circle(0.0, 0.0, 20.0, 0.0, |lon, lat| points.push((lon, lat)));
        assert_eq!(points.len(), 10);
        let (lon, lat) = *points.last().unwrap();
        assert!(close(lon, 20.0, 1e-9));
        assert!(close(lat, 0.0, 1e-9));
    }
}

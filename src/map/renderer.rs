use crate::braille::BrailleCanvas;
use crate::hash::{hash2, rand_unit};
use crate::map::geometry::{draw_circle, draw_line, draw_ring};
use crate::map::globe::{walk_great_circle, GlobeViewport};
use crate::map::projection::Viewport;
use crate::map::spatial::{line_bbox, FeatureGrid};

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Grid cell size for feature culling, in degrees
const FEATURE_CELL_DEG: f64 = 10.0;

/// Level of detail for map data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }
}

/// Lines plus a culling index over their bounding boxes
#[derive(Default)]
struct FeatureSet {
    lines: Vec<LineString>,
    grid: Option<FeatureGrid>,
}

impl FeatureSet {
    fn extend(&mut self, lines: Vec<LineString>) {
        self.lines.extend(lines.into_iter().filter(|l| l.len() >= 2));
        self.grid = None;
    }

    fn reindex(&mut self) {
        // Every stored line has points, so indices stay aligned with `lines`
        let bboxes = self
            .lines
            .iter()
            .map(|l| line_bbox(l).unwrap_or((0.0, 0.0, 0.0, 0.0)));
        self.grid = Some(FeatureGrid::build(bboxes, FEATURE_CELL_DEG));
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines that may intersect the bounds; everything when unindexed
    fn visible(&self, bounds: (f64, f64, f64, f64)) -> Vec<&LineString> {
        match &self.grid {
            Some(grid) => {
                let (min_lon, min_lat, max_lon, max_lat) = bounds;
                grid.query(min_lon, min_lat, max_lon, max_lat)
                    .into_iter()
                    .filter_map(|idx| self.lines.get(idx))
                    .collect()
            }
            None => self.lines.iter().collect(),
        }
    }
}

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_coastlines: bool,
    pub show_borders: bool,
    pub show_graticule: bool,
    pub show_stars: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_coastlines: true,
            show_borders: true,
            show_graticule: false,
            show_stars: true,
        }
    }
}

/// Where to draw the station
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IssMarker {
    pub lon: f64,
    pub lat: f64,
    /// Altitude in Earth radii, lifts the marker above the globe
    pub altitude_ratio: f64,
}

/// Rendered layers, composited back to front by the UI
pub struct MapLayers {
    pub stars: BrailleCanvas,
    pub graticule: BrailleCanvas,
    pub outline: BrailleCanvas,
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub iss: BrailleCanvas,
    /// Character cell of the ISS marker when it is on screen
    pub iss_cell: Option<(u16, u16)>,
}

impl MapLayers {
    fn new(width: usize, height: usize) -> Self {
        Self {
            stars: BrailleCanvas::new(width, height),
            graticule: BrailleCanvas::new(width, height),
            outline: BrailleCanvas::new(width, height),
            coastlines: BrailleCanvas::new(width, height),
            borders: BrailleCanvas::new(width, height),
            iss: BrailleCanvas::new(width, height),
            iss_cell: None,
        }
    }
}

/// Map renderer with multi-resolution coastline data
pub struct MapRenderer {
    coastlines_low: FeatureSet,
    coastlines_medium: FeatureSet,
    coastlines_high: FeatureSet,
    borders_medium: FeatureSet,
    borders_high: FeatureSet,
    graticule: Vec<LineString>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            coastlines_low: FeatureSet::default(),
            coastlines_medium: FeatureSet::default(),
            coastlines_high: FeatureSet::default(),
            borders_medium: FeatureSet::default(),
            borders_high: FeatureSet::default(),
            graticule: graticule_lines(30.0),
            settings: DisplaySettings::default(),
        }
    }

    /// Coastlines for the LOD, falling back to coarser data
    fn coastlines(&self, lod: Lod) -> &FeatureSet {
        let candidates = match lod {
            Lod::High => [&self.coastlines_high, &self.coastlines_medium, &self.coastlines_low],
            Lod::Medium => [&self.coastlines_medium, &self.coastlines_low, &self.coastlines_low],
            Lod::Low => [&self.coastlines_low, &self.coastlines_medium, &self.coastlines_high],
        };
        candidates
            .into_iter()
            .find(|set| !set.is_empty())
            .unwrap_or(&self.coastlines_low)
    }

    fn borders(&self, lod: Lod) -> &FeatureSet {
        if lod == Lod::High && !self.borders_high.is_empty() {
            &self.borders_high
        } else {
            &self.borders_medium
        }
    }

    /// Render the flat Mercator view
    pub fn render_map(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        iss: Option<IssMarker>,
    ) -> MapLayers {
        let mut layers = MapLayers::new(width, height);
        let lod = Lod::from_zoom(viewport.zoom);
        let (west, south, east, north) = viewport.visible_bounds();

        // Draw each world copy that overlaps the view
        for offset in [-360.0, 0.0, 360.0] {
            if east < -180.0 + offset || west > 180.0 + offset {
                continue;
            }
            let bounds = (
                (west - offset).max(-180.0),
                south,
                (east - offset).min(180.0),
                north,
            );

            if self.settings.show_graticule {
                for line in &self.graticule {
                    draw_linestring(&mut layers.graticule, line, viewport, offset);
                }
            }
            if self.settings.show_coastlines {
                for line in self.coastlines(lod).visible(bounds) {
                    draw_linestring(&mut layers.coastlines, line, viewport, offset);
                }
            }
            if self.settings.show_borders {
                for line in self.borders(lod).visible(bounds) {
                    draw_linestring(&mut layers.borders, line, viewport, offset);
                }
            }
        }

        if let Some(marker) = iss {
            let (px, py) = viewport.project_nearest(marker.lon, marker.lat);
            if viewport.is_visible(px, py) {
                draw_circle(&mut layers.iss, px, py, 2);
                layers.iss_cell = pixel_to_cell(px, py, width, height);
            }
        }

        layers
    }

    /// Render the orthographic globe view
    pub fn render_globe(
        &self,
        width: usize,
        height: usize,
        globe: &GlobeViewport,
        iss: Option<IssMarker>,
    ) -> MapLayers {
        let mut layers = MapLayers::new(width, height);
        let lod = Lod::from_zoom(globe.effective_zoom());
        let bounds = globe.visible_bounds();
        let (cx, cy) = globe.center_px();

        if self.settings.show_stars {
            draw_starfield(&mut layers.stars, cx, cy, globe.radius);
        }

        draw_ring(&mut layers.outline, cx, cy, globe.radius.round() as i32);

        if self.settings.show_graticule {
            for line in &self.graticule {
                draw_globe_linestring(&mut layers.graticule, line, globe);
            }
        }
        if self.settings.show_coastlines {
            for line in self.coastlines(lod).visible(bounds) {
                draw_globe_linestring(&mut layers.coastlines, line, globe);
            }
        }
        if self.settings.show_borders {
            for line in self.borders(lod).visible(bounds) {
                draw_globe_linestring(&mut layers.borders, line, globe);
            }
        }

        if let Some(marker) = iss {
            if let Some((px, py)) = globe.project_elevated(marker.lon, marker.lat, marker.altitude_ratio) {
                draw_circle(&mut layers.iss, px, py, 2);
                layers.iss_cell = pixel_to_cell(px, py, width, height);
            }
        }

        layers
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastlines(&mut self, lines: Vec<LineString>, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.extend(lines),
            Lod::Medium => self.coastlines_medium.extend(lines),
            Lod::High => self.coastlines_high.extend(lines),
        }
    }

    /// Add border data at a specific LOD (low-detail borders share the medium set)
    pub fn add_borders(&mut self, lines: Vec<LineString>, lod: Lod) {
        match lod {
            Lod::High => self.borders_high.extend(lines),
            Lod::Low | Lod::Medium => self.borders_medium.extend(lines),
        }
    }

    /// Rebuild culling indexes; call once after loading data
    pub fn reindex(&mut self) {
        for set in [
            &mut self.coastlines_low,
            &mut self.coastlines_medium,
            &mut self.coastlines_high,
            &mut self.borders_medium,
            &mut self.borders_high,
        ] {
            set.reindex();
        }
    }

    /// Check if any coastline data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }

    pub fn has_borders(&self) -> bool {
        !self.borders_medium.is_empty() || !self.borders_high.is_empty()
    }

    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    pub fn toggle_graticule(&mut self) {
        self.settings.show_graticule = !self.settings.show_graticule;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert braille pixel coordinates to a character cell inside the canvas
fn pixel_to_cell(px: i32, py: i32, width: usize, height: usize) -> Option<(u16, u16)> {
    if px < 0 || py < 0 {
        return None;
    }
    let (cx, cy) = ((px / 2) as usize, (py / 4) as usize);
    if cx < width && cy < height {
        Some((cx as u16, cy as u16))
    } else {
        None
    }
}

/// Draw a Mercator linestring shifted by `lon_offset` degrees, with culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport, lon_offset: f64) {
    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon + lon_offset, lat);

        if let Some((prev_x, prev_y)) = prev {
            // Long jumps are antimeridian crossings inside one feature
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }

        prev = Some((px, py));
    }
}

/// Draw a linestring on the globe, subdividing along great circles and
/// breaking the line where it passes behind the sphere
fn draw_globe_linestring(canvas: &mut BrailleCanvas, line: &LineString, globe: &GlobeViewport) {
    let Some(&(start_lon, start_lat)) = line.first() else {
        return;
    };
    let mut prev_geo = (start_lon, start_lat);
    let mut prev_px = globe.project(start_lon, start_lat);

    for &(lon, lat) in &line[1..] {
        walk_great_circle(prev_geo.0, prev_geo.1, lon, lat, |s_lon, s_lat| {
            let cur = globe.project(s_lon, s_lat);
            if let (Some(a), Some(b)) = (prev_px, cur) {
                if globe.line_might_be_visible(a, b) {
                    draw_line(canvas, a.0, a.1, b.0, b.1);
                }
            }
            prev_px = cur;
        });
        prev_geo = (lon, lat);
    }
}

/// Scatter fixed stars over the canvas, skipping the globe disk
fn draw_starfield(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: f64) {
    let w = canvas.pixel_width();
    let h = canvas.pixel_height();
    let count = w * h / 90;
    let clear = (radius + 2.0) * (radius + 2.0);

    for i in 0..count as u64 {
        let x = (rand_unit(hash2(i, 0x5eed)) * w as f64) as i32;
        let y = (rand_unit(hash2(i, 0xbeef)) * h as f64) as i32;
        let (dx, dy) = ((x - cx) as f64, (y - cy) as f64);
        if dx * dx + dy * dy > clear {
            canvas.set_pixel_signed(x, y);
        }
    }
}

/// Meridians and parallels every `step` degrees, sampled at 2 degrees
fn graticule_lines(step: f64) -> Vec<LineString> {
    let mut lines = Vec::new();

    let mut lon = -180.0;
    while lon < 180.0 {
        let mut meridian = Vec::new();
        let mut lat = -80.0;
        while lat <= 80.0 {
            meridian.push((lon, lat));
            lat += 2.0;
        }
        lines.push(meridian);
        lon += step;
    }

    let mut lat = -90.0 + step;
    while lat < 90.0 {
        let mut parallel = Vec::new();
        let mut lon = -180.0;
        while lon <= 180.0 {
            parallel.push((lon, lat));
            lon += 2.0;
        }
        lines.push(parallel);
        lat += step;
    }

    lines
}

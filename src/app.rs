use std::time::Instant;

use log::{debug, info};
use ratatui::layout::Rect;
use serde::Deserialize;

use crate::config::Config;
use crate::facts::FactTicker;
use crate::geo::hemisphere_coords;
use crate::map::{GlobeViewport, IssMarker, Lod, MapRenderer, Viewport};
use crate::series::DeltaBuffer;
use crate::telemetry::{IssSample, PollEvent};

/// Which view fills the main area
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Globe,
    Map,
}

impl ViewMode {
    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Globe => "Globe",
            ViewMode::Map => "Map",
        }
    }

    pub fn other(self) -> Self {
        match self {
            ViewMode::Globe => ViewMode::Map,
            ViewMode::Map => ViewMode::Globe,
        }
    }
}

/// Application state
pub struct App {
    pub mode: ViewMode,
    pub viewport: Viewport,
    pub globe: GlobeViewport,
    pub map_renderer: MapRenderer,
    /// Latest sample; `None` shows the loading state
    pub sample: Option<IssSample>,
    pub deltas: DeltaBuffer,
    pub ticker: FactTicker,
    /// Recenter the view on every new sample
    pub follow: bool,
    pub last_error: Option<String>,
    pub polls_ok: u64,
    pub polls_failed: u64,
    /// Marker popup in the map view
    pub popup_open: bool,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Whether the current press has moved (drag) or not (click)
    drag_moved: bool,
    /// Screen cells occupied by the map or globe
    view_area: Rect,
}

impl App {
    pub fn new(config: &Config, now: Instant) -> Self {
        Self {
            mode: config.view,
            viewport: Viewport::world(2, 4),
            globe: GlobeViewport::fitted(0.0, 0.0, 2, 4),
            map_renderer: MapRenderer::new(),
            sample: None,
            deltas: DeltaBuffer::default(),
            ticker: FactTicker::new(config.fact_interval, now),
            follow: config.follow,
            last_error: None,
            polls_ok: 0,
            polls_failed: 0,
            popup_open: false,
            should_quit: false,
            last_mouse: None,
            drag_moved: false,
            view_area: Rect::new(0, 0, 1, 1),
        }
    }

    /// Track where the UI placed the view; sizes both projections to it.
    /// Braille gives 2x4 pixels per cell.
    pub fn set_view_area(&mut self, area: Rect) {
        if area == self.view_area {
            return;
        }
        self.view_area = area;
        let width = area.width.max(1) as usize * 2;
        let height = area.height.max(1) as usize * 4;
        self.viewport.width = width;
        self.viewport.height = height;
        self.globe.set_size(width, height);
    }

    pub fn view_area(&self) -> Rect {
        self.view_area
    }

    pub fn select_view(&mut self, mode: ViewMode) {
        if self.mode != mode {
            info!("render selected: {}", mode.label());
            self.mode = mode;
            self.popup_open = false;
        }
    }

    pub fn toggle_view(&mut self) {
        self.select_view(self.mode.other());
    }

    /// Fold one poll outcome into the state
    pub fn apply(&mut self, event: PollEvent) {
        match event {
            PollEvent::Sample(sample) => {
                self.polls_ok += 1;
                self.last_error = None;
                if let Some(ts) = sample.timestamp {
                    self.deltas.push(sample.altitude, ts);
                }
                if self.follow {
                    self.viewport.center_on(sample.longitude, sample.latitude);
                    self.globe.look_at(sample.longitude, sample.latitude);
                }
                self.ticker.set_sample(Some(&sample));
                debug!("sample: {:?}", sample);
                self.sample = Some(sample);
            }
            PollEvent::Empty => {
                self.polls_ok += 1;
                self.last_error = None;
                self.clear_sample();
            }
            PollEvent::Failed(message) => {
                self.polls_failed += 1;
                self.last_error = Some(message);
                self.clear_sample();
            }
        }
    }

    fn clear_sample(&mut self) {
        self.sample = None;
        self.popup_open = false;
        self.ticker.set_sample(None);
    }

    /// Time-driven updates; returns true if anything visible changed
    pub fn tick(&mut self, now: Instant) -> bool {
        self.ticker.tick(now)
    }

    /// Marker for the current sample
    pub fn marker(&self) -> Option<IssMarker> {
        self.sample.as_ref().map(|s| IssMarker {
            lon: s.longitude,
            lat: s.latitude,
            altitude_ratio: s.altitude_ratio(),
        })
    }

    /// Pan the map or rotate the globe by braille pixels
    pub fn pan(&mut self, dx: i32, dy: i32) {
        match self.mode {
            ViewMode::Map => self.viewport.pan(dx, dy),
            ViewMode::Globe => self.globe.rotate_drag(dx, dy),
        }
    }

    pub fn zoom_in(&mut self) {
        match self.mode {
            ViewMode::Map => self.viewport.zoom_in(),
            ViewMode::Globe => self.globe.zoom_in(),
        }
    }

    pub fn zoom_out(&mut self) {
        match self.mode {
            ViewMode::Map => self.viewport.zoom_out(),
            ViewMode::Globe => self.globe.zoom_out(),
        }
    }

    /// Zoom in towards a terminal cell
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            match self.mode {
                ViewMode::Map => self.viewport.zoom_in_at(px, py),
                ViewMode::Globe => self.globe.zoom_in_at(px, py),
            }
        }
    }

    /// Zoom out from a terminal cell
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            match self.mode {
                ViewMode::Map => self.viewport.zoom_out_at(px, py),
                ViewMode::Globe => self.globe.zoom_out_at(px, py),
            }
        }
    }

    /// Terminal cell to braille pixel inside the view, `None` outside it
    fn cell_to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.view_area;
        let inside = col >= area.x
            && col < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        inside.then(|| (((col - area.x) as i32) * 2, ((row - area.y) as i32) * 4))
    }

    /// Mouse button pressed
    pub fn begin_drag(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.drag_moved = false;
    }

    /// Mouse moved with the button held
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - col as i32;
            let dy = last_y as i32 - row as i32;
            if dx != 0 || dy != 0 {
                self.drag_moved = true;
                // One cell is 2x4 braille pixels
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((col, row));
    }

    /// Mouse button released; a press without movement is a click
    pub fn end_drag(&mut self, col: u16, row: u16) {
        let was_click = self.last_mouse.is_some() && !self.drag_moved;
        self.last_mouse = None;
        self.drag_moved = false;
        if was_click {
            self.click(col, row);
        }
    }

    /// Click inside the view: toggles the marker popup when it hits the ISS
    pub fn click(&mut self, col: u16, row: u16) {
        if self.mode != ViewMode::Map {
            return;
        }
        let Some((mx, my)) = self.iss_screen_cell() else {
            self.popup_open = false;
            return;
        };
        let hit = (col as i32 - mx as i32).abs() <= 2 && (row as i32 - my as i32).abs() <= 1;
        self.popup_open = hit && !self.popup_open;
    }

    /// Absolute terminal cell of the ISS marker in the map view
    pub fn iss_screen_cell(&self) -> Option<(u16, u16)> {
        let marker = self.marker()?;
        let (px, py) = self.viewport.project_nearest(marker.lon, marker.lat);
        if px < 0 || py < 0 {
            return None;
        }
        let (cx, cy) = ((px / 2) as u16, (py / 4) as u16);
        let area = self.view_area;
        (cx < area.width && cy < area.height).then(|| (area.x + cx, area.y + cy))
    }

    /// Back to the initial framing, centered on the ISS if known
    pub fn reset_view(&mut self) {
        let (lon, lat) = self
            .sample
            .as_ref()
            .map(|s| (s.longitude, s.latitude))
            .unwrap_or((0.0, 0.0));
        self.viewport = Viewport::new(lon, lat.clamp(-85.0, 85.0), 1.0, self.viewport.width, self.viewport.height);
        self.globe = GlobeViewport::fitted(lon, lat, self.globe.width, self.globe.height);
        self.popup_open = false;
    }

    pub fn toggle_follow(&mut self) {
        self.follow = !self.follow;
        if self.follow {
            if let Some(s) = &self.sample {
                self.viewport.center_on(s.longitude, s.latitude);
                self.globe.look_at(s.longitude, s.latitude);
            }
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.effective_zoom())
    }

    fn effective_zoom(&self) -> f64 {
        match self.mode {
            ViewMode::Map => self.viewport.zoom,
            ViewMode::Globe => self.globe.effective_zoom(),
        }
    }

    /// Current view center as a string
    pub fn center_coords(&self) -> String {
        let (lon, lat) = match self.mode {
            ViewMode::Map => (self.viewport.center_lon, self.viewport.center_lat),
            ViewMode::Globe => self.globe.center_lonlat(),
        };
        hemisphere_coords(lon, lat)
    }

    /// Current LOD level as a string
    pub fn lod_level(&self) -> &'static str {
        Lod::from_zoom(self.effective_zoom()).label()
    }
}

use crate::app::{App, ViewMode};
use crate::braille::BrailleCanvas;
use crate::chart::sparkline;
use crate::format;
use crate::map::MapLayers;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

const ISS_ORANGE: Color = Color::Rgb(255, 165, 0);

/// Widest the docked globe stats panel gets
const STATS_WIDTH: u16 = 40;

/// Rows reserved for the sparkline
const CHART_HEIGHT: u16 = 3;

/// Screen regions for one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screen {
    pub bar: Rect,
    pub view: Rect,
    pub stats: Rect,
    pub status: Rect,
}

/// Split the terminal: selection bar on top, status line at the bottom, and
/// the view plus stats panel arranged per mode in between.
pub fn layout(area: Rect, mode: ViewMode) -> Screen {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Selection bar
            Constraint::Min(3),    // View + stats
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let body = match mode {
        ViewMode::Globe => Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(STATS_WIDTH.min(rows[1].width / 2)),
                Constraint::Min(1),
            ])
            .split(rows[1]),
        ViewMode::Map => Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]),
    };

    let (view, stats) = match mode {
        ViewMode::Globe => (body[1], body[0]),
        ViewMode::Map => (body[0], body[1]),
    };

    Screen {
        bar: rows[0],
        view,
        stats,
        status: rows[2],
    }
}

/// Inside of the bordered view block
pub fn view_inner(view: Rect) -> Rect {
    view_block(ViewMode::Globe).inner(view)
}

fn view_block(mode: ViewMode) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Button rectangles of the selection bar
pub fn selection_buttons(bar: Rect) -> [(ViewMode, Rect); 2] {
    let mut x = bar.x + 1;
    [ViewMode::Globe, ViewMode::Map].map(|mode| {
        let width = (mode.label().len() as u16 + 2).min((bar.x + bar.width).saturating_sub(x));
        let rect = Rect::new(x, bar.y, width, bar.height.min(1));
        x = x.saturating_add(width + 1);
        (mode, rect)
    })
}

/// Which button, if any, a click landed on
pub fn selection_hit(bar: Rect, col: u16, row: u16) -> Option<ViewMode> {
    selection_buttons(bar)
        .into_iter()
        .find(|(_, r)| col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height)
        .map(|(mode, _)| mode)
}

/// Render the UI; also records the view area on the app for mouse mapping
pub fn render(frame: &mut Frame, app: &mut App) {
    let screen = layout(frame.area(), app.mode);
    app.set_view_area(view_inner(screen.view));

    render_selection_bar(frame, app, screen.bar);
    render_view(frame, app, screen.view);
    match app.mode {
        ViewMode::Globe => render_tracker_panel(frame, app, screen.stats),
        ViewMode::Map => render_station_panel(frame, app, screen.stats),
    }
    render_status_bar(frame, app, screen.status);
}

fn render_selection_bar(frame: &mut Frame, app: &App, area: Rect) {
    let buf = frame.buffer_mut();
    for (mode, rect) in selection_buttons(area) {
        if rect.is_empty() {
            continue;
        }
        let style = if mode == app.mode {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray).bg(Color::DarkGray)
        };
        buf.set_stringn(rect.x, rect.y, format!(" {} ", mode.label()), rect.width as usize, style);
    }
}

fn render_view(frame: &mut Frame, app: &App, area: Rect) {
    let block = view_block(app.mode);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.sample.is_none() {
        let loading = Paragraph::new(Line::from(Span::styled(
            "Loading",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        let row = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, inner.height.min(1));
        frame.render_widget(loading, row);
        return;
    }

    let (width, height) = (inner.width as usize, inner.height as usize);
    let layers = match app.mode {
        ViewMode::Globe => app.map_renderer.render_globe(width, height, &app.globe, app.marker()),
        ViewMode::Map => app.map_renderer.render_map(width, height, &app.viewport, app.marker()),
    };
    let iss_cell = layers.iss_cell;
    frame.render_widget(MapWidget { layers }, inner);

    if app.mode == ViewMode::Map && app.popup_open {
        if let Some((cx, cy)) = iss_cell {
            render_popup(frame, app, inner, (inner.x + cx, inner.y + cy));
        }
    }
}

/// Draw a braille canvas onto the buffer, skipping blank cells
fn render_canvas(canvas: &BrailleCanvas, style: Style, area: Rect, buf: &mut Buffer) {
    let rows = canvas.height().min(area.height as usize);
    let cols = canvas.width().min(area.width as usize);
    for row in 0..rows {
        for col in 0..cols {
            if let Some(ch) = canvas.glyph(col, row) {
                buf[(area.x + col as u16, area.y + row as u16)]
                    .set_char(ch)
                    .set_style(style);
            }
        }
    }
}

/// Braille map or globe with the ISS label overlaid
struct MapWidget {
    layers: MapLayers,
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front
        render_canvas(&self.layers.stars, Style::default().fg(Color::DarkGray), area, buf);
        render_canvas(&self.layers.graticule, Style::default().fg(Color::DarkGray), area, buf);
        render_canvas(&self.layers.outline, Style::default().fg(Color::Blue), area, buf);
        render_canvas(&self.layers.coastlines, Style::default().fg(Color::Cyan), area, buf);
        render_canvas(&self.layers.borders, Style::default().fg(Color::Yellow), area, buf);
        render_canvas(
            &self.layers.iss,
            Style::default().fg(ISS_ORANGE).add_modifier(Modifier::BOLD),
            area,
            buf,
        );

        if let Some((cx, cy)) = self.layers.iss_cell {
            let x = area.x + cx + 2;
            let y = area.y + cy;
            let right = area.x + area.width;
            if x < right {
                buf.set_stringn(
                    x,
                    y,
                    "ISS",
                    (right - x) as usize,
                    Style::default().fg(ISS_ORANGE).add_modifier(Modifier::BOLD),
                );
            }
        }
    }
}

fn popup_lines(app: &App) -> Vec<Line<'static>> {
    let Some(s) = &app.sample else {
        return Vec::new();
    };
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);
    let row = |name: &'static str, text: String| {
        Line::from(vec![Span::styled(name, label), Span::styled(text, value)])
    };
    vec![
        row("Lat: ", format!("{}°", format::number(Some(s.latitude), 4))),
        row("Lng: ", format!("{}°", format::number(Some(s.longitude), 4))),
        row("Alt: ", format!("{} km", format::number(Some(s.altitude), 1))),
        row("Vel: ", format!("{} km/h", format::number(s.velocity, 1))),
    ]
}

/// Box next to the marker, kept inside the view
fn popup_area(view: Rect, anchor: (u16, u16), width: u16, height: u16) -> Rect {
    let width = width.min(view.width);
    let height = height.min(view.height);
    let max_x = view.x + view.width - width;
    let max_y = view.y + view.height - height;
    let x = (anchor.0 + 2).min(max_x).max(view.x);
    let y = if anchor.1 > view.y + height {
        anchor.1 - height
    } else {
        anchor.1 + 1
    };
    Rect::new(x, y.min(max_y).max(view.y), width, height)
}

fn render_popup(frame: &mut Frame, app: &App, view: Rect, anchor: (u16, u16)) {
    let lines = popup_lines(app);
    let width = lines.iter().map(|l| l.width() as u16).max().unwrap_or(0) + 4;
    let area = popup_area(view, anchor, width, lines.len() as u16 + 2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ISS_ORANGE))
        .title(Span::styled(" ISS ", Style::default().fg(ISS_ORANGE)));
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn stat_line(name: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<17}", name), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

fn position_lines(app: &App) -> Vec<Line<'static>> {
    let s = app.sample.as_ref();
    vec![
        stat_line("Latitude", format!("{}°", format::number(s.map(|s| s.latitude), 4))),
        stat_line("Longitude", format!("{}°", format::number(s.map(|s| s.longitude), 4))),
        stat_line("Altitude", format!("{} km", format::number(s.map(|s| s.altitude), 2))),
        stat_line("Velocity", format!("{} km/h", format::number(s.and_then(|s| s.velocity), 1))),
    ]
}

fn time_lines(app: &App) -> Vec<Line<'static>> {
    let s = app.sample.as_ref();
    let ts = s.and_then(|s| s.timestamp);
    vec![
        stat_line("Timestamp", format::timestamp(ts)),
        stat_line("Local time", format::local_time(ts)),
        stat_line(
            "Fetched at (UTC)",
            s.and_then(|s| s.fetched_at.clone())
                .unwrap_or_else(|| format::MISSING.to_string()),
        ),
    ]
}

/// `Δ Altitude (per sample)` header, sparkline and latest delta
fn render_delta_chart(frame: &mut Frame, app: &App, area: Rect) {
    if area.height == 0 {
        return;
    }
    let header = Line::from(vec![
        Span::styled("Δ Altitude (per sample) ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format::delta_km(app.deltas.latest_delta()),
            Style::default().fg(ISS_ORANGE),
        ),
    ]);
    frame.render_widget(Paragraph::new(header), Rect { height: 1, ..area });

    let chart = Rect {
        y: area.y + 1,
        height: area.height - 1,
        ..area
    };
    let canvas = sparkline(&app.deltas, chart.width as usize, chart.height as usize);
    render_canvas(&canvas, Style::default().fg(ISS_ORANGE), chart, frame.buffer_mut());
}

/// Docked panel beside the globe
fn render_tracker_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " ISS Tracker ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(CHART_HEIGHT + 2),
            Constraint::Min(0),
        ])
        .split(inner);

    frame.render_widget(Paragraph::new(position_lines(app)), rows[0]);
    render_delta_chart(frame, app, Rect { height: rows[1].height.saturating_sub(1), ..rows[1] });
    frame.render_widget(Paragraph::new(time_lines(app)), rows[2]);
}

/// Panel under the map: badge, stats, chart and the facts feed
fn render_station_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " International Space Station ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .title_top(
            Line::from(Span::styled(
                " On Orbit ",
                Style::default().fg(Color::Black).bg(Color::Green),
            ))
            .right_aligned(),
        );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)])
        .split(inner);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let mut left = position_lines(app);
    left.extend(time_lines(app));
    frame.render_widget(Paragraph::new(left), cols[0]);
    render_delta_chart(frame, app, Rect { height: cols[1].height.min(CHART_HEIGHT + 1), ..cols[1] });

    let prompt = Style::default().fg(Color::Green);
    let feed = vec![
        Line::from(Span::styled(
            "/var/log/iss — live feed",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(vec![
            Span::styled("$ ", prompt),
            Span::styled(app.ticker.current().to_string(), Style::default().fg(Color::White)),
            Span::styled(
                if app.ticker.is_paused() { "  [paused]" } else { "" },
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];
    frame.render_widget(Paragraph::new(feed), rows[1]);
}

fn toggle_span(on: bool, on_text: &'static str, off_text: &'static str) -> Span<'static> {
    Span::styled(
        if on { on_text } else { off_text },
        Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
    )
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;

    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", Style::default().fg(Color::DarkGray)),
        Span::styled(app.lod_level(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", Style::default().fg(Color::DarkGray)),
        toggle_span(app.follow, "[F]ollow ", "[f]ollow "),
        toggle_span(settings.show_graticule, "[G]rid ", "[g]rid "),
        toggle_span(settings.show_borders, "[B]order ", "[b]order "),
        toggle_span(app.ticker.is_paused(), "[P]aused ", "[p]ause "),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!(" | polls {}", app.polls_ok),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.polls_failed > 0 {
        spans.push(Span::styled(
            format!(" ({} failed)", app.polls_failed),
            Style::default().fg(Color::Red),
        ));
    }

    match &app.last_error {
        Some(err) => spans.push(Span::styled(format!(" | {}", err), Style::default().fg(Color::Red))),
        None => spans.push(Span::styled(
            " | 1/2/Tab:view hjkl:pan +/-:zoom n:fact r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        )),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

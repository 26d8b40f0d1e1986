use crate::map::{LineString, Lod, MapRenderer};
use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use log::{info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layer {
    Coastline,
    Border,
}

/// Natural Earth files picked up from the data directory
const MAP_FILES: [(&str, Layer, Lod); 5] = [
    ("ne_110m_coastline.json", Layer::Coastline, Lod::Low),
    ("ne_50m_coastline.json", Layer::Coastline, Lod::Medium),
    ("ne_10m_coastline.json", Layer::Coastline, Lod::High),
    ("ne_50m_borders.json", Layer::Border, Lod::Medium),
    ("ne_10m_borders.json", Layer::Border, Lod::High),
];

/// Load the coastline and border files present in `data_dir`, parsing them in
/// parallel. Returns how many files were loaded; unreadable files are logged
/// and skipped.
pub fn load_map_data(renderer: &mut MapRenderer, data_dir: &Path) -> usize {
    let present: Vec<(PathBuf, Layer, Lod)> = MAP_FILES
        .iter()
        .map(|&(name, layer, lod)| (data_dir.join(name), layer, lod))
        .filter(|(path, _, _)| path.exists())
        .collect();

    let parsed: Vec<(Layer, Lod, Vec<LineString>)> = present
        .par_iter()
        .filter_map(|(path, layer, lod)| match read_lines(path) {
            Ok(lines) => {
                info!("loaded {} lines from {}", lines.len(), path.display());
                Some((*layer, *lod, lines))
            }
            Err(e) => {
                warn!("failed to load {}: {:#}", path.display(), e);
                None
            }
        })
        .collect();

    let loaded = parsed.len();
    for (layer, lod, lines) in parsed {
        match layer {
            Layer::Coastline => renderer.add_coastlines(lines, lod),
            Layer::Border => renderer.add_borders(lines, lod),
        }
    }
    loaded
}

/// Load map data, falling back to the built-in outline when no coastline
/// file is available, then build the culling indexes.
pub fn prepare_map(renderer: &mut MapRenderer, data_dir: &Path) {
    if data_dir.is_dir() {
        load_map_data(renderer, data_dir);
    } else {
        info!("no map data directory at {}", data_dir.display());
    }
    if !renderer.has_data() {
        info!("using built-in world outline");
        renderer.add_coastlines(simple_world(), Lod::Low);
    }
    renderer.reindex();
}

/// Read one GeoJSON file into line strings
fn read_lines(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = content.parse().context("parsing GeoJSON")?;
    Ok(collect_lines(&geojson))
}

/// Extract every line (polygon exteriors included) from a GeoJSON document
pub fn collect_lines(geojson: &GeoJson) -> Vec<LineString> {
    let mut lines = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for geometry in fc.features.iter().filter_map(|f| f.geometry.as_ref()) {
                geometry_lines(geometry, &mut lines);
            }
        }
        GeoJson::Feature(f) => {
            if let Some(geometry) = &f.geometry {
                geometry_lines(geometry, &mut lines);
            }
        }
        GeoJson::Geometry(geometry) => geometry_lines(geometry, &mut lines),
    }
    lines
}

fn to_line(coords: &[Vec<f64>]) -> LineString {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

fn geometry_lines(geometry: &Geometry, out: &mut Vec<LineString>) {
    match &geometry.value {
        Value::LineString(coords) => out.push(to_line(coords)),
        Value::MultiLineString(lines) => out.extend(lines.iter().map(|c| to_line(c))),
        Value::Polygon(rings) => out.extend(rings.first().map(|c| to_line(c))),
        Value::MultiPolygon(polygons) => {
            out.extend(polygons.iter().filter_map(|rings| rings.first()).map(|c| to_line(c)))
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                geometry_lines(g, out);
            }
        }
        Value::Point(_) | Value::MultiPoint(_) => {}
    }
}

/// Coarse continent outlines for running without data files
pub fn simple_world() -> Vec<LineString> {
    vec![
        // North America
        vec![
            (-166.0, 68.0), (-162.0, 60.0), (-152.0, 58.0), (-138.0, 59.0),
            (-128.0, 52.0), (-124.0, 46.0), (-122.0, 37.0), (-115.0, 30.0),
            (-105.0, 20.0), (-95.0, 16.0), (-83.0, 9.0), (-78.0, 8.0),
            (-84.0, 15.0), (-88.0, 21.0), (-97.0, 22.0), (-97.0, 27.0),
            (-90.0, 29.5), (-83.0, 29.0), (-80.5, 25.0), (-80.0, 31.0),
            (-76.0, 35.0), (-74.0, 40.5), (-70.0, 42.0), (-66.0, 44.5),
            (-60.0, 46.0), (-56.0, 52.0), (-61.0, 56.0), (-65.0, 60.0),
            (-78.0, 62.0), (-94.0, 59.0), (-92.0, 65.0), (-108.0, 68.0),
            (-125.0, 70.0), (-141.0, 69.5), (-156.0, 71.0), (-166.0, 68.0),
        ],
        // South America
        vec![
            (-77.0, 8.0), (-72.0, 12.0), (-62.0, 10.5), (-52.0, 5.0),
            (-50.0, 0.0), (-44.0, -2.5), (-35.0, -5.0), (-39.0, -14.0),
            (-41.0, -22.0), (-48.0, -26.0), (-53.0, -33.0), (-57.0, -36.0),
            (-62.0, -39.0), (-65.0, -45.0), (-68.0, -52.0), (-70.0, -55.0),
            (-74.0, -50.0), (-73.0, -40.0), (-71.5, -30.0), (-70.0, -18.0),
            (-76.0, -14.0), (-81.0, -5.0), (-80.0, 1.0), (-77.0, 8.0),
        ],
        // Europe and Asia
        vec![
            (-9.5, 37.0), (-6.0, 36.0), (0.0, 39.0), (3.0, 43.0),
            (8.0, 44.0), (12.5, 44.0), (18.5, 40.0), (23.0, 37.0),
            (26.0, 40.5), (29.0, 41.0), (36.0, 36.5), (35.0, 31.0),
            (43.0, 13.0), (52.0, 16.0), (58.0, 22.0), (57.0, 26.0),
            (67.0, 24.5), (73.0, 19.0), (77.0, 8.0), (80.0, 15.0),
            (87.0, 21.5), (92.0, 22.0), (94.0, 17.0), (98.0, 8.0),
            (103.0, 1.5), (105.0, 10.0), (109.0, 12.0), (107.0, 21.0),
            (114.0, 22.5), (121.0, 30.0), (119.0, 37.0), (126.0, 37.5),
            (129.0, 35.0), (131.0, 43.0), (141.0, 52.0), (136.0, 54.0),
            (155.0, 59.0), (163.0, 60.0), (180.0, 66.0), (178.0, 70.0),
            (160.0, 70.0), (140.0, 72.0), (113.0, 74.0), (100.0, 77.5),
            (80.0, 73.0), (68.0, 69.0), (55.0, 68.5), (43.0, 66.0),
            (33.0, 70.0), (20.0, 70.0), (10.0, 64.0), (5.0, 60.0),
            (8.0, 58.0), (12.0, 56.0), (8.0, 54.0), (4.0, 52.0),
            (-1.5, 49.5), (-4.5, 48.0), (-1.5, 46.0), (-2.0, 43.5),
            (-9.0, 43.0), (-9.5, 37.0),
        ],
        // Africa
        vec![
            (-6.0, 36.0), (-10.0, 30.0), (-17.0, 21.0), (-17.0, 14.5),
            (-13.0, 8.0), (-7.5, 4.5), (2.0, 6.0), (9.5, 4.0),
            (9.5, -1.0), (13.0, -9.0), (12.0, -17.0), (15.0, -27.0),
            (18.5, -34.5), (26.0, -34.0), (32.5, -28.5), (35.5, -23.0),
            (35.0, -17.0), (40.5, -11.0), (39.5, -4.0), (43.0, 0.0),
            (51.0, 11.5), (43.5, 12.0), (38.5, 18.0), (34.0, 27.0),
            (32.0, 31.0), (25.0, 32.0), (20.0, 31.0), (11.0, 33.5),
            (10.0, 37.0), (-1.0, 35.5), (-6.0, 36.0),
        ],
        // Australia
        vec![
            (114.0, -22.0), (122.0, -18.0), (130.0, -13.0), (136.5, -12.0),
            (136.0, -15.0), (141.0, -17.0), (142.5, -10.7), (146.0, -19.0),
            (153.0, -25.0), (153.0, -31.0), (150.0, -37.5), (146.0, -39.0),
            (140.0, -37.5), (137.5, -35.0), (131.0, -31.5), (124.0, -33.5),
            (117.0, -35.0), (115.0, -33.5), (113.5, -26.0), (114.0, -22.0),
        ],
        // Greenland
        vec![
            (-73.0, 78.0), (-60.0, 82.0), (-30.0, 83.5), (-20.0, 81.0),
            (-19.0, 72.0), (-22.0, 70.0), (-32.0, 68.0), (-40.0, 65.0),
            (-43.0, 60.0), (-50.0, 63.0), (-54.0, 68.0), (-58.0, 75.5),
            (-73.0, 78.0),
        ],
        // Antarctica
        vec![
            (-180.0, -84.0), (-150.0, -77.0), (-120.0, -73.5), (-90.0, -72.5),
            (-68.0, -67.0), (-58.0, -63.5), (-60.0, -70.0), (-40.0, -78.0),
            (-10.0, -71.0), (20.0, -70.0), (50.0, -67.0), (75.0, -69.0),
            (100.0, -66.0), (130.0, -66.0), (160.0, -70.0), (170.0, -77.0),
            (180.0, -84.0),
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[0, 0], [10, 5], [20, 0]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                 [[[0, 0], [1, 0], [1, 1], [0, 0]], [[0.2, 0.2], [0.4, 0.2], [0.2, 0.2]]],
                 [[[5, 5], [6, 5], [6, 6], [5, 5]]]
             ]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [3, 3]}}
        ]
    }"#;

    #[test]
    fn test_collect_lines_keeps_exteriors() {
        let geojson: GeoJson = SAMPLE.parse().unwrap();
        let lines = collect_lines(&geojson);
        // One line string plus the two polygon exteriors; the hole and the point are skipped
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], vec![(0.0, 0.0), (10.0, 5.0), (20.0, 0.0)]);
        assert_eq!(lines[2][0], (5.0, 5.0));
    }

    #[test]
    fn test_simple_world_is_closed_and_in_range() {
        let world = simple_world();
        assert_eq!(world.len(), 7);
        for line in &world {
            assert!(line.len() >= 4);
            assert!(line
                .iter()
                .all(|&(lon, lat)| (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)));
        }
    }

    #[test]
    fn test_load_map_data_reads_present_files() {
        let dir = std::env::temp_dir().join(format!("iss-tui-data-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ne_110m_coastline.json"), SAMPLE).unwrap();
        fs::write(dir.join("ne_50m_borders.json"), "not json").unwrap();

        let mut renderer = MapRenderer::new();
        let loaded = load_map_data(&mut renderer, &dir);
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(loaded, 1);
        assert!(renderer.has_data());
        assert!(!renderer.has_borders());
    }

    #[test]
    fn test_prepare_map_falls_back() {
        let mut renderer = MapRenderer::new();
        prepare_map(&mut renderer, Path::new("/nonexistent/iss-tui-data"));
        assert!(renderer.has_data());
    }
}

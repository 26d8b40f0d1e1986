use std::collections::HashMap;

/// Spatial index over feature bounding boxes.
/// Each feature is inserted into every cell its bbox overlaps, so queries
/// never miss a feature but may return extras (dropped later by per-segment
/// visibility checks while drawing).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from (min_lon, min_lat, max_lon, max_lat) boxes; the feature index
    /// is the position in the iterator.
    pub fn build(bboxes: impl Iterator<Item = (f64, f64, f64, f64)>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in bboxes.enumerate() {
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Feature indices overlapping the given bounds, sorted and deduplicated
    pub fn query(&self, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Vec<usize> {
        let min_cell = self.to_cell(min_lon, min_lat);
        let max_cell = self.to_cell(max_lon, max_lat);
        let mut results = Vec::new();
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
        results.sort_unstable();
        results.dedup();
        results
    }
}

/// Bounding box of a line, `None` when it has no points
pub fn line_bbox(line: &[(f64, f64)]) -> Option<(f64, f64, f64, f64)> {
    let (&(first_lon, first_lat), rest) = line.split_first()?;
    let bbox = rest.iter().fold(
        (first_lon, first_lat, first_lon, first_lat),
        |(min_lon, min_lat, max_lon, max_lat), &(lon, lat)| {
            (min_lon.min(lon), min_lat.min(lat), max_lon.max(lon), max_lat.max(lat))
        },
    );
    Some(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_finds_overlapping_features() {
        let boxes = vec![
            (-10.0, -10.0, 10.0, 10.0),
            (100.0, 40.0, 120.0, 50.0),
            (-170.0, -80.0, -160.0, -70.0),
        ];
        let grid = FeatureGrid::build(boxes.into_iter(), 10.0);
        assert_eq!(grid.query(0.0, 0.0, 5.0, 5.0), vec![0]);
        assert_eq!(grid.query(-180.0, -90.0, 180.0, 90.0), vec![0, 1, 2]);
        assert!(grid.query(50.0, -50.0, 60.0, -40.0).is_empty());
    }

    #[test]
    fn test_query_is_deduplicated() {
        let grid = FeatureGrid::build(std::iter::once((-45.0, -45.0, 45.0, 45.0)), 10.0);
        assert_eq!(grid.query(-40.0, -40.0, 40.0, 40.0), vec![0]);
    }

    #[test]
    fn test_line_bbox() {
        let line = vec![(1.0, 5.0), (-3.0, 2.0), (4.0, -1.0)];
        assert_eq!(line_bbox(&line), Some((-3.0, -1.0, 4.0, 5.0)));
        assert_eq!(line_bbox(&[]), None);
    }
}

use crate::braille::BrailleCanvas;
use crate::map::{draw_dotted_hline, draw_line};
use crate::series::DeltaBuffer;

/// Braille sparkline of a delta series: a line through present deltas,
/// broken at gaps, over a dotted zero reference when zero is in range.
pub fn sparkline(series: &DeltaBuffer, width: usize, height: usize) -> BrailleCanvas {
    let mut canvas = BrailleCanvas::new(width, height);
    let Some((lo, hi)) = series.domain() else {
        return canvas;
    };

    let pw = canvas.pixel_width() as i32;
    let ph = canvas.pixel_height() as i32;
    if pw == 0 || ph == 0 {
        return canvas;
    }

    let y_of = |v: f64| -> i32 {
        if hi > lo {
            let t = (v - lo) / (hi - lo);
            ((1.0 - t) * (ph - 1) as f64).round() as i32
        } else {
            ph / 2
        }
    };

    if lo <= 0.0 && hi >= 0.0 {
        draw_dotted_hline(&mut canvas, 0, pw - 1, y_of(0.0));
    }

    let n = series.len();
    let x_of = |i: usize| -> i32 {
        if n > 1 {
            ((i as f64 / (n - 1) as f64) * (pw - 1) as f64).round() as i32
        } else {
            0
        }
    };

    let mut prev: Option<(i32, i32)> = None;
    for (i, point) in series.iter().enumerate() {
        match point.delta {
            Some(d) => {
                let cur = (x_of(i), y_of(d));
                match prev {
                    Some((px, py)) => draw_line(&mut canvas, px, py, cur.0, cur.1),
                    None => canvas.set_pixel_signed(cur.0, cur.1),
                }
                prev = Some(cur);
            }
            None => prev = None,
        }
    }

    canvas
}

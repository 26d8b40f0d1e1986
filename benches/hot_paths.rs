use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iss_tui::chart::sparkline;
use iss_tui::data::simple_world;
use iss_tui::map::{GlobeViewport, IssMarker, Lod, MapRenderer, Viewport};
use iss_tui::series::DeltaBuffer;

const COLS: usize = 120;
const ROWS: usize = 40;

fn renderer() -> MapRenderer {
    let mut renderer = MapRenderer::new();
    renderer.add_coastlines(simple_world(), Lod::Low);
    renderer.reindex();
    renderer.settings.show_graticule = true;
    renderer
}

fn marker() -> Option<IssMarker> {
    Some(IssMarker {
        lon: -12.25,
        lat: 51.64,
        altitude_ratio: 420.0 / 6371.0,
    })
}

fn bench_render_globe(c: &mut Criterion) {
    let renderer = renderer();
    let globe = GlobeViewport::fitted(-12.25, 51.64, COLS * 2, ROWS * 4);
    c.bench_function("render_globe", |b| {
        b.iter(|| renderer.render_globe(COLS, ROWS, black_box(&globe), marker()));
    });
}

fn bench_render_map(c: &mut Criterion) {
    let renderer = renderer();
    let viewport = Viewport::new(170.0, 20.0, 1.5, COLS * 2, ROWS * 4);
    c.bench_function("render_map_antimeridian", |b| {
        b.iter(|| renderer.render_map(COLS, ROWS, black_box(&viewport), marker()));
    });
}

fn bench_delta_push(c: &mut Criterion) {
    c.bench_function("delta_push_full_buffer", |b| {
        let mut buffer = DeltaBuffer::default();
        let mut ts = 0.0;
        b.iter(|| {
            ts += 2.0;
            buffer.push(black_box(420.0 + (ts * 0.01).sin()), ts);
        });
    });
}

fn bench_sparkline(c: &mut Criterion) {
    let mut buffer = DeltaBuffer::default();
    for i in 0..200 {
        buffer.push(420.0 + (i as f64 * 0.1).sin() * 0.2, i as f64 * 2.0);
    }
    c.bench_function("sparkline", |b| {
        b.iter(|| sparkline(black_box(&buffer), 34, 3));
    });
}

criterion_group!(
    benches,
    bench_render_globe,
    bench_render_map,
    bench_delta_push,
    bench_sparkline
);
criterion_main!(benches);

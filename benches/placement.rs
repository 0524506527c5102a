use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lesson_canvas::config::PlacementConfig;
use lesson_canvas::geometry::{Rect, Size};
use lesson_canvas::layout::{SizeSource, SizedItem, SnapOptions, plan, snap_move, snap_resize};
use lesson_canvas::{EngineConfig, LayoutDocument, ResizeHandle, Theme, render_svg};
use lesson_canvas::render::RenderOptions;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn cards(count: usize) -> Vec<SizedItem> {
    (0..count)
        .map(|idx| SizedItem {
            id: format!("card-{idx}"),
            size: Size::new(220.0 + (idx % 5) as f32 * 40.0, 160.0 + (idx % 3) as f32 * 60.0),
            source: SizeSource::Estimated,
        })
        .collect()
}

/// A staggered two-column lesson with `count` blocks.
fn siblings(count: usize) -> Vec<Rect> {
    (0..count)
        .map(|idx| {
            let col = (idx % 2) as f32;
            let row = (idx / 2) as f32;
            Rect::new(40.0 + col * 640.0, 40.0 + row * 300.0 + col * 17.0, 600.0, 240.0)
        })
        .collect()
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement");
    let config = PlacementConfig::default();
    for (name, count, container) in [
        ("roomy_8", 8, Size::new(2400.0, 1600.0)),
        ("board_20", 20, Size::new(1600.0, 1000.0)),
        ("crowded_40", 40, Size::new(1280.0, 800.0)),
    ] {
        let items = cards(count);
        group.bench_with_input(BenchmarkId::from_parameter(name), &items, |b, items| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(7);
                let placement = plan(black_box(items), container, &config, &mut rng);
                black_box(placement);
            });
        });
    }
    group.finish();
}

fn bench_snap(c: &mut Criterion) {
    let mut group = c.benchmark_group("snap");
    let options = SnapOptions::default();
    let anchor = Rect::new(0.0, 0.0, 600.0, 240.0);
    for count in [4usize, 32, 128] {
        let siblings = siblings(count);
        group.bench_with_input(BenchmarkId::new("move", count), &siblings, |b, siblings| {
            b.iter(|| {
                let result = snap_move(anchor, black_box(678.0), black_box(1203.0), siblings, &options);
                black_box(result);
            });
        });
        group.bench_with_input(BenchmarkId::new("resize_se", count), &siblings, |b, siblings| {
            b.iter(|| {
                let result = snap_resize(
                    anchor,
                    ResizeHandle::Se,
                    black_box(83.0),
                    black_box(61.0),
                    siblings,
                    &options,
                );
                black_box(result);
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let doc = LayoutDocument::lesson_template(&EngineConfig::default());
    let theme = Theme::builder();
    let options = RenderOptions {
        grid_size: Some(20.0),
        ..RenderOptions::default()
    };
    c.bench_function("render_template", |b| {
        b.iter(|| black_box(render_svg(black_box(&doc), &theme, &options)));
    });
}

criterion_group!(benches, bench_plan, bench_snap, bench_render);
criterion_main!(benches);

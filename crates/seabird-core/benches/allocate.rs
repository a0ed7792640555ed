use criterion::{Criterion, black_box, criterion_group, criterion_main};
use geo::{MultiPolygon, Point, polygon};
use seabird_core::{
    AllocationConfig, Colony, ColonyKey, Grid, GridCell, LandMask, run_allocation,
};

const CELL: f64 = 20_000.0;

/// `n` x `n` grid of 20 km cells with a strip of land along the west edge.
fn setup(n: u32) -> (Grid, LandMask) {
    let mut cells = Vec::new();
    for row in 0..n {
        for col in 0..n {
            let x0 = col as f64 * CELL;
            let y0 = row as f64 * CELL;
            let geometry = MultiPolygon::new(vec![polygon![
                (x: x0, y: y0),
                (x: x0 + CELL, y: y0),
                (x: x0 + CELL, y: y0 + CELL),
                (x: x0, y: y0 + CELL),
            ]]);
            cells.push(GridCell::new(row * n + col, geometry, false, -50.0));
        }
    }
    let extent = n as f64 * CELL;
    let land = LandMask::new(vec![polygon![
        (x: -extent, y: -extent),
        (x: 15_000.0, y: -extent),
        (x: 15_000.0, y: 2.0 * extent),
        (x: -extent, y: 2.0 * extent),
    ]]);
    (Grid::new(cells).unwrap(), land)
}

fn colonies(count: usize, extent: f64) -> Vec<Colony> {
    (0..count)
        .map(|i| {
            let y = extent * (i as f64 + 0.5) / count as f64;
            Colony::new(
                ColonyKey::new("bench", &format!("site-{i}"), "GUIL"),
                if i % 2 == 0 { "auks" } else { "gulls" },
                Point::new(15_000.0, y),
                100.0 + i as f64,
                Some(40.0 + (i % 5) as f64 * 10.0),
            )
        })
        .collect()
}

fn bench_allocation(c: &mut Criterion) {
    let (grid, land) = setup(20);
    let colonies = colonies(50, 20.0 * CELL);

    let mut group = c.benchmark_group("run_allocation");
    group.bench_function("parallel_50x400", |b| {
        b.iter(|| run_allocation(black_box(&colonies), &land, &grid, &AllocationConfig::default()))
    });
    let sequential = AllocationConfig {
        parallel: false,
        ..AllocationConfig::default()
    };
    group.bench_function("sequential_50x400", |b| {
        b.iter(|| run_allocation(black_box(&colonies), &land, &grid, &sequential))
    });
    group.finish();
}

criterion_group!(benches, bench_allocation);
criterion_main!(benches);

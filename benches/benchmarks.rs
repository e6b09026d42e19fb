use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use quadregion::{BlockLayout, ClassMap, MemoryRaster, QuadMesh, cluster, cluster_by_class};

const SIZE: usize = 128;

/// Classes in horizontal bands, broken up by a diagonal stripe.
fn striped_classes(w: usize, h: usize) -> Vec<u32> {
    (0..h)
        .flat_map(|y| (0..w).map(move |x| if x == y { 9 } else { (y / 8) as u32 }))
        .collect()
}

fn striped_raster() -> MemoryRaster {
    MemoryRaster::new(SIZE + 1, SIZE + 1)
        .expect("Cannot create raster")
        .with_layout(BlockLayout::new(32, 32).expect("Invalid layout"))
        .with_classes(striped_classes(SIZE + 1, SIZE + 1))
        .expect("Invalid class band")
}

// Mesh Construction Benchmarks
fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    group.bench_function("procedural_grid", |b| {
        b.iter(|| {
            let mesh = QuadMesh::grid(black_box(SIZE), black_box(SIZE)).expect("Cannot build grid");
            black_box(mesh);
        });
    });

    group.bench_function("streamed_blocks", |b| {
        let raster = striped_raster();
        b.iter(|| {
            let mesh = QuadMesh::from_source(black_box(raster.clone())).expect("Cannot read raster");
            black_box(mesh);
        });
    });

    group.finish();
}

// Clustering Benchmarks
fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering");
    let mesh = QuadMesh::grid(SIZE, SIZE).expect("Cannot build grid");

    group.bench_function("single_cluster", |b| {
        b.iter(|| {
            let report = cluster(black_box(&mesh), |_, _| true).expect("Cannot cluster");
            black_box(report);
        });
    });

    group.bench_function("checkerboard", |b| {
        let parity = |id: usize| (id % SIZE + id / SIZE) % 2;
        b.iter(|| {
            let report = cluster(black_box(&mesh), |a, b| parity(a) == parity(b))
                .expect("Cannot cluster");
            black_box(report);
        });
    });

    let raster = striped_raster();
    let classes: ClassMap<u32> = raster.cell_classes();
    let streamed = QuadMesh::from_source(raster).expect("Cannot read raster");
    group.bench_function("by_class", |b| {
        b.iter(|| {
            let report =
                cluster_by_class(black_box(&streamed), &classes).expect("Cannot cluster");
            black_box(report);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_construction, bench_clustering);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use kinfu_image::Image;
use kinfu_imgproc::{depth::depth_from_raw, pyramid::build_depth_pyramid};

fn bench_pyramid(c: &mut Criterion) {
    let mut group = c.benchmark_group("Depth Pyramid");

    for (width, height) in [(320, 240), (640, 480), (1280, 960)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);
        let image_size = [*width, *height].into();

        let raw = Image::<u16>::from_fn(image_size, |x, y| (500 + (x + y) % 2000) as u16);
        let mut depth = Image::<f32>::from_size_val(image_size, 0.0).unwrap();

        group.bench_with_input(
            BenchmarkId::new("depth_from_raw", &parameter_string),
            &raw,
            |b, raw| {
                b.iter(|| {
                    black_box(depth_from_raw(raw, &mut depth, 1e-3, 0.3, 4.0)).unwrap();
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("build_depth_pyramid", &parameter_string),
            &depth,
            |b, depth| {
                b.iter(|| {
                    black_box(build_depth_pyramid(depth, 3)).unwrap();
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_pyramid);
criterion_main!(benches);

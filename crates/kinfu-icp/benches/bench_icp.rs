use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use kinfu_3d::{synthetic::Scene, PinholeCamera, PointNormalPyramid};
use kinfu_icp::{align, IcpParams};
use kinfu_imgproc::build_depth_pyramid;
use kinfu_lie::{SE3F32, SO3F32};

fn bench_icp(c: &mut Criterion) {
    let mut group = c.benchmark_group("ICP");

    let scene = Scene::new()
        .with_plane(Vec3::new(0.0, 0.0, 1.5), Vec3::NEG_Z)
        .with_plane(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Y)
        .with_plane(Vec3::new(-0.6, 0.0, 0.0), Vec3::X)
        .with_sphere(Vec3::new(0.2, 0.0, 1.2), 0.15);
    let delta = SE3F32::new(
        SO3F32::from_axis_angle(Vec3::Y, 0.02),
        Vec3::new(0.01, 0.0, 0.005),
    );

    for (width, height) in [(160, 120), (320, 240), (640, 480)].iter() {
        let parameter_string = format!("{}x{}", width, height);
        let f = *width as f32 * 0.75;
        let camera = PinholeCamera::new(
            f,
            f,
            *width as f32 / 2.0 - 0.5,
            *height as f32 / 2.0 - 0.5,
            [*width, *height].into(),
        )
        .unwrap();

        let maps = |pose: &SE3F32| {
            let depth = scene.render_depth(&camera, pose);
            let pyramid = build_depth_pyramid(&depth, 3).unwrap();
            PointNormalPyramid::from_depth_pyramid(&pyramid, &camera).unwrap()
        };
        let model = maps(&SE3F32::IDENTITY);
        let current = maps(&delta);
        let params = IcpParams::default();

        group.bench_with_input(
            BenchmarkId::new("align", &parameter_string),
            &(&model, &current),
            |b, (model, current)| {
                b.iter(|| {
                    black_box(align(
                        model,
                        current,
                        &camera,
                        &SE3F32::IDENTITY,
                        &params,
                    ))
                    .unwrap();
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_icp);
criterion_main!(benches);

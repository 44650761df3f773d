use glam::Vec3;
use kinfu::{
    k3d::synthetic::Scene, lie::SE3F32, CameraConfig, FusionConfig, KinectFusion, VolumeConfig,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn config() -> FusionConfig {
    FusionConfig {
        camera: CameraConfig {
            fx: 120.0,
            fy: 120.0,
            cx: 79.5,
            cy: 59.5,
            width: 160,
            height: 120,
        },
        volume: VolumeConfig {
            size: [64, 64, 64],
            origin: [-0.8, -0.8, 0.3],
            voxel_size: [0.025; 3],
            truncation: 0.075,
            ..Default::default()
        },
        warmup_frames: 1,
        ..Default::default()
    }
}

fn room() -> Scene {
    Scene::new()
        .with_plane(Vec3::new(0.0, 0.0, 1.5), Vec3::NEG_Z)
        .with_plane(Vec3::new(0.0, 0.45, 0.0), Vec3::NEG_Y)
        .with_plane(Vec3::new(-0.55, 0.0, 0.0), Vec3::X)
        .with_sphere(Vec3::new(0.2, 0.1, 1.1), 0.15)
}

fn step() -> SE3F32 {
    SE3F32::exp(&[
        0.2f32.to_radians(),
        0.4f32.to_radians(),
        0.1f32.to_radians(),
        0.004,
        -0.002,
        0.005,
    ])
}

#[test]
fn tracks_synthetic_trajectory() -> TestResult {
    let config = config();
    let mut fusion = KinectFusion::new(config.clone())?;
    let camera = *fusion.camera();
    let scene = room();

    let mut gt = SE3F32::IDENTITY;
    for i in 0..10 {
        // static while the model is bootstrapped
        if i > config.warmup_frames {
            gt = gt * step();
        }

        let raw = scene.render_raw_depth(&camera, &gt, config.depth.scale);
        let status = fusion.process_frame(&raw)?;
        assert_eq!(status.tracked(), i > config.warmup_frames);

        if let Some(icp) = &status.icp {
            assert!(!icp.is_degenerate(), "frame {i} degenerate");
        }

        let error = fusion.pose().inverse() * gt;
        assert!(
            error.translation.length() < 0.01,
            "frame {i}: translation error {} m",
            error.translation.length()
        );
        assert!(
            error.angle().to_degrees() < 0.5,
            "frame {i}: rotation error {} deg",
            error.angle().to_degrees()
        );
    }

    assert_eq!(fusion.num_fused(), 10);
    assert!(fusion.volume().observed_voxels() > 0);
    Ok(())
}

#[test]
fn restarts_after_reset() -> TestResult {
    let config = config();
    let mut fusion = KinectFusion::new(config.clone())?;
    let camera = *fusion.camera();
    let depth = room().render_depth(&camera, &SE3F32::IDENTITY);

    for _ in 0..4 {
        fusion.process_depth(&depth)?;
    }
    fusion.reset();

    let status = fusion.process_depth(&depth)?;
    assert_eq!(status.frame, 0);
    assert!(!status.tracked());
    assert_eq!(fusion.num_fused(), 1);
    assert!(fusion.current_points().is_some());
    Ok(())
}

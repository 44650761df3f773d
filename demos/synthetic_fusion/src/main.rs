use argh::FromArgs;
use std::path::PathBuf;

use glam::Vec3;
use kinfu::{k3d::synthetic::Scene, lie::SE3F32, FusionConfig, KinectFusion};

#[derive(FromArgs)]
/// Fuse an analytic room seen along a circular trajectory and report the tracking error.
struct Args {
    /// path to a JSON fusion configuration
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// number of frames to render
    #[argh(option, short = 'n', default = "60")]
    num_frames: usize,

    /// radius of the trajectory in metres
    #[argh(option, default = "0.05")]
    radius: f32,

    /// yaw amplitude of the trajectory in degrees
    #[argh(option, default = "3.0")]
    yaw_deg: f32,
}

fn room() -> Scene {
    Scene::new()
        .with_plane(Vec3::new(0.0, 0.0, 2.2), Vec3::NEG_Z)
        .with_plane(Vec3::new(0.0, 0.6, 0.0), Vec3::NEG_Y)
        .with_plane(Vec3::new(-0.9, 0.0, 0.0), Vec3::X)
        .with_sphere(Vec3::new(0.2, 0.3, 1.4), 0.25)
        .with_sphere(Vec3::new(-0.4, -0.2, 1.8), 0.2)
}

fn ground_truth(frame: usize, warmup: usize, radius: f32, yaw_deg: f32) -> SE3F32 {
    // hold still while the model is bootstrapped
    let t = frame.saturating_sub(warmup + 1) as f32 * 0.1;
    let yaw = yaw_deg.to_radians() * t.sin();
    SE3F32::exp(&[
        0.0,
        yaw,
        0.0,
        radius * (1.0 - t.cos()),
        0.0,
        radius * t.sin(),
    ])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => FusionConfig::from_json_file(path)?,
        None => FusionConfig::default(),
    };
    let warmup = config.warmup_frames;
    let scale = config.depth.scale;

    let mut fusion = KinectFusion::new(config)?;
    let camera = *fusion.camera();
    let scene = room();

    let mut max_translation = 0.0f32;
    let mut max_rotation = 0.0f32;

    for i in 0..args.num_frames {
        let gt = ground_truth(i, warmup, args.radius, args.yaw_deg);
        let raw = scene.render_raw_depth(&camera, &gt, scale);
        let status = fusion.process_frame(&raw)?;

        let error = fusion.pose().inverse() * gt;
        let translation = error.translation.length();
        let rotation = error.angle().to_degrees();
        max_translation = max_translation.max(translation);
        max_rotation = max_rotation.max(rotation);

        if let Some(icp) = status.icp.as_ref().filter(|r| r.is_degenerate()) {
            log::warn!("frame {i}: degenerate alignment {:?}", icp.levels);
        }

        println!(
            "frame {:3}: tracked {:5} fused {:5} error {:.4} m {:.3} deg",
            i,
            status.tracked(),
            status.fused(),
            translation,
            rotation
        );
    }

    println!(
        "fused {} frames, {} observed voxels, max error {:.4} m {:.3} deg",
        fusion.num_fused(),
        fusion.volume().observed_voxels(),
        max_translation,
        max_rotation
    );

    Ok(())
}

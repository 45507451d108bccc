use anyhow::Result;
use nalgebra::{Rotation3, Vector3};

use rust_cubeslam::atlas::map::{ClassIdx, KeyFrameId, LandmarkDimension};
use rust_cubeslam::geometry::{CameraModel, SE3};
use rust_cubeslam::io::landmark_store;
use rust_cubeslam::settings::SlamSettings;
use rust_cubeslam::system::{LandmarkUpdate, MappingSystem};

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading settings from: {}", path);
            SlamSettings::from_yaml_file(&path)?
        }
        None => SlamSettings::default(),
    };
    let output_path = settings.output.output_path("landmarks.yaml");
    let csv_path = settings.output.output_path("landmarks.csv");

    // KITTI-like intrinsics
    let camera = CameraModel::new(718.856, 718.856, 607.1928, 185.2157)?.with_image_size(1241, 376);

    let mut system = MappingSystem::new(settings)?;
    println!("Mapping system running with {} workers", system.num_workers());

    // A few parked cars and one pedestrian in front of the camera
    let car = LandmarkDimension::new(1.5, 4.2, 1.8);
    let detections = [
        (ClassIdx(3), car, Vector3::new(-3.0, 1.0, 12.0), 0.1),
        (ClassIdx(3), car, Vector3::new(3.5, 1.0, 18.0), -0.2),
        (ClassIdx(3), car, Vector3::new(-2.5, 1.0, 25.0), 0.05),
        (ClassIdx(1), LandmarkDimension::new(1.7, 0.6, 0.5), Vector3::new(1.0, 0.8, 8.0), 0.0),
    ];
    let mut landmarks = Vec::with_capacity(detections.len());
    for &(class_idx, dimension, position, yaw) in &detections {
        let pose = SE3::from_parts(Rotation3::from_euler_angles(0.0, yaw, 0.0), position)?;
        landmarks.push((system.create_landmark(class_idx, dimension, pose)?, pose));
    }

    // Refine each landmark as if the camera moved forward over a few keyframes
    for step in 1..=5u64 {
        let tcw = SE3::from_translation(Vector3::new(0.0, 0.0, -(step as f64)))?;
        for (lm, detected) in &landmarks {
            let refined = refined_pose(detected, step)?;
            system.submit(LandmarkUpdate::Pose {
                landmark_id: lm.id(),
                pose: refined,
            })?;

            if let Some(center) = camera.project(&tcw.transform_point(&refined.translation())) {
                system.submit(LandmarkUpdate::Observation {
                    landmark_id: lm.id(),
                    kf_id: KeyFrameId::new(step),
                    center,
                })?;
            }
        }
    }
    system.submit(LandmarkUpdate::Dimension {
        landmark_id: landmarks[0].0.id(),
        dimension: LandmarkDimension::new(1.45, 4.4, 1.75),
    })?;
    system.shutdown();

    let shared = system.shared_state();
    println!(
        "Applied {} updates ({} dropped)",
        shared.num_applied_updates(),
        shared.num_dropped_updates()
    );

    let map = shared.map.read();
    let tcw = SE3::identity();
    let recorded = map.record_projections(KeyFrameId::new(0), &tcw, &camera);
    println!("{} of {} landmarks visible from the origin", recorded, map.num_landmarks());

    for lm in map.landmarks_sorted() {
        let center = lm.center();
        println!(
            "  {} {}: center [{:.2}, {:.2}, {:.2}], volume {:.2} m^3, {} observations",
            lm.id(),
            lm.class_idx(),
            center.x,
            center.y,
            center.z,
            lm.dimension().volume(),
            lm.num_bbox_centers()
        );
    }

    landmark_store::save_yaml(&map, &output_path)?;
    landmark_store::save_csv(&map, &csv_path)?;
    println!("Saved landmarks to {:?} and {:?}", output_path, csv_path);

    Ok(())
}

/// Refinement at a given keyframe step, derived from the detection pose only.
fn refined_pose(detected: &SE3, step: u64) -> Result<SE3> {
    let drift = Vector3::new(0.01 * step as f64, 0.0, 0.0);
    Ok(SE3::from_parts(detected.rotation(), detected.translation() + drift)?)
}

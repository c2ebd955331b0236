use nalgebra::Vector3;

use crate::{
    color,
    transfer_function::{ControlPoint, TransferFunction},
};

// Points are hard coded and strictly increasing
fn build(points: Vec<ControlPoint>) -> TransferFunction {
    let mut tf = TransferFunction::new();
    if tf.set_control_points(points).is_err() {
        log::error!("Premade transfer function rejected");
    }
    tf
}

/// Black and transparent to white and opaque
pub fn grayscale_ramp() -> TransferFunction {
    build(vec![
        ControlPoint::new(0.0, color::mono(0.0, 0.0)),
        ControlPoint::new(1.0, color::mono(1.0, 1.0)),
    ])
}

// Air and soft tissue hidden, bone off-white
pub fn ct_bone() -> TransferFunction {
    build(vec![
        ControlPoint::new(0.0, color::zero()),
        ControlPoint::new(0.45, color::zero()),
        ControlPoint::new(0.55, color::new(0.75, 0.55, 0.45, 0.2)),
        ControlPoint::new(0.7, color::new(0.89, 0.85, 0.79, 0.8)),
        ControlPoint::new(1.0, color::new(1.0, 1.0, 0.95, 1.0)),
    ])
}

// Skin faint, muscle red, bone mostly transparent white
pub fn ct_soft_tissue() -> TransferFunction {
    build(vec![
        ControlPoint::new(0.0, color::zero()),
        ControlPoint::new(0.2, color::zero()),
        ControlPoint::new(0.3, color::new(0.9, 0.7, 0.6, 0.02)),
        ControlPoint::new(0.4, color::new(0.8, 0.25, 0.2, 0.15)),
        ControlPoint::new(0.55, color::new(0.85, 0.35, 0.3, 0.25)),
        ControlPoint::new(0.7, color::new(1.0, 1.0, 1.0, 0.05)),
        ControlPoint::new(1.0, color::new(1.0, 1.0, 1.0, 0.1)),
    ])
}

/// Everything above zero is `rgb` and fully opaque
pub fn opaque(rgb: Vector3<f32>) -> TransferFunction {
    let solid = color::new(rgb.x, rgb.y, rgb.z, 1.0);
    build(vec![
        ControlPoint::new(0.0, color::zero()),
        ControlPoint::new(f32::EPSILON, solid),
        ControlPoint::new(1.0, solid),
    ])
}

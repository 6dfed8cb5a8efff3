// Camera pose and structure framing.
// The framing value is min + (max - min) over light heights, which lands on the
// top light rather than the middle. Existing stored scenes rely on that view.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::types::{CameraSettings, LightPosition};

/// Perspective camera pose as handed to the scene collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: [f64; 3],
    /// Look-at point. Orbit controls rotate around it.
    pub target: [f64; 3],
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl CameraPose {
    /// Camera on the +z axis, `render_scale * distance_factor` units back.
    pub fn new(settings: &CameraSettings, render_scale: f64) -> Self {
        CameraPose {
            position: [0.0, 0.0, render_scale * settings.distance_factor],
            target: [0.0, 0.0, 0.0],
            fov_deg: settings.fov_deg,
            aspect: settings.aspect,
            near: settings.near,
            far: settings.far,
        }
    }

    pub fn eye(&self) -> DVec3 {
        DVec3::from_array(self.position)
    }

    pub fn look_at(&self) -> DVec3 {
        DVec3::from_array(self.target)
    }

    pub fn distance_to_target(&self) -> f64 {
        self.eye().distance(self.look_at())
    }
}

/// Vertical framing for a structure: `min(z) + (max(z) - min(z))`.
///
/// Non-finite heights are ignored. `None` for a structure with no usable
/// heights, in which case the camera is left where it is.
pub fn vertical_framing(lights: &[LightPosition]) -> Option<f64> {
    let (min, max) = lights
        .iter()
        .map(|light| light.z)
        .filter(|z| z.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, z| match acc {
            None => Some((z, z)),
            Some((min, max)) => Some((min.min(z), max.max(z))),
        })?;

    let diff = max - min;
    Some(min + diff)
}

// Data model shared by the parsers, the scheduler, and the render worker.
// Strong typing over strings: newtypes for time, Option for malformed numeric fields.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EngineError;

/// Elapsed time in milliseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
pub struct Millis(f64);

impl Millis {
    pub fn from_millis(ms: f64) -> Self {
        Millis(ms)
    }

    pub fn zero() -> Self {
        Millis(0.0)
    }

    pub fn as_millis(&self) -> f64 {
        self.0
    }
}

impl std::ops::Add for Millis {
    type Output = Millis;

    fn add(self, rhs: Millis) -> Millis {
        Millis(self.0 + rhs.0)
    }
}

impl From<std::time::Duration> for Millis {
    fn from(duration: std::time::Duration) -> Self {
        Millis(duration.as_secs_f64() * 1000.0)
    }
}

/// One light's position. Index in the owning structure is the light's address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightPosition {
    #[serde(deserialize_with = "nullable_f64")]
    pub x: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub y: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub z: f64,
}

impl LightPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        LightPosition { x, y, z }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

// serde_json writes NaN as null; read it back as NaN.
fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Parsed structure file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub filename: String,
    pub lights: Vec<LightPosition>,
}

/// One light's color within a frame. `None` channels came from malformed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightColor {
    pub red: Option<i64>,
    pub green: Option<i64>,
    pub blue: Option<i64>,
    pub hex: String,
}

impl LightColor {
    pub fn new(red: Option<i64>, green: Option<i64>, blue: Option<i64>) -> Self {
        let hex = format!("{}{}{}", hex_digits(red), hex_digits(green), hex_digits(blue));
        LightColor {
            red,
            green,
            blue,
            hex,
        }
    }

    pub fn rgb(red: i64, green: i64, blue: i64) -> Self {
        LightColor::new(Some(red), Some(green), Some(blue))
    }

    /// Normalized color for the renderer. Malformed channels become NaN.
    pub fn to_rgb(&self) -> Rgb {
        Rgb::new(
            normalize_channel(self.red),
            normalize_channel(self.green),
            normalize_channel(self.blue),
        )
    }
}

// Unpadded, lowercase; mirrors Number.prototype.toString(16).
fn hex_digits(channel: Option<i64>) -> String {
    match channel {
        Some(value) if value < 0 => format!("-{:x}", value.unsigned_abs()),
        Some(value) => format!("{:x}", value),
        None => "NaN".to_string(),
    }
}

fn normalize_channel(channel: Option<i64>) -> f32 {
    channel.map(|v| v as f32 / 255.0).unwrap_or(f32::NAN)
}

/// One frame of a color animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrame {
    #[serde(rename = "frameId")]
    pub frame_id: Option<i64>,
    pub lights: Vec<LightColor>,
}

/// Parsed color animation file. Frame order is playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    pub filename: String,
    pub frames: Vec<AnimationFrame>,
}

/// Normalized RGB color (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Rgb { r, g, b }
    }

    pub fn black() -> Self {
        Rgb::default()
    }
}

/// Last known on-screen placement and size of the visible canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportGeometry {
    pub left: f64,
    pub top: f64,
    pub width: u32,
    pub height: u32,
}

impl ViewportGeometry {
    pub fn new(left: f64, top: f64, width: u32, height: u32) -> Self {
        ViewportGeometry {
            left,
            top,
            width,
            height,
        }
    }

    /// Apply a screen-size notification. Missing offsets keep their previous value.
    pub fn apply(&mut self, update: &ScreenSizeUpdate) {
        self.width = update.width;
        self.height = update.height;
        if let Some(left) = update.left {
            self.left = left;
        }
        if let Some(top) = update.top {
            self.top = top;
        }
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    pub fn client_rect(&self) -> ClientRect {
        ClientRect {
            left: self.left,
            top: self.top,
            width: self.width as f64,
            height: self.height as f64,
            right: self.left + self.width as f64,
            bottom: self.top + self.height as f64,
        }
    }
}

impl Default for ViewportGeometry {
    fn default() -> Self {
        ViewportGeometry::new(0.0, 0.0, 300, 150)
    }
}

/// Resize notification sent from the main thread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSizeUpdate {
    pub height: u32,
    pub width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
}

impl ScreenSizeUpdate {
    pub fn new(width: u32, height: u32) -> Self {
        ScreenSizeUpdate {
            height,
            width,
            left: None,
            top: None,
        }
    }

    pub fn with_offset(mut self, left: f64, top: f64) -> Self {
        self.left = Some(left);
        self.top = Some(top);
        self
    }
}

/// `getBoundingClientRect`-shaped rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ClientRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Backing size of the drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        SurfaceSize { width, height }
    }
}

/// An uploaded file: its name and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub contents: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        FileUpload {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// File text, decoded as UTF-8 with replacement characters like `File.text()`.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}

/// Renderer configuration passed from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// World units per structure unit.
    #[serde(default = "default_render_scale")]
    pub render_scale: f64,
    /// Minimum time between animation frame advances.
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: f64,
    /// Sphere radius for each rendered light.
    #[serde(default = "default_light_radius")]
    pub light_radius: f64,
    /// Display refresh period for the native worker's frame clock.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,
    #[serde(default)]
    pub initial_viewport: ViewportGeometry,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub orbit: OrbitSettings,
}

impl RendererConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    pub fn frame_interval(&self) -> Millis {
        Millis::from_millis(self.frame_interval_ms)
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            render_scale: default_render_scale(),
            frame_interval_ms: default_frame_interval(),
            light_radius: default_light_radius(),
            refresh_interval_ms: default_refresh_interval(),
            initial_viewport: ViewportGeometry::default(),
            camera: CameraSettings::default(),
            orbit: OrbitSettings::default(),
        }
    }
}

fn default_render_scale() -> f64 {
    100.0
}

fn default_frame_interval() -> f64 {
    50.0
}

fn default_light_radius() -> f64 {
    2.0
}

fn default_refresh_interval() -> u64 {
    16 // ~60Hz
}

/// Perspective camera settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    #[serde(default = "default_fov")]
    pub fov_deg: f64,
    #[serde(default = "default_aspect")]
    pub aspect: f64,
    #[serde(default = "default_near")]
    pub near: f64,
    #[serde(default = "default_far")]
    pub far: f64,
    /// Initial camera distance, in multiples of `render_scale`.
    #[serde(default = "default_distance_factor")]
    pub distance_factor: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            fov_deg: default_fov(),
            aspect: default_aspect(),
            near: default_near(),
            far: default_far(),
            distance_factor: default_distance_factor(),
        }
    }
}

fn default_fov() -> f64 {
    75.0
}

fn default_aspect() -> f64 {
    2.0
}

fn default_near() -> f64 {
    0.1
}

fn default_far() -> f64 {
    500.0
}

fn default_distance_factor() -> f64 {
    4.0
}

/// Orbit control tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitSettings {
    #[serde(default = "default_one")]
    pub rotate_speed: f64,
    #[serde(default = "default_one")]
    pub zoom_speed: f64,
    #[serde(default = "default_one")]
    pub pan_speed: f64,
    /// Pixels panned per arrow key press.
    #[serde(default = "default_key_pan")]
    pub key_pan_px: f64,
    #[serde(default)]
    pub min_distance: f64,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        OrbitSettings {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            key_pan_px: default_key_pan(),
            min_distance: 0.0,
            max_distance: default_max_distance(),
        }
    }
}

fn default_one() -> f64 {
    1.0
}

fn default_key_pan() -> f64 {
    7.0
}

fn default_max_distance() -> f64 {
    10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_unpadded() {
        let color = LightColor::rgb(255, 0, 10);
        assert_eq!(color.hex, "ff0a");
    }

    #[test]
    fn hex_renders_malformed_channel_as_nan() {
        let color = LightColor::new(Some(1), None, Some(-5));
        assert_eq!(color.hex, "1NaN-5");
        assert!(color.to_rgb().g.is_nan());
    }

    #[test]
    fn screen_size_without_offsets_keeps_previous() {
        let mut geometry = ViewportGeometry::new(10.0, 20.0, 300, 150);
        geometry.apply(&ScreenSizeUpdate::new(800, 600));
        assert_eq!(geometry, ViewportGeometry::new(10.0, 20.0, 800, 600));

        geometry.apply(&ScreenSizeUpdate::new(800, 600).with_offset(0.0, 5.0));
        assert_eq!(geometry.top, 5.0);
    }

    #[test]
    fn nan_position_survives_json() {
        let structure = Structure {
            filename: "tree.csv".to_string(),
            lights: vec![LightPosition::new(f64::NAN, 1.0, 2.0)],
        };
        let json = serde_json::to_string(&structure).unwrap();
        let back: Structure = serde_json::from_str(&json).unwrap();
        assert!(back.lights[0].x.is_nan());
        assert_eq!(back.lights[0].y, 1.0);
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config = RendererConfig::from_json(r#"{"render_scale": 50}"#).unwrap();
        assert_eq!(config.render_scale, 50.0);
        assert_eq!(config.frame_interval_ms, 50.0);
        assert_eq!(config.camera.fov_deg, 75.0);
        assert_eq!(config.initial_viewport.width, 300);
    }
}

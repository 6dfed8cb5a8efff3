// Worker-resident render context: one owned value per render session holding
// the structure, rendered lights, playback state, camera and viewport.
// Touched only by the worker's own command handlers and its tick.

use serde::Serialize;
use tracing::{debug, info};

use crate::camera::{vertical_framing, CameraPose};
use crate::orbit::OrbitControls;
use crate::protocol::InputEventRecord;
use crate::scene::SceneBackend;
use crate::scheduler::{recolor, CountMismatch, PlaybackScheduler};
use crate::surface::SyntheticInputSurface;
use crate::types::{
    Animation, FileUpload, Millis, RendererConfig, Rgb, ScreenSizeUpdate, Structure, SurfaceSize,
    ViewportGeometry,
};

/// What a tick did, for the host and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TickReport {
    pub resized: bool,
    pub advanced_frame: Option<usize>,
    pub camera_moved: bool,
    /// Set when the advanced frame's color count differs from the light count.
    pub count_mismatch: Option<CountMismatch>,
}

/// Coordinates parsing results, playback, input and the scene.
pub struct RenderOrchestrator<S: SceneBackend> {
    config: RendererConfig,
    scene: S,
    structure: Option<Structure>,
    lights: Vec<Rgb>,
    scheduler: PlaybackScheduler,
    surface: SyntheticInputSurface,
    controls: OrbitControls,
    camera: CameraPose,
    initialized: bool,
}

impl<S: SceneBackend> RenderOrchestrator<S> {
    pub fn new(config: RendererConfig, scene: S) -> Self {
        let mut surface = SyntheticInputSurface::new(config.initial_viewport);
        let controls = OrbitControls::attach(&mut surface, config.orbit.clone());
        let camera = CameraPose::new(&config.camera, config.render_scale);
        let scheduler = PlaybackScheduler::new(config.frame_interval());

        RenderOrchestrator {
            config,
            scene,
            structure: None,
            lights: Vec::new(),
            scheduler,
            surface,
            controls,
            camera,
            initialized: false,
        }
    }

    /// Place the camera and key light, then draw the first frame.
    pub fn initialize(&mut self) {
        self.scene.set_camera(&self.camera);
        self.scene.set_key_light(self.camera.position);
        self.scene.render();
        self.initialized = true;
        info!(
            width = self.surface.geometry().width,
            height = self.surface.geometry().height,
            "render worker initialized"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Record the visible canvas's new box. The surface follows on the next tick.
    pub fn update_screen_size(&mut self, update: &ScreenSizeUpdate) {
        let mut geometry = self.surface.geometry();
        geometry.apply(update);
        self.surface.update_geometry(geometry);
        debug!(width = geometry.width, height = geometry.height, "screen size updated");
    }

    /// Replace the structure and everything derived from it.
    pub fn load_structure(&mut self, structure: Structure) {
        self.scheduler.reset();
        self.scene.clear();

        let scale = self.config.render_scale;
        for (index, light) in structure.lights.iter().enumerate() {
            let position = [light.x * scale, light.y * scale, light.z * scale];
            self.scene.add_light(index, position, self.config.light_radius);
            self.scene.set_light_color(index, Rgb::black());
        }
        self.lights = vec![Rgb::black(); structure.lights.len()];

        if let Some(framing) = vertical_framing(&structure.lights) {
            self.camera.position[1] = framing * scale;
            self.scene.set_camera(&self.camera);
        }
        self.scene.set_key_light(self.camera.position);

        info!(
            filename = %structure.filename,
            lights = structure.lights.len(),
            "structure loaded"
        );
        self.structure = Some(structure);
    }

    pub fn load_structure_from_file(&mut self, upload: &FileUpload) -> Structure {
        let structure = Structure::from_upload(upload);
        self.load_structure(structure.clone());
        structure
    }

    /// Start playing `animation` over the current lights.
    pub fn load_animation(&mut self, animation: Animation) {
        info!(
            filename = %animation.filename,
            frames = animation.frames.len(),
            "animation loaded"
        );
        self.scheduler.bind(animation);
    }

    pub fn load_animation_from_file(&mut self, upload: &FileUpload) -> Animation {
        let animation = Animation::from_upload(upload);
        self.load_animation(animation.clone());
        animation
    }

    /// Dispatch a forwarded input record to the surface's listeners.
    pub fn handle_proxy_event(&mut self, record: &InputEventRecord) -> usize {
        self.surface.handle_event(record)
    }

    /// One render-loop step: resize if needed, advance playback, fold camera
    /// input, draw.
    pub fn tick(&mut self, elapsed: Millis) -> TickReport {
        if !self.initialized {
            return TickReport::default();
        }

        let mut report = TickReport {
            resized: self.resize_to_display(),
            ..TickReport::default()
        };

        if let Some(advance) = self.scheduler.tick(elapsed) {
            report.count_mismatch = recolor(advance.frame, &mut self.lights);
            for (index, color) in self.lights.iter().enumerate().take(advance.frame.lights.len()) {
                self.scene.set_light_color(index, *color);
            }
            report.advanced_frame = Some(advance.index);
        }

        if self.controls.update(&mut self.camera) {
            self.scene.set_key_light(self.camera.position);
            report.camera_moved = true;
        }
        if report.resized || report.camera_moved {
            self.scene.set_camera(&self.camera);
        }

        self.scene.render();
        report
    }

    fn resize_to_display(&mut self) -> bool {
        let geometry = self.surface.geometry();
        let wanted = SurfaceSize::new(geometry.width, geometry.height);
        if self.scene.surface_size() == wanted {
            return false;
        }

        self.scene.resize_surface(wanted);
        self.camera.aspect = geometry.aspect();
        debug!(width = wanted.width, height = wanted.height, aspect = self.camera.aspect, "surface resized");
        true
    }

    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    pub fn light_colors(&self) -> &[Rgb] {
        &self.lights
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn viewport(&self) -> ViewportGeometry {
        self.surface.geometry()
    }

    pub fn surface(&self) -> &SyntheticInputSurface {
        &self.surface
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WheelFields;
    use crate::scene::{SceneCommand, SceneCommandBuffer};
    use crate::types::{AnimationFrame, LightColor, LightPosition};

    fn orchestrator(backing: SurfaceSize) -> RenderOrchestrator<SceneCommandBuffer> {
        let mut orchestrator =
            RenderOrchestrator::new(RendererConfig::default(), SceneCommandBuffer::new(backing));
        orchestrator.initialize();
        orchestrator.scene_mut().take_commands();
        orchestrator
    }

    fn structure(zs: &[f64]) -> Structure {
        Structure {
            filename: "tree.csv".to_string(),
            lights: zs.iter().map(|&z| LightPosition::new(0.0, 0.0, z)).collect(),
        }
    }

    fn ms(value: f64) -> Millis {
        Millis::from_millis(value)
    }

    fn count_resizes(commands: &[SceneCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, SceneCommand::ResizeSurface { .. }))
            .count()
    }

    #[test]
    fn resize_applies_exactly_once() {
        let mut orchestrator = orchestrator(SurfaceSize::new(640, 480));
        orchestrator.update_screen_size(&ScreenSizeUpdate::new(800, 600));

        let first = orchestrator.tick(ms(16.0));
        let second = orchestrator.tick(ms(16.0));
        assert!(first.resized);
        assert!(!second.resized);

        let commands = orchestrator.scene_mut().take_commands();
        assert_eq!(count_resizes(&commands), 1);
        assert_eq!(orchestrator.camera().aspect, 800.0 / 600.0);
        assert_eq!(orchestrator.scene().surface_size(), SurfaceSize::new(800, 600));
    }

    #[test]
    fn ticks_before_initialize_do_nothing() {
        let mut orchestrator =
            RenderOrchestrator::new(RendererConfig::default(), SceneCommandBuffer::new(SurfaceSize::new(1, 1)));
        assert_eq!(orchestrator.tick(ms(100.0)), TickReport::default());
        assert!(orchestrator.scene().commands().is_empty());
    }

    #[test]
    fn structure_frames_camera_on_top_light() {
        let mut orchestrator = orchestrator(SurfaceSize::new(300, 150));
        orchestrator.load_structure(structure(&[-1.0, 0.0, 2.0]));

        assert_eq!(orchestrator.camera().position[1], 200.0);
        assert_eq!(orchestrator.light_colors().len(), 3);

        let commands = orchestrator.scene_mut().take_commands();
        assert_eq!(commands[0], SceneCommand::Clear);
        assert!(commands.contains(&SceneCommand::AddLight {
            index: 2,
            position: [0.0, 0.0, 200.0],
            radius: 2.0,
        }));
        assert!(commands.contains(&SceneCommand::SetKeyLight {
            position: orchestrator.camera().position,
        }));
    }

    #[test]
    fn new_structure_stops_playback() {
        let mut orchestrator = orchestrator(SurfaceSize::new(300, 150));
        orchestrator.load_structure(structure(&[0.0]));
        orchestrator.load_animation(Animation {
            filename: "a.csv".to_string(),
            frames: vec![AnimationFrame {
                frame_id: Some(0),
                lights: vec![LightColor::rgb(255, 255, 255)],
            }],
        });
        assert!(orchestrator.scheduler().is_playing());

        orchestrator.load_structure(structure(&[0.0, 1.0]));
        assert!(!orchestrator.scheduler().is_playing());
        assert_eq!(orchestrator.tick(ms(100.0)).advanced_frame, None);
    }

    #[test]
    fn animation_recolors_lights_on_cadence() {
        let mut orchestrator = orchestrator(SurfaceSize::new(300, 150));
        orchestrator.load_structure(structure(&[0.0, 1.0]));
        let upload = FileUpload::new("a.csv", "header\n0,255,0,0,0,255,0\n1,0,0,255,0,0,255\n");
        let animation = orchestrator.load_animation_from_file(&upload);
        assert_eq!(animation.frames.len(), 2);

        assert_eq!(orchestrator.tick(ms(30.0)).advanced_frame, None);
        assert_eq!(orchestrator.tick(ms(30.0)).advanced_frame, Some(0));
        assert_eq!(
            orchestrator.light_colors(),
            &[Rgb::new(1.0, 0.0, 0.0), Rgb::new(0.0, 1.0, 0.0)]
        );

        assert_eq!(orchestrator.tick(ms(51.0)).advanced_frame, Some(1));
        assert_eq!(orchestrator.tick(ms(51.0)).advanced_frame, Some(0));
    }

    #[test]
    fn short_frame_recolors_prefix_only() {
        let mut orchestrator = orchestrator(SurfaceSize::new(300, 150));
        orchestrator.load_structure(structure(&[0.0, 1.0, 2.0]));
        orchestrator.load_animation(Animation {
            filename: "short.csv".to_string(),
            frames: vec![AnimationFrame {
                frame_id: Some(0),
                lights: vec![LightColor::rgb(0, 0, 255)],
            }],
        });
        orchestrator.scene_mut().take_commands();

        let report = orchestrator.tick(ms(60.0));
        assert_eq!(report.advanced_frame, Some(0));
        assert_eq!(
            report.count_mismatch,
            Some(CountMismatch {
                frame_id: Some(0),
                colors: 1,
                lights: 3,
            })
        );
        assert_eq!(orchestrator.tick(ms(10.0)).count_mismatch, None);
        let colored: Vec<usize> = orchestrator
            .scene_mut()
            .take_commands()
            .into_iter()
            .filter_map(|c| match c {
                SceneCommand::SetLightColor { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(colored, vec![0]);
        assert_eq!(orchestrator.light_colors()[2], Rgb::black());
    }

    #[test]
    fn proxied_wheel_moves_camera_on_next_tick() {
        let mut orchestrator = orchestrator(SurfaceSize::new(300, 150));
        let before = orchestrator.camera().distance_to_target();
        let dispatched = orchestrator.handle_proxy_event(&InputEventRecord::Wheel(WheelFields {
            delta_x: 0.0,
            delta_y: -120.0,
        }));
        assert_eq!(dispatched, 1);

        let report = orchestrator.tick(ms(16.0));
        assert!(report.camera_moved);
        assert!(orchestrator.camera().distance_to_target() < before);
    }

    #[test]
    fn structure_from_file_returns_parsed_structure() {
        let mut orchestrator = orchestrator(SurfaceSize::new(300, 150));
        let upload = FileUpload::new("tree.csv", "1,2,3\n4,5,6\n");
        let structure = orchestrator.load_structure_from_file(&upload);
        assert_eq!(structure.lights[0], LightPosition::new(2.0, 3.0, 1.0));
        assert_eq!(orchestrator.structure(), Some(&structure));
    }

    #[test]
    fn screen_size_without_offsets_keeps_position() {
        let mut orchestrator = orchestrator(SurfaceSize::new(300, 150));
        orchestrator.update_screen_size(&ScreenSizeUpdate::new(400, 300).with_offset(10.0, 20.0));
        orchestrator.update_screen_size(&ScreenSizeUpdate::new(500, 400));
        assert_eq!(orchestrator.viewport(), ViewportGeometry::new(10.0, 20.0, 500, 400));
    }
}

// treelight_engine: render control plane for a tree-light visualizer.
// Parsers, playback and the input proxy are plain Rust; `Engine` exposes the
// worker-side render context to JS through a JSON interface.

mod animation;
mod camera;
mod error;
mod logging;
mod orbit;
mod orchestrator;
mod projector;
mod protocol;
mod scene;
mod scheduler;
mod sender;
mod storage;
mod structure;
mod surface;
mod types;

#[cfg(not(target_arch = "wasm32"))]
mod app;
#[cfg(target_arch = "wasm32")]
mod browser;
#[cfg(not(target_arch = "wasm32"))]
mod worker;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use animation::parse_animation;
pub use camera::{vertical_framing, CameraPose};
pub use error::EngineError;
pub use logging::init as init_logging;
pub use orbit::OrbitControls;
pub use orchestrator::{RenderOrchestrator, TickReport};
pub use projector::{
    project_key, project_pointer, project_touch, project_wheel, suppress_context_menu, RawEvent,
    RawKeyEvent, RawPointerEvent, RawTouchEvent, RawWheelEvent, ORBIT_KEY_CODES,
};
pub use protocol::{
    EventCategory, EventKind, InputEventRecord, KeyFields, PointerFields, TouchFields, TouchPoint,
    WheelFields,
};
pub use scene::{SceneBackend, SceneCommand, SceneCommandBuffer};
pub use scheduler::{recolor, CountMismatch, FrameAdvance, PlaybackScheduler, PlaybackState};
pub use sender::{ElementEventSender, ProxyEventSink, PROXIED_EVENTS};
pub use storage::{KeyValueStore, MemoryStore, PersistedState, LAST_STRUCTURE_KEY};
pub use structure::parse_structure;
pub use surface::{ElementSurface, Listener, ListenerId, SyntheticEvent, SyntheticInputSurface};
pub use types::*;

#[cfg(not(target_arch = "wasm32"))]
pub use app::Application;
#[cfg(target_arch = "wasm32")]
pub use browser::{
    read_upload, screen_size_of, AttachedEventSender, CanvasEventProxy, JsFunctionSink,
};
#[cfg(target_arch = "wasm32")]
pub use logging::init_console;
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorageStore;
#[cfg(not(target_arch = "wasm32"))]
pub use worker::{PendingReply, RenderSnapshot, RenderWorker, WorkerClient};

/// Initialize panic hook and console logging for the browser.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(target_arch = "wasm32")]
    logging::init_console("info").ok();
}

/// One tick's output: what happened and the scene commands to apply.
#[derive(Debug, Serialize)]
pub struct FrameOutput {
    pub report: TickReport,
    pub commands: Vec<SceneCommand>,
}

/// Worker-side render context exposed to JavaScript.
/// Each call is one JS↔WASM crossing; scene work comes back batched per tick.
#[wasm_bindgen]
pub struct Engine {
    orchestrator: RenderOrchestrator<SceneCommandBuffer>,
}

fn js_error(err: EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_error(e.into()))
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<Engine, JsValue> {
        let config = RendererConfig::from_json(config_json).map_err(js_error)?;
        let viewport = config.initial_viewport;
        let scene = SceneCommandBuffer::new(SurfaceSize::new(viewport.width, viewport.height));

        Ok(Engine {
            orchestrator: RenderOrchestrator::new(config, scene),
        })
    }

    /// First render. Returns the scene commands as a JSON array.
    pub fn initialize(&mut self) -> Result<String, JsValue> {
        self.orchestrator.initialize();
        to_json(&self.orchestrator.scene_mut().take_commands())
    }

    /// `{height, width, left?, top?}` of the visible canvas.
    pub fn update_screen_size(&mut self, update_json: &str) -> Result<(), JsValue> {
        let update: ScreenSizeUpdate = serde_json::from_str(update_json)
            .map_err(|e| js_error(EngineError::InvalidMessage(e.to_string())))?;
        self.orchestrator.update_screen_size(&update);
        Ok(())
    }

    /// Parse and load a structure file. Returns the parsed structure as JSON.
    pub fn set_structure_from_text(&mut self, filename: &str, text: &str) -> Result<String, JsValue> {
        let upload = FileUpload::new(filename, text);
        let structure = self.orchestrator.load_structure_from_file(&upload);
        to_json(&structure)
    }

    /// Load a previously parsed structure, e.g. the persisted one.
    pub fn set_structure_from_memory(&mut self, structure_json: &str) -> Result<(), JsValue> {
        let structure: Structure = serde_json::from_str(structure_json)
            .map_err(|e| js_error(EngineError::InvalidMessage(e.to_string())))?;
        self.orchestrator.load_structure(structure);
        Ok(())
    }

    /// Parse and start a color animation. Returns the parsed animation as JSON.
    pub fn set_color_animation(&mut self, filename: &str, text: &str) -> Result<String, JsValue> {
        let upload = FileUpload::new(filename, text);
        let animation = self.orchestrator.load_animation_from_file(&upload);
        to_json(&animation)
    }

    pub fn send_proxy_element_event(&mut self, record_json: &str) -> Result<(), JsValue> {
        let record = InputEventRecord::from_json(record_json).map_err(js_error)?;
        self.orchestrator.handle_proxy_event(&record);
        Ok(())
    }

    /// Bounding rect of the synthetic input surface.
    pub fn surface_rect(&self) -> Result<String, JsValue> {
        to_json(&self.orchestrator.viewport().client_rect())
    }

    /// Advance by `elapsed_ms`. Returns `{report, commands}` as JSON.
    pub fn tick(&mut self, elapsed_ms: f64) -> Result<String, JsValue> {
        let report = self.orchestrator.tick(Millis::from_millis(elapsed_ms));
        let commands = self.orchestrator.scene_mut().take_commands();
        to_json(&FrameOutput { report, commands })
    }
}

// Port to the scene-graph collaborator. The orchestrator never draws; it tells
// a backend what the scene holds and asks it to render.

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::CameraPose;
use crate::types::{Rgb, SurfaceSize};

/// Scene graph plus drawing surface, owned by the render worker.
pub trait SceneBackend {
    /// Drop every light sphere. Camera and key light stay.
    fn clear(&mut self);

    /// Add the sphere for light `index`. Indices arrive in order, starting at 0.
    fn add_light(&mut self, index: usize, position: [f64; 3], radius: f64);

    fn set_light_color(&mut self, index: usize, color: Rgb);

    fn set_key_light(&mut self, position: [f64; 3]);

    fn set_camera(&mut self, pose: &CameraPose);

    /// Current backing size of the drawing surface.
    fn surface_size(&self) -> SurfaceSize;

    fn resize_surface(&mut self, size: SurfaceSize);

    fn render(&mut self);

    /// Called by the render worker once a frame has been produced. Backends
    /// that queue work hand it off here.
    fn end_frame(&mut self) {}
}

/// A scene mutation, as handed to a host that owns the real renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SceneCommand {
    Clear,
    AddLight {
        index: usize,
        position: [f64; 3],
        radius: f64,
    },
    SetLightColor {
        index: usize,
        color: Rgb,
    },
    SetKeyLight {
        position: [f64; 3],
    },
    SetCamera {
        pose: CameraPose,
    },
    ResizeSurface {
        size: SurfaceSize,
    },
    Render,
}

/// Backend that records commands instead of drawing.
///
/// The wasm `Engine` drains it once per tick and hands the batch to JS, one
/// crossing per frame. On the native worker `end_frame` sends each batch to
/// the frame sink, or discards it when there is none.
#[derive(Debug, Clone, Default)]
pub struct SceneCommandBuffer {
    size: SurfaceSize,
    commands: Vec<SceneCommand>,
    frame_sink: Option<Sender<Vec<SceneCommand>>>,
}

impl SceneCommandBuffer {
    pub fn new(size: SurfaceSize) -> Self {
        SceneCommandBuffer {
            size,
            commands: Vec::new(),
            frame_sink: None,
        }
    }

    /// Buffer whose per-frame batches go to `sink`.
    pub fn with_frame_sink(size: SurfaceSize, sink: Sender<Vec<SceneCommand>>) -> Self {
        SceneCommandBuffer {
            frame_sink: Some(sink),
            ..SceneCommandBuffer::new(size)
        }
    }

    pub fn commands(&self) -> &[SceneCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl SceneBackend for SceneCommandBuffer {
    fn clear(&mut self) {
        self.commands.push(SceneCommand::Clear);
    }

    fn add_light(&mut self, index: usize, position: [f64; 3], radius: f64) {
        self.commands.push(SceneCommand::AddLight {
            index,
            position,
            radius,
        });
    }

    fn set_light_color(&mut self, index: usize, color: Rgb) {
        self.commands.push(SceneCommand::SetLightColor { index, color });
    }

    fn set_key_light(&mut self, position: [f64; 3]) {
        self.commands.push(SceneCommand::SetKeyLight { position });
    }

    fn set_camera(&mut self, pose: &CameraPose) {
        self.commands.push(SceneCommand::SetCamera { pose: *pose });
    }

    fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    fn resize_surface(&mut self, size: SurfaceSize) {
        self.size = size;
        self.commands.push(SceneCommand::ResizeSurface { size });
    }

    fn render(&mut self) {
        self.commands.push(SceneCommand::Render);
    }

    fn end_frame(&mut self) {
        if self.commands.is_empty() {
            return;
        }
        let batch = self.take_commands();
        if let Some(sink) = &self.frame_sink {
            if sink.send(batch).is_err() {
                debug!("frame batch dropped, sink closed");
                self.frame_sink = None;
            }
        }
    }
}

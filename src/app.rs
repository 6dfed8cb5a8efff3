// Main-thread side of a native host: owns the worker and the persisted slot,
// restores the last structure on start and writes new ones through.

use tracing::{info, warn};

use crate::error::EngineError;
use crate::sender::ElementEventSender;
use crate::storage::{KeyValueStore, PersistedState};
use crate::types::{Animation, FileUpload, ScreenSizeUpdate, Structure};
use crate::worker::{RenderWorker, WorkerClient};

pub struct Application<K: KeyValueStore> {
    worker: RenderWorker,
    client: WorkerClient,
    state: PersistedState<K>,
}

impl<K: KeyValueStore> Application<K> {
    pub fn new(worker: RenderWorker, store: K) -> Self {
        let client = worker.client();
        Application {
            worker,
            client,
            state: PersistedState::new(store),
        }
    }

    /// Initialize the worker, then hand it the persisted structure if any.
    /// Returns the restored structure.
    pub fn start(&mut self) -> Result<Option<Structure>, EngineError> {
        self.client.initialize().wait()?;

        let restored = self.state.load_structure();
        if let Some(structure) = &restored {
            info!(filename = %structure.filename, lights = structure.lights.len(), "restoring last structure");
            self.client.set_structure_from_memory(structure.clone());
        }
        Ok(restored)
    }

    /// Parse and load a structure file on the worker. On success the result
    /// replaces the persisted slot.
    pub fn load_structure_file(&mut self, upload: FileUpload) -> Result<Structure, EngineError> {
        let structure = self.client.set_structure_from_file(upload).wait()?;
        if let Err(e) = self.state.save_structure(&structure) {
            warn!(error = %e, "structure loaded but not persisted");
        }
        Ok(structure)
    }

    pub fn load_animation_file(&self, upload: FileUpload) -> Result<Animation, EngineError> {
        self.client.set_color_animation(upload).wait()
    }

    /// Forward the visible canvas's new box to the worker.
    pub fn handle_resize(&self, update: ScreenSizeUpdate) {
        self.client.update_screen_size(update);
    }

    pub fn event_sender(&self) -> ElementEventSender<WorkerClient> {
        ElementEventSender::new(self.client.clone())
    }

    pub fn client(&self) -> &WorkerClient {
        &self.client
    }

    pub fn state(&self) -> &PersistedState<K> {
        &self.state
    }

    pub fn worker(&self) -> &RenderWorker {
        &self.worker
    }
}

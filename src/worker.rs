// Native render worker: one thread owns the render context, fed by a single
// ordered command queue and a fixed-rate frame clock.
// Request/response calls carry a one-shot reply channel; everything else is
// fire-and-forget. No cancellation, no timeouts: a caller waits until the
// worker replies or goes away.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender, TryRecvError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::camera::CameraPose;
use crate::error::EngineError;
use crate::orchestrator::RenderOrchestrator;
use crate::protocol::InputEventRecord;
use crate::scene::SceneBackend;
use crate::sender::ProxyEventSink;
use crate::types::{
    Animation, FileUpload, Millis, RendererConfig, ScreenSizeUpdate, Structure, ViewportGeometry,
};

enum WorkerCommand {
    Initialize {
        reply: Sender<()>,
    },
    UpdateScreenSize(ScreenSizeUpdate),
    SetStructureFromFile {
        upload: FileUpload,
        reply: Sender<Structure>,
    },
    SetStructureFromMemory(Structure),
    SetColorAnimation {
        upload: FileUpload,
        reply: Sender<Animation>,
    },
    ProxyEvent(InputEventRecord),
    Snapshot {
        reply: Sender<RenderSnapshot>,
    },
    Shutdown,
}

/// Point-in-time view of the worker's render context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub initialized: bool,
    pub light_count: usize,
    pub playing: bool,
    pub next_frame: Option<usize>,
    pub viewport: ViewportGeometry,
    pub camera: CameraPose,
}

impl RenderSnapshot {
    fn of<S: SceneBackend>(orchestrator: &RenderOrchestrator<S>) -> Self {
        RenderSnapshot {
            initialized: orchestrator.is_initialized(),
            light_count: orchestrator.light_colors().len(),
            playing: orchestrator.scheduler().is_playing(),
            next_frame: orchestrator.scheduler().next_frame_index(),
            viewport: orchestrator.viewport(),
            camera: *orchestrator.camera(),
        }
    }
}

/// Result of a request/response call, not yet delivered.
#[must_use = "a pending reply does nothing unless waited on"]
pub struct PendingReply<T> {
    rx: Receiver<T>,
}

impl<T> PendingReply<T> {
    /// Block until the worker replies.
    pub fn wait(self) -> Result<T, EngineError> {
        self.rx
            .recv()
            .map_err(|_| EngineError::Transport("render worker dropped the request".to_string()))
    }
}

/// Calling side of the worker. Cheap to clone; every clone feeds the same queue.
#[derive(Clone)]
pub struct WorkerClient {
    tx: Sender<WorkerCommand>,
}

impl WorkerClient {
    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> WorkerCommand) -> PendingReply<T> {
        let (reply, rx) = bounded(1);
        // On failure the command, and the reply sender with it, is dropped,
        // so `wait` reports the transport error.
        if self.tx.send(command(reply)).is_err() {
            debug!("request not delivered, render worker gone");
        }
        PendingReply { rx }
    }

    fn post(&self, command: WorkerCommand) {
        if self.tx.send(command).is_err() {
            debug!("message dropped, render worker gone");
        }
    }

    pub fn initialize(&self) -> PendingReply<()> {
        self.request(|reply| WorkerCommand::Initialize { reply })
    }

    pub fn update_screen_size(&self, update: ScreenSizeUpdate) {
        self.post(WorkerCommand::UpdateScreenSize(update));
    }

    pub fn set_structure_from_file(&self, upload: FileUpload) -> PendingReply<Structure> {
        self.request(|reply| WorkerCommand::SetStructureFromFile { upload, reply })
    }

    pub fn set_structure_from_memory(&self, structure: Structure) {
        self.post(WorkerCommand::SetStructureFromMemory(structure));
    }

    pub fn set_color_animation(&self, upload: FileUpload) -> PendingReply<Animation> {
        self.request(|reply| WorkerCommand::SetColorAnimation { upload, reply })
    }

    pub fn snapshot(&self) -> PendingReply<RenderSnapshot> {
        self.request(|reply| WorkerCommand::Snapshot { reply })
    }
}

impl ProxyEventSink for WorkerClient {
    fn send_proxy_element_event(&self, record: InputEventRecord) {
        self.post(WorkerCommand::ProxyEvent(record));
    }
}

/// Owns the worker thread. Dropping it stops the thread.
pub struct RenderWorker {
    client: WorkerClient,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Start the worker. `make_scene` runs on the worker thread, so the scene
    /// backend itself never has to be `Send`.
    pub fn spawn<S, F>(config: RendererConfig, make_scene: F) -> Result<Self, EngineError>
    where
        S: SceneBackend + 'static,
        F: FnOnce() -> S + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let refresh = Duration::from_millis(config.refresh_interval_ms.max(1));

        let handle = thread::Builder::new()
            .name("render-worker".to_string())
            .spawn(move || {
                let orchestrator = RenderOrchestrator::new(config, make_scene());
                run(orchestrator, rx, refresh);
            })
            .map_err(|e| EngineError::Transport(format!("failed to spawn render worker: {}", e)))?;

        info!(refresh_ms = refresh.as_millis() as u64, "render worker started");
        Ok(RenderWorker {
            client: WorkerClient { tx },
            handle: Some(handle),
        })
    }

    pub fn client(&self) -> WorkerClient {
        self.client.clone()
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.client.post(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("render worker panicked");
            }
        }
    }
}

fn run<S: SceneBackend>(
    mut orchestrator: RenderOrchestrator<S>,
    commands: Receiver<WorkerCommand>,
    refresh: Duration,
) {
    let frames = tick(refresh);
    let mut last_frame = Instant::now();

    loop {
        let running = select! {
            recv(commands) -> command => match command {
                Ok(command) => dispatch(&mut orchestrator, command),
                Err(_) => false,
            },
            recv(frames) -> now => {
                // Apply everything queued before this frame, geometry included.
                let mut running = true;
                while running {
                    match commands.try_recv() {
                        Ok(command) => running = dispatch(&mut orchestrator, command),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => running = false,
                    }
                }

                if running {
                    let now = now.unwrap_or_else(|_| Instant::now());
                    let elapsed = now.saturating_duration_since(last_frame);
                    last_frame = now;
                    orchestrator.tick(Millis::from(elapsed));
                    orchestrator.scene_mut().end_frame();
                }
                running
            }
        };
        if !running {
            break;
        }
    }
    info!("render worker stopped");
}

/// Returns false when the worker should stop.
fn dispatch<S: SceneBackend>(orchestrator: &mut RenderOrchestrator<S>, command: WorkerCommand) -> bool {
    match command {
        WorkerCommand::Initialize { reply } => {
            orchestrator.initialize();
            let _ = reply.send(());
        }
        WorkerCommand::UpdateScreenSize(update) => orchestrator.update_screen_size(&update),
        WorkerCommand::SetStructureFromFile { upload, reply } => {
            let structure = orchestrator.load_structure_from_file(&upload);
            let _ = reply.send(structure);
        }
        WorkerCommand::SetStructureFromMemory(structure) => orchestrator.load_structure(structure),
        WorkerCommand::SetColorAnimation { upload, reply } => {
            let animation = orchestrator.load_animation_from_file(&upload);
            let _ = reply.send(animation);
        }
        WorkerCommand::ProxyEvent(record) => {
            orchestrator.handle_proxy_event(&record);
        }
        WorkerCommand::Snapshot { reply } => {
            let _ = reply.send(RenderSnapshot::of(orchestrator));
        }
        WorkerCommand::Shutdown => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::scene::{SceneCommand, SceneCommandBuffer};
    use crate::types::{Rgb, SurfaceSize};

    fn spawn() -> RenderWorker {
        let config = RendererConfig {
            refresh_interval_ms: 2,
            ..RendererConfig::default()
        };
        RenderWorker::spawn(config, || SceneCommandBuffer::new(SurfaceSize::new(300, 150))).unwrap()
    }

    #[test]
    fn requests_are_answered_in_order() {
        let worker = spawn();
        let client = worker.client();

        client.initialize().wait().unwrap();
        client.update_screen_size(ScreenSizeUpdate::new(800, 600));
        let structure = client
            .set_structure_from_file(FileUpload::new("tree.csv", "0,0,0\n1,1,1\n2,2,2\n"))
            .wait()
            .unwrap();
        assert_eq!(structure.lights.len(), 3);

        let snapshot = client.snapshot().wait().unwrap();
        assert!(snapshot.initialized);
        assert_eq!(snapshot.light_count, 3);
        assert_eq!(snapshot.viewport.width, 800);
    }

    /// Records the largest backlog seen at each draw.
    struct BacklogGauge {
        inner: SceneCommandBuffer,
        peak: Arc<AtomicUsize>,
    }

    impl SceneBackend for BacklogGauge {
        fn clear(&mut self) {
            self.inner.clear();
        }
        fn add_light(&mut self, index: usize, position: [f64; 3], radius: f64) {
            self.inner.add_light(index, position, radius);
        }
        fn set_light_color(&mut self, index: usize, color: Rgb) {
            self.inner.set_light_color(index, color);
        }
        fn set_key_light(&mut self, position: [f64; 3]) {
            self.inner.set_key_light(position);
        }
        fn set_camera(&mut self, pose: &CameraPose) {
            self.inner.set_camera(pose);
        }
        fn surface_size(&self) -> SurfaceSize {
            self.inner.surface_size()
        }
        fn resize_surface(&mut self, size: SurfaceSize) {
            self.inner.resize_surface(size);
        }
        fn render(&mut self) {
            self.inner.render();
            self.peak.fetch_max(self.inner.commands().len(), Ordering::SeqCst);
        }
        fn end_frame(&mut self) {
            self.inner.end_frame();
        }
    }

    #[test]
    fn scene_backlog_stays_bounded_while_playing() {
        let peak = Arc::new(AtomicUsize::new(0));
        let gauge_peak = Arc::clone(&peak);
        let config = RendererConfig {
            refresh_interval_ms: 1,
            frame_interval_ms: 1.0,
            ..RendererConfig::default()
        };
        let worker = RenderWorker::spawn(config, move || BacklogGauge {
            inner: SceneCommandBuffer::new(SurfaceSize::new(300, 150)),
            peak: gauge_peak,
        })
        .unwrap();
        let client = worker.client();

        client.initialize().wait().unwrap();
        client
            .set_structure_from_file(FileUpload::new("tree.csv", "0,0,0\n1,1,1\n"))
            .wait()
            .unwrap();
        client
            .set_color_animation(FileUpload::new("a.csv", "h\n0,255,0,0,0,255,0\n1,0,0,255,255,0,0\n"))
            .wait()
            .unwrap();
        thread::sleep(Duration::from_millis(300));
        assert!(client.snapshot().wait().unwrap().playing);

        // One frame's worth of commands, plus whatever loads landed before it.
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak > 0);
        assert!(peak < 32, "scene backlog grew to {}", peak);
    }

    #[test]
    fn frame_batches_reach_the_sink() {
        let (frames_tx, frames_rx) = unbounded();
        let config = RendererConfig {
            refresh_interval_ms: 2,
            ..RendererConfig::default()
        };
        let worker = RenderWorker::spawn(config, move || {
            SceneCommandBuffer::with_frame_sink(SurfaceSize::new(300, 150), frames_tx)
        })
        .unwrap();
        let client = worker.client();
        client.initialize().wait().unwrap();

        let batch = frames_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(batch.last(), Some(&SceneCommand::Render));
        let next = frames_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(next.last(), Some(&SceneCommand::Render));
    }

    #[test]
    fn dropped_worker_rejects_requests() {
        let worker = spawn();
        let client = worker.client();
        drop(worker);

        let err = client.initialize().wait().unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
        // Fire-and-forget calls are silently dropped.
        client.update_screen_size(ScreenSizeUpdate::new(1, 1));
    }
}

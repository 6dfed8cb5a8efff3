// End-to-end through the native worker: main-thread calls cross one ordered
// queue, the worker owns the render context.
#![cfg(not(target_arch = "wasm32"))]

use std::thread;
use std::time::{Duration, Instant};

use treelight_engine::{
    Application, EngineError, FileUpload, MemoryStore, RenderSnapshot, RenderWorker, RendererConfig,
    SceneCommandBuffer, ScreenSizeUpdate, SurfaceSize, WorkerClient, LAST_STRUCTURE_KEY,
};
use treelight_engine::{KeyValueStore, RawEvent, RawWheelEvent};

fn spawn() -> RenderWorker {
    let config = RendererConfig {
        refresh_interval_ms: 2,
        ..RendererConfig::default()
    };
    RenderWorker::spawn(config, || SceneCommandBuffer::new(SurfaceSize::new(640, 480))).unwrap()
}

fn wait_for(client: &WorkerClient, done: impl Fn(&RenderSnapshot) -> bool) -> RenderSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = client.snapshot().wait().unwrap();
        if done(&snapshot) || Instant::now() > deadline {
            return snapshot;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

struct Wheel(f64);

impl RawEvent for Wheel {
    fn event_type(&self) -> String {
        "wheel".to_string()
    }

    fn prevent_default(&self) {}
}

impl RawWheelEvent for Wheel {
    fn delta_x(&self) -> f64 {
        0.0
    }

    fn delta_y(&self) -> f64 {
        self.0
    }
}

#[test]
fn animation_plays_on_the_worker_clock() {
    let worker = spawn();
    let client = worker.client();
    client.initialize().wait().unwrap();

    client
        .set_structure_from_file(FileUpload::new("tree.csv", "0,0,0\n1,0,0\n"))
        .wait()
        .unwrap();
    let animation = client
        .set_color_animation(FileUpload::new(
            "a.csv",
            "header\n0,255,0,0,255,0,0\n1,0,255,0,0,255,0\n2,0,0,255,0,0,255\n",
        ))
        .wait()
        .unwrap();
    assert_eq!(animation.frames.len(), 3);

    let snapshot = wait_for(&client, |s| s.next_frame != Some(0));
    assert!(snapshot.playing);
    assert_ne!(snapshot.next_frame, Some(0));
}

#[test]
fn geometry_and_input_reach_the_worker() {
    let mut app = Application::new(spawn(), MemoryStore::new());
    app.start().unwrap();

    app.handle_resize(ScreenSizeUpdate::new(800, 600).with_offset(4.0, 8.0));
    let before = app.client().snapshot().wait().unwrap();
    assert_eq!(before.viewport.width, 800);
    assert_eq!(before.viewport.left, 4.0);

    let sender = app.event_sender();
    assert!(sender.on_wheel(&Wheel(-100.0)));

    let after = wait_for(app.client(), |s| s.camera.position != before.camera.position);
    assert_ne!(after.camera.position, before.camera.position);
    assert_eq!(after.camera.aspect, 800.0 / 600.0);
}

#[test]
fn restart_restores_the_last_structure() {
    let mut first = Application::new(spawn(), MemoryStore::new());
    first.start().unwrap();
    first
        .load_structure_file(FileUpload::new("tree.csv", "1,2,3\n4,5,6\n7,8,9\n"))
        .unwrap();
    let store = first.state().store().clone();
    drop(first);

    assert!(store.get(LAST_STRUCTURE_KEY).unwrap().is_some());

    let mut second = Application::new(spawn(), store);
    let restored = second.start().unwrap().unwrap();
    assert_eq!(restored.filename, "tree.csv");
    assert_eq!(second.client().snapshot().wait().unwrap().light_count, 3);
}

#[test]
fn calls_after_shutdown_fail_with_transport_error() {
    let worker = spawn();
    let client = worker.client();
    drop(worker);

    let err = client
        .set_structure_from_file(FileUpload::new("tree.csv", "0,0,0\n"))
        .wait()
        .unwrap_err();
    assert!(matches!(err, EngineError::Transport(_)));
}

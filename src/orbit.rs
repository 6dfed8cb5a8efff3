// Orbit/pan/zoom camera controls driven by proxied input.
// Listeners only accumulate deltas; `update` folds them into the camera once
// per tick, so input arriving between frames is never lost or applied twice.

use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use glam::DVec3;

use crate::camera::CameraPose;
use crate::protocol::{EventKind, InputEventRecord};
use crate::surface::{ElementSurface, ListenerId, SyntheticEvent};
use crate::types::OrbitSettings;

const POLE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Idle,
    Rotate,
    Pan,
    Dolly,
    TouchRotate,
    TouchDolly,
}

struct OrbitInput {
    settings: OrbitSettings,
    gesture: Gesture,
    last_point: [f64; 2],
    last_touch_distance: f64,
    rotate_left: f64,
    rotate_up: f64,
    pan_px: [f64; 2],
    pan_height: f64,
    dolly: f64,
}

impl OrbitInput {
    fn new(settings: OrbitSettings) -> Self {
        OrbitInput {
            settings,
            gesture: Gesture::Idle,
            last_point: [0.0, 0.0],
            last_touch_distance: 0.0,
            rotate_left: 0.0,
            rotate_up: 0.0,
            pan_px: [0.0, 0.0],
            pan_height: 1.0,
            dolly: 1.0,
        }
    }

    fn has_pending(&self) -> bool {
        self.rotate_left != 0.0
            || self.rotate_up != 0.0
            || self.pan_px != [0.0, 0.0]
            || self.dolly != 1.0
    }

    fn clear_pending(&mut self) {
        self.rotate_left = 0.0;
        self.rotate_up = 0.0;
        self.pan_px = [0.0, 0.0];
        self.dolly = 1.0;
    }

    fn zoom_scale(&self) -> f64 {
        0.95f64.powf(self.settings.zoom_speed)
    }

    fn rotate_by(&mut self, dx: f64, dy: f64, height: f64) {
        let height = height.max(1.0);
        self.rotate_left += 2.0 * PI * dx / height * self.settings.rotate_speed;
        self.rotate_up += 2.0 * PI * dy / height * self.settings.rotate_speed;
    }

    fn pan_by(&mut self, dx: f64, dy: f64, height: f64) {
        self.pan_px[0] += dx * self.settings.pan_speed;
        self.pan_px[1] += dy * self.settings.pan_speed;
        self.pan_height = height.max(1.0);
    }

    fn on_pointer_down(&mut self, event: &SyntheticEvent<'_>) {
        let Some(fields) = event.record().pointer_fields() else {
            return;
        };
        let modified = fields.ctrl_key || fields.meta_key || fields.shift_key;
        self.gesture = match fields.button {
            0 if modified => Gesture::Pan,
            0 => Gesture::Rotate,
            1 => Gesture::Dolly,
            2 => Gesture::Pan,
            _ => Gesture::Idle,
        };
        self.last_point = [fields.client_x, fields.client_y];
    }

    fn on_pointer_move(&mut self, event: &SyntheticEvent<'_>) {
        let Some(fields) = event.record().pointer_fields() else {
            return;
        };
        let point = [fields.client_x, fields.client_y];
        let [dx, dy] = [point[0] - self.last_point[0], point[1] - self.last_point[1]];
        let height = event.current_target().height;
        let zoom = self.zoom_scale();

        match self.gesture {
            Gesture::Rotate => self.rotate_by(dx, dy, height),
            Gesture::Pan => self.pan_by(dx, dy, height),
            Gesture::Dolly if dy > 0.0 => self.dolly /= zoom,
            Gesture::Dolly if dy < 0.0 => self.dolly *= zoom,
            _ => {}
        }
        self.last_point = point;
    }

    fn on_pointer_up(&mut self, _event: &SyntheticEvent<'_>) {
        self.gesture = Gesture::Idle;
    }

    fn on_wheel(&mut self, event: &SyntheticEvent<'_>) {
        let InputEventRecord::Wheel(fields) = event.record() else {
            return;
        };
        event.prevent_default();
        let zoom = self.zoom_scale();
        if fields.delta_y < 0.0 {
            self.dolly *= zoom;
        } else if fields.delta_y > 0.0 {
            self.dolly /= zoom;
        }
    }

    fn on_key_down(&mut self, event: &SyntheticEvent<'_>) {
        let InputEventRecord::KeyDown(fields) = event.record() else {
            return;
        };
        let step = self.settings.key_pan_px;
        let height = event.current_target().height;
        match fields.key_code {
            37 => self.pan_by(step, 0.0, height),
            38 => self.pan_by(0.0, step, height),
            39 => self.pan_by(-step, 0.0, height),
            40 => self.pan_by(0.0, -step, height),
            _ => return,
        }
        event.prevent_default();
    }

    fn on_touch_start(&mut self, event: &SyntheticEvent<'_>) {
        let Some(fields) = event.record().touch_fields() else {
            return;
        };
        event.prevent_default();
        match fields.touches.as_slice() {
            [touch] => {
                self.gesture = Gesture::TouchRotate;
                self.last_point = [touch.page_x, touch.page_y];
            }
            [a, b, ..] => {
                self.gesture = Gesture::TouchDolly;
                self.last_touch_distance = (a.page_x - b.page_x).hypot(a.page_y - b.page_y);
            }
            [] => self.gesture = Gesture::Idle,
        }
    }

    fn on_touch_move(&mut self, event: &SyntheticEvent<'_>) {
        let Some(fields) = event.record().touch_fields() else {
            return;
        };
        event.prevent_default();
        match (self.gesture, fields.touches.as_slice()) {
            (Gesture::TouchRotate, [touch, ..]) => {
                let point = [touch.page_x, touch.page_y];
                let height = event.current_target().height;
                self.rotate_by(
                    point[0] - self.last_point[0],
                    point[1] - self.last_point[1],
                    height,
                );
                self.last_point = point;
            }
            (Gesture::TouchDolly, [a, b, ..]) => {
                let distance = (a.page_x - b.page_x).hypot(a.page_y - b.page_y);
                if self.last_touch_distance > 0.0 && distance > 0.0 {
                    let spread = distance / self.last_touch_distance;
                    self.dolly /= spread.powf(self.settings.zoom_speed);
                }
                self.last_touch_distance = distance;
            }
            _ => {}
        }
    }

    fn on_touch_end(&mut self, _event: &SyntheticEvent<'_>) {
        self.gesture = Gesture::Idle;
    }
}

/// Orbit controls bound to an element surface.
pub struct OrbitControls {
    input: Rc<RefCell<OrbitInput>>,
    listeners: Vec<ListenerId>,
}

type Handler = fn(&mut OrbitInput, &SyntheticEvent<'_>);

impl OrbitControls {
    /// Register listeners on `surface`.
    pub fn attach(surface: &mut impl ElementSurface, settings: OrbitSettings) -> Self {
        let input = Rc::new(RefCell::new(OrbitInput::new(settings)));

        let handlers: [(EventKind, Handler); 8] = [
            (EventKind::PointerDown, OrbitInput::on_pointer_down),
            (EventKind::PointerMove, OrbitInput::on_pointer_move),
            (EventKind::PointerUp, OrbitInput::on_pointer_up),
            (EventKind::Wheel, OrbitInput::on_wheel),
            (EventKind::KeyDown, OrbitInput::on_key_down),
            (EventKind::TouchStart, OrbitInput::on_touch_start),
            (EventKind::TouchMove, OrbitInput::on_touch_move),
            (EventKind::TouchEnd, OrbitInput::on_touch_end),
        ];

        let listeners = handlers
            .into_iter()
            .map(|(kind, handler)| {
                let input = Rc::clone(&input);
                surface.add_event_listener(
                    kind,
                    Box::new(move |event: &SyntheticEvent<'_>| {
                        handler(&mut input.borrow_mut(), event)
                    }),
                )
            })
            .collect();

        OrbitControls { input, listeners }
    }

    /// Remove every listener this instance registered.
    pub fn detach(&mut self, surface: &mut impl ElementSurface) {
        for id in self.listeners.drain(..) {
            surface.remove_event_listener(id);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.input.borrow().gesture != Gesture::Idle
    }

    /// Fold pending input into `camera`. Returns whether the pose changed.
    pub fn update(&self, camera: &mut CameraPose) -> bool {
        let mut input = self.input.borrow_mut();
        if !input.has_pending() {
            return false;
        }

        let offset = camera.eye() - camera.look_at();
        let radius = offset.length();
        let (mut theta, mut phi) = if radius > POLE_EPSILON {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI / 2.0)
        };

        let mut target = camera.look_at();
        if input.pan_px != [0.0, 0.0] {
            let (right, up) = screen_axes(camera);
            let target_distance = radius * (camera.fov_deg.to_radians() / 2.0).tan();
            let left = 2.0 * input.pan_px[0] * target_distance / input.pan_height;
            let upward = 2.0 * input.pan_px[1] * target_distance / input.pan_height;
            target += right * -left + up * upward;
        }

        theta -= input.rotate_left;
        phi = (phi - input.rotate_up).clamp(POLE_EPSILON, PI - POLE_EPSILON);
        let radius = (radius * input.dolly)
            .max(input.settings.min_distance)
            .min(input.settings.max_distance);

        let offset = DVec3::new(
            phi.sin() * theta.sin(),
            phi.cos(),
            phi.sin() * theta.cos(),
        ) * radius;
        camera.target = target.to_array();
        camera.position = (target + offset).to_array();

        input.clear_pending();
        true
    }
}

// Camera right and up vectors in world space, world up = +y.
fn screen_axes(camera: &CameraPose) -> (DVec3, DVec3) {
    let forward = (camera.look_at() - camera.eye()).normalize_or_zero();
    let right = forward.cross(DVec3::Y).normalize_or_zero();
    let up = right.cross(forward);
    (right, up)
}

// Event property projection: copy a fixed allow-list of fields off a raw input
// event into a serializable record. Pure; the only side effect allowed is
// suppressing the event's default action where noted.

use crate::protocol::{
    EventCategory, EventKind, InputEventRecord, KeyFields, PointerFields, TouchFields, TouchPoint,
    WheelFields,
};

/// Key codes forwarded to the camera controls: left, up, right, down.
pub const ORBIT_KEY_CODES: [u32; 4] = [37, 38, 39, 40];

/// Minimal surface of a raw DOM event.
pub trait RawEvent {
    /// DOM `type` string, e.g. `"pointermove"`.
    fn event_type(&self) -> String;
    fn prevent_default(&self);
}

pub trait RawPointerEvent: RawEvent {
    fn ctrl_key(&self) -> bool;
    fn meta_key(&self) -> bool;
    fn shift_key(&self) -> bool;
    fn button(&self) -> i16;
    fn pointer_type(&self) -> Option<String>;
    fn client_x(&self) -> f64;
    fn client_y(&self) -> f64;
    fn page_x(&self) -> f64;
    fn page_y(&self) -> f64;
}

pub trait RawWheelEvent: RawEvent {
    fn delta_x(&self) -> f64;
    fn delta_y(&self) -> f64;
}

pub trait RawKeyEvent: RawEvent {
    fn ctrl_key(&self) -> bool;
    fn meta_key(&self) -> bool;
    fn shift_key(&self) -> bool;
    fn key_code(&self) -> u32;
}

pub trait RawTouchEvent: RawEvent {
    /// Active touch list, in DOM order.
    fn touches(&self) -> Vec<TouchPoint>;
}

fn kind_in(event: &impl RawEvent, category: EventCategory) -> Option<EventKind> {
    EventKind::from_type(&event.event_type()).filter(|kind| kind.category() == category)
}

/// Project a pointer or mouse event.
pub fn project_pointer(event: &impl RawPointerEvent) -> Option<InputEventRecord> {
    let kind = kind_in(event, EventCategory::Pointer)?;
    InputEventRecord::pointer(
        kind,
        PointerFields {
            ctrl_key: event.ctrl_key(),
            meta_key: event.meta_key(),
            shift_key: event.shift_key(),
            button: event.button(),
            pointer_type: event.pointer_type(),
            client_x: event.client_x(),
            client_y: event.client_y(),
            page_x: event.page_x(),
            page_y: event.page_y(),
        },
    )
}

/// Project a wheel event. The page must not scroll, so the default action is
/// suppressed before anything else.
pub fn project_wheel(event: &impl RawWheelEvent) -> Option<InputEventRecord> {
    event.prevent_default();
    kind_in(event, EventCategory::Wheel)?;
    Some(InputEventRecord::Wheel(WheelFields {
        delta_x: event.delta_x(),
        delta_y: event.delta_y(),
    }))
}

/// Project a keydown. Only arrow keys are forwarded; everything else is
/// dropped without touching the event.
pub fn project_key(event: &impl RawKeyEvent) -> Option<InputEventRecord> {
    kind_in(event, EventCategory::Key)?;
    let key_code = event.key_code();
    if !ORBIT_KEY_CODES.contains(&key_code) {
        return None;
    }

    event.prevent_default();
    Some(InputEventRecord::KeyDown(KeyFields {
        ctrl_key: event.ctrl_key(),
        meta_key: event.meta_key(),
        shift_key: event.shift_key(),
        key_code,
    }))
}

/// Project a touch event, reducing each active touch to its page position.
pub fn project_touch(event: &impl RawTouchEvent) -> Option<InputEventRecord> {
    let kind = kind_in(event, EventCategory::Touch)?;
    InputEventRecord::touch(
        kind,
        TouchFields {
            touches: event.touches(),
        },
    )
}

/// Context menu events are never forwarded; the browser menu is suppressed.
pub fn suppress_context_menu(event: &impl RawEvent) {
    event.prevent_default();
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::Cell;

    use super::*;

    /// Raw event stand-in carrying every field any category reads, plus
    /// extras that must never leak into a record.
    #[allow(dead_code)]
    #[derive(Default)]
    pub struct FakeEvent {
        pub event_type: String,
        pub ctrl_key: bool,
        pub meta_key: bool,
        pub shift_key: bool,
        pub alt_key: bool,
        pub button: i16,
        pub buttons: u16,
        pub pointer_type: Option<String>,
        pub client_x: f64,
        pub client_y: f64,
        pub page_x: f64,
        pub page_y: f64,
        pub screen_x: f64,
        pub delta_x: f64,
        pub delta_y: f64,
        pub key_code: u32,
        pub touches: Vec<TouchPoint>,
        pub prevented: Cell<u32>,
    }

    impl FakeEvent {
        pub fn of(event_type: &str) -> Self {
            FakeEvent {
                event_type: event_type.to_string(),
                ..Default::default()
            }
        }

        pub fn pointer(event_type: &str, button: i16, client_x: f64, client_y: f64) -> Self {
            FakeEvent {
                button,
                pointer_type: Some("mouse".to_string()),
                client_x,
                client_y,
                page_x: client_x,
                page_y: client_y,
                ..FakeEvent::of(event_type)
            }
        }
    }

    impl RawEvent for FakeEvent {
        fn event_type(&self) -> String {
            self.event_type.clone()
        }

        fn prevent_default(&self) {
            self.prevented.set(self.prevented.get() + 1);
        }
    }

    impl RawPointerEvent for FakeEvent {
        fn ctrl_key(&self) -> bool {
            self.ctrl_key
        }
        fn meta_key(&self) -> bool {
            self.meta_key
        }
        fn shift_key(&self) -> bool {
            self.shift_key
        }
        fn button(&self) -> i16 {
            self.button
        }
        fn pointer_type(&self) -> Option<String> {
            self.pointer_type.clone()
        }
        fn client_x(&self) -> f64 {
            self.client_x
        }
        fn client_y(&self) -> f64 {
            self.client_y
        }
        fn page_x(&self) -> f64 {
            self.page_x
        }
        fn page_y(&self) -> f64 {
            self.page_y
        }
    }

    impl RawWheelEvent for FakeEvent {
        fn delta_x(&self) -> f64 {
            self.delta_x
        }
        fn delta_y(&self) -> f64 {
            self.delta_y
        }
    }

    impl RawKeyEvent for FakeEvent {
        fn ctrl_key(&self) -> bool {
            self.ctrl_key
        }
        fn meta_key(&self) -> bool {
            self.meta_key
        }
        fn shift_key(&self) -> bool {
            self.shift_key
        }
        fn key_code(&self) -> u32 {
            self.key_code
        }
    }

    impl RawTouchEvent for FakeEvent {
        fn touches(&self) -> Vec<TouchPoint> {
            self.touches.clone()
        }
    }
}

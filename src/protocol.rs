// Wire shapes for input forwarded from the main thread to the render worker.
// A record is a flat JSON object tagged with the DOM event's `type` string.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// DOM event types the main thread listens for on the visible canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    ContextMenu,
    MouseDown,
    MouseMove,
    MouseUp,
    PointerDown,
    PointerMove,
    PointerUp,
    TouchStart,
    TouchMove,
    TouchEnd,
    Wheel,
    KeyDown,
}

/// How an event kind is projected before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Pointer,
    Wheel,
    Key,
    Touch,
    ContextMenu,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::ContextMenu,
        EventKind::MouseDown,
        EventKind::MouseMove,
        EventKind::MouseUp,
        EventKind::PointerDown,
        EventKind::PointerMove,
        EventKind::PointerUp,
        EventKind::TouchStart,
        EventKind::TouchMove,
        EventKind::TouchEnd,
        EventKind::Wheel,
        EventKind::KeyDown,
    ];

    /// DOM event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ContextMenu => "contextmenu",
            EventKind::MouseDown => "mousedown",
            EventKind::MouseMove => "mousemove",
            EventKind::MouseUp => "mouseup",
            EventKind::PointerDown => "pointerdown",
            EventKind::PointerMove => "pointermove",
            EventKind::PointerUp => "pointerup",
            EventKind::TouchStart => "touchstart",
            EventKind::TouchMove => "touchmove",
            EventKind::TouchEnd => "touchend",
            EventKind::Wheel => "wheel",
            EventKind::KeyDown => "keydown",
        }
    }

    pub fn from_type(event_type: &str) -> Option<EventKind> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == event_type)
    }

    pub fn category(&self) -> EventCategory {
        match self {
            EventKind::ContextMenu => EventCategory::ContextMenu,
            EventKind::MouseDown
            | EventKind::MouseMove
            | EventKind::MouseUp
            | EventKind::PointerDown
            | EventKind::PointerMove
            | EventKind::PointerUp => EventCategory::Pointer,
            EventKind::TouchStart | EventKind::TouchMove | EventKind::TouchEnd => {
                EventCategory::Touch
            }
            EventKind::Wheel => EventCategory::Wheel,
            EventKind::KeyDown => EventCategory::Key,
        }
    }
}

/// Pointer and mouse fields, copied verbatim from the raw event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerFields {
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    pub button: i16,
    /// Absent on plain mouse events.
    pub pointer_type: Option<String>,
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelFields {
    pub delta_x: f64,
    pub delta_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFields {
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    pub key_code: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchPoint {
    pub page_x: f64,
    pub page_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TouchFields {
    pub touches: Vec<TouchPoint>,
}

/// A projected input event as it crosses the thread boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputEventRecord {
    MouseDown(PointerFields),
    MouseMove(PointerFields),
    MouseUp(PointerFields),
    PointerDown(PointerFields),
    PointerMove(PointerFields),
    PointerUp(PointerFields),
    TouchStart(TouchFields),
    TouchMove(TouchFields),
    TouchEnd(TouchFields),
    Wheel(WheelFields),
    KeyDown(KeyFields),
}

impl InputEventRecord {
    /// Tag pointer fields with a pointer/mouse kind.
    pub fn pointer(kind: EventKind, fields: PointerFields) -> Option<Self> {
        Some(match kind {
            EventKind::MouseDown => InputEventRecord::MouseDown(fields),
            EventKind::MouseMove => InputEventRecord::MouseMove(fields),
            EventKind::MouseUp => InputEventRecord::MouseUp(fields),
            EventKind::PointerDown => InputEventRecord::PointerDown(fields),
            EventKind::PointerMove => InputEventRecord::PointerMove(fields),
            EventKind::PointerUp => InputEventRecord::PointerUp(fields),
            _ => return None,
        })
    }

    /// Tag touch fields with a touch kind.
    pub fn touch(kind: EventKind, fields: TouchFields) -> Option<Self> {
        Some(match kind {
            EventKind::TouchStart => InputEventRecord::TouchStart(fields),
            EventKind::TouchMove => InputEventRecord::TouchMove(fields),
            EventKind::TouchEnd => InputEventRecord::TouchEnd(fields),
            _ => return None,
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            InputEventRecord::MouseDown(_) => EventKind::MouseDown,
            InputEventRecord::MouseMove(_) => EventKind::MouseMove,
            InputEventRecord::MouseUp(_) => EventKind::MouseUp,
            InputEventRecord::PointerDown(_) => EventKind::PointerDown,
            InputEventRecord::PointerMove(_) => EventKind::PointerMove,
            InputEventRecord::PointerUp(_) => EventKind::PointerUp,
            InputEventRecord::TouchStart(_) => EventKind::TouchStart,
            InputEventRecord::TouchMove(_) => EventKind::TouchMove,
            InputEventRecord::TouchEnd(_) => EventKind::TouchEnd,
            InputEventRecord::Wheel(_) => EventKind::Wheel,
            InputEventRecord::KeyDown(_) => EventKind::KeyDown,
        }
    }

    pub fn pointer_fields(&self) -> Option<&PointerFields> {
        match self {
            InputEventRecord::MouseDown(fields)
            | InputEventRecord::MouseMove(fields)
            | InputEventRecord::MouseUp(fields)
            | InputEventRecord::PointerDown(fields)
            | InputEventRecord::PointerMove(fields)
            | InputEventRecord::PointerUp(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn touch_fields(&self) -> Option<&TouchFields> {
        match self {
            InputEventRecord::TouchStart(fields)
            | InputEventRecord::TouchMove(fields)
            | InputEventRecord::TouchEnd(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidMessage(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}

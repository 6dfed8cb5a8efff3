// Browser bindings for the main-thread half: raw DOM events behind the
// projector's capability traits, listener attachment on the visible canvas,
// file reading and localStorage persistence.

use std::rc::Rc;

use js_sys::{Function, Uint8Array};
use tracing::debug;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Element, Event, File, KeyboardEvent, MouseEvent, PointerEvent, TouchEvent, WheelEvent};

use crate::error::EngineError;
use crate::projector::{RawEvent, RawKeyEvent, RawPointerEvent, RawTouchEvent, RawWheelEvent};
use crate::protocol::{EventCategory, EventKind, InputEventRecord, TouchPoint};
use crate::sender::{ElementEventSender, ProxyEventSink, PROXIED_EVENTS};
use crate::storage::{LocalStorageStore, PersistedState};
use crate::types::{FileUpload, ScreenSizeUpdate, Structure};

fn js_error(err: JsValue) -> EngineError {
    EngineError::Transport(format!("{:?}", err))
}

macro_rules! impl_raw_event {
    ($($ty:ty),*) => {
        $(
            impl RawEvent for $ty {
                fn event_type(&self) -> String {
                    Event::type_(self)
                }

                fn prevent_default(&self) {
                    Event::prevent_default(self)
                }
            }
        )*
    };
}

impl_raw_event!(Event, MouseEvent, WheelEvent, KeyboardEvent, TouchEvent);

impl RawPointerEvent for MouseEvent {
    fn ctrl_key(&self) -> bool {
        MouseEvent::ctrl_key(self)
    }
    fn meta_key(&self) -> bool {
        MouseEvent::meta_key(self)
    }
    fn shift_key(&self) -> bool {
        MouseEvent::shift_key(self)
    }
    fn button(&self) -> i16 {
        MouseEvent::button(self)
    }
    fn pointer_type(&self) -> Option<String> {
        self.dyn_ref::<PointerEvent>().map(PointerEvent::pointer_type)
    }
    fn client_x(&self) -> f64 {
        MouseEvent::client_x(self) as f64
    }
    fn client_y(&self) -> f64 {
        MouseEvent::client_y(self) as f64
    }
    fn page_x(&self) -> f64 {
        MouseEvent::page_x(self) as f64
    }
    fn page_y(&self) -> f64 {
        MouseEvent::page_y(self) as f64
    }
}

impl RawWheelEvent for WheelEvent {
    fn delta_x(&self) -> f64 {
        WheelEvent::delta_x(self)
    }
    fn delta_y(&self) -> f64 {
        WheelEvent::delta_y(self)
    }
}

impl RawKeyEvent for KeyboardEvent {
    fn ctrl_key(&self) -> bool {
        KeyboardEvent::ctrl_key(self)
    }
    fn meta_key(&self) -> bool {
        KeyboardEvent::meta_key(self)
    }
    fn shift_key(&self) -> bool {
        KeyboardEvent::shift_key(self)
    }
    fn key_code(&self) -> u32 {
        KeyboardEvent::key_code(self)
    }
}

impl RawTouchEvent for TouchEvent {
    fn touches(&self) -> Vec<TouchPoint> {
        let list = TouchEvent::touches(self);
        (0..list.length())
            .filter_map(|i| list.get(i))
            .map(|touch| TouchPoint {
                page_x: touch.page_x() as f64,
                page_y: touch.page_y() as f64,
            })
            .collect()
    }
}

/// Forwards records to a JS function as JSON strings, e.g. a worker proxy's
/// `sendProxyElementEvent`.
pub struct JsFunctionSink {
    callback: Function,
}

impl JsFunctionSink {
    pub fn new(callback: Function) -> Self {
        JsFunctionSink { callback }
    }
}

impl ProxyEventSink for JsFunctionSink {
    fn send_proxy_element_event(&self, record: InputEventRecord) {
        let json = match record.to_json() {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "proxy event not serialized");
                return;
            }
        };
        if let Err(e) = self.callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            debug!(error = ?e, "proxy event callback threw");
        }
    }
}

type DomListener = Closure<dyn FnMut(Event)>;

/// One native listener per proxied event type on an element. Listeners are
/// removed when this is dropped.
pub struct AttachedEventSender {
    element: Element,
    listeners: Vec<(EventKind, DomListener)>,
}

impl AttachedEventSender {
    pub fn attach<K: ProxyEventSink + 'static>(
        element: &Element,
        sender: ElementEventSender<K>,
    ) -> Result<Self, EngineError> {
        let sender = Rc::new(sender);
        // Listeners registered before a failure are removed when this drops.
        let mut attached = AttachedEventSender {
            element: element.clone(),
            listeners: Vec::with_capacity(PROXIED_EVENTS.len()),
        };

        for kind in PROXIED_EVENTS {
            let sender = Rc::clone(&sender);
            let listener: DomListener = Closure::wrap(Box::new(move |event: Event| {
                forward(&sender, kind, &event);
            }) as Box<dyn FnMut(Event)>);

            element
                .add_event_listener_with_callback(kind.as_str(), listener.as_ref().unchecked_ref())
                .map_err(js_error)?;
            attached.listeners.push((kind, listener));
        }

        debug!(listeners = attached.listeners.len(), "canvas event proxy attached");
        Ok(attached)
    }
}

fn forward<K: ProxyEventSink>(sender: &ElementEventSender<K>, kind: EventKind, event: &Event) {
    match kind.category() {
        EventCategory::Pointer => {
            if let Some(event) = event.dyn_ref::<MouseEvent>() {
                sender.on_pointer(event);
            }
        }
        EventCategory::Wheel => {
            if let Some(event) = event.dyn_ref::<WheelEvent>() {
                sender.on_wheel(event);
            }
        }
        EventCategory::Key => {
            if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                sender.on_key(event);
            }
        }
        EventCategory::Touch => {
            if let Some(event) = event.dyn_ref::<TouchEvent>() {
                sender.on_touch(event);
            }
        }
        EventCategory::ContextMenu => {
            sender.on_context_menu(event);
        }
    }
}

impl Drop for AttachedEventSender {
    fn drop(&mut self) {
        for (kind, listener) in self.listeners.drain(..) {
            let _ = self
                .element
                .remove_event_listener_with_callback(kind.as_str(), listener.as_ref().unchecked_ref());
        }
    }
}

/// Read an uploaded file's bytes.
pub async fn read_upload(file: &File) -> Result<FileUpload, EngineError> {
    let buffer = JsFuture::from(file.array_buffer()).await.map_err(js_error)?;
    let contents = Uint8Array::new(&buffer).to_vec();
    Ok(FileUpload::new(file.name(), contents))
}

/// Current on-screen box of `element`, in `updateScreenSize` shape.
pub fn screen_size_of(element: &Element) -> ScreenSizeUpdate {
    let rect = element.get_bounding_client_rect();
    ScreenSizeUpdate::new(element.client_width().max(0) as u32, element.client_height().max(0) as u32)
        .with_offset(rect.left(), rect.top())
}

/// Main-thread event proxy for JS hosts. Listeners stay attached until
/// `free()` is called.
#[wasm_bindgen]
pub struct CanvasEventProxy {
    _attached: AttachedEventSender,
}

#[wasm_bindgen]
impl CanvasEventProxy {
    /// `callback` receives each record as a JSON string.
    #[wasm_bindgen(constructor)]
    pub fn new(element: &Element, callback: Function) -> Result<CanvasEventProxy, JsValue> {
        let sender = ElementEventSender::new(JsFunctionSink::new(callback));
        let attached = AttachedEventSender::attach(element, sender)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(CanvasEventProxy { _attached: attached })
    }
}

/// `updateScreenSize` payload for `element`, as JSON.
#[wasm_bindgen(js_name = screenSizeOf)]
pub fn screen_size_json(element: &Element) -> Result<String, JsValue> {
    serde_json::to_string(&screen_size_of(element))
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Read a `File` as text, decoded like `File.text()`.
#[wasm_bindgen(js_name = readFileText)]
pub async fn read_file_text(file: File) -> Result<String, JsValue> {
    let upload = read_upload(&file)
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(upload.text())
}

/// The persisted last structure as JSON, if any.
#[wasm_bindgen(js_name = loadLastStructure)]
pub fn load_last_structure() -> Result<Option<String>, JsValue> {
    let store = LocalStorageStore::new().map_err(|e| JsValue::from_str(&e.to_string()))?;
    PersistedState::new(store)
        .load_structure()
        .map(|structure| serde_json::to_string(&structure))
        .transpose()
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Persist a structure JSON returned by the render worker.
#[wasm_bindgen(js_name = saveLastStructure)]
pub fn save_last_structure(structure_json: &str) -> Result<(), JsValue> {
    let structure: Structure = serde_json::from_str(structure_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid structure: {}", e)))?;
    let store = LocalStorageStore::new().map_err(|e| JsValue::from_str(&e.to_string()))?;
    PersistedState::new(store)
        .save_structure(&structure)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

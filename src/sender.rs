// Main-thread half of the event proxy: project each canvas event and forward
// the record to the render worker. Fire-and-forget; nothing is awaited.

use crossbeam_channel::Sender;
use tracing::debug;

use crate::projector::{self, RawEvent, RawKeyEvent, RawPointerEvent, RawTouchEvent, RawWheelEvent};
use crate::protocol::{EventKind, InputEventRecord};

/// Event types a sender listens for on the visible canvas, one listener each.
pub const PROXIED_EVENTS: [EventKind; 12] = EventKind::ALL;

/// Receiving end of `sendProxyElementEvent`.
pub trait ProxyEventSink {
    fn send_proxy_element_event(&self, record: InputEventRecord);
}

impl ProxyEventSink for Sender<InputEventRecord> {
    fn send_proxy_element_event(&self, record: InputEventRecord) {
        if self.send(record).is_err() {
            debug!("proxy event dropped, receiver gone");
        }
    }
}

impl<K: ProxyEventSink + ?Sized> ProxyEventSink for &K {
    fn send_proxy_element_event(&self, record: InputEventRecord) {
        (**self).send_proxy_element_event(record)
    }
}

/// Projects raw canvas events and forwards them to a sink.
pub struct ElementEventSender<K> {
    sink: K,
}

impl<K: ProxyEventSink> ElementEventSender<K> {
    pub fn new(sink: K) -> Self {
        ElementEventSender { sink }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Returns whether a record was sent.
    fn forward(&self, record: Option<InputEventRecord>) -> bool {
        match record {
            Some(record) => {
                self.sink.send_proxy_element_event(record);
                true
            }
            None => false,
        }
    }

    pub fn on_pointer(&self, event: &impl RawPointerEvent) -> bool {
        self.forward(projector::project_pointer(event))
    }

    pub fn on_wheel(&self, event: &impl RawWheelEvent) -> bool {
        self.forward(projector::project_wheel(event))
    }

    pub fn on_key(&self, event: &impl RawKeyEvent) -> bool {
        self.forward(projector::project_key(event))
    }

    pub fn on_touch(&self, event: &impl RawTouchEvent) -> bool {
        self.forward(projector::project_touch(event))
    }

    pub fn on_context_menu(&self, event: &impl RawEvent) -> bool {
        projector::suppress_context_menu(event);
        false
    }
}

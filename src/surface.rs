// Worker-side stand-in for the canvas element. Camera controls are written
// against a live element; this emulates only the slice of it they touch:
// size and position getters, listener registration, dispatch, and no-op
// focus / pointer capture. It is not a DOM polyfill.

use tracing::trace;

use crate::protocol::{EventKind, InputEventRecord};
use crate::types::{ClientRect, ViewportGeometry};

/// Handle returned by `add_event_listener`, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&SyntheticEvent<'_>)>;

/// A forwarded record as seen by a listener.
///
/// The record never touched a real DOM, so default-action and propagation
/// hooks exist but do nothing.
pub struct SyntheticEvent<'a> {
    record: &'a InputEventRecord,
    current_target: ClientRect,
}

impl<'a> SyntheticEvent<'a> {
    pub fn new(record: &'a InputEventRecord, current_target: ClientRect) -> Self {
        SyntheticEvent {
            record,
            current_target,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.record.kind()
    }

    pub fn record(&self) -> &'a InputEventRecord {
        self.record
    }

    /// Bounding rect of the element the event was dispatched on.
    pub fn current_target(&self) -> ClientRect {
        self.current_target
    }

    pub fn prevent_default(&self) {}

    pub fn stop_propagation(&self) {}
}

/// Positionable, sizeable event-dispatch target.
pub trait ElementSurface {
    fn client_width(&self) -> u32;
    fn client_height(&self) -> u32;
    fn bounding_client_rect(&self) -> ClientRect;

    fn focus(&self) {}
    fn set_pointer_capture(&self, _pointer_id: i32) {}
    fn release_pointer_capture(&self, _pointer_id: i32) {}

    fn add_event_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId;
    fn remove_event_listener(&mut self, id: ListenerId) -> bool;

    /// Run every listener registered for the record's type, in registration
    /// order. Returns how many ran.
    fn dispatch_event(&mut self, record: &InputEventRecord) -> usize;
}

struct Registration {
    id: ListenerId,
    kind: EventKind,
    listener: Listener,
}

/// The canvas proxy living in the render worker.
pub struct SyntheticInputSurface {
    geometry: ViewportGeometry,
    listeners: Vec<Registration>,
    next_id: u64,
}

impl SyntheticInputSurface {
    pub fn new(geometry: ViewportGeometry) -> Self {
        SyntheticInputSurface {
            geometry,
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    pub fn geometry(&self) -> ViewportGeometry {
        self.geometry
    }

    pub fn update_geometry(&mut self, geometry: ViewportGeometry) {
        self.geometry = geometry;
    }

    /// Entry point for `sendProxyElementEvent`.
    pub fn handle_event(&mut self, record: &InputEventRecord) -> usize {
        self.dispatch_event(record)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.iter().filter(|r| r.kind == kind).count()
    }
}

impl Default for SyntheticInputSurface {
    fn default() -> Self {
        SyntheticInputSurface::new(ViewportGeometry::default())
    }
}

impl ElementSurface for SyntheticInputSurface {
    fn client_width(&self) -> u32 {
        self.geometry.width
    }

    fn client_height(&self) -> u32 {
        self.geometry.height
    }

    fn bounding_client_rect(&self) -> ClientRect {
        self.geometry.client_rect()
    }

    fn add_event_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Registration { id, kind, listener });
        id
    }

    fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|r| r.id != id);
        self.listeners.len() != before
    }

    fn dispatch_event(&mut self, record: &InputEventRecord) -> usize {
        let kind = record.kind();
        let event = SyntheticEvent::new(record, self.geometry.client_rect());

        let mut dispatched = 0;
        for registration in self.listeners.iter_mut().filter(|r| r.kind == kind) {
            (registration.listener)(&event);
            dispatched += 1;
        }

        trace!(event = kind.as_str(), dispatched, "proxy event dispatched");
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::protocol::{KeyFields, WheelFields};

    fn wheel(delta_y: f64) -> InputEventRecord {
        InputEventRecord::Wheel(WheelFields {
            delta_x: 0.0,
            delta_y,
        })
    }

    #[test]
    fn geometry_drives_size_and_rect() {
        let mut surface = SyntheticInputSurface::default();
        assert_eq!(surface.client_width(), 300);
        assert_eq!(surface.client_height(), 150);

        surface.update_geometry(ViewportGeometry::new(10.0, 20.0, 800, 600));
        let rect = surface.bounding_client_rect();
        assert_eq!(surface.client_width(), 800);
        assert_eq!(rect.left, 10.0);
        assert_eq!(rect.right, 810.0);
        assert_eq!(rect.bottom, 620.0);

        // No-ops, but callable like on a real element.
        surface.focus();
        surface.set_pointer_capture(1);
        surface.release_pointer_capture(1);
    }

    #[test]
    fn dispatches_by_type_in_registration_order() {
        let mut surface = SyntheticInputSurface::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = seen.clone();
            surface.add_event_listener(
                EventKind::Wheel,
                Box::new(move |event: &SyntheticEvent<'_>| {
                    event.prevent_default();
                    event.stop_propagation();
                    if let InputEventRecord::Wheel(fields) = event.record() {
                        seen.borrow_mut().push((tag, fields.delta_y));
                    }
                }),
            );
        }
        let keys = seen.clone();
        surface.add_event_listener(
            EventKind::KeyDown,
            Box::new(move |_: &SyntheticEvent<'_>| keys.borrow_mut().push(("key", 0.0))),
        );

        assert_eq!(surface.handle_event(&wheel(5.0)), 2);
        assert_eq!(*seen.borrow(), vec![("a", 5.0), ("b", 5.0)]);

        let key = InputEventRecord::KeyDown(KeyFields {
            ctrl_key: false,
            meta_key: false,
            shift_key: false,
            key_code: 37,
        });
        assert_eq!(surface.handle_event(&key), 1);
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn events_without_listeners_are_ignored() {
        let mut surface = SyntheticInputSurface::default();
        assert_eq!(surface.handle_event(&wheel(1.0)), 0);
    }

    #[test]
    fn removed_listener_stops_receiving() {
        let mut surface = SyntheticInputSurface::default();
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        let id = surface.add_event_listener(
            EventKind::Wheel,
            Box::new(move |_: &SyntheticEvent<'_>| *counter.borrow_mut() += 1),
        );

        surface.handle_event(&wheel(1.0));
        assert!(surface.remove_event_listener(id));
        assert!(!surface.remove_event_listener(id));
        surface.handle_event(&wheel(1.0));

        assert_eq!(*count.borrow(), 1);
        assert_eq!(surface.listener_count(EventKind::Wheel), 0);
    }

    #[test]
    fn listeners_see_current_target_rect() {
        let mut surface = SyntheticInputSurface::new(ViewportGeometry::new(5.0, 6.0, 100, 50));
        let rect = Rc::new(RefCell::new(None));
        let slot = rect.clone();
        surface.add_event_listener(
            EventKind::Wheel,
            Box::new(move |event: &SyntheticEvent<'_>| *slot.borrow_mut() = Some(event.current_target())),
        );

        surface.handle_event(&wheel(1.0));
        assert_eq!(rect.borrow().unwrap().height, 50.0);
    }
}

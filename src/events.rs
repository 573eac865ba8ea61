//! A small event emitter: handlers subscribe to an event kind and are run in
//! subscription order against explicitly passed state.

use anyhow::Result;
use tracing::trace;

use crate::projection::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Move,
    Zoom,
    Resize,
    MoveEnd,
    SliderInput,
}

/// Something happened to the map or the time slider. Each event carries the
/// value at the moment it fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    Move(Viewport),
    Zoom(Viewport),
    Resize(Viewport),
    MoveEnd(Viewport),
    SliderInput(i32),
}

impl MapEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MapEvent::Move(_) => EventKind::Move,
            MapEvent::Zoom(_) => EventKind::Zoom,
            MapEvent::Resize(_) => EventKind::Resize,
            MapEvent::MoveEnd(_) => EventKind::MoveEnd,
            MapEvent::SliderInput(_) => EventKind::SliderInput,
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        match self {
            MapEvent::Move(vp) | MapEvent::Zoom(vp) | MapEvent::Resize(vp) | MapEvent::MoveEnd(vp) => {
                Some(*vp)
            }
            MapEvent::SliderInput(_) => None,
        }
    }
}

pub type Handler<S> = Box<dyn FnMut(&mut S, &MapEvent) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

pub struct EventEmitter<S> {
    next_id: usize,
    handlers: Vec<(SubscriptionId, EventKind, Handler<S>)>,
}

impl<S> Default for EventEmitter<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }
}

impl<S> EventEmitter<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&mut S, &MapEvent) -> Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, kind, Box::new(handler)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _, _)| *sub != id);
        self.handlers.len() != before
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.iter().filter(|(_, k, _)| *k == kind).count()
    }

    /// Runs every handler subscribed to the event's kind and returns how many
    /// ran. Stops at the first handler error.
    pub fn emit(&mut self, state: &mut S, event: &MapEvent) -> Result<usize> {
        let kind = event.kind();
        let mut ran = 0;
        for (_, k, handler) in self.handlers.iter_mut() {
            if *k != kind {
                continue;
            }
            handler(state, event)?;
            ran += 1;
        }
        trace!(?kind, handlers = ran, "Event dispatched");
        Ok(ran)
    }
}

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::handle::{HandleId, PlayError, PlayRequest, VideoHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Activated(HandleId),
    Deactivated(HandleId),
}

#[derive(Debug, Default)]
struct RegistryState {
    active: Option<HandleId>,
    known: HashMap<HandleId, Arc<dyn VideoHandle>>,
}

// Handle commands are issued with the state lock held.
#[derive(Debug)]
pub struct PlaybackRegistry {
    state: Mutex<RegistryState>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackRegistry {
    const EVENT_CAPACITY: usize = 32;

    pub fn new() -> Self {
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);
        Self {
            state: Mutex::new(RegistryState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn active(&self) -> Option<HandleId> {
        self.state.lock().active
    }

    pub fn is_registered(&self, id: HandleId) -> bool {
        self.state.lock().known.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn register(&self, handle: Arc<dyn VideoHandle>) -> HandleId {
        let id = handle.id();
        let mut state = self.state.lock();
        if !state.known.contains_key(&id) {
            log::debug!("Registering video {id}");
            state.known.insert(id, handle);
        }
        id
    }

    pub fn unregister(&self, id: HandleId) -> bool {
        let mut state = self.state.lock();
        if state.known.remove(&id).is_none() {
            return false;
        }
        log::debug!("Unregistering video {id}");
        if state.active == Some(id) {
            state.active = None;
            self.emit(PlaybackEvent::Deactivated(id));
        }
        true
    }

    // The returned request may reject; `id` stays the intended active handle
    // either way and is never retried.
    pub fn play(&self, id: HandleId) -> PlayRequest {
        let mut state = self.state.lock();
        let Some(handle) = state.known.get(&id).cloned() else {
            log::debug!("Ignoring play request for unregistered video {id}");
            return PlayRequest::rejected(id, PlayError::Unregistered(id));
        };

        match state.active.replace(id) {
            Some(prev) if prev == id => {}
            Some(prev) => {
                if let Some(previous) = state.known.get(&prev) {
                    previous.pause();
                }
                self.emit(PlaybackEvent::Deactivated(prev));
                self.activated(id);
            }
            None => self.activated(id),
        }

        PlayRequest::new(id, handle.play())
    }

    pub fn pause(&self, id: HandleId) {
        let mut state = self.state.lock();
        let Some(handle) = state.known.get(&id) else {
            return;
        };
        handle.pause();
        if state.active == Some(id) {
            state.active = None;
            self.emit(PlaybackEvent::Deactivated(id));
        }
    }

    pub fn pause_all(&self) {
        let mut state = self.state.lock();
        for handle in state.known.values() {
            handle.pause();
        }
        if let Some(previous) = state.active.take() {
            self.emit(PlaybackEvent::Deactivated(previous));
        }
    }

    // For elements started through their native controls: pauses the
    // previously active handle without issuing another play command.
    pub fn notify_played(&self, id: HandleId) {
        let mut state = self.state.lock();
        if !state.known.contains_key(&id) {
            return;
        }
        match state.active.replace(id) {
            Some(prev) if prev == id => return,
            Some(prev) => {
                if let Some(previous) = state.known.get(&prev) {
                    previous.pause();
                }
                self.emit(PlaybackEvent::Deactivated(prev));
            }
            None => {}
        }
        self.activated(id);
    }

    pub fn notify_paused(&self, id: HandleId) {
        let mut state = self.state.lock();
        if state.active != Some(id) {
            return;
        }
        state.active = None;
        self.emit(PlaybackEvent::Deactivated(id));
    }

    fn activated(&self, id: HandleId) {
        log::debug!("Video {id} is now active");
        self.emit(PlaybackEvent::Activated(id));
    }

    fn emit(&self, event: PlaybackEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for PlaybackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

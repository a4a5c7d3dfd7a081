use std::{
    collections::HashMap,
    fmt,
    time::{Duration, Instant},
};

use anyhow::anyhow;
use serde::Deserialize;

use crate::handle::HandleId;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutoplayConfig {
    pub threshold: f32,
    pub debounce_ms: u64,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            debounce_ms: 50,
        }
    }
}

impl AutoplayConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(anyhow!(
                "Autoplay threshold must be within (0, 1], got {}",
                self.threshold
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ContainerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityEntry {
    pub container: ContainerId,
    pub intersecting: bool,
    pub ratio: f32,
}

impl VisibilityEntry {
    pub fn new(container: impl Into<ContainerId>, ratio: f32) -> Self {
        Self {
            container: container.into(),
            intersecting: ratio > 0.0,
            ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play(HandleId),
    Pause(HandleId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyState {
    Idle,
    Selecting {
        container: ContainerId,
        handle: HandleId,
        deadline: Instant,
    },
    Playing {
        container: ContainerId,
        handle: HandleId,
    },
}

// Containers crossing the threshold while another one is selected or playing
// are queued in crossing order; the first of them takes over once the current
// one drops below the threshold.
#[derive(Debug)]
pub struct AutoplayPolicy {
    threshold: f32,
    debounce: Duration,
    observed: HashMap<ContainerId, HandleId>,
    candidates: Vec<ContainerId>,
    state: PolicyState,
}

impl AutoplayPolicy {
    pub fn new(config: &AutoplayConfig) -> Self {
        Self {
            threshold: config.threshold,
            debounce: config.debounce(),
            observed: HashMap::new(),
            candidates: Vec::new(),
            state: PolicyState::Idle,
        }
    }

    pub fn state(&self) -> &PolicyState {
        &self.state
    }

    pub fn playing(&self) -> Option<HandleId> {
        match &self.state {
            PolicyState::Playing { handle, .. } => Some(*handle),
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            PolicyState::Selecting { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    pub fn observe(
        &mut self,
        container: ContainerId,
        handle: HandleId,
        now: Instant,
    ) -> Vec<Command> {
        let commands = match self.observed.get(&container) {
            Some(existing) if *existing == handle => return vec![],
            Some(_) => self.unobserve(&container, now),
            None => vec![],
        };
        log::debug!("Observing container {container} for video {handle}");
        self.observed.insert(container, handle);
        commands
    }

    pub fn unobserve(&mut self, container: &ContainerId, now: Instant) -> Vec<Command> {
        if self.observed.remove(container).is_none() {
            return vec![];
        }
        self.candidates.retain(|c| c != container);
        self.release(container, now)
    }

    pub fn on_visibility(&mut self, entry: VisibilityEntry, now: Instant) -> Vec<Command> {
        if !self.observed.contains_key(&entry.container) {
            log::trace!(
                "Ignoring visibility of unobserved container {}",
                entry.container
            );
            return vec![];
        }

        let above = entry.intersecting && entry.ratio >= self.threshold;
        let was_above = self.candidates.contains(&entry.container);
        match (was_above, above) {
            (false, true) => {
                self.candidates.push(entry.container);
                self.select(now);
                vec![]
            }
            (true, false) => {
                self.candidates.retain(|c| *c != entry.container);
                self.release(&entry.container, now)
            }
            _ => vec![],
        }
    }

    pub fn poll(&mut self, now: Instant) -> Vec<Command> {
        let PolicyState::Selecting {
            container,
            handle,
            deadline,
        } = &self.state
        else {
            return vec![];
        };
        if now < *deadline {
            return vec![];
        }

        let handle = *handle;
        log::debug!("Autoplaying video {handle} in container {container}");
        self.state = PolicyState::Playing {
            container: container.clone(),
            handle,
        };
        vec![Command::Play(handle)]
    }

    pub fn teardown(&mut self) -> Vec<HandleId> {
        self.state = PolicyState::Idle;
        self.candidates.clear();
        self.observed.drain().map(|(_, handle)| handle).collect()
    }

    fn release(&mut self, container: &ContainerId, now: Instant) -> Vec<Command> {
        let commands = match &self.state {
            PolicyState::Selecting { container: c, .. } if c == container => {
                log::debug!("Container {container} left the viewport before playing");
                vec![]
            }
            PolicyState::Playing {
                container: c,
                handle,
            } if c == container => vec![Command::Pause(*handle)],
            _ => return vec![],
        };
        self.state = PolicyState::Idle;
        self.select(now);
        commands
    }

    fn select(&mut self, now: Instant) {
        if self.state != PolicyState::Idle {
            return;
        }
        let Some(container) = self.candidates.first() else {
            return;
        };
        let Some(handle) = self.observed.get(container) else {
            return;
        };
        self.state = PolicyState::Selecting {
            container: container.clone(),
            handle: *handle,
            deadline: now + self.debounce,
        };
    }
}

use std::{future, sync::Arc, time::Instant};

use anyhow::Context;
use log::debug;
use tokio::{sync::mpsc, task::JoinHandle, time};

use crate::{
    autoplay::{AutoplayConfig, AutoplayPolicy, Command, ContainerId, VisibilityEntry},
    handle::HandleId,
    playback::PlaybackRegistry,
};

#[derive(Debug)]
enum AutoplayMsg {
    Observe(ContainerId, HandleId),
    Unobserve(ContainerId),
    Visibility(VisibilityEntry),
    Teardown,
}

// Dropping the controller tears the feed down without waiting for it.
#[derive(Debug)]
pub struct AutoplayController {
    message_tx: mpsc::Sender<AutoplayMsg>,
    join_handle: JoinHandle<()>,
}

impl AutoplayController {
    const CHANNEL_CAPACITY: usize = 64;

    pub fn spawn(config: &AutoplayConfig, registry: Arc<PlaybackRegistry>) -> Self {
        let (message_tx, message_rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        let mut driver = AutoplayDriver {
            running: true,
            policy: AutoplayPolicy::new(config),
            registry,
            message_rx,
        };
        let join_handle = tokio::spawn(async move { driver.run().await });
        Self {
            message_tx,
            join_handle,
        }
    }

    pub async fn observe(
        &self,
        container: impl Into<ContainerId>,
        handle: HandleId,
    ) -> anyhow::Result<()> {
        self.send(AutoplayMsg::Observe(container.into(), handle))
            .await
    }

    pub async fn unobserve(&self, container: impl Into<ContainerId>) -> anyhow::Result<()> {
        self.send(AutoplayMsg::Unobserve(container.into())).await
    }

    pub async fn report(&self, entry: VisibilityEntry) -> anyhow::Result<()> {
        self.send(AutoplayMsg::Visibility(entry)).await
    }

    pub async fn teardown(self) -> anyhow::Result<()> {
        self.send(AutoplayMsg::Teardown).await?;
        self.join_handle
            .await
            .context("Autoplay driver panicked")?;
        Ok(())
    }

    async fn send(&self, msg: AutoplayMsg) -> anyhow::Result<()> {
        self.message_tx
            .send(msg)
            .await
            .context("Autoplay driver has shut down")
    }
}

struct AutoplayDriver {
    running: bool,
    policy: AutoplayPolicy,
    registry: Arc<PlaybackRegistry>,
    message_rx: mpsc::Receiver<AutoplayMsg>,
}

impl AutoplayDriver {
    async fn run(&mut self) {
        while self.running {
            let deadline = self.policy.next_deadline();
            tokio::select! {
                msg = self.message_rx.recv() => {
                    if let Some(msg) = msg {
                        self.handle_msg(msg)
                    } else {
                        debug!("Autoplay controller was dropped");
                        self.teardown()
                    }
                }
                _ = wait_until(deadline) => {
                    let commands = self.policy.poll(now());
                    self.apply(commands);
                }
            }
        }
    }

    fn handle_msg(&mut self, msg: AutoplayMsg) {
        let commands = match msg {
            AutoplayMsg::Observe(container, handle) => {
                self.policy.observe(container, handle, now())
            }
            AutoplayMsg::Unobserve(container) => self.policy.unobserve(&container, now()),
            AutoplayMsg::Visibility(entry) => self.policy.on_visibility(entry, now()),
            AutoplayMsg::Teardown => {
                self.teardown();
                return;
            }
        };
        self.apply(commands);
    }

    fn apply(&self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Play(handle) => self.registry.play(handle).detach(),
                Command::Pause(handle) => self.registry.pause(handle),
            }
        }
    }

    fn teardown(&mut self) {
        debug!("Tearing down autoplay");
        self.running = false;
        self.registry.pause_all();
        for handle in self.policy.teardown() {
            self.registry.unregister(handle);
        }
    }
}

fn now() -> Instant {
    time::Instant::now().into_std()
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(time::Instant::from_std(deadline)).await,
        None => future::pending::<()>().await,
    }
}

use std::{
    collections::HashSet,
    fs::File,
    io::Read,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Context};
use futures::future::{self, BoxFuture, FutureExt};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::{sync::broadcast::error::RecvError, time};

use crate::{
    autoplay::{AutoplayConfig, ContainerId, VisibilityEntry},
    driver::AutoplayController,
    handle::{HandleId, PlayError, VideoHandle},
    playback::{PlaybackEvent, PlaybackRegistry},
    utils::millis,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoSpec {
    pub container: ContainerId,

    // Play requests for this video are rejected, as if blocked by the
    // browser's autoplay policy.
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScrollEvent {
    pub at_ms: u64,
    pub container: ContainerId,
    pub ratio: f32,

    #[serde(default)]
    pub intersecting: Option<bool>,
}

impl ScrollEvent {
    pub fn entry(&self) -> VisibilityEntry {
        VisibilityEntry {
            container: self.container.clone(),
            intersecting: self.intersecting.unwrap_or(self.ratio > 0.0),
            ratio: self.ratio,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub videos: Vec<VideoSpec>,
    pub events: Vec<ScrollEvent>,
}

impl Scenario {
    pub fn read(file: &mut impl Read) -> anyhow::Result<Self> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read scenario file")?;

        let mut scenario: Self =
            toml::from_str(&contents).context("Failed to parse scenario file")?;
        scenario.validate()?;
        scenario.events.sort_by_key(|event| event.at_ms);
        Ok(scenario)
    }

    pub fn read_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut file = File::open(path).context("Failed to open scenario file")?;
        Self::read(&mut file)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut containers = HashSet::new();
        for video in &self.videos {
            if !containers.insert(&video.container) {
                return Err(anyhow!("Container {} is declared twice", video.container));
            }
        }
        for event in &self.events {
            if !containers.contains(&event.container) {
                return Err(anyhow!(
                    "Scroll event at {}ms refers to unknown container {}",
                    event.at_ms,
                    event.container
                ));
            }
            if !(0.0..=1.0).contains(&event.ratio) {
                return Err(anyhow!(
                    "Scroll event at {}ms has an invalid ratio {}",
                    event.at_ms,
                    event.ratio
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimulatedHandle {
    id: HandleId,
    container: ContainerId,
    blocked: bool,
    playing: AtomicBool,
    play_requests: AtomicUsize,
}

impl SimulatedHandle {
    pub fn new(spec: &VideoSpec) -> Self {
        Self {
            id: HandleId::new(),
            container: spec.container.clone(),
            blocked: spec.blocked,
            playing: AtomicBool::new(false),
            play_requests: AtomicUsize::new(0),
        }
    }

    pub fn play_requests(&self) -> usize {
        self.play_requests.load(Ordering::SeqCst)
    }
}

impl VideoHandle for SimulatedHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn play(&self) -> BoxFuture<'static, Result<(), PlayError>> {
        self.play_requests.fetch_add(1, Ordering::SeqCst);
        if self.blocked {
            warn!("Video in {} was blocked from playing", self.container);
            return future::ready(Err(PlayError::NotAllowed)).boxed();
        }
        self.playing.store(true, Ordering::SeqCst);
        info!("Video in {} started playing", self.container);
        future::ready(Ok(())).boxed()
    }

    fn pause(&self) {
        if self.playing.swap(false, Ordering::SeqCst) {
            info!("Video in {} paused", self.container);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    pub container: ContainerId,
    pub play_requests: usize,
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub videos: Vec<VideoSummary>,

    pub last_active: Option<ContainerId>,
}

pub async fn run(scenario: &Scenario, config: &AutoplayConfig) -> anyhow::Result<SimulationReport> {
    let registry = Arc::new(PlaybackRegistry::new());
    let event_logger = tokio::spawn(log_playback_events(registry.clone()));

    let controller = AutoplayController::spawn(config, registry.clone());
    let mut handles = Vec::with_capacity(scenario.videos.len());
    for spec in &scenario.videos {
        let handle = Arc::new(SimulatedHandle::new(spec));
        let id = registry.register(handle.clone());
        controller.observe(spec.container.clone(), id).await?;
        handles.push(handle);
    }

    let start = time::Instant::now();
    for event in &scenario.events {
        time::sleep_until(start + Duration::from_millis(event.at_ms)).await;
        debug!(
            "{}ms: {} is {:.0}% visible",
            millis(start.elapsed()),
            event.container,
            event.ratio * 100.0
        );
        controller.report(event.entry()).await?;
    }
    // let the last selection play out
    time::sleep(config.debounce() + Duration::from_millis(1)).await;

    let last_active = registry.active().and_then(|active| {
        handles
            .iter()
            .find(|handle| handle.id == active)
            .map(|handle| handle.container.clone())
    });
    controller
        .teardown()
        .await
        .context("Failed to tear down the feed")?;
    event_logger.abort();

    Ok(SimulationReport {
        videos: handles
            .iter()
            .map(|handle| VideoSummary {
                container: handle.container.clone(),
                play_requests: handle.play_requests(),
                blocked: handle.blocked,
            })
            .collect(),
        last_active,
    })
}

async fn log_playback_events(registry: Arc<PlaybackRegistry>) {
    let mut events = registry.subscribe();
    drop(registry);
    loop {
        match events.recv().await {
            Ok(PlaybackEvent::Activated(id)) => debug!("Video {id} became active"),
            Ok(PlaybackEvent::Deactivated(id)) => debug!("Video {id} is no longer active"),
            Err(RecvError::Lagged(skipped)) => debug!("Missed {skipped} playback events"),
            Err(RecvError::Closed) => break,
        }
    }
}

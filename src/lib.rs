pub mod app;
pub mod autoplay;
pub mod config;
pub mod driver;
pub mod handle;
pub mod playback;
pub mod scenario;
mod utils;

#[cfg(test)]
mod testing;

pub use autoplay::{AutoplayConfig, AutoplayPolicy, Command, ContainerId, VisibilityEntry};
pub use driver::AutoplayController;
pub use handle::{HandleId, PlayError, PlayRequest, VideoHandle};
pub use playback::{PlaybackEvent, PlaybackRegistry};

use clap::Parser;
use log::{info, LevelFilter};

use crate::{config::Config, scenario, scenario::Scenario};

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(help = "The scenario file describing the feed and the scroll events to replay.")]
    pub scenario: String,

    #[arg(
        short,
        long,
        help = "The path to the config file. The default is `config.toml`."
    )]
    pub config: Option<String>,

    #[arg(
        short,
        long,
        help = "The visible fraction at which a video starts playing. This overrides the value from the config file."
    )]
    pub threshold: Option<f32>,

    #[arg(
        short,
        long,
        help = "How many milliseconds a video has to stay visible before it plays. This overrides the value from the config file."
    )]
    pub debounce_ms: Option<u64>,
}

pub async fn start() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("REEL_AUTOPLAY_LOG")
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli_args(&cli)?;
    let scenario = Scenario::read_path(&cli.scenario)?;

    info!(
        "Replaying {} scroll events over {} videos (threshold {}, debounce {}ms)...",
        scenario.events.len(),
        scenario.videos.len(),
        config.autoplay.threshold,
        config.autoplay.debounce_ms
    );
    let report = scenario::run(&scenario, &config.autoplay).await?;

    for video in &report.videos {
        let note = if video.blocked { " (blocked)" } else { "" };
        info!(
            "{}: {} play request(s){note}",
            video.container, video.play_requests
        );
    }
    match report.last_active {
        Some(container) => info!("Video in {container} was active at the end of the scroll"),
        None => info!("No video was active at the end of the scroll"),
    }

    Ok(())
}

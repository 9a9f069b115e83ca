use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use channelcast::bumper::BumperGenerator;
use channelcast::config::Config;
use channelcast::database::repositories::bucket::BucketSeaOrmRepository;
use channelcast::database::repositories::bucket_progression::BucketProgressionRepository;
use channelcast::database::repositories::channel::ChannelSeaOrmRepository;
use channelcast::database::repositories::media_file::MediaFileSeaOrmRepository;
use channelcast::database::repositories::playback_session::PlaybackSessionRepository;
use channelcast::database::repositories::schedule_block::ScheduleBlockSeaOrmRepository;
use channelcast::database::repositories::schedule_start_time::ScheduleStartTimeRepository;
use channelcast::database::Database;
use channelcast::epg::EpgGenerator;
use channelcast::observability::RuntimeObservability;
use channelcast::playlist::PlaylistResolver;
use channelcast::runtime::{ChannelRuntime, ViewerEdgeBridge};
use channelcast::schedule::ScheduleTimeline;
use channelcast::transcoder::FfmpegTranscoderAdapter;
use channelcast::viewer::ViewerPresenceTracker;
use channelcast::web::{AppState, WebServer};

/// Get dependencies from SBOM
fn get_dependencies() -> Result<Value, Box<dyn std::error::Error>> {
    let sbom_str = include_str!(concat!(env!("OUT_DIR"), "/sbom.json"));
    let sbom: Value = serde_json::from_str(sbom_str)?;
    Ok(sbom)
}

/// Print detailed version information including dependency versions
fn print_version_info() {
    println!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("Build Information:");
    println!("  Target: {}-{}", std::env::consts::ARCH, std::env::consts::OS);

    println!();
    println!("Software Bill of Materials:");
    match get_dependencies() {
        Ok(sbom) => {
            let mut dependencies = Vec::new();
            if let Some(packages) = sbom["packages"].as_array() {
                for package in packages {
                    if let (Some(name), Some(version)) =
                        (package["name"].as_str(), package["versionInfo"].as_str())
                    {
                        if name != env!("CARGO_PKG_NAME") && !version.contains("path+") {
                            dependencies.push((name.to_string(), version.to_string()));
                        }
                    }
                }
            }
            dependencies.sort_by(|a, b| a.0.cmp(&b.0));
            if dependencies.is_empty() {
                println!("  (No external components found in SBOM)");
            } else {
                for (name, version) in dependencies {
                    println!("  {name}: {version}");
                }
            }
        }
        Err(_) => println!("  (Unable to read SBOM data)"),
    }

    println!();
    println!("Repository: {}", env!("CARGO_PKG_REPOSITORY"));
    println!("License: {}", env!("CARGO_PKG_LICENSE"));
    println!("Authors: {}", env!("CARGO_PKG_AUTHORS"));
}

#[derive(Parser)]
#[command(name = "channelcastd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turns a media library into always-on scheduled HLS channels")]
#[command(long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Print version information including dependency versions
    #[arg(short = 'v', long)]
    version: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        print_version_info();
        return Ok(());
    }

    let log_filter = if cli.log_level == "trace" {
        format!("channelcast={},tower_http=trace", cli.log_level)
    } else {
        format!("channelcast={}", cli.log_level)
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting channelcast v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    config.streaming.validate()?;

    info!("Using database: {}", config.database.url);
    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let connection = database.connection().clone().into();
    let channels = Arc::new(ChannelSeaOrmRepository::new(Arc::clone(&connection)));
    let buckets = Arc::new(BucketSeaOrmRepository::new(Arc::clone(&connection)));
    let schedule_blocks = Arc::new(ScheduleBlockSeaOrmRepository::new(Arc::clone(&connection)));
    let media_files = Arc::new(MediaFileSeaOrmRepository::new(Arc::clone(&connection)));
    let bucket_progression = Arc::new(BucketProgressionRepository::new(Arc::clone(&connection)));
    let playback_sessions = Arc::new(PlaybackSessionRepository::new(Arc::clone(&connection)));
    let schedule_start_times = Arc::new(ScheduleStartTimeRepository::new(Arc::clone(&connection)));

    let schedule_timeline = Arc::new(ScheduleTimeline::new(schedule_start_times));
    let playlist_resolver = Arc::new(PlaylistResolver::new(
        Arc::clone(&buckets),
        Arc::clone(&schedule_blocks),
        bucket_progression,
        Arc::clone(&media_files),
    ));
    let bumper_generator = Arc::new(BumperGenerator::new(config.streaming.ffmpeg_command.clone()));
    let epg = Arc::new(EpgGenerator::new());

    let observability = Some(Arc::new(RuntimeObservability::new(&config.observability)));

    let transcoder: Arc<dyn channelcast::transcoder::TranscoderAdapter> = Arc::new(
        FfmpegTranscoderAdapter::new(config.streaming.ffmpeg_command.clone(), observability.clone()),
    );

    let runtime = ChannelRuntime::new(
        Arc::clone(&channels),
        playback_sessions,
        Arc::clone(&schedule_timeline),
        Arc::clone(&playlist_resolver),
        bumper_generator,
        transcoder,
        Arc::clone(&epg),
        observability.clone(),
        config.clone(),
    );

    let viewer_edge_bridge = ViewerEdgeBridge::new(&runtime);
    let viewer_tracker = ViewerPresenceTracker::new(
        Duration::from_secs(config.viewer.session_idle_timeout_seconds),
        Duration::from_secs(config.viewer.disconnect_grace_period_seconds),
        viewer_edge_bridge,
        observability.clone(),
    );

    info!("Recovering channel state from previous run");
    runtime.recover_on_startup().await?;

    let sweeper_cancel = CancellationToken::new();
    tokio::spawn({
        let viewer_tracker = viewer_tracker.clone();
        let cancel = sweeper_cancel.clone();
        async move {
            viewer_tracker.run_sweeper(Duration::from_secs(10), cancel).await;
        }
    });

    let auto_save_cancel = CancellationToken::new();
    if let Some(auto_save) = &config.streaming.auto_save {
        info!("Auto-save enabled, interval: {}s", auto_save.interval_seconds);
        tokio::spawn({
            let runtime = Arc::clone(&runtime);
            let viewer_tracker = viewer_tracker.clone();
            let interval = Duration::from_secs(auto_save.interval_seconds);
            let cancel = auto_save_cancel.clone();
            async move {
                runtime.run_auto_save(viewer_tracker, interval, cancel).await;
            }
        });
    }

    let state = AppState {
        runtime,
        channels,
        buckets,
        schedule_blocks,
        media_files,
        playlist_resolver,
        schedule_timeline,
        epg,
        viewer_tracker,
        database,
        config: config.clone(),
    };

    let web_server = WebServer::new(state)?;
    info!("Starting web server on {}:{}", web_server.host(), web_server.port());

    let (server_ready_tx, server_ready_rx) = tokio::sync::oneshot::channel();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = web_server.serve_with_signal(server_ready_tx).await {
            tracing::error!("Web server failed: {e}");
        }
    });

    match server_ready_rx.await {
        Ok(Ok(())) => info!("Web server is now listening"),
        Ok(Err(bind_error)) => {
            tracing::error!("Failed to bind web server: {bind_error}");
            return Err(bind_error);
        }
        Err(_) => {
            tracing::error!("Web server task completed without signaling");
            return Err(anyhow::anyhow!("web server failed to start"));
        }
    }

    server_handle.await?;
    sweeper_cancel.cancel();
    auto_save_cancel.cancel();

    Ok(())
}

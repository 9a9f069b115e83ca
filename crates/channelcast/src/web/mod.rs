//! Web layer: thin Axum handlers over the channel runtime and repositories.
//! Business logic never lives here — every handler either reads through a
//! repository or delegates to [`crate::runtime::ChannelRuntime`].

pub mod extractors;
pub mod handlers;
pub mod responses;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::database::Database;
use crate::database::repositories::bucket::BucketSeaOrmRepository;
use crate::database::repositories::channel::ChannelSeaOrmRepository;
use crate::database::repositories::media_file::MediaFileSeaOrmRepository;
use crate::database::repositories::schedule_block::ScheduleBlockSeaOrmRepository;
use crate::epg::EpgGenerator;
use crate::playlist::PlaylistResolver;
use crate::runtime::ChannelRuntime;
use crate::schedule::ScheduleTimeline;
use crate::viewer::ViewerPresenceTracker;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ChannelRuntime>,
    pub channels: Arc<ChannelSeaOrmRepository>,
    pub buckets: Arc<BucketSeaOrmRepository>,
    pub schedule_blocks: Arc<ScheduleBlockSeaOrmRepository>,
    pub media_files: Arc<MediaFileSeaOrmRepository>,
    pub playlist_resolver: Arc<PlaylistResolver>,
    pub schedule_timeline: Arc<ScheduleTimeline>,
    pub epg: Arc<EpgGenerator>,
    pub viewer_tracker: Arc<ViewerPresenceTracker>,
    pub database: Database,
    pub config: Config,
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        Ok(Self { app: Self::router(state), addr })
    }

    /// Builds the full route table without binding a socket, for in-process
    /// testing via `tower::ServiceExt::oneshot`.
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/ready", get(handlers::health::readiness_check))
            .route("/live", get(handlers::health::liveness_check))
            .nest("/api/v1", Self::api_v1_routes())
            .route("/{slug}/master.m3u8", get(handlers::streaming::master_playlist))
            .route("/{slug}/stream.m3u8", get(handlers::streaming::stream_playlist))
            .route("/{slug}/{segment}", get(handlers::streaming::segment))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    fn api_v1_routes() -> Router<AppState> {
        Router::new()
            .route(
                "/channels",
                get(handlers::channels::list_channels).post(handlers::channels::create_channel),
            )
            .route(
                "/channels/{id}",
                get(handlers::channels::get_channel)
                    .put(handlers::channels::update_channel)
                    .delete(handlers::channels::delete_channel),
            )
            .route("/channels/{id}/start", post(handlers::channels::start_channel))
            .route("/channels/{id}/stop", post(handlers::channels::stop_channel))
            .route("/channels/{id}/restart", post(handlers::channels::restart_channel))
            .route("/channels/{id}/next", post(handlers::channels::next_media))
            .route("/channels/{id}/index", put(handlers::channels::set_index))
            .route(
                "/channels/{id}/schedule-time",
                put(handlers::channels::set_schedule_time),
            )
            .route(
                "/channels/{id}/buckets",
                get(handlers::buckets::list_channel_buckets).post(handlers::buckets::associate_channel),
            )
            .route(
                "/channels/{id}/schedule-blocks",
                get(handlers::schedule_blocks::list_for_channel)
                    .post(handlers::schedule_blocks::create),
            )
            .route(
                "/channels/{id}/epg",
                get(handlers::epg::channel_programs),
            )
            .route(
                "/channels/{id}/epg/now-next",
                get(handlers::epg::current_and_next),
            )
            .route("/channels/{id}/epg/refresh", post(handlers::epg::refresh))
            .route("/epg/xmltv", get(handlers::epg::xmltv))
            .route(
                "/schedule-blocks/{id}",
                put(handlers::schedule_blocks::update).delete(handlers::schedule_blocks::delete),
            )
            .route(
                "/buckets",
                get(handlers::buckets::list_buckets).post(handlers::buckets::create_bucket),
            )
            .route(
                "/buckets/{id}",
                get(handlers::buckets::get_bucket)
                    .put(handlers::buckets::update_bucket)
                    .delete(handlers::buckets::delete_bucket),
            )
            .route("/buckets/{id}/media", post(handlers::buckets::add_media))
            .route(
                "/buckets/{id}/media/{media_id}",
                axum::routing::delete(handlers::buckets::remove_media),
            )
            .route(
                "/media",
                get(handlers::buckets::list_media).post(handlers::buckets::create_media),
            )
            .route("/media/{id}", put(handlers::buckets::update_media))
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    /// Serves until shutdown, signaling on `ready_signal` once actually bound
    /// (or on bind failure), mirroring a startup-ordering pattern used
    /// elsewhere in the ambient stack for "don't accept traffic before ready".
    pub async fn serve_with_signal(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                let _ = ready_signal.send(Ok(()));
                axum::serve(listener, self.app).await?;
                Ok(())
            }
            Err(e) => {
                let msg = format!("failed to bind to {}: {e}", self.addr);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{msg}")));
                Err(anyhow::anyhow!("{msg}"))
            }
        }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

//! Viewer Presence Tracker: a session map with per-session idle timers and
//! first-viewer/last-viewer-gone edges, so the runtime can pause encoding
//! when nobody is watching without losing schedule alignment.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::observability::RuntimeObservability;

/// Callbacks the Channel Runtime subscribes to.
#[async_trait]
pub trait ViewerEdgeSink: Send + Sync {
    async fn on_first_viewer(&self, channel_id: Uuid);
    async fn on_last_viewer_gone(&self, channel_id: Uuid);
}

struct ChannelSessions {
    /// session id -> expiry instant.
    sessions: HashMap<String, DateTime<Utc>>,
    pending_last_gone: Option<CancellationToken>,
}

impl ChannelSessions {
    fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            pending_last_gone: None,
        }
    }
}

pub struct ViewerPresenceTracker {
    state: Mutex<HashMap<Uuid, ChannelSessions>>,
    idle_timeout: Duration,
    grace_period: Duration,
    edge_sink: Arc<dyn ViewerEdgeSink>,
    observability: Option<Arc<RuntimeObservability>>,
}

impl ViewerPresenceTracker {
    pub fn new(
        idle_timeout: Duration,
        grace_period: Duration,
        edge_sink: Arc<dyn ViewerEdgeSink>,
        observability: Option<Arc<RuntimeObservability>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HashMap::new()),
            idle_timeout,
            grace_period,
            edge_sink,
            observability,
        })
    }

    /// Registers activity for `session_id` on `channel_id`, extending its idle
    /// timer. Fires `onFirstViewer` on a 0 -> 1 transition and cancels any
    /// pending `onLastViewerGone` for this channel (reconnect-within-grace).
    pub async fn touch(&self, channel_id: Uuid, session_id: &str) {
        let mut state = self.state.lock().await;
        let entry = state.entry(channel_id).or_insert_with(ChannelSessions::new);
        let was_empty = entry.sessions.is_empty();
        entry
            .sessions
            .insert(session_id.to_string(), Utc::now() + chrono::Duration::from_std(self.idle_timeout).unwrap());

        if let Some(token) = entry.pending_last_gone.take() {
            token.cancel();
            debug!(channel_id = %channel_id, "cancelled pending last-viewer-gone on reconnect");
        }

        if was_empty {
            drop(state);
            if let Some(obs) = &self.observability {
                obs.viewer_session_edges.add(1, &[]);
            }
            self.edge_sink.on_first_viewer(channel_id).await;
        }
    }

    /// Drops expired sessions across all channels; for any channel whose
    /// session set transitions to empty, schedules `onLastViewerGone` after
    /// the grace period (cancellable by a subsequent `touch`).
    pub async fn sweep(self: &Arc<Self>) {
        let now = Utc::now();
        let mut newly_empty = Vec::new();

        {
            let mut state = self.state.lock().await;
            for (channel_id, sessions) in state.iter_mut() {
                let had_sessions = !sessions.sessions.is_empty();
                sessions.sessions.retain(|_, expires_at| *expires_at > now);
                if had_sessions && sessions.sessions.is_empty() && sessions.pending_last_gone.is_none() {
                    let token = CancellationToken::new();
                    sessions.pending_last_gone = Some(token.clone());
                    newly_empty.push((*channel_id, token));
                }
            }
        }

        for (channel_id, token) in newly_empty {
            self.schedule_last_viewer_gone(channel_id, token);
        }
    }

    fn schedule_last_viewer_gone(self: &Arc<Self>, channel_id: Uuid, token: CancellationToken) {
        let tracker = self.clone();
        let grace_period = self.grace_period;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(grace_period) => {
                    let still_empty = {
                        let mut state = tracker.state.lock().await;
                        match state.get_mut(&channel_id) {
                            Some(sessions) => {
                                let empty = sessions.sessions.is_empty();
                                sessions.pending_last_gone = None;
                                empty
                            }
                            None => true,
                        }
                    };
                    if still_empty {
                        if let Some(obs) = &tracker.observability {
                            obs.viewer_session_edges.add(1, &[]);
                        }
                        tracker.edge_sink.on_last_viewer_gone(channel_id).await;
                    }
                }
                _ = token.cancelled() => {
                    debug!(channel_id = %channel_id, "last-viewer-gone cancelled before grace period elapsed");
                }
            }
        });
    }

    pub async fn viewer_count(&self, channel_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .get(&channel_id)
            .map(|s| s.sessions.len())
            .unwrap_or(0)
    }

    /// Runs the periodic sweep loop; intended to be spawned once at startup.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, cancellation: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep().await,
                _ = cancellation.cancelled() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        first: AtomicUsize,
        last: AtomicUsize,
    }

    #[async_trait]
    impl ViewerEdgeSink for CountingSink {
        async fn on_first_viewer(&self, _channel_id: Uuid) {
            self.first.fetch_add(1, Ordering::SeqCst);
        }
        async fn on_last_viewer_gone(&self, _channel_id: Uuid) {
            self.last.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn first_touch_fires_on_first_viewer_once() {
        let sink = Arc::new(CountingSink {
            first: AtomicUsize::new(0),
            last: AtomicUsize::new(0),
        });
        let tracker = ViewerPresenceTracker::new(
            Duration::from_secs(60),
            Duration::from_millis(50),
            sink.clone(),
            None,
        );
        let channel_id = Uuid::new_v4();
        tracker.touch(channel_id, "session-a").await;
        tracker.touch(channel_id, "session-b").await;
        assert_eq!(sink.first.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reconnect_within_grace_cancels_last_viewer_gone() {
        let sink = Arc::new(CountingSink {
            first: AtomicUsize::new(0),
            last: AtomicUsize::new(0),
        });
        let tracker = ViewerPresenceTracker::new(
            Duration::from_millis(10),
            Duration::from_millis(200),
            sink.clone(),
            None,
        );
        let channel_id = Uuid::new_v4();
        tracker.touch(channel_id, "session-a").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        tracker.sweep().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        tracker.touch(channel_id, "session-a").await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(sink.last.load(Ordering::SeqCst), 0);
    }
}

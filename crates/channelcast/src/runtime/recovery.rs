//! Startup recovery: on process start, any channel left in a non-terminal
//! state by an unclean shutdown (STREAMING/STARTING/STOPPING/ERROR) has no
//! live transcoder behind it, so it is force-reset to IDLE. `scheduleStartTime`
//! is left untouched: the wall clock kept running while the process was down,
//! and channels resume "live" on their next start rather than rewinding.

use std::sync::Arc;

use tracing::{info, warn};

use crate::database::repositories::channel::ChannelUpdateRequest;
use crate::database::repositories::Repository;
use crate::errors::AppResult;
use crate::models::ChannelState;

use super::ChannelRuntime;

impl ChannelRuntime {
    /// Runs once at startup, before the web server accepts traffic.
    pub async fn recover_on_startup(self: &Arc<Self>) -> AppResult<()> {
        let channels = self.channels.find_all().await?;
        for channel in channels {
            if matches!(
                channel.state,
                ChannelState::Streaming | ChannelState::Starting | ChannelState::Stopping | ChannelState::Error
            ) {
                info!(channel_id = %channel.id, previous_state = %channel.state, "resetting channel to IDLE after restart");
                if let Err(e) = self
                    .channels
                    .update(
                        &channel.id,
                        ChannelUpdateRequest {
                            name: None,
                            config: None,
                            state: Some(ChannelState::Idle),
                            current_index: None,
                            viewer_count: Some(0),
                            started_at: Some(None),
                            last_error: None,
                        },
                    )
                    .await
                {
                    warn!(channel_id = %channel.id, error = %e, "failed to reset channel state during recovery");
                }
            }

            if channel.config.auto_start {
                if let Err(e) = self.start(channel.id, None, false).await {
                    warn!(channel_id = %channel.id, error = %e, "auto-start failed during recovery");
                }
            }
        }
        Ok(())
    }
}

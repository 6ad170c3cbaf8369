//! Discord Rich Presence publishing using discord-sdk

use std::future::Future;
use std::time::{Duration, UNIX_EPOCH};

use discord_sdk::{
    activity::{ActivityBuilder, Assets, Button},
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};
use titlecast_core::{ActivityPayload, ConnectionState};
use tracing::{debug, info, warn};

use crate::retry::retry_forever;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("discord error: {0}")]
    Discord(#[from] discord_sdk::Error),

    #[error("discord handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("discord connection closed: {0}")]
    Closed(String),
}

/// Where activity updates go.
pub trait PresenceSink {
    fn publish(
        &mut self,
        activity: &ActivityPayload,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;

    fn clear(&mut self) -> impl Future<Output = Result<(), PublishError>> + Send;

    /// Link state as of the last call.
    fn state(&self) -> ConnectionState;
}

/// Connected Discord IPC session.
pub struct DiscordPublisher {
    discord: Discord,
    // Keeps the event spokes alive for the lifetime of the connection.
    _wheel: Wheel,
    state: ConnectionState,
}

impl DiscordPublisher {
    /// Connect to the local Discord client, retrying every `retry_delay`
    /// until a handshake completes.
    pub async fn connect(app_id: i64, retry_delay: Duration, handshake_timeout: Duration) -> Self {
        info!("Discord connecting...");
        let (discord, wheel) = retry_forever("Discord IPC connect", retry_delay, || {
            connect_once(app_id, handshake_timeout)
        })
        .await;

        Self {
            discord,
            _wheel: wheel,
            state: ConnectionState::Connected,
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "Discord presence");
            self.state = next;
        }
    }

    /// Clear presence and close the IPC connection.
    pub async fn shutdown(self) {
        self.discord.disconnect().await;
        info!("Discord Rich Presence disconnected");
    }
}

async fn connect_once(
    app_id: i64,
    handshake_timeout: Duration,
) -> Result<(Discord, Wheel), PublishError> {
    let (wheel, handler) = Wheel::new(Box::new(|err| {
        warn!("Discord error: {:?}", err);
    }));
    let mut user_spoke = wheel.user();

    let discord = Discord::new(app_id, Subscriptions::ACTIVITY, Box::new(handler))?;

    let handshake = tokio::time::timeout(handshake_timeout, async {
        if user_spoke.0.changed().await.is_err() {
            return Err(PublishError::Closed("event channel dropped".to_string()));
        }
        match &*user_spoke.0.borrow() {
            UserState::Connected(user) => Ok(user.clone()),
            UserState::Disconnected(err) => Err(PublishError::Closed(format!("{err:?}"))),
        }
    })
    .await;

    let outcome = match handshake {
        Ok(Ok(user)) => {
            info!(
                "Discord Rich Presence connected as {}#{}",
                user.username,
                user.discriminator.unwrap_or(0)
            );
            return Ok((discord, wheel));
        }
        Ok(Err(e)) => e,
        Err(_) => PublishError::HandshakeTimeout(handshake_timeout),
    };

    discord.disconnect().await;
    Err(outcome)
}

fn to_activity(payload: &ActivityPayload) -> ActivityBuilder {
    let start = UNIX_EPOCH + Duration::from_secs(payload.start.max(0) as u64);
    let mut activity = ActivityBuilder::new()
        .details(payload.details.clone())
        .start_timestamp(start)
        .assets(
            Assets::default().large(payload.large_image.clone(), Some(payload.details.clone())),
        );
    for button in &payload.buttons {
        activity = activity.button(Button {
            label: button.label.clone(),
            url: button.url.clone(),
        });
    }
    activity
}

impl PresenceSink for DiscordPublisher {
    async fn publish(&mut self, activity: &ActivityPayload) -> Result<(), PublishError> {
        match self.discord.update_activity(to_activity(activity)).await {
            Ok(_) => {
                self.set_state(ConnectionState::Connected);
                debug!("Discord activity set: {}", activity.details);
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                Err(e.into())
            }
        }
    }

    async fn clear(&mut self) -> Result<(), PublishError> {
        self.discord.clear_activity().await?;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

/// Current time as epoch seconds, the start timestamp of a new activity.
pub fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

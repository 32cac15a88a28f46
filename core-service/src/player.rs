//! # Embed Player
//!
//! One mounted widget: a playback engine plus the tasks that hang off it.
//!
//! ## Lifecycle
//!
//! [`EmbedPlayer::mount`] spawns the engine, starts the listen recorder and
//! the remote-control bridge when their features are enabled, and evaluates
//! autoplay. Audio is not touched before the first toggle unless autoplay
//! fires. [`EmbedPlayer::unmount`] stops the tasks and releases the engine;
//! dropping the player without unmounting releases it as well once the last
//! engine handle is gone.
//!
//! ## Collections
//!
//! One row is active at a time. When the active track completes the next row
//! is loaded and started; the last row leaves the widget stopped.

use crate::error::{CoreError, Result};
use crate::request::{PlayerContent, PlayerKey, PlayerRequest};
use core_playback::{
    AutoplayPolicy, EngineConfig, ListenConfig, ListenRecorder, PlaybackControl, PlaybackEngine,
    PlaybackSnapshot, PlayingState, Track,
};
use core_remote::RemoteControlBridge;
use core_runtime::config::WidgetConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Engine and recorder tuning for a mounted widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSettings {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub listen: ListenConfig,
}

#[derive(Debug, Default)]
struct WidgetState {
    active_index: usize,
    did_init_audio: bool,
    popover_visible: bool,
}

pub struct EmbedPlayer {
    request: PlayerRequest,
    content: Arc<PlayerContent>,
    engine: PlaybackEngine,
    events: EventBus,
    state: Arc<Mutex<WidgetState>>,
    cancel: CancellationToken,
    recorder: Option<JoinHandle<()>>,
    advance: Option<JoinHandle<()>>,
    bridge: Option<RemoteControlBridge>,
}

impl EmbedPlayer {
    /// Mount a widget for `request` showing `content`.
    pub async fn mount(
        request: PlayerRequest,
        content: PlayerContent,
        config: WidgetConfig,
        settings: PlayerSettings,
    ) -> Result<Self> {
        config.validate()?;
        content.check(&request)?;
        settings.listen.validate()?;

        let events = EventBus::new(config.event_buffer);
        let engine = PlaybackEngine::spawn(
            Arc::clone(&config.segment_fetcher),
            Arc::clone(&config.audio_output),
            settings.engine,
            events.clone(),
        )?;

        let content = Arc::new(content);
        let state = Arc::new(Mutex::new(WidgetState::default()));
        let cancel = CancellationToken::new();

        let recorder = match (&config.listen_reporter, config.features.listen_tracking) {
            (Some(reporter), true) => {
                let recorder = ListenRecorder::new(settings.listen);
                Some(tokio::spawn(recorder.run(
                    engine.subscribe(),
                    Arc::clone(reporter),
                    Arc::clone(&config.clock),
                    events.clone(),
                    cancel.child_token(),
                )))
            }
            _ => None,
        };

        let bridge = match (&config.message_source, config.features.remote_control) {
            (Some(source), true) => {
                let control: Arc<dyn PlaybackControl> = Arc::new(engine.clone());
                Some(RemoteControlBridge::subscribe(
                    source.as_ref(),
                    control,
                    config.remote_origin.clone(),
                    events.clone(),
                )?)
            }
            _ => None,
        };

        let advance = content.is_collection().then(|| {
            tokio::spawn(advance_on_completion(
                engine.clone(),
                Arc::clone(&content),
                Arc::clone(&state),
                events.subscribe(),
                cancel.child_token(),
            ))
        });

        let player = Self {
            request,
            content,
            engine,
            events,
            state,
            cancel,
            recorder,
            advance,
            bridge,
        };

        info!(
            id = player.request.id,
            request_type = ?player.request.request_type,
            flavor = ?player.request.flavor,
            tracks = player.content.tracks().len(),
            "Widget mounted"
        );

        if let (Some(context), true, Some(track)) = (
            &config.embed_context,
            config.features.autoplay,
            player.active_track(),
        ) {
            let mut policy = AutoplayPolicy::new();
            if policy
                .evaluate(context.as_ref(), &player.engine, &track)
                .await
                .is_some()
            {
                player.state.lock().did_init_audio = true;
            }
        }

        Ok(player)
    }

    pub fn request(&self) -> &PlayerRequest {
        &self.request
    }

    pub fn content(&self) -> &PlayerContent {
        &self.content
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.engine.snapshot()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn active_index(&self) -> usize {
        self.state.lock().active_index
    }

    pub fn active_track(&self) -> Option<Track> {
        self.content.tracks().get(self.active_index()).cloned()
    }

    pub fn popover_visible(&self) -> bool {
        self.state.lock().popover_visible
    }

    /// The play bar reacts to input only while not buffering and with the
    /// pause popover hidden.
    pub fn playbar_enabled(&self) -> bool {
        self.engine.snapshot().state != PlayingState::Buffering && !self.popover_visible()
    }

    /// Toggle the active track, initializing audio and loading it on first
    /// use. Pausing through here raises the pause popover.
    pub async fn toggle_play(&self) -> PlaybackSnapshot {
        let first_use = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.did_init_audio, true)
        };
        if first_use {
            debug!("First toggle; initializing audio");
            self.engine.init_audio().await;
            match self.active_track() {
                Some(track) => {
                    self.engine.load_track(track).await;
                }
                None => warn!(index = self.active_index(), "No track at the active row"),
            }
        }

        let was_playing = self.engine.snapshot().is_playing();
        let snapshot = self.engine.toggle_play().await;
        if was_playing {
            self.state.lock().popover_visible = true;
        }
        snapshot
    }

    /// Row click in a collection: the active row toggles, any other row is
    /// loaded and started.
    pub async fn toggle_track(&self, index: usize) -> Result<PlaybackSnapshot> {
        let len = self.content.tracks().len();
        if index >= len {
            return Err(CoreError::TrackIndexOutOfRange { index, len });
        }

        let switching = {
            let mut state = self.state.lock();
            if state.active_index == index {
                false
            } else {
                state.active_index = index;
                state.did_init_audio = true;
                true
            }
        };
        if !switching {
            return Ok(self.toggle_play().await);
        }

        info!(index, "Switching collection track");
        let track = self.content.tracks()[index].clone();
        self.engine.init_audio().await;
        Ok(start_from_top(&self.engine, track).await)
    }

    pub async fn seek_to(&self, seconds: f64) -> PlaybackSnapshot {
        self.engine.seek_to(seconds).await
    }

    pub async fn stop(&self) -> PlaybackSnapshot {
        self.engine.stop().await
    }

    /// Keyboard input. Space toggles when the play bar is enabled.
    pub async fn handle_key(&self, key: PlayerKey) -> Option<PlaybackSnapshot> {
        match key {
            PlayerKey::Space if self.playbar_enabled() => Some(self.toggle_play().await),
            PlayerKey::Space => {
                debug!("Space ignored: play bar disabled");
                None
            }
            PlayerKey::Other => None,
        }
    }

    pub fn dismiss_popover(&self) {
        self.state.lock().popover_visible = false;
    }

    /// Stop every task and release the audio output.
    pub async fn unmount(mut self) {
        self.shutdown();
        self.engine.release().await;
        info!(id = self.request.id, "Widget unmounted");
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        self.bridge.take();
        for task in [self.recorder.take(), self.advance.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

impl Drop for EmbedPlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for EmbedPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedPlayer")
            .field("request", &self.request)
            .field("engine", &self.engine)
            .field("remote_control", &self.bridge.is_some())
            .field("listen_tracking", &self.recorder.is_some())
            .finish()
    }
}

/// Start the next collection row whenever the active one completes.
async fn advance_on_completion(
    engine: PlaybackEngine,
    content: Arc<PlayerContent>,
    state: Arc<Mutex<WidgetState>>,
    mut events: broadcast::Receiver<CoreEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        let completed = match event {
            Ok(CoreEvent::Playback(PlaybackEvent::Completed { track_id, .. })) => track_id,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Collection advance lagged behind playback events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let tracks = content.tracks();
        let next = {
            let mut state = state.lock();
            if tracks.get(state.active_index).map(|t| t.id) != Some(completed) {
                continue;
            }
            let next = state.active_index + 1;
            if next >= tracks.len() {
                info!("Collection finished");
                continue;
            }
            state.active_index = next;
            next
        };

        info!(index = next, track_id = %tracks[next].id, "Advancing to next collection track");
        start_from_top(&engine, tracks[next].clone()).await;
    }
    debug!("Collection advance stopped");
}

/// Load `track` and start it from the beginning. A row repeating the loaded
/// track keeps its session, so it is stopped first to rewind it.
async fn start_from_top(engine: &PlaybackEngine, track: Track) -> PlaybackSnapshot {
    if engine.snapshot().track_id == Some(track.id) {
        engine.stop().await;
    }
    engine.load_track(track).await;
    engine.toggle_play().await
}

//! # Playback Engine
//!
//! A single task owns the audio output and the loaded session. Callers hold
//! cheap cloneable [`PlaybackEngine`] handles that send commands over a
//! channel and get back the snapshot published after the command was applied.
//!
//! ## State machine
//!
//! ```text
//!            toggle                 segment ready
//! Stopped ───────────> Buffering ─────────────────> Playing
//!    ^                   │   ^                      │   │
//!    │ stall / end       │   │ seek, next segment   │   │ toggle
//!    └───────────────────┘   └──────────────────────┘   v
//!                                           toggle    Paused
//!                             Buffering <────────────────┘
//! ```
//!
//! - A toggle while buffering is queued once; further toggles are ignored.
//!   When buffering completes with a queued toggle the session lands in
//!   `Paused`.
//! - A seek while buffering replaces the buffer target.
//! - Seeking to the end of an active session finishes the track.
//! - Fetch failures for the segment being buffered, output failures and the
//!   buffering timeout stop the session with the position kept and the error
//!   recorded on the snapshot.
//!
//! ## Concurrency
//!
//! Segment fetches run as spawned tasks and report back through an internal
//! channel. Each report carries the epoch it was started in; loading, stopping
//! and releasing bump the epoch so late results are discarded.
//!
//! Dropping every handle shuts the task down and releases the output.

use crate::config::EngineConfig;
use crate::error::{PlaybackError, Result};
use crate::session::{BufferTarget, PlaybackSession};
use crate::source::{FetchOutcome, SegmentSource};
use crate::types::{PlaybackSnapshot, PlayingState, Track};
use bridge_traits::{platform::PlatformSendSync, AudioOutput, SegmentFetcher, TrackId};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace, warn};

/// Used as the buffering deadline when nothing is buffering; never reached.
const IDLE_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

type Reply = oneshot::Sender<PlaybackSnapshot>;

enum Command {
    InitAudio { reply: Reply },
    Load { track: Box<Track>, reply: Reply },
    TogglePlay { reply: Reply },
    Seek { seconds: f64, reply: Reply },
    Stop { reply: Reply },
    Release { reply: Reply },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::InitAudio { .. } => "init_audio",
            Command::Load { .. } => "load_track",
            Command::TogglePlay { .. } => "toggle_play",
            Command::Seek { .. } => "seek_to",
            Command::Stop { .. } => "stop",
            Command::Release { .. } => "release",
        }
    }
}

/// Remote-controllable subset of the engine.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait PlaybackControl: PlatformSendSync {
    async fn toggle_play(&self);
    async fn stop(&self);
    async fn seek_to(&self, seconds: f64);
}

/// Handle to a running playback engine.
#[derive(Clone)]
pub struct PlaybackEngine {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
}

impl PlaybackEngine {
    /// Start the engine task on the current tokio runtime.
    pub fn spawn(
        fetcher: Arc<dyn SegmentFetcher>,
        output: Arc<dyn AudioOutput>,
        config: EngineConfig,
        events: EventBus,
    ) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::default());
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let actor = EngineActor {
            fetcher,
            output,
            config,
            events,
            snapshots: snapshot_tx,
            outcomes: outcome_tx,
            audio_ready: false,
            epoch: 0,
            session: None,
            track_id: None,
            error: None,
            clock_restarted: false,
        };
        tokio::spawn(actor.run(command_rx, outcome_rx));

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
        })
    }

    async fn request(&self, make: impl FnOnce(Reply) -> Command) -> PlaybackSnapshot {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(make(tx)).await.is_err() {
            debug!("Playback engine has shut down; returning last snapshot");
            return self.snapshot();
        }
        rx.await.unwrap_or_else(|_| self.snapshot())
    }

    /// Acquire the audio output. Idempotent.
    pub async fn init_audio(&self) -> PlaybackSnapshot {
        self.request(|reply| Command::InitAudio { reply }).await
    }

    /// Arm a session for `track` without starting playback.
    pub async fn load_track(&self, track: Track) -> PlaybackSnapshot {
        self.request(|reply| Command::Load {
            track: Box::new(track),
            reply,
        })
        .await
    }

    pub async fn toggle_play(&self) -> PlaybackSnapshot {
        self.request(|reply| Command::TogglePlay { reply }).await
    }

    /// Seek to `seconds`, clamped to the track.
    pub async fn seek_to(&self, seconds: f64) -> PlaybackSnapshot {
        self.request(|reply| Command::Seek { seconds, reply }).await
    }

    /// Stop and rewind, keeping the output open and the session armed.
    pub async fn stop(&self) -> PlaybackSnapshot {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Drop the session and close the output.
    pub async fn release(&self) -> PlaybackSnapshot {
        self.request(|reply| Command::Release { reply }).await
    }

    /// Most recently published state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published state.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("running", &self.is_running())
            .field("state", &self.snapshots.borrow().state)
            .finish()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl PlaybackControl for PlaybackEngine {
    async fn toggle_play(&self) {
        PlaybackEngine::toggle_play(self).await;
    }

    async fn stop(&self) {
        PlaybackEngine::stop(self).await;
    }

    async fn seek_to(&self, seconds: f64) {
        PlaybackEngine::seek_to(self, seconds).await;
    }
}

struct EngineActor {
    fetcher: Arc<dyn SegmentFetcher>,
    output: Arc<dyn AudioOutput>,
    config: EngineConfig,
    events: EventBus,
    snapshots: watch::Sender<PlaybackSnapshot>,
    outcomes: mpsc::UnboundedSender<FetchOutcome>,
    audio_ready: bool,
    epoch: u64,
    session: Option<PlaybackSession>,
    /// Last track passed to `load_track`, kept even when arming failed.
    track_id: Option<TrackId>,
    error: Option<PlaybackError>,
    /// Set when the play clock starts so the position ticker realigns.
    clock_restarted: bool,
}

impl EngineActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut outcomes: mpsc::UnboundedReceiver<FetchOutcome>,
    ) {
        let mut ticker = interval(self.config.position_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("Playback engine started");

        loop {
            let playing = self.state() == Some(PlayingState::Playing);
            let deadline = self.buffer_deadline();
            let buffering = deadline.is_some();
            let wake_at = deadline.unwrap_or_else(|| Instant::now() + IDLE_WAIT);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                Some(outcome) = outcomes.recv() => {
                    self.on_fetch_outcome(outcome).await;
                    self.publish();
                }
                _ = ticker.tick(), if playing => {
                    self.on_tick().await;
                    self.publish();
                }
                _ = sleep_until(wake_at), if buffering => {
                    self.on_buffer_timeout().await;
                    self.publish();
                }
            }

            if std::mem::take(&mut self.clock_restarted) {
                ticker.reset();
            }
        }

        self.release().await;
        self.publish();
        debug!("Playback engine stopped");
    }

    async fn handle(&mut self, command: Command) {
        trace!(command = command.name(), "Applying command");
        let reply = match command {
            Command::InitAudio { reply } => {
                self.init_audio().await;
                reply
            }
            Command::Load { track, reply } => {
                self.load_track(*track).await;
                reply
            }
            Command::TogglePlay { reply } => {
                self.toggle_play().await;
                reply
            }
            Command::Seek { seconds, reply } => {
                self.seek_to(seconds).await;
                reply
            }
            Command::Stop { reply } => {
                self.stop().await;
                reply
            }
            Command::Release { reply } => {
                self.release().await;
                reply
            }
        };
        let snapshot = self.publish();
        // The caller may have given up waiting.
        let _ = reply.send(snapshot);
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    fn state(&self) -> Option<PlayingState> {
        self.session.as_ref().map(|s| s.state)
    }

    fn buffer_deadline(&self) -> Option<Instant> {
        let session = self.session.as_ref()?;
        if session.state != PlayingState::Buffering {
            return None;
        }
        session.target.map(|t| t.deadline)
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        match &self.session {
            Some(session) => PlaybackSnapshot {
                state: session.state,
                position: session.position_at(Instant::now()),
                duration: session.duration(),
                media_key: Some(session.media_key),
                track_id: Some(session.track.id),
                armed: true,
                audio_ready: self.audio_ready,
                error: self.error.clone(),
            },
            None => PlaybackSnapshot {
                track_id: self.track_id,
                audio_ready: self.audio_ready,
                error: self.error.clone(),
                ..PlaybackSnapshot::default()
            },
        }
    }

    fn publish(&self) -> PlaybackSnapshot {
        let snapshot = self.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine.
        let _ = self.events.emit(CoreEvent::Playback(event));
    }

    fn position_ms(&self) -> u64 {
        self.session
            .as_ref()
            .map(|s| s.position_at(Instant::now()).as_millis() as u64)
            .unwrap_or(0)
    }

    fn current_track(&self) -> TrackId {
        self.session
            .as_ref()
            .map(|s| s.track.id)
            .or(self.track_id)
            .unwrap_or(TrackId(0))
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    async fn init_audio(&mut self) {
        if self.audio_ready {
            trace!("Audio output already open");
            return;
        }

        match self.output.open().await {
            Ok(()) => {
                self.audio_ready = true;
                if self.error == Some(PlaybackError::AudioNotInitialized) {
                    self.error = None;
                }
                info!("Audio output opened");
            }
            Err(e) => {
                warn!(error = %e, "Failed to open audio output");
                self.fail(PlaybackError::AudioOutput(e.to_string()));
            }
        }
    }

    #[instrument(skip(self, track), fields(track_id = %track.id))]
    async fn load_track(&mut self, track: Track) {
        if !self.audio_ready {
            warn!("load_track issued before init_audio");
            self.track_id = Some(track.id);
            self.fail(PlaybackError::AudioNotInitialized);
            return;
        }

        let stalled = self.error.is_some();
        if let Some(session) = self.session.as_mut() {
            if session.track.same_source(&track) {
                if stalled && session.state == PlayingState::Stopped {
                    self.epoch += 1;
                    session.source.reset(self.epoch);
                    self.error = None;
                    info!(media_key = %session.media_key, "Stalled track reloaded");
                } else {
                    debug!(media_key = %session.media_key, "Track already loaded; keeping session");
                }
                return;
            }
        }

        self.teardown_session().await;
        self.track_id = Some(track.id);

        match SegmentSource::new(Arc::clone(&self.fetcher), &track, self.epoch) {
            Ok(source) => {
                let session = PlaybackSession::new(track, source);
                info!(
                    media_key = %session.media_key,
                    segments = session.timeline.len(),
                    duration_ms = session.duration().as_millis() as u64,
                    "Track loaded"
                );
                self.error = None;
                self.emit(PlaybackEvent::Loaded {
                    track_id: session.track.id,
                    media_key: session.media_key,
                    duration_ms: session.duration().as_millis() as u64,
                });
                self.session = Some(session);
            }
            Err(e) => {
                warn!(error = %e, "Failed to arm track");
                self.fail(e);
            }
        }
    }

    async fn toggle_play(&mut self) {
        if !self.audio_ready {
            debug!("toggle_play ignored: audio output not initialized");
            return;
        }

        let Some(state) = self.state() else {
            debug!("toggle_play ignored: no track loaded");
            return;
        };

        match state {
            PlayingState::Buffering => self.queue_toggle(),
            PlayingState::Playing => self.pause().await,
            PlayingState::Paused => self.resume().await,
            PlayingState::Stopped => self.play_from_stopped().await,
        }
    }

    async fn seek_to(&mut self, seconds: f64) {
        let now = Instant::now();
        let Some(session) = self.session.as_mut() else {
            debug!("seek_to ignored: no track loaded");
            return;
        };

        let duration = session.duration();
        let target = if seconds.is_nan() || seconds <= 0.0 {
            Duration::ZERO
        } else if seconds >= duration.as_secs_f64() {
            duration
        } else {
            session.clamp(crate::types::seconds(seconds))
        };
        let state = session.state;
        let track_id = session.track.id;
        debug!(requested = seconds, position_ms = target.as_millis() as u64, ?state, "Seek");

        self.emit(PlaybackEvent::Seeked {
            track_id,
            position_ms: target.as_millis() as u64,
        });

        if state.is_active() && target >= duration {
            self.finish_track().await;
            return;
        }

        match state {
            PlayingState::Stopped => {
                if let Some(session) = self.session.as_mut() {
                    session.set_position(target);
                }
            }
            PlayingState::Paused => {
                if let Some(session) = self.session.as_mut() {
                    session.detach_output(now);
                    session.set_position(target);
                }
                self.prefetch_from(target);
            }
            PlayingState::Playing => {
                if let Some(session) = self.session.as_mut() {
                    session.hold_clock(now);
                }
                if let Err(e) = self.output.halt().await {
                    self.stall(PlaybackError::AudioOutput(e.to_string())).await;
                    return;
                }
                self.begin_buffering(target).await;
            }
            PlayingState::Buffering => self.begin_buffering(target).await,
        }
    }

    async fn stop(&mut self) {
        if self.session.is_none() {
            debug!("stop ignored: no track loaded");
            return;
        }

        self.epoch += 1;
        let epoch = self.epoch;
        if let Some(session) = self.session.as_mut() {
            session.source.reset(epoch);
            session.detach_output(Instant::now());
            session.pending_toggle = false;
            session.completed = false;
            session.state = PlayingState::Stopped;
            session.set_position(Duration::ZERO);
        }

        if let Err(e) = self.output.halt().await {
            warn!(error = %e, "Audio output failed to halt on stop");
        }
        self.error = None;
        info!(epoch, "Playback stopped");
        self.emit(PlaybackEvent::Stopped {
            track_id: self.current_track(),
        });
    }

    async fn release(&mut self) {
        self.teardown_session().await;
        self.track_id = None;
        self.error = None;

        if self.audio_ready {
            if let Err(e) = self.output.close().await {
                warn!(error = %e, "Audio output failed to close");
            }
            self.audio_ready = false;
            info!("Audio output released");
        }
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn queue_toggle(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.pending_toggle {
            trace!("Extra toggle during buffering ignored");
        } else {
            session.pending_toggle = true;
            debug!("Toggle queued until buffering completes");
        }
    }

    async fn pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.hold_clock(Instant::now());

        if let Err(e) = self.output.pause().await {
            self.stall(PlaybackError::AudioOutput(e.to_string())).await;
            return;
        }

        if let Some(session) = self.session.as_mut() {
            session.state = PlayingState::Paused;
            session.primed = true;
        }
        debug!("Playback paused");
        self.emit(PlaybackEvent::Paused {
            track_id: self.current_track(),
            position_ms: self.position_ms(),
        });
    }

    async fn resume(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let position = session.position_at(Instant::now());
        let primed = session.primed && session.current.is_some();
        session.state = PlayingState::Buffering;
        self.emit(PlaybackEvent::Buffering {
            track_id: self.current_track(),
            position_ms: position.as_millis() as u64,
        });
        self.publish();

        if !primed {
            self.begin_buffering(position).await;
            return;
        }

        if let Err(e) = self.output.resume().await {
            self.stall(PlaybackError::AudioOutput(e.to_string())).await;
            return;
        }
        self.enter_playing(None);
    }

    async fn play_from_stopped(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut position = session.position_at(Instant::now());
        if position >= session.duration() {
            position = Duration::ZERO;
        }
        session.completed = false;
        self.error = None;
        self.begin_buffering(position).await;
    }

    /// Enter `Buffering` for the segment containing `position`. Starts the
    /// output right away when that segment is already buffered.
    async fn begin_buffering(&mut self, position: Duration) {
        let now = Instant::now();
        let timeout = self.config.buffering_timeout;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.detach_output(now);
        session.set_position(position);
        let Some((index, offset)) = session.timeline.locate(session.position_at(now)) else {
            self.finish_track().await;
            return;
        };

        session.state = PlayingState::Buffering;
        session.target = Some(BufferTarget {
            index,
            offset,
            deadline: now + timeout,
        });
        let ready = session.source.buffered(index).is_some();
        let requested = if ready {
            Ok(())
        } else {
            session.source.ensure_fetching(index, &self.outcomes)
        };
        debug!(segment = index, offset_ms = offset.as_millis() as u64, ready, "Buffering");

        self.emit(PlaybackEvent::Buffering {
            track_id: self.current_track(),
            position_ms: self.position_ms(),
        });

        if let Err(e) = requested {
            self.stall(PlaybackError::BufferStall {
                index,
                reason: e.to_string(),
            })
            .await;
            return;
        }

        self.prefetch_after(index);

        if ready {
            self.complete_buffering().await;
        }
    }

    /// The buffer target is available: start the output, or settle in
    /// `Paused` when a toggle was queued meanwhile.
    async fn complete_buffering(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(target) = session.target else {
            return;
        };

        if std::mem::take(&mut session.pending_toggle) {
            session.target = None;
            session.state = PlayingState::Paused;
            info!(segment = target.index, "Buffering complete; queued toggle leaves playback paused");
            self.emit(PlaybackEvent::Paused {
                track_id: self.current_track(),
                position_ms: self.position_ms(),
            });
            return;
        }

        let Some(audio) = session.source.buffered(target.index).cloned() else {
            return;
        };

        if let Err(e) = self.output.start(&audio, target.offset).await {
            self.stall(PlaybackError::AudioOutput(e.to_string())).await;
            return;
        }
        self.enter_playing(Some(target.index));
    }

    fn enter_playing(&mut self, segment: Option<usize>) {
        let now = Instant::now();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if segment.is_some() {
            session.current = segment;
        }
        session.target = None;
        session.primed = true;
        session.state = PlayingState::Playing;
        session.run_clock(now);
        self.clock_restarted = true;

        debug!(segment = ?session.current, "Playing");
        self.emit(PlaybackEvent::Started {
            track_id: self.current_track(),
            position_ms: self.position_ms(),
        });
    }

    /// Advance the play head; cross segment boundaries and finish the track.
    async fn on_tick(&mut self) {
        let now = Instant::now();
        loop {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            if session.state != PlayingState::Playing {
                return;
            }

            let position = session.settle(now);
            let Some(current) = session.current else {
                return;
            };
            if position < session.timeline.end_of(current) {
                return;
            }

            if session.is_last_segment(current) {
                self.finish_track().await;
                return;
            }

            let next = current + 1;
            let next_start = session.timeline.start_of(next);
            let Some(audio) = session.source.buffered(next).cloned() else {
                debug!(segment = next, "Next segment not buffered yet");
                self.begin_buffering(position.max(next_start)).await;
                return;
            };

            let offset = position.saturating_sub(next_start);
            if let Err(e) = self.output.start(&audio, offset).await {
                self.stall(PlaybackError::AudioOutput(e.to_string())).await;
                return;
            }
            if let Some(session) = self.session.as_mut() {
                session.current = Some(next);
            }
            debug!(segment = next, "Advanced to next segment");
            self.prefetch_after(next);
        }
    }

    async fn on_fetch_outcome(&mut self, outcome: FetchOutcome) {
        let FetchOutcome {
            epoch,
            index,
            result,
        } = outcome;

        if epoch != self.epoch {
            trace!(index, epoch, current = self.epoch, "Dropping stale fetch result");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let is_target = session.state == PlayingState::Buffering
            && session.target.map(|t| t.index) == Some(index);

        match result {
            Ok(audio) => {
                if let Some(actual) = audio.duration {
                    if session.timeline.refine(index, actual) {
                        debug!(
                            segment = index,
                            duration_ms = session.duration().as_millis() as u64,
                            "Track duration refined"
                        );
                    }
                }
                session.source.complete(index, audio);
                trace!(segment = index, is_target, "Segment buffered");
                if is_target {
                    self.complete_buffering().await;
                }
            }
            Err(e) => {
                session.source.fail(index);
                if is_target {
                    self.stall(PlaybackError::BufferStall {
                        index,
                        reason: e.to_string(),
                    })
                    .await;
                } else {
                    debug!(segment = index, error = %e, "Prefetch failed; retrying when needed");
                }
            }
        }
    }

    async fn on_buffer_timeout(&mut self) {
        let Some(target) = self
            .session
            .as_ref()
            .filter(|s| s.state == PlayingState::Buffering)
            .and_then(|s| s.target)
        else {
            return;
        };
        if Instant::now() < target.deadline {
            return;
        }

        self.stall(PlaybackError::BufferTimeout {
            index: target.index,
            timeout: self.config.buffering_timeout,
        })
        .await;
    }

    /// End of the last segment: stop at the end and notify once.
    async fn finish_track(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.detach_output(Instant::now());
        session.pending_toggle = false;
        session.state = PlayingState::Stopped;
        session.set_position(session.duration());
        let first = !std::mem::replace(&mut session.completed, true);
        let track_id = session.track.id;
        let media_key = session.media_key;

        if let Err(e) = self.output.halt().await {
            debug!(error = %e, "Audio output failed to halt after track end");
        }

        if first {
            info!(%track_id, "Track completed");
            self.emit(PlaybackEvent::Completed {
                track_id,
                media_key,
            });
        }
    }

    async fn stall(&mut self, error: PlaybackError) {
        if let Some(session) = self.session.as_mut() {
            session.detach_output(Instant::now());
            session.pending_toggle = false;
            session.state = PlayingState::Stopped;
        }
        if let Err(e) = self.output.halt().await {
            debug!(error = %e, "Audio output failed to halt after stall");
        }
        warn!(error = %error, "Playback stalled");
        self.fail(error);
    }

    fn fail(&mut self, error: PlaybackError) {
        self.emit(PlaybackEvent::Error {
            track_id: self.session.as_ref().map(|s| s.track.id).or(self.track_id),
            message: error.to_string(),
            recoverable: error.is_transient(),
        });
        self.error = Some(error);
    }

    async fn teardown_session(&mut self) {
        self.epoch += 1;
        let Some(session) = self.session.take() else {
            return;
        };
        if session.state.is_active() {
            if let Err(e) = self.output.halt().await {
                debug!(error = %e, "Audio output failed to halt on teardown");
            }
        }
        debug!(media_key = %session.media_key, "Session torn down");
    }

    // ------------------------------------------------------------------------
    // Prefetch
    // ------------------------------------------------------------------------

    fn prefetch_after(&mut self, index: usize) {
        let ahead = self.config.prefetch_ahead;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let last = session.source.segment_count().saturating_sub(1);
        for next in (index + 1)..=(index + ahead).min(last) {
            if let Err(e) = session.source.ensure_fetching(next, &self.outcomes) {
                debug!(segment = next, error = %e, "Prefetch skipped");
            }
        }
    }

    fn prefetch_from(&mut self, position: Duration) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Some((index, _)) = session.timeline.locate(position) {
            if let Err(e) = session.source.ensure_fetching(index, &self.outcomes) {
                debug!(segment = index, error = %e, "Prefetch skipped");
            }
        }
    }
}

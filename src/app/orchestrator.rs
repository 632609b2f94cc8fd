//! The facade the presentation layer talks to.
//!
//! `Orchestrator` owns the queue, the playback coordinator and the
//! equalizer, and keeps the persisted settings in step with them. All of it
//! is mutated from one task: [`Orchestrator::run`] drains user commands and
//! engine notifications in a single loop and pushes a fresh snapshot after
//! each change.

use super::config::{PersistentState, UserConfig};
use super::events::{Command, QueueContext, StateUpdate};
use crate::catalog::{Catalog, Report, Reporter};
use crate::eq::{Equalizer, PresetBook};
use crate::error::PlaybackError;
use crate::model::{RepeatMode, Track};
use crate::player::{AudioEngine, Effect, EngineEvent, PlaybackCoordinator, SeekTarget};
use crate::queue::{QueueCursor, QueueEngine};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub struct Orchestrator {
    queue: QueueEngine,
    coordinator: PlaybackCoordinator,
    equalizer: Equalizer,
    settings: PersistentState,
    config: UserConfig,
    reporter: Reporter,
    updates: UnboundedSender<StateUpdate>,
}

/// Cloneable command sender for the presentation layer.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: UnboundedSender<Command>,
}

impl OrchestratorHandle {
    pub fn channel() -> (Self, UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// `false` once the orchestrator has shut down.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

impl Orchestrator {
    pub fn new(
        engine: Box<dyn AudioEngine>,
        catalog: Arc<dyn Catalog>,
        settings: PersistentState,
        config: UserConfig,
        updates: UnboundedSender<StateUpdate>,
    ) -> Self {
        let coordinator = PlaybackCoordinator::new(engine, settings.volume, config.volume_step);
        let equalizer = Equalizer::new(
            PresetBook::new(settings.presets.clone()),
            &settings.last_preset_name,
            &settings.eq_bands,
            settings.eq_enabled,
        );

        let mut orchestrator = Self {
            queue: QueueEngine::new(),
            coordinator,
            equalizer,
            settings,
            config,
            reporter: Reporter::new(catalog),
            updates,
        };
        orchestrator.restore_queue_modes();
        let chain = orchestrator.equalizer.effects_string();
        orchestrator.coordinator.set_effects_chain(&chain);
        orchestrator
    }

    /// Swap in a specific queue (e.g. a seeded one). Saved shuffle and
    /// repeat modes are applied to it.
    pub fn with_queue(mut self, queue: QueueEngine) -> Self {
        self.queue = queue;
        self.restore_queue_modes();
        self
    }

    /// Report synchronously instead of on the blocking pool.
    pub fn with_inline_reports(mut self) -> Self {
        self.reporter = Reporter::inline(self.reporter.catalog_arc());
        self
    }

    fn restore_queue_modes(&mut self) {
        self.queue.set_shuffle(self.settings.shuffle);
        self.queue.set_repeat(self.settings.repeat);
    }

    // ─── Read access ─────────────────────────────────────────────

    /// Current settings, ready to be saved.
    pub fn settings(&self) -> &PersistentState {
        &self.settings
    }

    pub fn queue(&self) -> &QueueEngine {
        &self.queue
    }

    pub fn playback(&self) -> &crate::player::PlaybackState {
        self.coordinator.state()
    }

    pub fn equalizer(&self) -> &Equalizer {
        &self.equalizer
    }

    /// Push every snapshot once (initial render).
    pub fn publish_all(&self) {
        self.publish_playback();
        self.publish_queue();
        self.publish_equalizer();
    }

    fn publish(&self, update: StateUpdate) {
        // Nobody listening is fine
        let _ = self.updates.send(update);
    }

    fn publish_playback(&self) {
        self.publish(StateUpdate::Playback(self.coordinator.state().clone()));
    }

    fn publish_queue(&self) {
        self.publish(StateUpdate::Queue(self.queue.snapshot()));
    }

    fn publish_equalizer(&self) {
        self.publish(StateUpdate::Equalizer(self.equalizer.snapshot()));
    }

    fn notice(&self, message: impl Into<String>) {
        self.publish(StateUpdate::Notice(message.into()));
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        let mut queue_moved = false;
        for effect in effects {
            match effect {
                Effect::ReportNowPlaying(id) => self.reporter.dispatch(Report::NowPlaying(id)),
                Effect::ReportPlayed(id) => self.reporter.dispatch(Report::Played(id)),
                Effect::TrackStarted(track) => {
                    tracing::debug!(track = %track.id, "track started");
                    queue_moved = true;
                }
                Effect::QueueExhausted => self.notice("End of queue"),
                Effect::PlaybackFailed(reason) => {
                    self.notice(format!("Playback failed: {}", reason))
                }
            }
        }
        if queue_moved {
            self.publish_queue();
        }
    }

    // ─── Transport ───────────────────────────────────────────────

    /// Play `track` from `url`. The queue is replaced by `context` only once
    /// the engine accepted the track.
    pub fn play_track(
        &mut self,
        track: Track,
        url: &str,
        context: Option<QueueContext>,
    ) -> Result<(), PlaybackError> {
        match self.coordinator.play(track, url) {
            Ok(effects) => {
                if let Some(context) = context {
                    self.queue.set_queue(context.tracks, context.start_index);
                    self.publish_queue();
                }
                self.apply_effects(effects);
                self.publish_playback();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, %url, "play refused");
                self.notice(format!("Playback failed: {}", e));
                Err(e)
            }
        }
    }

    /// Play a track the queue already points at. When the engine refuses
    /// it, the queue goes back to `cursor` so it keeps matching what plays.
    fn start(&mut self, track: Track, cursor: QueueCursor) -> Result<(), PlaybackError> {
        let url = self.reporter.catalog().stream_url(&track);
        let result = self.play_track(track, &url, None);
        if result.is_err() {
            self.queue.restore_cursor(cursor);
            self.publish_queue();
        }
        result
    }

    /// Playing <-> Paused. From Stopped, starts the queue's current track
    /// (or its first one).
    pub fn toggle_pause(&mut self) -> Result<(), PlaybackError> {
        if self.coordinator.state().is_active() {
            self.coordinator.toggle_pause();
            self.publish_playback();
            return Ok(());
        }

        let cursor = self.queue.cursor();
        let track = match self.queue.current_track().cloned() {
            Some(track) => Some(track),
            None => self.queue.next(),
        };
        match track {
            Some(track) => self.start(track, cursor),
            None => Err(PlaybackError::NothingToPlay),
        }
    }

    pub fn stop(&mut self) {
        self.coordinator.stop();
        self.publish_playback();
    }

    pub fn next(&mut self) -> Result<(), PlaybackError> {
        let cursor = self.queue.cursor();
        match self.queue.next() {
            Some(track) => self.start(track, cursor),
            None => {
                self.notice("End of queue");
                Err(PlaybackError::NothingToPlay)
            }
        }
    }

    /// Restart the current track when past the restart threshold, otherwise
    /// step back in the queue.
    pub fn previous(&mut self) -> Result<(), PlaybackError> {
        let state = self.coordinator.state();
        if state.is_active() && state.position_secs > self.config.restart_threshold_secs {
            self.seek_absolute(0.0);
            return Ok(());
        }

        let cursor = self.queue.cursor();
        match self.queue.previous() {
            Some(track) => self.start(track, cursor),
            None => Err(PlaybackError::NothingToPlay),
        }
    }

    pub fn seek_relative(&mut self, seconds: f64) {
        if self.coordinator.seek(SeekTarget::Relative(seconds)) {
            self.publish_playback();
        }
    }

    pub fn seek_absolute(&mut self, seconds: f64) {
        if self.coordinator.seek(SeekTarget::Absolute(seconds)) {
            self.publish_playback();
        }
    }

    // ─── Volume ──────────────────────────────────────────────────

    pub fn set_volume(&mut self, percent: u8) -> u8 {
        let volume = self.coordinator.set_volume(percent);
        self.volume_changed(volume)
    }

    pub fn volume_up(&mut self) -> u8 {
        let volume = self.coordinator.volume_up();
        self.volume_changed(volume)
    }

    pub fn volume_down(&mut self) -> u8 {
        let volume = self.coordinator.volume_down();
        self.volume_changed(volume)
    }

    fn volume_changed(&mut self, volume: u8) -> u8 {
        self.settings.volume = volume;
        self.publish_playback();
        volume
    }

    pub fn mute_toggle(&mut self) -> bool {
        let muted = self.coordinator.toggle_mute();
        self.publish_playback();
        muted
    }

    // ─── Queue ───────────────────────────────────────────────────

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.queue.set_shuffle(enabled);
        self.settings.shuffle = self.queue.shuffle();
        self.publish_queue();
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        let enabled = !self.queue.shuffle();
        self.set_shuffle(enabled);
        enabled
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        let mode = self.queue.cycle_repeat();
        self.settings.repeat = mode;
        self.publish_queue();
        mode
    }

    pub fn add_to_queue(&mut self, track: Track) {
        self.queue.add(track);
        self.publish_queue();
    }

    pub fn insert_next(&mut self, track: Track) {
        self.queue.insert_next(track);
        self.publish_queue();
    }

    /// Removing the playing track does not stop it.
    pub fn remove_from_queue(&mut self, index: usize) -> Option<Track> {
        let removed = self.queue.remove(index);
        if removed.is_some() {
            self.publish_queue();
        }
        removed
    }

    pub fn move_in_queue(&mut self, from: usize, to: usize) {
        self.queue.move_entry(from, to);
        self.publish_queue();
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.publish_queue();
    }

    pub fn jump_to_queue_index(&mut self, index: usize) -> Result<(), PlaybackError> {
        let cursor = self.queue.cursor();
        match self.queue.jump_to(index) {
            Some(track) => self.start(track, cursor),
            None => Err(PlaybackError::NothingToPlay),
        }
    }

    // ─── Equalizer ───────────────────────────────────────────────

    fn equalizer_changed(&mut self) {
        let chain = self.equalizer.effects_string();
        self.coordinator.set_effects_chain(&chain);

        self.settings.eq_bands = *self.equalizer.gains();
        self.settings.eq_enabled = self.equalizer.enabled();
        self.settings.last_preset_name = self.equalizer.active_preset().to_string();
        self.settings.presets = self.equalizer.presets().custom().to_vec();
        self.publish_equalizer();
    }

    pub fn set_band_gain(&mut self, index: usize, db: f32) -> bool {
        let changed = self.equalizer.set_band(index, db);
        if changed {
            self.equalizer_changed();
        }
        changed
    }

    pub fn load_preset(&mut self, name: &str) -> bool {
        let found = self.equalizer.load_preset(name);
        if found {
            self.equalizer_changed();
        } else {
            self.notice(format!("No preset named '{}'", name));
        }
        found
    }

    /// Returns the name the preset was stored under.
    pub fn save_current_as_preset(&mut self, name: &str) -> String {
        let stored = self.equalizer.save_as_preset(name);
        self.equalizer_changed();
        self.notice(format!("Saved preset '{}'", stored));
        stored
    }

    pub fn reset_to_flat(&mut self) {
        self.equalizer.reset_to_flat();
        self.equalizer_changed();
    }

    pub fn toggle_eq(&mut self) -> bool {
        let enabled = self.equalizer.toggle_enabled();
        self.equalizer_changed();
        enabled
    }

    // ─── Event loop ──────────────────────────────────────────────

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        let catalog = self.reporter.catalog_arc();
        let effects = self
            .coordinator
            .handle_event(event, &mut self.queue, catalog.as_ref());
        self.apply_effects(effects);
        self.publish_playback();
    }

    /// Apply one command. Returns `false` for [`Command::Quit`].
    pub fn handle_command(&mut self, command: Command) -> bool {
        let outcome = match command {
            Command::Play {
                track,
                url,
                context,
            } => {
                let url = url.unwrap_or_else(|| self.reporter.catalog().stream_url(&track));
                self.play_track(track, &url, context)
            }
            Command::TogglePause => self.toggle_pause(),
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::Next => self.next(),
            Command::Previous => self.previous(),
            Command::SeekRelative(secs) => {
                self.seek_relative(secs);
                Ok(())
            }
            Command::SeekAbsolute(secs) => {
                self.seek_absolute(secs);
                Ok(())
            }
            Command::SetVolume(volume) => {
                self.set_volume(volume);
                Ok(())
            }
            Command::VolumeUp => {
                self.volume_up();
                Ok(())
            }
            Command::VolumeDown => {
                self.volume_down();
                Ok(())
            }
            Command::ToggleMute => {
                self.mute_toggle();
                Ok(())
            }
            Command::SetShuffle(enabled) => {
                self.set_shuffle(enabled);
                Ok(())
            }
            Command::ToggleShuffle => {
                self.toggle_shuffle();
                Ok(())
            }
            Command::CycleRepeat => {
                self.cycle_repeat();
                Ok(())
            }
            Command::Add(track) => {
                self.add_to_queue(track);
                Ok(())
            }
            Command::InsertNext(track) => {
                self.insert_next(track);
                Ok(())
            }
            Command::Remove(index) => {
                self.remove_from_queue(index);
                Ok(())
            }
            Command::Move { from, to } => {
                self.move_in_queue(from, to);
                Ok(())
            }
            Command::ClearQueue => {
                self.clear_queue();
                Ok(())
            }
            Command::JumpTo(index) => self.jump_to_queue_index(index),
            Command::SetBand { index, db } => {
                self.set_band_gain(index, db);
                Ok(())
            }
            Command::LoadPreset(name) => {
                self.load_preset(&name);
                Ok(())
            }
            Command::SavePreset(name) => {
                self.save_current_as_preset(&name);
                Ok(())
            }
            Command::ResetEq => {
                self.reset_to_flat();
                Ok(())
            }
            Command::ToggleEq => {
                self.toggle_eq();
                Ok(())
            }
            Command::Quit => return false,
        };

        if let Err(e) = outcome {
            tracing::debug!(error = %e, "command had no effect");
        }
        true
    }

    /// Serve commands and engine notifications until `Quit` or until every
    /// command sender is gone. Returns the final settings.
    pub async fn run(
        mut self,
        mut commands: UnboundedReceiver<Command>,
        mut events: UnboundedReceiver<EngineEvent>,
    ) -> PersistentState {
        self.publish_all();
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    None => break,
                },
                Some(event) = events.recv() => self.handle_engine_event(event),
            }
        }

        self.coordinator.stop();
        tracing::info!("orchestrator stopped");
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LocalCatalog;
    use crate::eq::{CUSTOM_LABEL, FLAT_PRESET};
    use crate::player::{EngineNotification, NullEngine, PlaybackStatus};

    fn orchestrator() -> (Orchestrator, UnboundedReceiver<StateUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(
            Box::new(NullEngine::default()),
            Arc::new(LocalCatalog),
            PersistentState::default(),
            UserConfig::default(),
            tx,
        )
        .with_queue(QueueEngine::with_seed(3))
        .with_inline_reports();
        (orchestrator, rx)
    }

    fn tracks() -> Vec<Track> {
        vec![
            Track::new("a", "A", 200),
            Track::new("b", "B", 150),
            Track::new("c", "C", 90),
        ]
    }

    fn drain(rx: &mut UnboundedReceiver<StateUpdate>) -> Vec<StateUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    fn position(o: &mut Orchestrator, secs: f64) {
        let generation = o.coordinator.generation();
        o.handle_engine_event(EngineEvent::new(generation, EngineNotification::Position(secs)));
    }

    #[test]
    fn play_with_context_installs_queue() {
        let (mut o, mut rx) = orchestrator();
        let context = QueueContext {
            tracks: tracks(),
            start_index: 1,
        };
        o.play_track(tracks()[1].clone(), "b", Some(context)).unwrap();

        assert_eq!(o.queue().current_index(), Some(1));
        assert_eq!(o.playback().status, PlaybackStatus::Playing);
        let updates = drain(&mut rx);
        assert!(updates.iter().any(|u| matches!(u, StateUpdate::Queue(q) if q.tracks.len() == 3)));
        assert!(updates.iter().any(|u| matches!(u, StateUpdate::Playback(_))));
    }

    #[test]
    fn next_and_previous_walk_the_queue() {
        let (mut o, _rx) = orchestrator();
        o.play_track(tracks()[0].clone(), "a", Some(QueueContext { tracks: tracks(), start_index: 0 }))
            .unwrap();

        o.next().unwrap();
        o.next().unwrap();
        assert_eq!(o.playback().current_track.as_ref().unwrap().id, "c");
        assert!(o.next().is_err());
        assert_eq!(o.queue().current_index(), Some(2));

        o.previous().unwrap();
        assert_eq!(o.playback().current_track.as_ref().unwrap().id, "b");
    }

    #[test]
    fn previous_restarts_past_threshold() {
        let (mut o, _rx) = orchestrator();
        o.play_track(tracks()[0].clone(), "a", Some(QueueContext { tracks: tracks(), start_index: 1 }))
            .unwrap();
        position(&mut o, 42.0);

        o.previous().unwrap();
        assert_eq!(o.playback().position_secs, 0.0);
        assert_eq!(o.queue().current_index(), Some(1));

        position(&mut o, 1.0);
        o.previous().unwrap();
        assert_eq!(o.queue().current_index(), Some(0));
    }

    #[test]
    fn toggle_pause_from_stopped_starts_queue() {
        let (mut o, _rx) = orchestrator();
        assert!(matches!(o.toggle_pause(), Err(PlaybackError::NothingToPlay)));

        for t in tracks() {
            o.add_to_queue(t);
        }
        o.toggle_pause().unwrap();
        assert_eq!(o.playback().status, PlaybackStatus::Playing);
        assert_eq!(o.playback().current_track.as_ref().unwrap().id, "a");

        o.toggle_pause().unwrap();
        assert_eq!(o.playback().status, PlaybackStatus::Paused);
    }

    #[test]
    fn exhausting_the_queue_posts_notice() {
        let (mut o, mut rx) = orchestrator();
        o.play_track(tracks()[2].clone(), "c", Some(QueueContext { tracks: tracks(), start_index: 2 }))
            .unwrap();
        drain(&mut rx);

        let generation = o.coordinator.generation();
        o.handle_engine_event(EngineEvent::new(generation, EngineNotification::EndOfMedia));
        assert_eq!(o.playback().status, PlaybackStatus::Stopped);
        let updates = drain(&mut rx);
        assert!(updates.contains(&StateUpdate::Notice("End of queue".to_string())));
    }

    #[test]
    fn settings_follow_changes() {
        let (mut o, _rx) = orchestrator();
        assert_eq!(o.volume_down(), 70);
        assert!(o.mute_toggle());
        assert_eq!(o.settings().volume, 70);

        o.toggle_shuffle();
        assert!(o.settings().shuffle);
        assert_eq!(o.cycle_repeat(), RepeatMode::All);
        assert_eq!(o.settings().repeat, RepeatMode::All);

        assert!(o.set_band_gain(0, 6.0));
        assert_eq!(o.settings().eq_bands[0], 6.0);
        assert_eq!(o.settings().last_preset_name, CUSTOM_LABEL);

        assert_eq!(o.save_current_as_preset("Rock"), "Rock (Custom)");
        assert_eq!(o.settings().presets.len(), 1);

        o.reset_to_flat();
        assert_eq!(o.settings().last_preset_name, FLAT_PRESET);
        assert!(!o.toggle_eq());
        assert!(!o.settings().eq_enabled);
    }

    #[test]
    fn unknown_preset_changes_nothing() {
        let (mut o, mut rx) = orchestrator();
        drain(&mut rx);
        assert!(!o.load_preset("Polka"));
        assert_eq!(o.settings().last_preset_name, FLAT_PRESET);
        assert!(matches!(drain(&mut rx).as_slice(), [StateUpdate::Notice(_)]));
    }

    #[test]
    fn removing_current_keeps_playing() {
        let (mut o, _rx) = orchestrator();
        o.play_track(tracks()[0].clone(), "a", Some(QueueContext { tracks: tracks(), start_index: 0 }))
            .unwrap();
        assert_eq!(o.remove_from_queue(0).unwrap().id, "a");
        assert_eq!(o.playback().status, PlaybackStatus::Playing);
        assert_eq!(o.queue().current_index(), Some(0));
        assert!(o.remove_from_queue(10).is_none());
    }

    #[test]
    fn quit_ends_command_handling() {
        let (mut o, _rx) = orchestrator();
        assert!(o.handle_command(Command::VolumeUp));
        assert_eq!(o.settings().volume, 80);
        assert!(!o.handle_command(Command::Quit));
    }
}

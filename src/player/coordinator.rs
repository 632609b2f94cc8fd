//! Playback state machine sitting between the facade and the audio engine.
//!
//! Commands go out to the engine, notifications come back tagged with a
//! generation. Everything here runs on the orchestrator task, which is the
//! only place `PlaybackState` is mutated.

use super::state::{PlaybackState, PlaybackStatus};
use super::traits::{AudioEngine, EngineEvent, EngineNotification, Generation, SeekTarget};
use crate::catalog::Catalog;
use crate::error::PlaybackError;
use crate::model::Track;
use crate::queue::QueueEngine;

/// Report as played past this fraction of the duration...
pub const SCROBBLE_FRACTION: f64 = 0.5;
/// ...or past this many seconds, whichever comes first.
pub const SCROBBLE_AFTER_SECS: f64 = 240.0;

pub const DEFAULT_VOLUME_STEP: u8 = 5;

/// Side effects for the facade to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    TrackStarted(Track),
    ReportNowPlaying(String),
    ReportPlayed(String),
    QueueExhausted,
    PlaybackFailed(String),
}

pub struct PlaybackCoordinator {
    engine: Box<dyn AudioEngine>,
    state: PlaybackState,
    generation: Generation,
    volume_step: u8,
}

impl PlaybackCoordinator {
    pub fn new(mut engine: Box<dyn AudioEngine>, volume: u8, volume_step: u8) -> Self {
        let state = PlaybackState::new(volume);
        if let Err(e) = engine.set_volume(state.volume) {
            tracing::warn!(error = %e, "initial volume not applied");
        }
        Self {
            engine,
            state,
            generation: 0,
            volume_step,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    // ─── Transport ───────────────────────────────────────────────

    /// Start `track`. On engine refusal nothing changes and the error is
    /// returned.
    pub fn play(&mut self, track: Track, url: &str) -> Result<Vec<Effect>, PlaybackError> {
        let generation = self.generation + 1;
        self.engine.load_and_play(url, generation)?;

        tracing::info!(track = %track.id, generation, "playing");
        self.generation = generation;
        self.state.status = PlaybackStatus::Playing;
        self.state.position_secs = 0.0;
        self.state.duration_secs = f64::from(track.duration_secs);
        self.state.scrobble_reported = false;
        self.state.current_track = Some(track.clone());

        Ok(vec![
            Effect::ReportNowPlaying(track.id.clone()),
            Effect::TrackStarted(track),
        ])
    }

    pub fn pause(&mut self) -> bool {
        if self.state.status != PlaybackStatus::Playing {
            return false;
        }
        match self.engine.pause() {
            Ok(()) => {
                self.state.status = PlaybackStatus::Paused;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "pause failed");
                false
            }
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.state.status != PlaybackStatus::Paused {
            return false;
        }
        match self.engine.resume() {
            Ok(()) => {
                self.state.status = PlaybackStatus::Playing;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "resume failed");
                false
            }
        }
    }

    /// Playing <-> Paused. Does nothing while stopped.
    pub fn toggle_pause(&mut self) -> bool {
        match self.state.status {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Paused => self.resume(),
            PlaybackStatus::Stopped => false,
        }
    }

    pub fn stop(&mut self) {
        if !self.state.is_active() {
            return;
        }
        if let Err(e) = self.engine.stop() {
            tracing::warn!(error = %e, "stop failed");
        }
        self.enter_stopped();
    }

    fn enter_stopped(&mut self) {
        // Anything still in flight for the old track is now stale
        self.generation += 1;
        self.state.status = PlaybackStatus::Stopped;
        self.state.current_track = None;
        self.state.position_secs = 0.0;
        self.state.duration_secs = 0.0;
    }

    /// Seek within the current track. Ignored while stopped.
    pub fn seek(&mut self, target: SeekTarget) -> bool {
        if !self.state.is_active() {
            return false;
        }
        let wanted = match target {
            SeekTarget::Relative(delta) => self.state.position_secs + delta,
            SeekTarget::Absolute(pos) => pos,
        };
        let mut position = wanted.max(0.0);
        if self.state.duration_secs > 0.0 {
            position = position.min(self.state.duration_secs);
        }

        if let Err(e) = self.engine.seek(target) {
            tracing::warn!(error = %e, "seek failed");
            return false;
        }
        self.state.position_secs = position;
        true
    }

    // ─── Volume ──────────────────────────────────────────────────

    pub fn set_volume(&mut self, percent: u8) -> u8 {
        self.state.volume = percent.min(100);
        if let Err(e) = self.engine.set_volume(self.state.volume) {
            tracing::warn!(error = %e, "set volume failed");
        }
        self.state.volume
    }

    pub fn volume_up(&mut self) -> u8 {
        self.set_volume(self.state.volume.saturating_add(self.volume_step))
    }

    pub fn volume_down(&mut self) -> u8 {
        self.set_volume(self.state.volume.saturating_sub(self.volume_step))
    }

    /// Mute sits on top of the stored volume, which it never changes.
    pub fn toggle_mute(&mut self) -> bool {
        self.state.muted = !self.state.muted;
        if let Err(e) = self.engine.set_muted(self.state.muted) {
            tracing::warn!(error = %e, "set mute failed");
        }
        self.state.muted
    }

    pub fn set_effects_chain(&mut self, descriptor: &str) {
        tracing::debug!(%descriptor, "effects chain");
        if let Err(e) = self.engine.set_effects_chain(descriptor) {
            tracing::warn!(error = %e, "effects chain rejected");
        }
    }

    // ─── Engine notifications ────────────────────────────────────

    /// Apply one engine notification. On end of media the next queued
    /// track is started right away.
    pub fn handle_event(
        &mut self,
        event: EngineEvent,
        queue: &mut QueueEngine,
        catalog: &dyn Catalog,
    ) -> Vec<Effect> {
        if event.generation != self.generation || !self.state.is_active() {
            tracing::trace!(
                generation = event.generation,
                current = self.generation,
                "stale engine notification dropped"
            );
            return Vec::new();
        }

        match event.notification {
            EngineNotification::Position(position) => self.on_position(position),
            EngineNotification::Duration(duration) => {
                if duration.is_finite() && duration > 0.0 {
                    self.state.duration_secs = duration;
                }
                Vec::new()
            }
            EngineNotification::PauseChanged(paused) => {
                self.state.status = if paused {
                    PlaybackStatus::Paused
                } else {
                    PlaybackStatus::Playing
                };
                Vec::new()
            }
            EngineNotification::EndOfMedia => self.on_end_of_media(queue, catalog),
            EngineNotification::Error(message) => {
                tracing::error!(%message, "playback failed mid-track");
                self.enter_stopped();
                vec![Effect::PlaybackFailed(message)]
            }
        }
    }

    fn on_position(&mut self, position: f64) -> Vec<Effect> {
        if !position.is_finite() {
            return Vec::new();
        }
        self.state.position_secs = position.max(0.0);

        if self.state.scrobble_reported || !passed_scrobble_point(position, self.state.duration_secs) {
            return Vec::new();
        }
        self.state.scrobble_reported = true;
        match &self.state.current_track {
            Some(track) => vec![Effect::ReportPlayed(track.id.clone())],
            None => Vec::new(),
        }
    }

    fn on_end_of_media(&mut self, queue: &mut QueueEngine, catalog: &dyn Catalog) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(finished) = self.state.current_track.as_ref() {
            tracing::debug!(track = %finished.id, "end of media");
            if !self.state.scrobble_reported {
                effects.push(Effect::ReportPlayed(finished.id.clone()));
            }
        }
        self.state.scrobble_reported = true;
        self.enter_stopped();

        match queue.next() {
            Some(next) => {
                let url = catalog.stream_url(&next);
                match self.play(next, &url) {
                    Ok(started) => effects.extend(started),
                    Err(e) => effects.push(Effect::PlaybackFailed(e.to_string())),
                }
            }
            None => effects.push(Effect::QueueExhausted),
        }
        effects
    }
}

/// Past half the track (when its length is known) or past four minutes.
pub fn passed_scrobble_point(position: f64, duration: f64) -> bool {
    let half_way = duration > 0.0 && position / duration > SCROBBLE_FRACTION;
    half_way || position > SCROBBLE_AFTER_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LocalCatalog;
    use crate::error::EngineError;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Cmd {
        Load(String, Generation),
        Pause,
        Resume,
        Stop,
        Seek(SeekTarget),
        Volume(u8),
        Muted(bool),
        Effects(String),
    }

    #[derive(Clone, Default)]
    struct FakeEngine {
        log: Arc<Mutex<Vec<Cmd>>>,
        refuse_loads: Arc<Mutex<bool>>,
    }

    impl FakeEngine {
        fn push(&self, cmd: Cmd) -> Result<(), EngineError> {
            self.log.lock().unwrap().push(cmd);
            Ok(())
        }
        fn commands(&self) -> Vec<Cmd> {
            self.log.lock().unwrap().clone()
        }
    }

    impl AudioEngine for FakeEngine {
        fn load_and_play(&mut self, url: &str, generation: Generation) -> Result<(), EngineError> {
            if *self.refuse_loads.lock().unwrap() {
                return Err(EngineError::Unplayable {
                    url: url.to_string(),
                    reason: "bad stream".to_string(),
                });
            }
            self.push(Cmd::Load(url.to_string(), generation))
        }
        fn pause(&mut self) -> Result<(), EngineError> {
            self.push(Cmd::Pause)
        }
        fn resume(&mut self) -> Result<(), EngineError> {
            self.push(Cmd::Resume)
        }
        fn stop(&mut self) -> Result<(), EngineError> {
            self.push(Cmd::Stop)
        }
        fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError> {
            self.push(Cmd::Seek(target))
        }
        fn set_volume(&mut self, percent: u8) -> Result<(), EngineError> {
            self.push(Cmd::Volume(percent))
        }
        fn set_muted(&mut self, muted: bool) -> Result<(), EngineError> {
            self.push(Cmd::Muted(muted))
        }
        fn set_effects_chain(&mut self, descriptor: &str) -> Result<(), EngineError> {
            self.push(Cmd::Effects(descriptor.to_string()))
        }
    }

    fn coordinator() -> (PlaybackCoordinator, FakeEngine) {
        let engine = FakeEngine::default();
        let coordinator = PlaybackCoordinator::new(Box::new(engine.clone()), 75, DEFAULT_VOLUME_STEP);
        (coordinator, engine)
    }

    fn event(c: &PlaybackCoordinator, notification: EngineNotification) -> EngineEvent {
        EngineEvent::new(c.generation(), notification)
    }

    fn played(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::ReportPlayed(_)))
            .count()
    }

    #[test]
    fn play_resets_state_and_reports_now_playing() {
        let (mut c, engine) = coordinator();
        let effects = c.play(Track::new("a", "A", 200), "a.flac").unwrap();

        assert_eq!(c.state().status, PlaybackStatus::Playing);
        assert_eq!(c.state().duration_secs, 200.0);
        assert_eq!(c.state().position_secs, 0.0);
        assert!(!c.state().scrobble_reported);
        assert!(effects.contains(&Effect::ReportNowPlaying("a".to_string())));
        assert!(engine.commands().contains(&Cmd::Load("a.flac".to_string(), 1)));
    }

    #[test]
    fn refused_load_keeps_previous_track() {
        let (mut c, engine) = coordinator();
        c.play(Track::new("a", "A", 200), "a.flac").unwrap();
        let generation = c.generation();

        *engine.refuse_loads.lock().unwrap() = true;
        let err = c.play(Track::new("b", "B", 100), "b.flac").unwrap_err();
        assert!(matches!(err, PlaybackError::Transport(_)));

        assert_eq!(c.state().status, PlaybackStatus::Playing);
        assert_eq!(c.state().current_track.as_ref().unwrap().id, "a");
        assert_eq!(c.generation(), generation);
    }

    #[test]
    fn pause_resume_are_idempotent() {
        let (mut c, engine) = coordinator();
        assert!(!c.pause());
        c.play(Track::new("a", "A", 200), "a").unwrap();

        assert!(c.pause());
        assert!(!c.pause());
        assert_eq!(c.state().status, PlaybackStatus::Paused);
        assert!(c.resume());
        assert!(!c.resume());

        let pauses = engine.commands().iter().filter(|c| **c == Cmd::Pause).count();
        assert_eq!(pauses, 1);
    }

    #[test]
    fn engine_pause_state_wins() {
        let (mut c, _) = coordinator();
        c.play(Track::new("a", "A", 200), "a").unwrap();
        let q = &mut QueueEngine::with_seed(1);

        c.handle_event(event(&c, EngineNotification::PauseChanged(true)), q, &LocalCatalog);
        assert_eq!(c.state().status, PlaybackStatus::Paused);
        c.handle_event(event(&c, EngineNotification::PauseChanged(false)), q, &LocalCatalog);
        assert_eq!(c.state().status, PlaybackStatus::Playing);
    }

    #[test]
    fn scrobbles_once_even_after_seeking_back() {
        let (mut c, _) = coordinator();
        c.play(Track::new("a", "A", 200), "a").unwrap();
        let q = &mut QueueEngine::with_seed(1);

        let mut reports = 0;
        for pos in [10.0, 99.0, 101.0, 150.0] {
            reports += played(&c.handle_event(event(&c, EngineNotification::Position(pos)), q, &LocalCatalog));
        }
        c.seek(SeekTarget::Absolute(5.0));
        for pos in [6.0, 120.0, 199.0] {
            reports += played(&c.handle_event(event(&c, EngineNotification::Position(pos)), q, &LocalCatalog));
        }
        reports += played(&c.handle_event(event(&c, EngineNotification::EndOfMedia), q, &LocalCatalog));

        assert_eq!(reports, 1);
    }

    #[test]
    fn unknown_duration_uses_four_minute_rule() {
        let (mut c, _) = coordinator();
        c.play(Track::new("live", "Live", 0), "live").unwrap();
        let q = &mut QueueEngine::with_seed(1);

        let early = c.handle_event(event(&c, EngineNotification::Position(200.0)), q, &LocalCatalog);
        assert_eq!(played(&early), 0);
        let late = c.handle_event(event(&c, EngineNotification::Position(241.0)), q, &LocalCatalog);
        assert_eq!(played(&late), 1);
    }

    #[test]
    fn engine_duration_overrides_catalog_duration() {
        let (mut c, _) = coordinator();
        c.play(Track::new("a", "A", 200), "a").unwrap();
        let q = &mut QueueEngine::with_seed(1);
        c.handle_event(event(&c, EngineNotification::Duration(212.5)), q, &LocalCatalog);
        assert_eq!(c.state().duration_secs, 212.5);
        c.handle_event(event(&c, EngineNotification::Duration(0.0)), q, &LocalCatalog);
        assert_eq!(c.state().duration_secs, 212.5);
    }

    #[test]
    fn stale_notifications_are_dropped() {
        let (mut c, _) = coordinator();
        c.play(Track::new("a", "A", 200), "a").unwrap();
        let old = c.generation();
        c.play(Track::new("b", "B", 200), "b").unwrap();
        let q = &mut QueueEngine::with_seed(1);

        let effects = c.handle_event(EngineEvent::new(old, EngineNotification::Position(150.0)), q, &LocalCatalog);
        assert!(effects.is_empty());
        assert_eq!(c.state().position_secs, 0.0);

        let effects = c.handle_event(EngineEvent::new(old, EngineNotification::EndOfMedia), q, &LocalCatalog);
        assert!(effects.is_empty());
        assert_eq!(c.state().current_track.as_ref().unwrap().id, "b");
    }

    #[test]
    fn position_after_stop_is_ignored() {
        let (mut c, engine) = coordinator();
        c.play(Track::new("a", "A", 200), "a").unwrap();
        let in_flight = event(&c, EngineNotification::Position(50.0));
        c.stop();

        let q = &mut QueueEngine::with_seed(1);
        c.handle_event(in_flight, q, &LocalCatalog);
        assert_eq!(c.state().status, PlaybackStatus::Stopped);
        assert_eq!(c.state().position_secs, 0.0);
        assert!(c.state().current_track.is_none());
        assert!(engine.commands().contains(&Cmd::Stop));
    }

    #[test]
    fn end_of_media_advances_the_queue() {
        let (mut c, engine) = coordinator();
        let mut q = QueueEngine::with_seed(1);
        q.set_queue(vec![Track::new("a", "A", 200), Track::new("b", "B", 150)], 0);
        c.play(Track::new("a", "A", 200), "a").unwrap();

        let effects = c.handle_event(event(&c, EngineNotification::EndOfMedia), &mut q, &LocalCatalog);
        assert_eq!(played(&effects), 1);
        assert!(effects.contains(&Effect::ReportNowPlaying("b".to_string())));
        assert_eq!(c.state().status, PlaybackStatus::Playing);
        assert_eq!(c.state().current_track.as_ref().unwrap().id, "b");
        assert!(engine.commands().contains(&Cmd::Load("b".to_string(), c.generation())));

        let effects = c.handle_event(event(&c, EngineNotification::EndOfMedia), &mut q, &LocalCatalog);
        assert!(effects.contains(&Effect::QueueExhausted));
        assert_eq!(c.state().status, PlaybackStatus::Stopped);
    }

    #[test]
    fn mid_track_error_stops_without_advancing() {
        let (mut c, _) = coordinator();
        let mut q = QueueEngine::with_seed(1);
        q.set_queue(vec![Track::new("a", "A", 200), Track::new("b", "B", 150)], 0);
        c.play(Track::new("a", "A", 200), "a").unwrap();

        let effects = c.handle_event(
            event(&c, EngineNotification::Error("decoder died".to_string())),
            &mut q,
            &LocalCatalog,
        );
        assert_eq!(effects, vec![Effect::PlaybackFailed("decoder died".to_string())]);
        assert_eq!(c.state().status, PlaybackStatus::Stopped);
        assert_eq!(q.current_index(), Some(0));
    }

    #[test]
    fn seek_is_clamped_and_ignored_when_stopped() {
        let (mut c, engine) = coordinator();
        assert!(!c.seek(SeekTarget::Relative(10.0)));

        c.play(Track::new("a", "A", 100), "a").unwrap();
        c.seek(SeekTarget::Relative(-30.0));
        assert_eq!(c.state().position_secs, 0.0);
        c.seek(SeekTarget::Absolute(500.0));
        assert_eq!(c.state().position_secs, 100.0);
        assert!(engine.commands().contains(&Cmd::Seek(SeekTarget::Relative(-30.0))));
    }

    #[test]
    fn volume_steps_and_mute_overlay() {
        let (mut c, engine) = coordinator();
        assert_eq!(c.volume_down(), 70);

        assert!(c.toggle_mute());
        assert_eq!(c.state().volume, 70);
        assert!(!c.toggle_mute());
        assert_eq!(c.state().volume, 70);

        c.set_volume(98);
        assert_eq!(c.volume_up(), 100);
        c.set_volume(3);
        assert_eq!(c.volume_down(), 0);
        assert_eq!(c.set_volume(250), 100);

        assert!(engine.commands().contains(&Cmd::Muted(true)));
        assert!(engine.commands().contains(&Cmd::Volume(70)));
    }

    #[test]
    fn effects_chain_is_forwarded() {
        let (mut c, engine) = coordinator();
        c.set_effects_chain("");
        assert!(engine.commands().contains(&Cmd::Effects(String::new())));
    }

    #[test]
    fn scrobble_threshold() {
        assert!(!passed_scrobble_point(100.0, 200.0));
        assert!(passed_scrobble_point(100.1, 200.0));
        assert!(passed_scrobble_point(240.5, 1000.0));
        assert!(!passed_scrobble_point(239.0, 0.0));
    }
}

use super::traits::{AudioEngine, EngineEvent, EngineEventSender, EngineNotification, Generation, SeekTarget};
use crate::error::EngineError;

/// Engine without an output device. Accepts every command and confirms
/// pause changes, so the rest of the player behaves normally.
///
/// Used with `--no-audio` and when another instance holds the audio lock.
#[derive(Default)]
pub struct NullEngine {
    events: Option<EngineEventSender>,
    generation: Generation,
}

impl NullEngine {
    pub fn new(events: Option<EngineEventSender>) -> Self {
        Self {
            events,
            generation: 0,
        }
    }

    fn notify(&self, notification: EngineNotification) {
        if let Some(tx) = &self.events {
            let _ = tx.send(EngineEvent::new(self.generation, notification));
        }
    }
}

impl AudioEngine for NullEngine {
    fn load_and_play(&mut self, url: &str, generation: Generation) -> Result<(), EngineError> {
        tracing::debug!(%url, generation, "null engine: load");
        self.generation = generation;
        self.notify(EngineNotification::PauseChanged(false));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.notify(EngineNotification::PauseChanged(true));
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        self.notify(EngineNotification::PauseChanged(false));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn seek(&mut self, _target: SeekTarget) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_volume(&mut self, _percent: u8) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_muted(&mut self, _muted: bool) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_effects_chain(&mut self, _descriptor: &str) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn confirms_pause_changes_for_current_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = NullEngine::new(Some(tx));
        engine.load_and_play("a.flac", 7).unwrap();
        engine.pause().unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first, EngineEvent::new(7, EngineNotification::PauseChanged(false)));
        let second = rx.try_recv().unwrap();
        assert_eq!(second.notification, EngineNotification::PauseChanged(true));
    }

    #[test]
    fn silent_without_channel() {
        let mut engine = NullEngine::default();
        assert!(engine.load_and_play("x", 1).is_ok());
        assert!(engine.set_effects_chain("superequalizer=1b=2.000").is_ok());
    }
}

//! Bundled audio engine: rodio output on a dedicated thread.
//!
//! The output stream is not `Send`, so a single thread owns it along with
//! the active sink and takes commands over a channel. Media is read fully
//! into memory before playback starts, which is also what makes seeking
//! possible: a seek rebuilds the sink from the buffered bytes.
//!
//! Loading never blocks the caller. A short-lived fetch thread downloads
//! the media and hands it back to the audio thread, which drops it if a
//! newer load or a stop came in meanwhile. Anything that goes wrong after
//! `load_and_play` returned is reported as [`EngineNotification::Error`].

use super::dsp::{EffectsChain, EqSource};
use crate::error::EngineError;
use crate::player::{
    AudioEngine, EngineEvent, EngineEventSender, EngineNotification, Generation, SeekTarget,
};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Position report interval
const TICK: Duration = Duration::from_millis(250);
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

enum AudioCommand {
    Load {
        url: String,
        generation: Generation,
    },
    /// Sent by the fetch thread once the media is in memory (or not)
    Fetched {
        url: String,
        generation: Generation,
        media: Result<Arc<[u8]>, String>,
    },
    Pause,
    Resume,
    Stop,
    Seek(SeekTarget),
    Volume(u8),
    Muted(bool),
    Shutdown,
}

/// The generation the caller wants to hear. Zero means "nothing": set by
/// `stop`, never used by a real load.
#[derive(Debug, Clone, Default)]
struct LoadGate(Arc<AtomicU64>);

impl LoadGate {
    fn request(&self, generation: Generation) {
        self.0.store(generation, Ordering::Release);
    }

    fn cancel(&self) {
        self.0.store(0, Ordering::Release);
    }

    fn is_wanted(&self, generation: Generation) -> bool {
        generation != 0 && self.0.load(Ordering::Acquire) == generation
    }
}

pub struct RodioEngine {
    tx: Sender<AudioCommand>,
    effects: EffectsChain,
    gate: LoadGate,
    thread: Option<JoinHandle<()>>,
}

impl RodioEngine {
    /// Open the default output device and start the audio thread.
    pub fn spawn(events: EngineEventSender) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let effects = EffectsChain::default();
        let thread_effects = effects.clone();
        let gate = LoadGate::default();
        let thread_gate = gate.clone();
        let loopback = tx.clone();

        let thread = thread::Builder::new()
            .name("naviplay-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(EngineError::Unavailable(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                AudioThread::new(handle, events, thread_effects, thread_gate, loopback).run(rx);
            })
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!("audio output opened");
                Ok(Self {
                    tx,
                    effects,
                    gate,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(EngineError::Unavailable("audio thread exited".to_string())),
        }
    }

    fn send(&self, cmd: AudioCommand) -> Result<(), EngineError> {
        self.tx
            .send(cmd)
            .map_err(|_| EngineError::Unavailable("audio thread stopped".to_string()))
    }
}

impl AudioEngine for RodioEngine {
    fn load_and_play(&mut self, url: &str, generation: Generation) -> Result<(), EngineError> {
        check_location(url)?;
        self.gate.request(generation);
        self.send(AudioCommand::Load {
            url: url.to_string(),
            generation,
        })
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.send(AudioCommand::Pause)
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        self.send(AudioCommand::Resume)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.gate.cancel();
        self.send(AudioCommand::Stop)
    }

    fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError> {
        self.send(AudioCommand::Seek(target))
    }

    fn set_volume(&mut self, percent: u8) -> Result<(), EngineError> {
        self.send(AudioCommand::Volume(percent.min(100)))
    }

    fn set_muted(&mut self, muted: bool) -> Result<(), EngineError> {
        self.send(AudioCommand::Muted(muted))
    }

    fn set_effects_chain(&mut self, descriptor: &str) -> Result<(), EngineError> {
        self.effects.apply(descriptor)
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        self.gate.cancel();
        let _ = self.tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Wall-clock playback position, paused time excluded.
#[derive(Debug, Clone, Copy, Default)]
struct Clock {
    offset: Duration,
    started: Option<Instant>,
}

impl Clock {
    fn running_from(offset: Duration) -> Self {
        Self {
            offset,
            started: Some(Instant::now()),
        }
    }

    fn position(&self) -> Duration {
        self.offset + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }

    fn is_running(&self) -> bool {
        self.started.is_some()
    }

    fn pause(&mut self) {
        self.offset = self.position();
        self.started = None;
    }

    fn resume(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }
}

struct Loaded {
    generation: Generation,
    media: Arc<[u8]>,
    sink: Sink,
    duration: Option<Duration>,
    clock: Clock,
    ended: bool,
}

struct AudioThread {
    handle: OutputStreamHandle,
    events: EngineEventSender,
    effects: EffectsChain,
    gate: LoadGate,
    /// Lets fetch threads post their result back into the command loop
    loopback: Sender<AudioCommand>,
    volume: u8,
    muted: bool,
    /// Last pause request, kept so a load still being fetched honours it
    paused: bool,
    current: Option<Loaded>,
}

impl AudioThread {
    fn new(
        handle: OutputStreamHandle,
        events: EngineEventSender,
        effects: EffectsChain,
        gate: LoadGate,
        loopback: Sender<AudioCommand>,
    ) -> Self {
        Self {
            handle,
            events,
            effects,
            gate,
            loopback,
            volume: 100,
            muted: false,
            paused: false,
            current: None,
        }
    }

    fn run(mut self, rx: Receiver<AudioCommand>) {
        loop {
            match rx.recv_timeout(TICK) {
                Ok(AudioCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(cmd) => self.handle(cmd),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.tick();
        }
        if let Some(current) = self.current.take() {
            current.sink.stop();
        }
        tracing::debug!("audio thread exiting");
    }

    fn notify(&self, generation: Generation, notification: EngineNotification) {
        let _ = self.events.send(EngineEvent::new(generation, notification));
    }

    fn output_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.volume as f32 / 100.0).powf(3.0)
        }
    }

    /// Fresh sink for `media`, starting `skip` into the track.
    fn open(
        &self,
        media: &Arc<[u8]>,
        skip: Duration,
        paused: bool,
    ) -> Result<(Sink, Option<Duration>), String> {
        let sink = Sink::try_new(&self.handle).map_err(|e| e.to_string())?;
        sink.set_volume(self.output_gain());
        let duration = fill_sink(&sink, media, skip, paused, &self.effects)?;
        Ok((sink, duration))
    }

    fn handle(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Load { url, generation } => {
                // Superseded right away, even though the new media is not in yet
                if let Some(previous) = self.current.take() {
                    previous.sink.stop();
                }
                self.paused = false;
                spawn_fetch(url, generation, self.loopback.clone());
            }
            AudioCommand::Fetched {
                url,
                generation,
                media,
            } => self.on_fetched(&url, generation, media),
            AudioCommand::Pause => {
                self.paused = true;
                if let Some(current) = self.current.as_mut() {
                    current.sink.pause();
                    current.clock.pause();
                    let generation = current.generation;
                    self.notify(generation, EngineNotification::PauseChanged(true));
                }
            }
            AudioCommand::Resume => {
                self.paused = false;
                if let Some(current) = self.current.as_mut() {
                    current.sink.play();
                    current.clock.resume();
                    let generation = current.generation;
                    self.notify(generation, EngineNotification::PauseChanged(false));
                }
            }
            AudioCommand::Stop => {
                if let Some(current) = self.current.take() {
                    current.sink.stop();
                }
            }
            AudioCommand::Seek(target) => self.seek(target),
            AudioCommand::Volume(volume) => {
                self.volume = volume;
                self.apply_gain();
            }
            AudioCommand::Muted(muted) => {
                self.muted = muted;
                self.apply_gain();
            }
            AudioCommand::Shutdown => {}
        }
    }

    fn apply_gain(&self) {
        if let Some(current) = &self.current {
            current.sink.set_volume(self.output_gain());
        }
    }

    fn on_fetched(&mut self, url: &str, generation: Generation, media: Result<Arc<[u8]>, String>) {
        if !self.gate.is_wanted(generation) {
            tracing::debug!(%url, generation, "superseded load dropped");
            return;
        }
        let opened = media.and_then(|media| {
            let (sink, duration) = self.open(&media, Duration::ZERO, self.paused)?;
            Ok((media, sink, duration))
        });
        let (media, sink, duration) = match opened {
            Ok(loaded) => loaded,
            Err(reason) => {
                tracing::warn!(%url, %reason, "load failed");
                self.notify(generation, EngineNotification::Error(reason));
                return;
            }
        };
        tracing::debug!(%url, generation, ?duration, "loaded");

        self.current = Some(Loaded {
            generation,
            media,
            sink,
            duration,
            clock: if self.paused {
                Clock::default()
            } else {
                Clock::running_from(Duration::ZERO)
            },
            ended: false,
        });
        if let Some(duration) = duration {
            self.notify(generation, EngineNotification::Duration(duration.as_secs_f64()));
        }
        self.notify(generation, EngineNotification::PauseChanged(self.paused));
    }

    fn seek(&mut self, target: SeekTarget) {
        let Some(current) = self.current.as_ref() else {
            return;
        };
        let now = current.clock.position().as_secs_f64();
        let wanted = match target {
            SeekTarget::Relative(delta) => now + delta,
            SeekTarget::Absolute(pos) => pos,
        };
        let mut secs = wanted.max(0.0);
        if let Some(duration) = current.duration {
            secs = secs.min(duration.as_secs_f64());
        }
        let position = Duration::from_secs_f64(secs);
        let media = current.media.clone();
        let running = current.clock.is_running();
        let generation = current.generation;

        match self.open(&media, position, !running) {
            Ok((sink, _)) => {
                if let Some(current) = self.current.as_mut() {
                    current.sink.stop();
                    current.sink = sink;
                    current.clock = if running {
                        Clock::running_from(position)
                    } else {
                        Clock {
                            offset: position,
                            started: None,
                        }
                    };
                    current.ended = false;
                }
                self.notify(generation, EngineNotification::Position(secs));
            }
            Err(reason) => {
                tracing::warn!(%reason, "seek failed");
                if let Some(current) = self.current.take() {
                    current.sink.stop();
                }
                self.notify(generation, EngineNotification::Error(reason));
            }
        }
    }

    fn tick(&mut self) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if current.ended || !current.clock.is_running() {
            return;
        }
        let generation = current.generation;

        if current.sink.empty() {
            current.ended = true;
            self.notify(generation, EngineNotification::EndOfMedia);
            return;
        }

        let mut position = current.clock.position();
        if let Some(duration) = current.duration {
            position = position.min(duration);
        }
        self.notify(generation, EngineNotification::Position(position.as_secs_f64()));
    }
}

/// Decode `media` into `sink` through the EQ stage. A paused sink is paused
/// before anything is appended, so it stays silent from the first sample.
fn fill_sink(
    sink: &Sink,
    media: &Arc<[u8]>,
    skip: Duration,
    paused: bool,
    effects: &EffectsChain,
) -> Result<Option<Duration>, String> {
    let decoder = Decoder::new(Cursor::new(media.clone())).map_err(|e| e.to_string())?;
    let duration = decoder.total_duration();
    if paused {
        sink.pause();
    }
    let source = decoder.convert_samples::<f32>().skip_duration(skip);
    sink.append(EqSource::new(source, effects.clone()));
    Ok(duration)
}

/// Cheap up-front check so obviously unplayable locations are refused
/// synchronously. Whether the media can actually be read is only known later.
fn check_location(url: &str) -> Result<(), EngineError> {
    let unplayable = |reason: &str| EngineError::Unplayable {
        url: url.to_string(),
        reason: reason.to_string(),
    };
    if url.trim().is_empty() {
        return Err(unplayable("empty location"));
    }
    match url.split_once("://") {
        None => Ok(()),
        Some(("http" | "https" | "file", rest)) if !rest.is_empty() => Ok(()),
        Some(("http" | "https" | "file", _)) => Err(unplayable("empty location")),
        Some((scheme, _)) => Err(unplayable(&format!("unsupported scheme '{}'", scheme))),
    }
}

/// Read the media off the audio thread and post it back as
/// [`AudioCommand::Fetched`].
fn spawn_fetch(url: String, generation: Generation, loopback: Sender<AudioCommand>) {
    let worker = thread::Builder::new()
        .name("naviplay-fetch".to_string())
        .spawn({
            let loopback = loopback.clone();
            let url = url.clone();
            move || {
                let media = fetch(&url).map(Arc::<[u8]>::from);
                let _ = loopback.send(AudioCommand::Fetched {
                    url,
                    generation,
                    media,
                });
            }
        });
    if let Err(e) = worker {
        let _ = loopback.send(AudioCommand::Fetched {
            url,
            generation,
            media: Err(e.to_string()),
        });
    }
}

/// Read a whole track: `http(s)://` over the network, anything else from disk.
fn fetch(url: &str) -> Result<Vec<u8>, String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| e.to_string())?;
        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        return response.bytes().map(|b| b.to_vec()).map_err(|e| e.to_string());
    }

    let path = url.strip_prefix("file://").unwrap_or(url);
    std::fs::read(path).map_err(|e| format!("{}: {}", path, e))
}

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

pub const LOCK_FILE_PATH: &str = "/tmp/naviplay_audio.lock";

/// Held for as long as this process owns the audio device. The OS releases
/// the lock when the file is closed, including on a crash.
#[derive(Debug)]
pub struct AudioLock {
    _file: File,
}

/// Try to acquire the audio lock.
/// Returns `None` if another instance holds it (we should run silent).
pub fn try_acquire_audio_lock() -> Option<AudioLock> {
    try_acquire_at(Path::new(LOCK_FILE_PATH))
}

pub fn try_acquire_at(path: &Path) -> Option<AudioLock> {
    let mut file = match OpenOptions::new().create(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot open audio lock");
            return None;
        }
    };

    if file.try_lock_exclusive().is_err() {
        tracing::info!("audio lock held by another instance");
        return None;
    }

    // Informational only
    if file.set_len(0).is_ok() {
        let _ = write!(file, "{}", std::process::id());
    }
    Some(AudioLock { _file: file })
}

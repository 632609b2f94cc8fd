//! Play queue with shuffle, repeat and shuffle history.
//!
//! The queue is a plain in-memory structure. It is only ever touched from
//! the orchestrator task, so nothing in here locks. Navigation never fails:
//! an impossible move answers `None` and leaves the queue as it was.

use crate::model::{RepeatMode, Track};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// A queued track plus the key that identifies this particular queue slot,
/// so the same song queued twice is still two distinct entries.
#[derive(Debug, Clone)]
struct Entry {
    key: u64,
    track: Track,
}

/// Read model pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub tracks: Vec<Track>,
    pub current_index: Option<usize>,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub total_duration_secs: u64,
}

/// Navigation position saved by [`QueueEngine::cursor`]. Only meaningful
/// while the queue contents stay the same.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueCursor {
    current: Option<usize>,
    history: Vec<usize>,
}

pub struct QueueEngine {
    /// Insertion order, the source of truth for un-shuffling
    original: Vec<Entry>,
    /// Order used for navigation (== `original` while shuffle is off)
    active: Vec<Entry>,
    current: Option<usize>,
    /// Indices into `active` visited while shuffled, most recent last
    history: Vec<usize>,
    shuffle: bool,
    repeat: RepeatMode,
    next_key: u64,
    rng: StdRng,
}

impl Default for QueueEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueEngine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic shuffling for tests and reproducible sessions.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            original: Vec::new(),
            active: Vec::new(),
            current: None,
            history: Vec::new(),
            shuffle: false,
            repeat: RepeatMode::Off,
            next_key: 0,
            rng,
        }
    }

    fn entry(&mut self, track: Track) -> Entry {
        let key = self.next_key;
        self.next_key += 1;
        Entry { key, track }
    }

    // ─── Mutation ────────────────────────────────────────────────

    /// Replace the whole queue. An out-of-range `start_index` leaves no
    /// current track.
    pub fn set_queue(&mut self, tracks: Vec<Track>, start_index: usize) {
        let entries: Vec<Entry> = tracks.into_iter().map(|t| self.entry(t)).collect();
        self.current = (start_index < entries.len()).then_some(start_index);
        self.original = entries.clone();
        self.active = entries;
        self.history.clear();
        if self.shuffle {
            self.apply_shuffle();
        }
    }

    pub fn add(&mut self, track: Track) {
        let entry = self.entry(track);
        self.original.push(entry.clone());
        self.active.push(entry);
    }

    pub fn add_many(&mut self, tracks: Vec<Track>) {
        for track in tracks {
            self.add(track);
        }
    }

    /// Insert right after the current track (at the front when there is none).
    pub fn insert_next(&mut self, track: Track) {
        let entry = self.entry(track);
        let pos = self.current.map_or(0, |c| c + 1);

        let original_pos = match self.current_entry_key() {
            Some(key) => self
                .original
                .iter()
                .position(|e| e.key == key)
                .map_or(self.original.len(), |p| p + 1),
            None => 0,
        };
        self.original.insert(original_pos, entry.clone());
        self.active.insert(pos, entry);

        for idx in self.history.iter_mut() {
            if *idx >= pos {
                *idx += 1;
            }
        }
    }

    /// Drop the entry at `index`. The current index keeps pointing at the
    /// same slot (now the following track) unless it fell off the end.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.active.len() {
            return None;
        }
        let removed = self.active.remove(index);
        if let Some(pos) = self.original.iter().position(|e| e.key == removed.key) {
            self.original.remove(pos);
        }

        self.current = match self.current {
            Some(c) if index < c => Some(c - 1),
            Some(c) if index == c => {
                if self.active.is_empty() {
                    None
                } else {
                    Some(c.min(self.active.len() - 1))
                }
            }
            other => other,
        };

        self.history.retain(|&i| i != index);
        for idx in self.history.iter_mut() {
            if *idx > index {
                *idx -= 1;
            }
        }
        Some(removed.track)
    }

    /// Relocate an entry. The current index follows its logical track.
    /// Out-of-range positions are ignored.
    pub fn move_entry(&mut self, from: usize, to: usize) {
        let len = self.active.len();
        if from >= len || to >= len || from == to {
            return;
        }

        let entry = self.active.remove(from);
        if !self.shuffle {
            // active mirrors original while unshuffled
            if let Some(pos) = self.original.iter().position(|e| e.key == entry.key) {
                let moved = self.original.remove(pos);
                self.original.insert(to.min(self.original.len()), moved);
            }
        }
        self.active.insert(to, entry);

        let remap = |i: usize| -> usize {
            if i == from {
                to
            } else if from < i && i <= to {
                i - 1
            } else if to <= i && i < from {
                i + 1
            } else {
                i
            }
        };
        self.current = self.current.map(remap);
        for idx in self.history.iter_mut() {
            *idx = remap(*idx);
        }
    }

    pub fn clear(&mut self) {
        self.original.clear();
        self.active.clear();
        self.current = None;
        self.history.clear();
    }

    // ─── Navigation ──────────────────────────────────────────────

    /// Advance according to shuffle/repeat and return the new current track.
    pub fn next(&mut self) -> Option<Track> {
        if self.active.is_empty() {
            return None;
        }
        if self.repeat == RepeatMode::One {
            return self.current_track().cloned();
        }

        let len = self.active.len();
        if self.shuffle {
            let candidates: Vec<usize> = (0..len).filter(|&i| Some(i) != self.current).collect();
            let target = match candidates.choose(&mut self.rng) {
                Some(&i) => i,
                // Single-track queue: re-roll over everything, current included
                None if self.repeat == RepeatMode::All => self.rng.gen_range(0..len),
                None => return None,
            };
            if let Some(c) = self.current {
                self.history.push(c);
            }
            self.current = Some(target);
        } else {
            self.current = match self.current {
                None => Some(0),
                Some(c) if c + 1 < len => Some(c + 1),
                Some(_) if self.repeat == RepeatMode::All => Some(0),
                Some(_) => return None,
            };
        }

        self.current_track().cloned()
    }

    /// Step back: through shuffle history first, then by position.
    pub fn previous(&mut self) -> Option<Track> {
        if self.active.is_empty() {
            return None;
        }

        let from_history = if self.shuffle { self.history.pop() } else { None };
        match from_history {
            Some(idx) => self.current = Some(idx),
            None => {
                self.current = match self.current {
                    Some(c) if c > 0 => Some(c - 1),
                    _ if self.repeat == RepeatMode::All => Some(self.active.len() - 1),
                    _ => return None,
                };
            }
        }

        self.current_track().cloned()
    }

    pub fn jump_to(&mut self, index: usize) -> Option<Track> {
        let track = self.active.get(index)?.track.clone();
        self.current = Some(index);
        self.history.clear();
        Some(track)
    }

    pub fn cursor(&self) -> QueueCursor {
        QueueCursor {
            current: self.current,
            history: self.history.clone(),
        }
    }

    /// Undo navigation back to `cursor`. Ignored if the queue shrank since.
    pub fn restore_cursor(&mut self, cursor: QueueCursor) {
        let len = self.active.len();
        if cursor.current.map_or(false, |c| c >= len) || cursor.history.iter().any(|&i| i >= len) {
            return;
        }
        self.current = cursor.current;
        self.history = cursor.history;
    }

    // ─── Modes ───────────────────────────────────────────────────

    pub fn toggle_shuffle(&mut self) {
        self.shuffle = !self.shuffle;
        if self.shuffle {
            self.apply_shuffle();
        } else {
            self.restore_order();
        }
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        if enabled != self.shuffle {
            self.toggle_shuffle();
        }
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.next();
        self.repeat
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    /// Current track first, everything else in random order behind it.
    fn apply_shuffle(&mut self) {
        if self.active.len() <= 1 {
            return;
        }
        let current = self.current.and_then(|c| self.active.get(c).cloned());
        let mut others: Vec<Entry> = self
            .active
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != self.current)
            .map(|(_, e)| e.clone())
            .collect();
        others.shuffle(&mut self.rng);

        self.current = current.as_ref().map(|_| 0);
        self.active = current.into_iter().chain(others).collect();
        self.history.clear();
    }

    fn restore_order(&mut self) {
        let key = self.current_entry_key();
        self.active = self.original.clone();
        if let Some(key) = key {
            self.current = Some(self.active.iter().position(|e| e.key == key).unwrap_or(0));
        }
        self.history.clear();
    }

    // ─── Read access ─────────────────────────────────────────────

    fn current_entry_key(&self) -> Option<u64> {
        self.current.and_then(|c| self.active.get(c)).map(|e| e.key)
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|c| self.active.get(c)).map(|e| &e.track)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.active.get(index).map(|e| &e.track)
    }

    /// Tracks in navigation order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.active.iter().map(|e| &e.track)
    }

    pub fn has_next(&self) -> bool {
        match self.repeat {
            RepeatMode::All | RepeatMode::One => !self.active.is_empty(),
            RepeatMode::Off => match self.current {
                Some(c) => c + 1 < self.active.len(),
                None => !self.active.is_empty(),
            },
        }
    }

    pub fn has_prev(&self) -> bool {
        if self.shuffle {
            return !self.history.is_empty();
        }
        matches!(self.current, Some(c) if c > 0)
    }

    /// The next `count` tracks after the current one.
    pub fn upcoming(&self, count: usize) -> Vec<Track> {
        match self.current {
            Some(c) => self
                .active
                .iter()
                .skip(c + 1)
                .take(count)
                .map(|e| e.track.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn total_duration(&self) -> u64 {
        self.active.iter().map(|e| u64::from(e.track.duration_secs)).sum()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.tracks().cloned().collect(),
            current_index: self.current,
            shuffle: self.shuffle,
            repeat: self.repeat,
            total_duration_secs: self.total_duration(),
        }
    }
}

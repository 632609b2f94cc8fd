//! Status output: one plain line per update, or JSON lines with `--json`.

use super::events::StateUpdate;
use crate::eq::{band_label, EqualizerSnapshot};
use crate::model::format_duration;
use crate::player::{PlaybackState, PlaybackStatus};
use crate::queue::QueueSnapshot;

pub fn render_json(update: &StateUpdate) -> serde_json::Result<String> {
    serde_json::to_string(update)
}

pub fn render_text(update: &StateUpdate, upcoming: usize) -> String {
    match update {
        StateUpdate::Playback(state) => playback_line(state),
        StateUpdate::Queue(queue) => queue_lines(queue, upcoming),
        StateUpdate::Equalizer(eq) => equalizer_line(eq),
        StateUpdate::Notice(message) => format!("» {}", message),
    }
}

fn playback_line(state: &PlaybackState) -> String {
    let icon = match state.status {
        PlaybackStatus::Playing => "▶",
        PlaybackStatus::Paused => "⏸",
        PlaybackStatus::Stopped => "■",
    };
    let volume = if state.muted {
        "muted".to_string()
    } else {
        format!("{}%", state.volume)
    };

    match &state.current_track {
        Some(track) => format!(
            "{} {} - {} [{} / {}] vol {}",
            icon,
            track.artist,
            track.title,
            format_duration(state.position_secs as u64),
            format_duration(state.duration_secs as u64),
            volume
        ),
        None => format!("{} {} vol {}", icon, state.status.label(), volume),
    }
}

fn queue_lines(queue: &QueueSnapshot, upcoming: usize) -> String {
    let position = match queue.current_index {
        Some(i) => format!("{}/{}", i + 1, queue.tracks.len()),
        None => format!("-/{}", queue.tracks.len()),
    };
    let mut out = format!(
        "queue {} ({}) shuffle {} repeat {}",
        position,
        format_duration(queue.total_duration_secs),
        if queue.shuffle { "on" } else { "off" },
        queue.repeat.label()
    );

    let start = queue.current_index.map_or(0, |i| i + 1);
    for (offset, track) in queue.tracks.iter().skip(start).take(upcoming).enumerate() {
        out.push_str(&format!("\n  {:>3}. {}", start + offset, track.title));
    }
    out
}

fn equalizer_line(eq: &EqualizerSnapshot) -> String {
    let bands: Vec<String> = eq
        .gains
        .iter()
        .enumerate()
        .filter(|(_, g)| **g != 0.0)
        .map(|(i, g)| format!("{}:{:+.1}", band_label(i), g))
        .collect();
    format!(
        "eq {} [{}] {}",
        if eq.enabled { "on" } else { "off" },
        eq.active_preset,
        if bands.is_empty() { "flat".to_string() } else { bands.join(" ") }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RepeatMode, Track};

    #[test]
    fn playback_line_shows_track_and_time() {
        let mut state = PlaybackState::new(70);
        state.status = PlaybackStatus::Playing;
        state.current_track = Some(Track::new("a", "Song", 200).with_artist("Band"));
        state.position_secs = 65.4;
        state.duration_secs = 200.0;

        let line = render_text(&StateUpdate::Playback(state.clone()), 3);
        assert_eq!(line, "▶ Band - Song [1:05 / 3:20] vol 70%");

        state.muted = true;
        assert!(render_text(&StateUpdate::Playback(state), 3).ends_with("vol muted"));
    }

    #[test]
    fn queue_lists_upcoming_only() {
        let snapshot = QueueSnapshot {
            tracks: vec![Track::new("a", "A", 60), Track::new("b", "B", 60), Track::new("c", "C", 60)],
            current_index: Some(0),
            shuffle: false,
            repeat: RepeatMode::All,
            total_duration_secs: 180,
        };
        let text = render_text(&StateUpdate::Queue(snapshot), 1);
        assert_eq!(text, "queue 1/3 (3:00) shuffle off repeat All\n    1. B");
    }

    #[test]
    fn json_is_tagged() {
        let json = render_json(&StateUpdate::Notice("End of queue".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"notice","data":"End of queue"}"#);
    }
}

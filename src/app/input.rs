//! Line commands read from stdin.
//!
//! ```text
//! p            play / pause          n / b       next / previous
//! s            stop                  f [secs]    seek forward
//! g [secs]     seek back             + / -       volume up / down
//! v <0-100>    set volume            m           mute
//! z            shuffle               r           cycle repeat
//! j <idx>      jump to entry         x <idx>     remove entry
//! mv <a> <b>   move entry            c           clear queue
//! a <path>     add to queue          an <path>   play next
//! eq <band> <db>                     preset <name>
//! save <name>  save EQ preset        flat        reset EQ
//! eqt          EQ on / off           q           quit
//! ```

use super::events::Command;
use crate::catalog::LocalCatalog;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("unknown command '{0}' (try 'h')")]
    Unknown(String),

    #[error("'{0}' needs {1}")]
    MissingArgument(String, &'static str),

    #[error("'{0}' is not a valid number")]
    BadNumber(String),
}

pub const HELP: &str = "p play/pause | n next | b prev | s stop | f/g [secs] seek | +/- volume | v <n> volume \
| m mute | z shuffle | r repeat | j/x <idx> jump/remove | mv <a> <b> | c clear | a/an <path> add/next \
| eq <band> <db> | preset <name> | save <name> | flat | eqt | q quit";

fn number<T: FromStr>(word: &str) -> Result<T, InputError> {
    word.parse().map_err(|_| InputError::BadNumber(word.to_string()))
}

/// Parse one line. Blank lines and `h` (help) give `Ok(None)`.
pub fn parse_line(line: &str, seek_step: f64) -> Result<Option<Command>, InputError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let needs = |what: &'static str| InputError::MissingArgument(word.to_string(), what);

    let step = |args: &[&str]| -> Result<f64, InputError> {
        match args.first() {
            Some(secs) => number(secs),
            None => Ok(seek_step),
        }
    };

    let command = match word {
        "" | "h" | "help" | "?" => return Ok(None),
        "p" => Command::TogglePause,
        "n" => Command::Next,
        "b" => Command::Previous,
        "s" => Command::Stop,
        "f" => Command::SeekRelative(step(args.as_slice())?),
        "g" => Command::SeekRelative(-step(args.as_slice())?),
        "+" => Command::VolumeUp,
        "-" => Command::VolumeDown,
        "v" => Command::SetVolume(number(args.first().ok_or_else(|| needs("a volume"))?)?),
        "m" => Command::ToggleMute,
        "z" => Command::ToggleShuffle,
        "r" => Command::CycleRepeat,
        "c" => Command::ClearQueue,
        "j" => Command::JumpTo(number(args.first().ok_or_else(|| needs("an index"))?)?),
        "x" => Command::Remove(number(args.first().ok_or_else(|| needs("an index"))?)?),
        "mv" => match args.as_slice() {
            [from, to, ..] => Command::Move {
                from: number(from)?,
                to: number(to)?,
            },
            _ => return Err(needs("two indices")),
        },
        "a" | "an" => {
            if rest.is_empty() {
                return Err(needs("a path"));
            }
            let track = LocalCatalog::track_for(rest);
            if word == "a" {
                Command::Add(track)
            } else {
                Command::InsertNext(track)
            }
        }
        "eq" => match args.as_slice() {
            [band, db, ..] => Command::SetBand {
                index: number(band)?,
                db: number(db)?,
            },
            _ => return Err(needs("a band and a gain")),
        },
        "preset" if !rest.is_empty() => Command::LoadPreset(rest.to_string()),
        "save" if !rest.is_empty() => Command::SavePreset(rest.to_string()),
        "preset" | "save" => return Err(needs("a name")),
        "flat" => Command::ResetEq,
        "eqt" => Command::ToggleEq,
        "q" | "quit" => Command::Quit,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

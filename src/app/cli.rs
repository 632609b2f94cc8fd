use crate::model::RepeatMode;
use clap::Parser;

/// naviplay - queue, play and equalize your music from the terminal 🎵
#[derive(Parser, Debug)]
#[command(name = "naviplay", version, about)]
pub struct Args {
    /// Files or http(s) URLs to queue, in order (song ids when a server
    /// is configured)
    pub tracks: Vec<String>,

    /// Start with shuffle on
    #[arg(long, short = 's')]
    pub shuffle: bool,

    /// Repeat mode: off, all or one
    #[arg(long, short = 'r')]
    pub repeat: Option<RepeatMode>,

    /// Start volume (0-100), overrides the saved one
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume: Option<u8>,

    /// Load this EQ preset at startup
    #[arg(long)]
    pub eq_preset: Option<String>,

    /// Run without an audio device
    #[arg(long)]
    pub no_audio: bool,

    /// Print snapshots as JSON lines instead of text
    #[arg(long)]
    pub json: bool,

    /// More log output (repeatable)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Generate default config.toml to stdout
    #[arg(long)]
    pub generate_config: bool,
}

impl Args {
    /// Log filter: `-v` and `-vv` override the configured level.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    }
}

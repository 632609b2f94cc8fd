pub mod dsp;
pub mod engine;

pub use dsp::{EffectsChain, EqSource};
pub use engine::RodioEngine;

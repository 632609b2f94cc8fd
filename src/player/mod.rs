pub mod coordinator;
pub mod null;
pub mod state;
pub mod traits;

pub use coordinator::{Effect, PlaybackCoordinator, DEFAULT_VOLUME_STEP};
pub use null::NullEngine;
pub use state::{PlaybackState, PlaybackStatus};
pub use traits::{AudioEngine, EngineEvent, EngineEventSender, EngineNotification, Generation, SeekTarget};

pub mod cli;
pub mod config;
pub mod events;
pub mod input;
pub mod lock;
pub mod orchestrator;
pub mod render;

pub use config::{AppConfig, PersistentState, ServerConfig, UserConfig};
pub use events::{Command, QueueContext, StateUpdate};
pub use orchestrator::{Orchestrator, OrchestratorHandle};

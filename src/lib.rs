pub mod app;
pub mod audio;
pub mod catalog;
pub mod eq;
pub mod error;
pub mod model;
pub mod player;
pub mod queue;

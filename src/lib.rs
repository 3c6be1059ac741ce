pub mod config;
pub mod engine;
pub mod player;
pub mod scheduler;
pub mod types;

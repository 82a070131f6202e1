pub mod canon;
pub mod classify;
pub mod codec;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod graph;
pub mod orchestrator;
pub mod protocol;
pub mod settings;
pub mod sink;

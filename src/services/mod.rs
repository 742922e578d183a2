// src/services/mod.rs
pub mod client_directory;
pub mod completion_gateway;
pub mod prompt_builder;
pub mod transcript_log;

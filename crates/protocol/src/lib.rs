//! # nb-protocol
//!
//! Core protocol definitions and data models for the notebook interpreter
//! supervisor.
//!
//! This crate defines all shared data structures used for:
//! - Interpreter process launch state and exit-code conventions
//! - Application (interactive widget) packages and status
//! - Remote calls issued against a live interpreter process
//! - Events relayed from the core to downstream listeners
//! - Configuration file parsing (TOML server config, YAML interpreter settings)
//!
//! ## Modules
//!
//! - [`process_models`]: Process launch state and reserved exit codes
//! - [`application_models`]: Application packages, status and output types
//! - [`note_models`]: Paragraph job status
//! - [`remote_models`]: Remote calls and their results
//! - [`config_models`]: Server configuration and interpreter settings
//! - [`ipc`]: Events emitted by the core
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, uuid and chrono
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other workspace crates

pub mod application_models;
pub mod config_models;
pub mod ipc;
pub mod note_models;
pub mod process_models;
pub mod remote_models;

// Re-export all public types for convenience
pub use application_models::*;
pub use config_models::*;
pub use ipc::*;
pub use note_models::*;
pub use process_models::*;
pub use remote_models::*;

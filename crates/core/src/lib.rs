//! # nb-core
//!
//! Interpreter process supervision and application coordination for the
//! notebook server.
//!
//! This crate provides:
//! - Launching interpreter processes and tracking their launch state
//! - Readiness detection with timeouts
//! - A post-mortem failure history for processes that never came up
//! - Queued load/run/unload of applications bound to notebook paragraphs
//! - Configuration loading from the `.notebook/` directory
//!
//! ## Modules
//!
//! - [`launcher`]: Process launcher, output capture and readiness waiting
//! - [`postmortem`]: Failure records and the shared failure tracker
//! - [`interpreter`]: Registry of running interpreter launchers
//! - [`remote`]: Remote interpreter process abstraction and interpreter groups
//! - [`executor`]: Named, bounded worker pools
//! - [`notebook`]: Notes, paragraphs and note events
//! - [`application`]: Application state and the application coordinator
//! - [`config`]: Configuration loading and management

pub mod application;
pub mod config;
pub mod executor;
pub mod interpreter;
pub mod launcher;
pub mod notebook;
pub mod postmortem;
pub mod remote;

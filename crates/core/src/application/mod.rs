//! Application coordination.
//!
//! This module provides:
//! - [`ApplicationState`]: one application bound to a paragraph
//! - [`ApplicationCoordinator`]: queued load/run/unload against the
//!   paragraph's interpreter process
//! - [`ApplicationEventListener`]: application activity callbacks

pub mod coordinator;
pub mod error;
pub mod listener;
pub mod state;

pub use coordinator::{ApplicationCoordinator, DEFAULT_POOL_SIZE};
pub use error::ApplicationError;
pub use listener::{ApplicationEventListener, EventChannelListener};
pub use state::ApplicationState;

//! Interpreter process management.

pub mod manager;

pub use manager::InterpreterManager;

//! Adapters implementing the engine's ports.

pub mod memory;

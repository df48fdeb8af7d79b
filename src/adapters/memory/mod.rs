//! In-process adapters for the engine's ports.

pub mod guild_config_store;
pub mod simulated_platform;

pub use guild_config_store::InMemoryGuildConfigStore;
pub use simulated_platform::{FaultScript, SimulatedPlatform};

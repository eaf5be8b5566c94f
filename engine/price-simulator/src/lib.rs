//! Price simulator - the system heartbeat for demo market movement
//!
//! A single periodic task perturbs every stored price by a bounded random
//! delta, floors the result, and seeds the daily open price on the first
//! update of each UTC calendar day.

pub mod config;
pub mod error;
pub mod simulator;

pub use config::SimulatorConfig;
pub use error::SimulatorError;
pub use simulator::{plan_tick, PriceSimulator, TickPlan};

// Result type alias
pub type Result<T> = std::result::Result<T, SimulatorError>;

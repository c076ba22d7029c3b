//! Timer-driven reconciliation scheduler.

pub mod alarm;
pub mod constants;
pub mod tick;

pub use tick::{run_tick, TickContext, TickReport};

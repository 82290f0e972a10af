//! Package spider expands clusters into radial member layouts with staggered reveals
pub mod controller;
pub mod layout;
pub mod scheduler;
pub mod state;

#[cfg(test)]
mod scheduler_test;

pub use controller::{RenderInstruction, Spiderifier};
pub use layout::{SpiralLayout, SpiralPosition, unit_offsets};
pub use scheduler::{Clock, ManualClock, RevealHandle, RevealScheduler, SystemClock};
pub use state::{ClusterPhase, ClusterStates, SharedPhase};

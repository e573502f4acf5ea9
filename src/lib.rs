//! Schedsim - single-core CPU scheduling policy simulator.

pub mod config;
pub mod engine;
pub mod events;
pub mod metrics;
pub mod pacing;
pub mod policy;
pub mod registry;
pub mod runner;
pub mod sink;
pub mod timeline;
pub mod types;

pub use engine::{DeadlineMiss, Simulation, SimulationBuilder};
pub use events::{EventKind, SimEvent};
pub use timeline::{Timeline, TimelineEntry};
pub use types::{Algorithm, Task};

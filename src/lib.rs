//! Agent-based SIR epidemic on the unit square.
//!
//! [`Engine`] advances the epidemic one step at a time; a step runs the
//! recovery, infection and movement phases over the whole [`Population`],
//! using a [`SpatialIndex`] to find infection candidates.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod grid;
pub mod manager;
pub mod model;
pub mod population;
pub mod random;
pub mod stats;
pub mod trajectory;

pub use config::Params;
pub use engine::Engine;
pub use grid::SpatialIndex;
pub use model::{Agent, Position, State};
pub use population::{Population, StateCounts};
pub use random::RandomStream;

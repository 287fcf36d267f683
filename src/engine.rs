use crate::config::{Params, check_num};
use crate::grid::SpatialIndex;
use crate::model::{Agent, Position, State};
use crate::population::{Population, StateCounts};
use crate::random::RandomStream;
use anyhow::{Context, Result};

/// Simulation engine.
///
/// Holds the parameters, the population and the random stream, and advances
/// the epidemic one step at a time.
pub struct Engine {
    params: Params,
    pop: Population,
    stream: RandomStream,
    n_steps: usize,
}

impl Engine {
    /// Create an engine with `n_agents` agents, one of them infected.
    ///
    /// # Errors
    /// Returns an error if `n_agents` is zero or `params` are invalid.
    pub fn new(n_agents: usize, params: Params, seed: u64) -> Result<Self> {
        Self::with_removed_seeds(n_agents, 0, params, seed)
    }

    /// Create an engine whose initial population also holds `n_removed`
    /// removed agents.
    pub fn with_removed_seeds(
        n_agents: usize,
        n_removed: usize,
        params: Params,
        seed: u64,
    ) -> Result<Self> {
        check_num(n_agents, 1..).context("invalid number of agents")?;
        check_num(n_removed, 0..n_agents).context("invalid number of removed seed agents")?;
        params.validate().context("invalid params")?;

        let mut stream = RandomStream::from_seed(seed).context("failed to seed random stream")?;
        let pop = Population::new(n_agents, n_removed, params.infection_radius, &mut stream);
        log::debug!(
            "created engine with {n_agents} agents on a {0}x{0} grid (seed {seed})",
            pop.grid_size()
        );

        Ok(Self {
            params,
            pop,
            stream,
            n_steps: 0,
        })
    }

    /// Advance the simulation by one step: recovery, infection, movement.
    pub fn step(&mut self) {
        self.pop.recover_phase(&self.params);
        self.pop.infect_phase(&self.params, &mut self.stream);
        self.pop.move_phase(&self.params, &mut self.stream);
        self.n_steps += 1;

        log::trace!("step {}: {:?}", self.n_steps, self.pop.state_counts());
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Number of steps performed so far.
    pub fn step_count(&self) -> usize {
        self.n_steps
    }

    pub fn population_size(&self) -> usize {
        self.pop.len()
    }

    pub fn agents(&self) -> &[Agent] {
        self.pop.agents()
    }

    pub fn query_positions(&self, state: State) -> Vec<Position> {
        self.pop.positions_where(state)
    }

    pub fn all_positions(&self) -> Vec<Position> {
        self.pop.all_positions()
    }

    pub fn state_counts(&self) -> StateCounts {
        self.pop.state_counts()
    }

    /// No infected agent is left, so no state can change anymore.
    pub fn is_over(&self) -> bool {
        self.pop.agents().iter().all(|agt| !agt.is_infected())
    }

    pub fn index(&self) -> &SpatialIndex {
        self.pop.index()
    }

    /// Check that the spatial index matches the current agent positions.
    pub fn index_is_consistent(&self) -> bool {
        self.pop.index_is_consistent(self.params.infection_radius)
    }
}

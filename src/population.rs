use crate::config::Params;
use crate::grid::SpatialIndex;
use crate::model::{Agent, Position, State};
use crate::random::RandomStream;
use serde::{Deserialize, Serialize};

/// Number of agents in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub susceptible: usize,
    pub infected: usize,
    pub removed: usize,
}

impl StateCounts {
    pub fn get(&self, state: State) -> usize {
        match state {
            State::Susceptible => self.susceptible,
            State::Infected => self.infected,
            State::Removed => self.removed,
        }
    }

    fn get_mut(&mut self, state: State) -> &mut usize {
        match state {
            State::Susceptible => &mut self.susceptible,
            State::Infected => &mut self.infected,
            State::Removed => &mut self.removed,
        }
    }

    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.removed
    }

    /// Iterate over `(state, count)` pairs, every state included.
    pub fn iter(&self) -> impl Iterator<Item = (State, usize)> + '_ {
        State::ALL.into_iter().map(|state| (state, self.get(state)))
    }
}

/// All agents of a simulation and the grid indexing them.
///
/// Agents are addressed by their position in the insertion order, which
/// never changes.
pub struct Population {
    agt_vec: Vec<Agent>,
    index: SpatialIndex,
    candidates: Vec<usize>,
}

impl Population {
    /// Create `n_agents` agents: one infected, then `n_removed` removed,
    /// then susceptible ones.
    pub fn new(
        n_agents: usize,
        n_removed: usize,
        radius: f64,
        stream: &mut RandomStream,
    ) -> Self {
        let mut agt_vec = Vec::with_capacity(n_agents);
        for i_agt in 0..n_agents {
            let state = if i_agt == 0 {
                State::Infected
            } else if i_agt <= n_removed {
                State::Removed
            } else {
                State::Susceptible
            };
            agt_vec.push(Agent::new(state, stream));
        }

        let index = SpatialIndex::from_positions(radius, agt_vec.iter().map(Agent::pos));

        Self {
            agt_vec,
            index,
            candidates: Vec::new(),
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agt_vec
    }

    pub fn len(&self) -> usize {
        self.agt_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agt_vec.is_empty()
    }

    pub fn grid_size(&self) -> usize {
        self.index.grid_size()
    }

    pub fn recover_phase(&mut self, params: &Params) {
        for agt in &mut self.agt_vec {
            agt.recover(params.infection_duration);
        }
    }

    /// Let every contagious agent try to infect its neighbors.
    ///
    /// Infections take effect immediately, so agents visited later in the
    /// phase see neighbors infected earlier in it (those cannot transmit yet).
    pub fn infect_phase(&mut self, params: &Params, stream: &mut RandomStream) {
        let sq_radius = params.infection_radius.powi(2);
        for i_agt in 0..self.agt_vec.len() {
            let source = self.agt_vec[i_agt];
            if !source.is_contagious() {
                continue;
            }
            self.index
                .neighbor_candidates(i_agt, source.pos(), &mut self.candidates);
            source.attempt_to_infect(
                &mut self.agt_vec,
                &self.candidates,
                sq_radius,
                params.infection_probability,
                stream,
            );
        }
    }

    pub fn move_phase(&mut self, params: &Params, stream: &mut RandomStream) {
        for (i_agt, agt) in self.agt_vec.iter_mut().enumerate() {
            let old_pos = agt.pos();
            agt.move_randomly(params.move_step, stream);
            self.index.relocate(i_agt, old_pos, agt.pos());
        }
    }

    pub fn positions_where(&self, state: State) -> Vec<Position> {
        self.agt_vec
            .iter()
            .filter(|agt| agt.state() == state)
            .map(Agent::pos)
            .collect()
    }

    pub fn all_positions(&self) -> Vec<Position> {
        self.agt_vec.iter().map(Agent::pos).collect()
    }

    pub fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for agt in &self.agt_vec {
            *counts.get_mut(agt.state()) += 1;
        }
        counts
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Check that the grid equals one rebuilt from the current positions,
    /// so every agent sits in exactly the cell of its position.
    pub fn index_is_consistent(&self, radius: f64) -> bool {
        self.index == SpatialIndex::from_positions(radius, self.agt_vec.iter().map(Agent::pos))
    }

    #[cfg(test)]
    fn from_agents(agt_vec: Vec<Agent>, radius: f64) -> Self {
        let index = SpatialIndex::from_positions(radius, agt_vec.iter().map(Agent::pos));
        Self {
            agt_vec,
            index,
            candidates: Vec::new(),
        }
    }
}

//! Agent state machine.

use crate::random::RandomStream;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Epidemic state of an agent.
///
/// Transitions only go forward: `Susceptible -> Infected -> Removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum State {
    Susceptible,
    Infected,
    Removed,
}

impl State {
    /// All states, in transition order.
    pub const ALL: [State; 3] = [State::Susceptible, State::Infected, State::Removed];
}

/// Point of the unit square.
///
/// A move that overshoots the upper edge folds to `1 - v`, which leaves the
/// coordinate slightly below zero until a later move brings it back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn sq_dist(&self, other: &Position) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }
}

/// Fold a value that left `[min, max]` back inside, using the distance
/// past the crossed boundary.
///
/// Assumes the value overshoots by less than the interval width.
pub fn constrain<T>(val: T, min: T, max: T) -> T
where
    T: PartialOrd + Copy + std::ops::Add<Output = T> + std::ops::Sub<Output = T>,
{
    if val < min {
        max - min + val
    } else if val > max {
        min + max - val
    } else {
        val
    }
}

/// Individual of the population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    pos: Position,
    state: State,
    duration: u32,
}

impl Agent {
    /// Create an agent in `state` at a random position.
    ///
    /// Draws `x` first, then `y`.
    pub fn new(state: State, stream: &mut RandomStream) -> Self {
        let x = stream.next_uniform();
        let y = stream.next_uniform();
        Self {
            pos: Position { x, y },
            state,
            duration: 0,
        }
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of steps spent infected so far.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn is_susceptible(&self) -> bool {
        self.state == State::Susceptible
    }

    pub fn is_infected(&self) -> bool {
        self.state == State::Infected
    }

    /// An agent only transmits from the step after it got infected on.
    pub fn is_contagious(&self) -> bool {
        self.is_infected() && self.duration > 0
    }

    /// Advance the infection clock and remove the agent once it has been
    /// infected for longer than `infection_duration` steps.
    pub fn recover(&mut self, infection_duration: u32) {
        if !self.is_infected() {
            return;
        }
        self.duration += 1;
        if self.duration > infection_duration {
            self.state = State::Removed;
        }
    }

    /// Try to infect every susceptible candidate within `sq_radius`.
    ///
    /// One uniform draw is taken per candidate in range, in the order given.
    /// `candidates` index into `agents` and must not contain this agent.
    pub fn attempt_to_infect(
        &self,
        agents: &mut [Agent],
        candidates: &[usize],
        sq_radius: f64,
        probability: f64,
        stream: &mut RandomStream,
    ) {
        if !self.is_contagious() {
            return;
        }
        for &i_agt in candidates {
            let other = &mut agents[i_agt];
            if !other.is_susceptible() || self.pos.sq_dist(&other.pos) > sq_radius {
                continue;
            }
            if stream.next_uniform() <= probability {
                other.state = State::Infected;
            }
        }
    }

    /// Move `step` in a random direction.
    pub fn move_randomly(&mut self, step: f64, stream: &mut RandomStream) {
        let theta = TAU * stream.next_uniform();
        self.move_along(theta, step);
    }

    fn move_along(&mut self, theta: f64, step: f64) {
        self.pos.x = constrain(self.pos.x + theta.sin() * step, 0.0, 1.0);
        self.pos.y = constrain(self.pos.y + theta.cos() * step, 0.0, 1.0);
    }
}

#[cfg(test)]
pub(crate) fn agent_at(x: f64, y: f64, state: State, duration: u32) -> Agent {
    Agent {
        pos: Position { x, y },
        state,
        duration,
    }
}

//! Uniform grid bucketing agents for radius-bounded neighbor queries.

use crate::model::{Position, constrain};
use std::collections::BTreeSet;

type Cell = (usize, usize);

/// Largest number of cells per side; smaller radii share wider cells.
pub const MAX_GRID_SIZE: usize = 1024;

/// Square grid over the unit square with cells at least `radius` wide.
///
/// Each agent index is held by exactly one cell: the one containing the
/// agent's current position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialIndex {
    grid_size: usize,
    cells: Vec<BTreeSet<usize>>,
}

impl SpatialIndex {
    /// Create an empty grid of `floor(1 / radius)` cells per side, capped
    /// at [`MAX_GRID_SIZE`].
    ///
    /// A radius of 1 or more gives a single cell.
    pub fn new(radius: f64) -> Self {
        let grid_size = ((1.0 / radius).floor() as usize).clamp(1, MAX_GRID_SIZE);
        Self {
            grid_size,
            cells: vec![BTreeSet::new(); grid_size * grid_size],
        }
    }

    /// Create a grid holding every position of `positions`, indexed by order.
    pub fn from_positions<I>(radius: f64, positions: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        let mut index = Self::new(radius);
        for (i_agt, pos) in positions.into_iter().enumerate() {
            index.insert(i_agt, pos);
        }
        index
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Cell containing `pos`, clamped to the grid.
    pub fn cell_of(&self, pos: Position) -> Cell {
        (self.axis_cell(pos.x), self.axis_cell(pos.y))
    }

    fn axis_cell(&self, coord: f64) -> usize {
        let max = (self.grid_size - 1) as f64;
        (coord * self.grid_size as f64).floor().clamp(0.0, max) as usize
    }

    fn cell_idx(&self, (i_x, i_y): Cell) -> usize {
        i_x * self.grid_size + i_y
    }

    pub fn insert(&mut self, i_agt: usize, pos: Position) {
        let idx = self.cell_idx(self.cell_of(pos));
        self.cells[idx].insert(i_agt);
    }

    /// Move an agent's entry after its position changed.
    ///
    /// # Panics
    /// Panics if the cell of `old_pos` does not hold the agent, which means
    /// the index is out of sync with the agents.
    pub fn relocate(&mut self, i_agt: usize, old_pos: Position, new_pos: Position) {
        let old_cell = self.cell_of(old_pos);
        let new_cell = self.cell_of(new_pos);
        if old_cell == new_cell {
            return;
        }
        let old_idx = self.cell_idx(old_cell);
        let new_idx = self.cell_idx(new_cell);
        assert!(
            self.cells[old_idx].remove(&i_agt),
            "agent {i_agt} missing from cell {old_cell:?}"
        );
        self.cells[new_idx].insert(i_agt);
    }

    /// Collect, in ascending order and without duplicates, every agent in the
    /// 3x3 block of cells around the cell of `pos`, except `i_agt` itself.
    ///
    /// Block coordinates leaving the grid are folded with [`constrain`]; an
    /// index that folds to `-1` selects the last row or column.
    pub fn neighbor_candidates(&self, i_agt: usize, pos: Position, candidates: &mut Vec<usize>) {
        candidates.clear();

        let (i_x, i_y) = self.cell_of(pos);
        let max = self.grid_size as i64 - 1;
        for off_x in -1..=1 {
            let c_x = self.fold(i_x as i64 + off_x, max);
            for off_y in -1..=1 {
                let c_y = self.fold(i_y as i64 + off_y, max);
                let idx = self.cell_idx((c_x, c_y));
                candidates.extend(self.cells[idx].iter().copied());
            }
        }

        candidates.sort_unstable();
        candidates.dedup();
        if let Ok(at) = candidates.binary_search(&i_agt) {
            candidates.remove(at);
        }
    }

    fn fold(&self, val: i64, max: i64) -> usize {
        constrain(val, 0, max).rem_euclid(self.grid_size as i64) as usize
    }

    /// Cell currently holding `i_agt`, if any.
    pub fn find(&self, i_agt: usize) -> Option<Cell> {
        self.cells
            .iter()
            .position(|cell| cell.contains(&i_agt))
            .map(|idx| (idx / self.grid_size, idx % self.grid_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: f64, y: f64) -> Position {
        Position { x, y }
    }

    #[test]
    fn grid_size_follows_radius() {
        assert_eq!(SpatialIndex::new(0.03).grid_size(), 33);
        assert_eq!(SpatialIndex::new(0.25).grid_size(), 4);
        assert_eq!(SpatialIndex::new(1.0).grid_size(), 1);
        assert_eq!(SpatialIndex::new(2.5).grid_size(), 1);
    }

    #[test]
    fn tiny_radius_caps_grid_size() {
        assert_eq!(SpatialIndex::new(1e-6).grid_size(), MAX_GRID_SIZE);
        assert_eq!(SpatialIndex::new(1e-300).grid_size(), MAX_GRID_SIZE);
        assert_eq!(SpatialIndex::new(f64::MIN_POSITIVE).grid_size(), MAX_GRID_SIZE);

        let positions = [pos(0.5, 0.5), pos(0.5000005, 0.5), pos(0.502, 0.5)];
        let index = SpatialIndex::from_positions(1e-6, positions);
        let mut candidates = Vec::new();
        index.neighbor_candidates(0, positions[0], &mut candidates);
        assert!(candidates.contains(&1));
    }

    #[test]
    fn agent_in_two_cells_differs_from_rebuilt_grid() {
        let positions = [pos(0.1, 0.1), pos(0.6, 0.6)];
        let mut index = SpatialIndex::from_positions(0.25, positions);
        assert_eq!(index, SpatialIndex::from_positions(0.25, positions));

        index.insert(0, pos(0.9, 0.9));
        assert_eq!(index.find(0), Some((0, 0)));
        assert_ne!(index, SpatialIndex::from_positions(0.25, positions));
    }

    #[test]
    fn cell_of_clamps_to_grid() {
        let index = SpatialIndex::new(0.25);
        assert_eq!(index.cell_of(pos(0.0, 0.0)), (0, 0));
        assert_eq!(index.cell_of(pos(0.3, 0.74)), (1, 2));
        assert_eq!(index.cell_of(pos(1.0, 0.999)), (3, 3));
        assert_eq!(index.cell_of(pos(-0.004, 0.5)), (0, 2));
    }

    #[test]
    fn candidates_cover_block_and_exclude_self() {
        let positions = [
            pos(0.5, 0.5),
            pos(0.3, 0.3),
            pos(0.7, 0.7),
            pos(0.1, 0.5),
            pos(0.5, 0.55),
        ];
        let index = SpatialIndex::from_positions(0.25, positions);

        let mut candidates = Vec::new();
        index.neighbor_candidates(0, positions[0], &mut candidates);
        assert_eq!(candidates, vec![1, 2, 4]);
    }

    #[test]
    fn edge_block_folds_across_grid() {
        // 4x4 grid: block around column 0 spans columns {2, 0, 1}, and
        // block around column 3 spans columns {2, 3, 3}.
        let positions = [
            pos(0.1, 0.1),
            pos(0.6, 0.1),
            pos(0.9, 0.1),
            pos(0.3, 0.1),
        ];
        let index = SpatialIndex::from_positions(0.25, positions);

        let mut candidates = Vec::new();
        index.neighbor_candidates(0, positions[0], &mut candidates);
        assert_eq!(candidates, vec![1, 3]);

        index.neighbor_candidates(2, positions[2], &mut candidates);
        assert_eq!(candidates, vec![1]);
    }

    #[test]
    fn single_cell_returns_everyone_else() {
        let positions = [pos(0.1, 0.1), pos(0.9, 0.9), pos(0.5, 0.2)];
        let index = SpatialIndex::from_positions(1.0, positions);

        let mut candidates = Vec::new();
        index.neighbor_candidates(1, positions[1], &mut candidates);
        assert_eq!(candidates, vec![0, 2]);
    }

    #[test]
    fn candidates_contain_every_agent_within_radius() {
        let radius = 0.1;
        let positions: Vec<Position> = (0..400)
            .map(|i| pos((i % 20) as f64 / 20.0 + 0.013, (i / 20) as f64 / 20.0 + 0.007))
            .collect();
        let index = SpatialIndex::from_positions(radius, positions.iter().copied());

        let mut candidates = Vec::new();
        for (i_agt, &p) in positions.iter().enumerate() {
            index.neighbor_candidates(i_agt, p, &mut candidates);
            for (j_agt, q) in positions.iter().enumerate() {
                if j_agt != i_agt && p.sq_dist(q) <= radius * radius {
                    assert!(candidates.contains(&j_agt), "{j_agt} missing for {i_agt}");
                }
            }
        }
    }

    #[test]
    fn relocate_moves_between_cells() {
        let mut index = SpatialIndex::from_positions(0.25, [pos(0.1, 0.1)]);
        assert_eq!(index.find(0), Some((0, 0)));

        index.relocate(0, pos(0.1, 0.1), pos(0.2, 0.2));
        assert_eq!(index.find(0), Some((0, 0)));

        index.relocate(0, pos(0.2, 0.2), pos(0.8, 0.3));
        assert_eq!(index.find(0), Some((3, 1)));
        assert_eq!(index, SpatialIndex::from_positions(0.25, [pos(0.8, 0.3)]));
    }

    #[test]
    #[should_panic(expected = "missing from cell")]
    fn relocate_with_stale_position_panics() {
        let mut index = SpatialIndex::from_positions(0.25, [pos(0.1, 0.1)]);
        index.relocate(0, pos(0.6, 0.6), pos(0.9, 0.9));
    }
}

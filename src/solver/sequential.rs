//! The reference sequential A* solver: binary-heap open set,
//! hash-indexed closed set, hash-indexed global node table for
//! best-known-`g` relaxation.
//!
//! Adapted from the structure of the `pathfinding` crate's own
//! `astar_with_hasher` (parents map + `BinaryHeap` of cost-ordered
//! entries, stale entries filtered by comparing recorded cost), rather
//! than depending on the crate: the parallel solver in this crate
//! needs the same node-table/closed-set machinery made explicit, so
//! both solvers share one vocabulary.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::error::GridstarError;
use crate::grid::Grid;
use crate::heuristic::octile_to;

use super::{Solution, Solver};

/// One node's best-known state. `predecessor == usize::MAX` marks the
/// start node.
#[derive(Clone, Copy)]
struct NodeRecord {
    g: f32,
    predecessor: usize,
    closed: bool,
}

const NO_PREDECESSOR: usize = usize::MAX;

/// Min-heap entry ordered by `f` ascending (smaller `f` = higher
/// priority). Mirrors `pathfinding::SmallestCostHolder` /
/// `petgraph::scored::MinScored`.
struct HeapEntry {
    f: f32,
    g: f32,
    id: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest `f` sorts
        // first. Ties favour the larger `g` (closer to the goal).
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.g.partial_cmp(&other.g).unwrap_or(Ordering::Equal))
    }
}

/// Classic A* with a binary-heap open set.
#[derive(Default)]
pub struct SequentialAStar;

impl SequentialAStar {
    pub fn new() -> Self {
        SequentialAStar
    }
}

impl Solver for SequentialAStar {
    fn solve(
        &mut self,
        grid: &Grid,
        start: crate::grid::Position,
        target: crate::grid::Position,
    ) -> Result<Solution, GridstarError> {
        let start_id = grid.to_id(start.x, start.y);
        let target_id = grid.to_id(target.x, target.y);

        let mut nodes: FxHashMap<usize, NodeRecord> = FxHashMap::default();
        let mut heap = BinaryHeap::new();

        nodes.insert(start_id, NodeRecord { g: 0.0, predecessor: NO_PREDECESSOR, closed: false });
        heap.push(HeapEntry { f: octile_to(grid, start_id, target_id), g: 0.0, id: start_id });

        while let Some(HeapEntry { id, g, .. }) = heap.pop() {
            let already_closed = nodes.get(&id).map(|n| n.closed).unwrap_or(false);
            if already_closed {
                continue;
            }
            // Stale entry: a better `g` has since been recorded for this cell.
            let current_g = nodes
                .get(&id)
                .ok_or_else(|| GridstarError::Invariant(format!("popped id {id} with no node record")))?
                .g;
            if g > current_g {
                continue;
            }

            nodes.get_mut(&id).unwrap().closed = true;

            if id == target_id {
                return Ok(Solution {
                    success: true,
                    optimal_cost: current_g,
                    path: reconstruct_path(grid, &nodes, target_id),
                });
            }

            for (neighbour_id, step_cost) in grid.neighbours(id) {
                let tentative_g = current_g + step_cost;
                let improved = match nodes.get(&neighbour_id) {
                    None => true,
                    Some(existing) => !existing.closed && tentative_g < existing.g,
                };
                if !improved {
                    continue;
                }
                nodes.insert(
                    neighbour_id,
                    NodeRecord { g: tentative_g, predecessor: id, closed: false },
                );
                let h = octile_to(grid, neighbour_id, target_id);
                heap.push(HeapEntry { f: tentative_g + h, g: tentative_g, id: neighbour_id });
            }
        }

        Ok(Solution::not_found())
    }
}

/// Walks predecessors from `target_id` back to the start and reverses.
fn reconstruct_path(
    grid: &Grid,
    nodes: &FxHashMap<usize, NodeRecord>,
    target_id: usize,
) -> Vec<crate::grid::Position> {
    let mut ids = Vec::new();
    let mut current = target_id;
    loop {
        ids.push(current);
        let predecessor = nodes[&current].predecessor;
        if predecessor == NO_PREDECESSOR {
            break;
        }
        current = predecessor;
    }
    ids.reverse();
    ids.into_iter()
        .map(|id| {
            let (x, y) = grid.to_xy(id);
            crate::grid::Position::new(x, y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Position;

    fn fully_connected(width: usize, height: usize) -> Grid {
        let mut grid = Grid::empty(width, height);
        for id in 0..grid.cell_count() {
            for dir in 0..8 {
                grid.enable(id, dir);
            }
        }
        grid
    }

    #[test]
    fn s1_3x3_diagonal() {
        let grid = fully_connected(3, 3);
        let mut solver = SequentialAStar::new();
        let solution = solver.solve(&grid, Position::new(0, 0), Position::new(2, 2)).unwrap();
        assert!(solution.success);
        assert!((solution.optimal_cost - 2.0 * std::f32::consts::SQRT_2).abs() < 1e-3);
        assert_eq!(solution.path.first(), Some(&Position::new(0, 0)));
        assert_eq!(solution.path.last(), Some(&Position::new(2, 2)));
    }

    #[test]
    fn s2_axial_only_5x5() {
        let mut grid = Grid::empty(5, 5);
        for id in 0..grid.cell_count() {
            for dir in 0..4 {
                grid.enable(id, dir);
            }
        }
        let mut solver = SequentialAStar::new();
        let solution = solver.solve(&grid, Position::new(0, 0), Position::new(4, 4)).unwrap();
        assert!(solution.success);
        assert!((solution.optimal_cost - 8.0).abs() < 1e-3);
    }

    #[test]
    fn s4_single_cell() {
        let grid = fully_connected(1, 1);
        let mut solver = SequentialAStar::new();
        let solution = solver.solve(&grid, Position::new(0, 0), Position::new(0, 0)).unwrap();
        assert!(solution.success);
        assert_eq!(solution.optimal_cost, 0.0);
        assert_eq!(solution.path, vec![Position::new(0, 0)]);
    }

    #[test]
    fn s6_single_diagonal_edge() {
        let mut grid = Grid::empty(2, 2);
        let id00 = grid.to_id(0, 0);
        grid.enable(id00, 4); // (+1, +1)
        let mut solver = SequentialAStar::new();
        let solution = solver.solve(&grid, Position::new(0, 0), Position::new(1, 1)).unwrap();
        assert!(solution.success);
        assert!((solution.optimal_cost - std::f32::consts::SQRT_2).abs() < 1e-3);
        assert_eq!(solution.path, vec![Position::new(0, 0), Position::new(1, 1)]);
    }

    #[test]
    fn no_path_when_disconnected() {
        let grid = Grid::empty(4, 4); // no bits set at all
        let mut solver = SequentialAStar::new();
        let solution = solver.solve(&grid, Position::new(0, 0), Position::new(3, 3)).unwrap();
        assert!(!solution.success);
    }

    #[test]
    fn deterministic_across_runs() {
        let grid = fully_connected(6, 6);
        let first = SequentialAStar::new().solve(&grid, Position::new(0, 0), Position::new(5, 5)).unwrap();
        let second = SequentialAStar::new().solve(&grid, Position::new(0, 0), Position::new(5, 5)).unwrap();
        assert_eq!(first.optimal_cost, second.optimal_cost);
        assert_eq!(first.path, second.path);
    }
}

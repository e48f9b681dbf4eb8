use std::collections::HashSet;

use crate::config::Params;
use crate::dir::{self, Mode};
use crate::driver::{Steppable, Tick};
use crate::grid::torus_xy;
use crate::render::{self, Surface};
use crate::rng::{Rng, SALT_SEARCH};

/// One suspended expansion of the depth-first search. All recursion state
/// lives here, never in shared counters.
struct Frame {
    cell: (usize, usize),
    neighbors: Vec<(usize, usize)>,
    next: usize,
    best: Vec<(usize, usize)>,
}

/// Result of a finished search. The path runs from the first step after the
/// source through the destination inclusive; seeding it as a cycle closes
/// the loop back to the source.
#[derive(Clone, Debug)]
pub struct SearchReport {
    pub path: Vec<(usize, usize)>,
    /// True when the depth limit or node budget pruned any branch.
    pub exhausted: bool,
    pub nodes: usize,
}

/// Randomized longest-path search, staged one node event per scheduler tick.
/// Walks backward from the destination toward the source; neighbors are
/// expanded in a randomly rotated order; the visited set is branch-local
/// (entries are dropped on backtrack). Exponential by nature; the depth
/// limit and node budget keep it bounded.
pub struct PathSearch {
    mode: Mode,
    cols: usize,
    rows: usize,
    source: (usize, usize),
    dest: (usize, usize),
    stack: Vec<Frame>,
    visited: HashSet<(usize, usize)>,
    returned: Option<Vec<(usize, usize)>>,
    result: Option<Vec<(usize, usize)>>,
    started: bool,
    exhausted: bool,
    nodes: usize,
    rng: Rng,
    delay_ms: u64,
    depth_limit: usize,
    node_budget: usize,
}

impl PathSearch {
    pub fn new(
        seed: u64,
        cols: usize,
        rows: usize,
        mode: Mode,
        src: (usize, usize),
        dst: (usize, usize),
        params: &Params,
    ) -> Self {
        let source = torus_xy(src.0 as i64, src.1 as i64, cols, rows);
        let dest = torus_xy(dst.0 as i64, dst.1 as i64, cols, rows);
        Self {
            mode,
            cols,
            rows,
            source,
            dest,
            stack: Vec::new(),
            visited: HashSet::new(),
            returned: None,
            result: None,
            started: false,
            exhausted: false,
            nodes: 0,
            rng: Rng::new(seed ^ SALT_SEARCH),
            delay_ms: params.search_delay_ms,
            depth_limit: params.search_depth_limit.max(1),
            node_budget: params.search_node_budget,
        }
    }

    pub fn is_done(&self) -> bool {
        self.result.is_some()
    }

    pub fn into_report(self) -> SearchReport {
        SearchReport {
            path: self.result.unwrap_or_default(),
            exhausted: self.exhausted,
            nodes: self.nodes,
        }
    }

    /// Enter a node: resolve base cases immediately or push a frame.
    fn enter(&mut self, cell: (usize, usize), surface: &mut dyn Surface) {
        self.nodes += 1;
        if self.nodes > self.node_budget || self.stack.len() >= self.depth_limit {
            self.exhausted = true;
            self.returned = Some(Vec::new());
            return;
        }
        // Base case: reached the source.
        if cell == self.source {
            self.returned = Some(Vec::new());
            return;
        }
        // Base case: this branch already holds the cell.
        if self.visited.contains(&cell) {
            self.returned = Some(Vec::new());
            return;
        }

        self.visited.insert(cell);
        surface.fill(cell.0, cell.1, render::VISITED);
        surface.fill(self.source.0, self.source.1, render::SOURCE);

        // Enumerate the 8 candidate neighbors starting at a random one,
        // deduplicated by coordinate (FOUR/TWO collapse codes).
        let offset = self.rng.range_usize(8);
        let mut neighbors = Vec::with_capacity(8);
        for i in 0..8 {
            let d = ((i + offset) % 8) as u8;
            let n = dir::resolve(self.mode, cell.0, cell.1, d, self.cols, self.rows);
            if !neighbors.contains(&n) {
                neighbors.push(n);
            }
        }

        self.stack.push(Frame {
            cell,
            neighbors,
            next: 0,
            best: Vec::new(),
        });
    }
}

impl Steppable for PathSearch {
    fn step(&mut self, surface: &mut dyn Surface) -> Tick {
        if self.result.is_some() {
            return Tick::Done;
        }

        if !self.started {
            self.started = true;
            surface.fill(self.source.0, self.source.1, render::SOURCE);
            surface.fill(self.dest.0, self.dest.1, render::DEST);
            self.enter(self.dest, surface);
            if self.stack.is_empty() {
                // The destination itself was a base case.
                self.result = Some(self.returned.take().unwrap_or_default());
                return Tick::Done;
            }
            return Tick::Pending {
                delay_ms: self.delay_ms,
            };
        }

        // Fold a finished child into its parent before expanding further.
        if let Some(path) = self.returned.take() {
            if let Some(top) = self.stack.last_mut() {
                if path.len() > top.best.len() {
                    top.best = path;
                }
            }
        }

        let Some(top) = self.stack.last_mut() else {
            self.result = Some(Vec::new());
            return Tick::Done;
        };

        if top.next < top.neighbors.len() {
            let n = top.neighbors[top.next];
            top.next += 1;
            self.enter(n, surface);
            return Tick::Pending {
                delay_ms: self.delay_ms,
            };
        }

        // All neighbors explored: retire the frame and hand the longest
        // child path, extended with this cell, to the parent.
        let Some(frame) = self.stack.pop() else {
            self.result = Some(Vec::new());
            return Tick::Done;
        };
        self.visited.remove(&frame.cell);
        let mut path = frame.best;
        path.push(frame.cell);

        if self.stack.is_empty() {
            self.result = Some(path);
            return Tick::Done;
        }
        self.returned = Some(path);
        Tick::Pending {
            delay_ms: self.delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{CancelFlag, drive};
    use crate::render::NullSurface;

    fn run_search(
        seed: u64,
        cols: usize,
        rows: usize,
        mode: Mode,
        src: (usize, usize),
        dst: (usize, usize),
        params: &Params,
    ) -> SearchReport {
        let mut search = PathSearch::new(seed, cols, rows, mode, src, dst, params);
        let cap = params.search_node_budget * 10 + 64;
        let report = drive(&mut search, &mut NullSurface, &CancelFlag::new(), cap);
        assert!(report.done, "search did not finish in {} steps", report.steps);
        search.into_report()
    }

    #[test]
    fn search_to_itself_is_the_base_case() {
        let report = run_search(1, 8, 8, Mode::Eight, (2, 2), (2, 2), &Params::default());
        assert!(report.path.is_empty());
        assert!(!report.exhausted);
    }

    #[test]
    fn minimal_board_returns_only_the_destination() {
        // On 2x1 every neighbor of the destination is the source or the
        // destination itself, so both base cases fire and the path is the
        // destination alone.
        let report = run_search(3, 2, 1, Mode::Eight, (0, 0), (1, 0), &Params::default());
        assert_eq!(report.path, vec![(1, 0)]);
        assert!(!report.exhausted);
    }

    #[test]
    fn path_is_walkable_and_ends_at_the_destination() {
        let params = Params {
            search_depth_limit: 12,
            search_node_budget: 5_000,
            ..Params::default()
        };
        let report = run_search(9, 5, 5, Mode::Four, (0, 0), (2, 2), &params);
        assert_eq!(*report.path.last().unwrap(), (2, 2));

        // Every hop, including source -> first, is one step under the mode.
        let mut prev = (0, 0);
        for &cell in &report.path {
            assert!(
                dir::between(Mode::Four, 5, 5, prev, cell).is_some(),
                "{prev:?} -> {cell:?} is not one step"
            );
            prev = cell;
        }

        // No cell repeats: the visited set is threaded through the search.
        let unique: HashSet<_> = report.path.iter().collect();
        assert_eq!(unique.len(), report.path.len());
    }

    #[test]
    fn tight_budget_reports_exhaustion() {
        let params = Params {
            search_node_budget: 8,
            ..Params::default()
        };
        let report = run_search(4, 16, 16, Mode::Eight, (0, 0), (8, 8), &params);
        assert!(report.exhausted);
    }

    #[test]
    fn depth_limit_bounds_the_path() {
        let params = Params {
            search_depth_limit: 4,
            search_node_budget: 50_000,
            ..Params::default()
        };
        let report = run_search(11, 12, 12, Mode::Eight, (0, 0), (6, 6), &params);
        assert!(report.path.len() <= 4);
    }

    #[test]
    fn same_seed_same_path() {
        let params = Params {
            search_depth_limit: 10,
            search_node_budget: 2_000,
            ..Params::default()
        };
        let a = run_search(21, 4, 4, Mode::Eight, (2, 2), (2, 1), &params);
        let b = run_search(21, 4, 4, Mode::Eight, (2, 2), (2, 1), &params);
        assert_eq!(a.path, b.path);
    }
}

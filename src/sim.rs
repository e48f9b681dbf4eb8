use thiserror::Error;

use crate::config::Params;
use crate::dir::{self, Mode};
use crate::driver::{Steppable, Tick};
use crate::grid::{Grid, UNASSIGNED, torus_xy};
use crate::render::{self, Surface};
use crate::rng::{Rng, SALT_ANIMATE, SALT_POPULATE};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("grid dimensions must be nonzero, got {cols}x{rows}")]
    EmptyGrid { cols: usize, rows: usize },
    #[error("cannot seed a cycle from an empty path")]
    EmptyPath,
    #[error("no direction connects {from:?} to {to:?} under {mode:?} mode")]
    NoDirection {
        mode: Mode,
        from: (usize, usize),
        to: (usize, usize),
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Assigning pointers, one tile per tick.
    Populate,
    /// Walking the linked structure. No terminal condition of its own.
    Animate,
    /// Nothing left to schedule.
    Idle,
}

/// The grid path simulator. Owns the board, the cursor and the per-phase
/// RNG streams; a fresh one is built per run, nothing persists across runs.
pub struct Simulator {
    grid: Grid<u8>,
    mode: Mode,
    params: Params,
    cursor: (usize, usize),
    phase: Phase,
    populated: usize,
    retries: u32,
    merges: Vec<(usize, usize)>,
    anim_started: bool,
    pop_rng: Rng,
    anim_rng: Rng,
}

impl Simulator {
    /// Population run: the walk starts from the center tile.
    pub fn new(
        seed: u64,
        cols: usize,
        rows: usize,
        mode: Mode,
        params: &Params,
    ) -> Result<Self, SimError> {
        if cols == 0 || rows == 0 {
            return Err(SimError::EmptyGrid { cols, rows });
        }
        Ok(Self {
            grid: Grid::filled(cols, rows, UNASSIGNED),
            mode,
            params: params.clone(),
            cursor: (cols / 2, rows / 2),
            phase: Phase::Populate,
            populated: 0,
            retries: 0,
            merges: Vec::new(),
            anim_started: false,
            pop_rng: Rng::new(seed ^ SALT_POPULATE),
            anim_rng: Rng::new(seed ^ SALT_ANIMATE),
        })
    }

    /// Path-seeded run: the board holds only the given cycle and the
    /// animation starts at its source tile.
    pub fn from_path(
        seed: u64,
        cols: usize,
        rows: usize,
        mode: Mode,
        params: &Params,
        src: (usize, usize),
        path: &[(usize, usize)],
    ) -> Result<Self, SimError> {
        if cols == 0 || rows == 0 {
            return Err(SimError::EmptyGrid { cols, rows });
        }
        let src = torus_xy(src.0 as i64, src.1 as i64, cols, rows);
        let mut grid = Grid::filled(cols, rows, UNASSIGNED);
        seed_path(&mut grid, mode, src, path)?;
        Ok(Self {
            grid,
            mode,
            params: params.clone(),
            cursor: src,
            phase: Phase::Animate,
            populated: path.len() + 1,
            retries: 0,
            merges: Vec::new(),
            anim_started: false,
            pop_rng: Rng::new(seed ^ SALT_POPULATE),
            anim_rng: Rng::new(seed ^ SALT_ANIMATE),
        })
    }

    pub fn grid(&self) -> &Grid<u8> {
        &self.grid
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    /// Tiles entered while still unassigned. The seed tile is not counted,
    /// so a complete board reads `rows*cols - 1`.
    pub fn populated(&self) -> usize {
        self.populated
    }

    /// Tiles where a cycle-closing collision was accepted after the retry
    /// budget ran out.
    pub fn merges(&self) -> &[(usize, usize)] {
        &self.merges
    }

    fn step_populate(&mut self, surface: &mut dyn Surface) -> Tick {
        let (x, y) = self.cursor;
        if self.grid.get(x, y) == UNASSIGNED {
            surface.fill(x, y, render::BOARD);
        }
        let d = self.pop_rng.dir8();
        self.grid.set(x, y, d);
        let (nx, ny) = dir::resolve(self.mode, x, y, d, self.grid.w, self.grid.h);

        if self.grid.get(nx, ny) != UNASSIGNED && self.retries < self.params.retry_budget {
            // Pointing at a populated tile would close the loop early.
            // Redraw on the same tile until the budget runs out.
            self.retries += 1;
            return Tick::Pending {
                delay_ms: self.params.populate_delay_ms,
            };
        }

        if self.grid.get(nx, ny) == UNASSIGNED {
            self.populated += 1;
        } else {
            // Budget exhausted: accept the collision.
            self.merges.push((nx, ny));
            surface.fill(nx, ny, render::MERGE);
        }

        let total = self.grid.w * self.grid.h;
        if self.populated < total.saturating_sub(1) {
            self.retries = 0;
            self.cursor = (nx, ny);
            Tick::Pending {
                delay_ms: self.params.populate_delay_ms,
            }
        } else {
            // Last tile gets a forced pointer so the walk can keep looping.
            self.grid.set(nx, ny, self.pop_rng.dir8());
            surface.fill(nx, ny, render::BOARD);
            self.begin_animation();
            Tick::Pending {
                delay_ms: self.params.animate_delay_ms,
            }
        }
    }

    fn begin_animation(&mut self) {
        let x = self.anim_rng.range_usize(self.grid.w);
        let y = self.anim_rng.range_usize(self.grid.h);
        self.cursor = (x, y);
        self.anim_started = false;
        self.phase = Phase::Animate;
    }

    fn step_animate(&mut self, surface: &mut dyn Surface) -> Tick {
        let (x, y) = self.cursor;
        if !self.anim_started {
            surface.fill(x, y, render::HEAD);
            self.anim_started = true;
            return Tick::Pending {
                delay_ms: self.params.animate_delay_ms,
            };
        }
        let d = self.grid.get(x, y);
        if d == UNASSIGNED {
            // Possible on path-seeded boards: the walk fell off the cycle.
            self.phase = Phase::Idle;
            return Tick::Done;
        }
        let (nx, ny) = dir::resolve(self.mode, x, y, d, self.grid.w, self.grid.h);
        surface.fill(x, y, render::TRAIL);
        surface.fill(nx, ny, render::HEAD);
        self.cursor = (nx, ny);
        Tick::Pending {
            delay_ms: self.params.animate_delay_ms,
        }
    }
}

impl Steppable for Simulator {
    fn step(&mut self, surface: &mut dyn Surface) -> Tick {
        match self.phase {
            Phase::Populate => self.step_populate(surface),
            Phase::Animate => self.step_animate(surface),
            Phase::Idle => Tick::Done,
        }
    }
}

/// Assign pointers so the walk runs from `src` through `path` in order and
/// the last tile loops back to `src`. Fails if any hop is not one step
/// under the mode.
pub fn seed_path(
    grid: &mut Grid<u8>,
    mode: Mode,
    src: (usize, usize),
    path: &[(usize, usize)],
) -> Result<(), SimError> {
    let (w, h) = (grid.w, grid.h);
    let first = *path.first().ok_or(SimError::EmptyPath)?;
    let d = dir::between(mode, w, h, src, first).ok_or(SimError::NoDirection {
        mode,
        from: src,
        to: first,
    })?;
    grid.set(src.0, src.1, d);

    for (k, &cell) in path.iter().enumerate() {
        let next = if k + 1 < path.len() { path[k + 1] } else { src };
        let d = dir::between(mode, w, h, cell, next).ok_or(SimError::NoDirection {
            mode,
            from: cell,
            to: next,
        })?;
        grid.set(cell.0, cell.1, d);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{CancelFlag, drive_while};
    use crate::render::NullSurface;

    fn run_population(seed: u64, cols: usize, rows: usize, mode: Mode) -> Simulator {
        let params = Params::default();
        let mut sim = Simulator::new(seed, cols, rows, mode, &params).unwrap();
        let cap = cols * rows * (params.retry_budget as usize + 1);
        let report = drive_while(&mut sim, &mut NullSurface, &CancelFlag::new(), cap, |s| {
            s.phase() == Phase::Populate
        });
        assert!(
            sim.phase() == Phase::Animate,
            "population did not finish in {} steps",
            report.steps
        );
        sim
    }

    #[test]
    fn population_assigns_every_tile() {
        for mode in [Mode::Eight, Mode::Four, Mode::Two, Mode::Knight] {
            let sim = run_population(2, 8, 8, mode);
            assert!(sim.grid().data.iter().all(|&d| d != UNASSIGNED));
            assert_eq!(sim.populated(), 8 * 8 - 1);
        }
    }

    #[test]
    fn population_is_deterministic_per_seed() {
        let a = run_population(7, 6, 6, Mode::Eight);
        let b = run_population(7, 6, 6, Mode::Eight);
        assert_eq!(a.grid(), b.grid());
        assert_eq!(a.merges(), b.merges());

        let c = run_population(8, 6, 6, Mode::Eight);
        assert_ne!(a.grid(), c.grid());
    }

    #[test]
    fn one_by_one_board_burns_the_budget_then_merges() {
        // Every pointer is a self-loop, so the first tile retries the full
        // budget, accepts the collision, and goes straight to animation.
        let params = Params::default();
        let mut sim = Simulator::new(5, 1, 1, Mode::Eight, &params).unwrap();
        let report = drive_while(
            &mut sim,
            &mut NullSurface,
            &CancelFlag::new(),
            10_000,
            |s| s.phase() == Phase::Populate,
        );
        assert_eq!(report.steps, params.retry_budget as usize + 1);
        assert_eq!(sim.merges(), &[(0, 0)]);
        assert_eq!(sim.phase(), Phase::Animate);
    }

    #[test]
    fn animation_walks_the_seeded_cycle() {
        // 1x2 board, TWO mode: south from either tile wraps to the other.
        let params = Params::default();
        let mut sim =
            Simulator::from_path(0, 1, 2, Mode::Two, &params, (0, 0), &[(0, 1)]).unwrap();
        let mut fb = crate::render::FrameBuffer::new(1, 2);

        assert_eq!(sim.step(&mut fb), Tick::Pending { delay_ms: 100 }); // start paint
        assert_eq!(fb.tile(0, 0), render::HEAD);

        sim.step(&mut fb);
        assert_eq!(sim.cursor(), (0, 1));
        assert_eq!(fb.tile(0, 0), render::TRAIL);
        assert_eq!(fb.tile(0, 1), render::HEAD);

        sim.step(&mut fb);
        assert_eq!(sim.cursor(), (0, 0));
        assert_eq!(fb.tile(0, 0), render::HEAD);
        assert_eq!(fb.tile(0, 1), render::TRAIL);
    }

    #[test]
    fn seeding_rejects_unreachable_hops() {
        let mut grid = Grid::filled(5, 5, UNASSIGNED);
        let err = seed_path(&mut grid, Mode::Four, (0, 0), &[(3, 3)]).unwrap_err();
        assert!(matches!(err, SimError::NoDirection { .. }));

        let err = seed_path(&mut grid, Mode::Four, (0, 0), &[]).unwrap_err();
        assert!(matches!(err, SimError::EmptyPath));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            Simulator::new(1, 0, 4, Mode::Eight, &Params::default()),
            Err(SimError::EmptyGrid { .. })
        ));
    }
}

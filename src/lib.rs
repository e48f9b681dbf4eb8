pub mod config;
pub mod dir;
pub mod driver;
pub mod grid;
pub mod render;
pub mod rng;
pub mod search;
pub mod sim;

use std::time::Instant;

use config::Params;
use dir::Mode;
use driver::{CancelFlag, drive, drive_while};
use grid::Grid;
use render::FrameBuffer;
use search::PathSearch;
use sim::{Phase, SimError, Simulator};

/// Result of a population run plus recorded animation ticks.
pub struct Outcome {
    pub cols: usize,
    pub rows: usize,
    /// Direction code per tile.
    pub board: Grid<u8>,
    /// Tiles where a cycle-closing collision was forced.
    pub merges: Vec<(usize, usize)>,
    pub populate_steps: usize,
    pub animate_steps: usize,
    /// False when the population stalled out its step bound or was cancelled.
    pub completed: bool,
    pub cancelled: bool,
    /// Upscaled RGBA frame of the board after the recorded animation.
    pub rgba: Vec<u8>,
}

/// Result of a longest-path demonstration.
pub struct PathOutcome {
    pub cols: usize,
    pub rows: usize,
    pub path: Vec<(usize, usize)>,
    pub exhausted: bool,
    pub nodes: usize,
    /// False when the path could not be closed into a cycle (empty path,
    /// or a pruned search left a first hop the mode cannot make).
    pub seeded: bool,
    pub board: Grid<u8>,
    pub animate_steps: usize,
    pub cancelled: bool,
    pub rgba: Vec<u8>,
}

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Forced-completion step envelope for a population run.
pub fn populate_step_bound(cols: usize, rows: usize, retry_budget: u32) -> usize {
    cols * rows * (retry_budget as usize + 1)
}

/// Run the population phase to completion and record `animation_steps`
/// animation ticks, all headlessly against a frame buffer.
pub fn simulate(
    seed: u64,
    cols: usize,
    rows: usize,
    mode: Mode,
    params: &Params,
    cancel: &CancelFlag,
) -> Result<(Outcome, Vec<Timing>), SimError> {
    let mut timings = Vec::new();
    let total_start = Instant::now();

    let mut sim = Simulator::new(seed, cols, rows, mode, params)?;
    let mut frame = FrameBuffer::new(cols, rows);

    let t = Instant::now();
    let pop_cap = populate_step_bound(cols, rows, params.retry_budget);
    let pop = drive_while(&mut sim, &mut frame, cancel, pop_cap, |s| {
        s.phase() == Phase::Populate
    });
    timings.push(Timing {
        name: "populate",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    let anim = drive_while(&mut sim, &mut frame, cancel, params.animation_steps, |s| {
        s.phase() == Phase::Animate
    });
    timings.push(Timing {
        name: "animate",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    let rgba = frame.to_rgba(params.tile_size);
    timings.push(Timing {
        name: "render",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    timings.push(Timing {
        name: "TOTAL",
        ms: total_start.elapsed().as_secs_f64() * 1000.0,
    });

    let outcome = Outcome {
        cols,
        rows,
        merges: sim.merges().to_vec(),
        populate_steps: pop.steps,
        animate_steps: anim.steps,
        completed: sim.phase() != Phase::Populate,
        cancelled: pop.cancelled || anim.cancelled,
        board: sim.grid().clone(),
        rgba,
    };

    Ok((outcome, timings))
}

/// Run the staged longest-path search, seed a demonstration cycle from the
/// result, and record animation ticks along it.
pub fn demonstrate_path(
    seed: u64,
    cols: usize,
    rows: usize,
    mode: Mode,
    src: (usize, usize),
    dst: (usize, usize),
    params: &Params,
    cancel: &CancelFlag,
) -> Result<(PathOutcome, Vec<Timing>), SimError> {
    if cols == 0 || rows == 0 {
        return Err(SimError::EmptyGrid { cols, rows });
    }

    let mut timings = Vec::new();
    let total_start = Instant::now();
    let mut frame = FrameBuffer::new(cols, rows);

    let t = Instant::now();
    let mut search = PathSearch::new(seed, cols, rows, mode, src, dst, params);
    let search_cap = params.search_node_budget * 10 + 64;
    let search_run = drive(&mut search, &mut frame, cancel, search_cap);
    let report = search.into_report();
    timings.push(Timing {
        name: "search",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    let empty_board = || Grid::filled(cols, rows, grid::UNASSIGNED);
    let (board, animate_steps, anim_cancelled, seeded) = if report.path.is_empty() {
        // Degenerate search (destination was a base case): nothing to seed.
        (empty_board(), 0, false, false)
    } else {
        match Simulator::from_path(seed, cols, rows, mode, params, src, &report.path) {
            Ok(mut sim) => {
                let anim =
                    drive_while(&mut sim, &mut frame, cancel, params.animation_steps, |s| {
                        s.phase() == Phase::Animate
                    });
                (sim.grid().clone(), anim.steps, anim.cancelled, true)
            }
            // A pruned search can leave a path whose first hop is not one
            // step from the source; the board stays empty and the caller
            // sees the flag instead of an error.
            Err(SimError::NoDirection { .. }) => (empty_board(), 0, false, false),
            Err(e) => return Err(e),
        }
    };
    timings.push(Timing {
        name: "seed_animate",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    let rgba = frame.to_rgba(params.tile_size);
    timings.push(Timing {
        name: "render",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    timings.push(Timing {
        name: "TOTAL",
        ms: total_start.elapsed().as_secs_f64() * 1000.0,
    });

    let outcome = PathOutcome {
        cols,
        rows,
        path: report.path,
        exhausted: report.exhausted,
        nodes: report.nodes,
        seeded,
        board,
        animate_steps,
        cancelled: search_run.cancelled || anim_cancelled,
        rgba,
    };

    Ok((outcome, timings))
}

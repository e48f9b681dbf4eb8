use rayon::prelude::*;

use crate::grid::{Grid, UNASSIGNED};
use crate::rng::splitmix32;

// Tile colors (RGBA)
pub const BACKGROUND: [u8; 4] = [20, 16, 24, 255];
pub const BOARD: [u8; 4] = [255, 102, 153, 255]; // freshly assigned tile
pub const MERGE: [u8; 4] = [255, 0, 153, 255]; // forced cycle closure
pub const HEAD: [u8; 4] = [51, 204, 51, 255]; // animation front
pub const TRAIL: [u8; 4] = [51, 187, 51, 255]; // cells the animation left behind
pub const SOURCE: [u8; 4] = [102, 0, 204, 255]; // search source
pub const DEST: [u8; 4] = [102, 255, 255, 255]; // search destination
pub const VISITED: [u8; 4] = [128, 0, 0, 255]; // search frontier

/// Sink for `(x, y, color)` paint effects. Simulation phases push paints
/// here after each state transition; tests swap in a discarding sink.
pub trait Surface {
    fn fill(&mut self, x: usize, y: usize, color: [u8; 4]);
    fn clear(&mut self);
}

/// Discards every paint. Used by headless drivers that only need grid state.
pub struct NullSurface;

impl Surface for NullSurface {
    fn fill(&mut self, _x: usize, _y: usize, _color: [u8; 4]) {}
    fn clear(&mut self) {}
}

/// Tile-resolution color buffer. Upscales to pixels on demand.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    tiles: Grid<[u8; 4]>,
}

impl FrameBuffer {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            tiles: Grid::filled(w, h, BACKGROUND),
        }
    }

    pub fn w(&self) -> usize {
        self.tiles.w
    }

    pub fn h(&self) -> usize {
        self.tiles.h
    }

    pub fn tile(&self, x: usize, y: usize) -> [u8; 4] {
        self.tiles.get(x, y)
    }

    /// Upscale to an RGBA pixel buffer, `tile_size` pixels per tile side.
    /// A zero tile size renders as one pixel per tile.
    pub fn to_rgba(&self, tile_size: usize) -> Vec<u8> {
        let tile_size = tile_size.max(1);
        let w = self.tiles.w;
        let h = self.tiles.h;
        let pw = w * tile_size;
        let mut rgba = vec![0u8; pw * h * tile_size * 4];

        rgba.par_chunks_mut(pw * 4)
            .enumerate()
            .for_each(|(py, row)| {
                let ty = py / tile_size;
                for tx in 0..w {
                    let color = self.tiles.get(tx, ty);
                    for sub in 0..tile_size {
                        let px = tx * tile_size + sub;
                        row[px * 4..px * 4 + 4].copy_from_slice(&color);
                    }
                }
            });

        rgba
    }
}

impl Surface for FrameBuffer {
    fn fill(&mut self, x: usize, y: usize, color: [u8; 4]) {
        // Out-of-range paints are dropped at the edge, not an error.
        if x < self.tiles.w && y < self.tiles.h {
            self.tiles.set(x, y, color);
        }
    }

    fn clear(&mut self) {
        for t in &mut self.tiles.data {
            *t = BACKGROUND;
        }
    }
}

/// Diagnostic layer: each cell colored by its direction code, unassigned
/// cells left dark. Code colors are hash-derived so all modes share them.
pub fn render_directions(board: &Grid<u8>) -> FrameBuffer {
    let colors: Vec<[u8; 4]> = (0..8u32)
        .map(|d| {
            let h = splitmix32(d * 13 + 7);
            [
                (h & 0xFF) as u8 | 60,
                ((h >> 8) & 0xFF) as u8 | 60,
                ((h >> 16) & 0xFF) as u8 | 60,
                255,
            ]
        })
        .collect();

    let mut fb = FrameBuffer::new(board.w, board.h);
    for y in 0..board.h {
        for x in 0..board.w {
            let d = board.get(x, y);
            if d != UNASSIGNED {
                fb.fill(x, y, colors[(d & 7) as usize]);
            }
        }
    }
    fb
}

use crate::grid::torus_xy;

/// Methods of path propagation. Direction codes are always drawn from 0..8;
/// the mode decides how a code maps to a coordinate delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// 8 compass directions.
    Eight,
    /// Cardinal directions only; codes collapse pairwise.
    Four,
    /// South or east only; codes collapse four-to-one.
    Two,
    /// Chess-knight offsets.
    Knight,
}

impl Mode {
    /// Parse the command name used by the CLI and the server.
    pub fn from_name(name: &str) -> Option<Mode> {
        match name {
            "eight" => Some(Mode::Eight),
            "four" => Some(Mode::Four),
            "two" => Some(Mode::Two),
            "knight" => Some(Mode::Knight),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Eight => "eight",
            Mode::Four => "four",
            Mode::Two => "two",
            Mode::Knight => "knight",
        }
    }
}

/// Coordinate delta for a direction code under the given mode.
/// Codes 0..8; anything else is a caller bug.
#[inline]
pub fn offset(mode: Mode, dir: u8) -> (i64, i64) {
    match mode {
        Mode::Eight => match dir {
            0 => (0, -1),  // N
            1 => (1, -1),  // NE
            2 => (1, 0),   // E
            3 => (1, 1),   // SE
            4 => (0, 1),   // S
            5 => (-1, 1),  // SW
            6 => (-1, 0),  // W
            _ => (-1, -1), // NW
        },
        Mode::Four => match dir {
            0 | 1 => (0, -1), // N
            2 | 3 => (1, 0),  // E
            4 | 5 => (0, 1),  // S
            _ => (-1, 0),     // W
        },
        Mode::Two => match dir {
            0..=3 => (0, 1), // S
            _ => (1, 0),     // E
        },
        Mode::Knight => match dir {
            0 => (1, -2),  // NNE
            1 => (2, -1),  // ENE
            2 => (2, 1),   // ESE
            3 => (1, 2),   // SSE
            4 => (-1, 2),  // SSW
            5 => (-2, 1),  // WSW
            6 => (-2, -1), // WNW
            _ => (-1, -2), // NNW
        },
    }
}

/// Destination of one step from (x, y) along `dir`, wrapped toroidally.
#[inline]
pub fn resolve(mode: Mode, x: usize, y: usize, dir: u8, w: usize, h: usize) -> (usize, usize) {
    let (dx, dy) = offset(mode, dir);
    torus_xy(x as i64 + dx, y as i64 + dy, w, h)
}

/// Inverse lookup: the lowest direction code connecting `from` to `to` in one
/// step, or None if no code does. Linear scan over the 8 candidates.
pub fn between(
    mode: Mode,
    w: usize,
    h: usize,
    from: (usize, usize),
    to: (usize, usize),
) -> Option<u8> {
    (0..8).find(|&d| resolve(mode, from.0, from.1, d, w, h) == to)
}

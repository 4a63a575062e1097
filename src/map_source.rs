//! Map sources: external collaborators that fill a grid's connectivity
//! masks and name the start/target cells. The core only consumes this
//! trait; map generation internals live outside it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::{Grid, Position};

/// Fills `width * height` connectivity masks in row-major order using
/// the `grid::DIRECTIONS` convention, and names the start/target
/// cells.
pub trait MapSource {
    fn generate(&mut self, grid: &mut Grid);
    fn start(&self) -> Position;
    fn target(&self) -> Position;
}

/// Rolls each of the 8 neighbour bits independently at `fill_probability`,
/// then repairs symmetry so that connectivity reads as a property of the
/// edge rather than the directed bit: an edge `u<->v` is either
/// traversable both ways or neither.
pub struct RandomMapSource {
    rng: StdRng,
    fill_probability: f64,
    start: Position,
    target: Position,
}

impl RandomMapSource {
    pub fn new(width: usize, height: usize, seed: Option<u64>, fill_probability: f64) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let start = Position::new(
            rng.gen_range(0..width.max(1)),
            rng.gen_range(0..height.max(1)),
        );
        let mut target = start;
        // Avoid a degenerate single-cell query unless the grid is 1x1.
        if width * height > 1 {
            while target == start {
                target = Position::new(
                    rng.gen_range(0..width.max(1)),
                    rng.gen_range(0..height.max(1)),
                );
            }
        }
        RandomMapSource { rng, fill_probability, start, target }
    }
}

impl MapSource for RandomMapSource {
    fn generate(&mut self, grid: &mut Grid) {
        for id in 0..grid.cell_count() {
            for dir in 0..8 {
                if self.rng.gen_bool(self.fill_probability) {
                    grid.enable(id, dir);
                }
            }
        }
        symmetrize(grid);
    }

    fn start(&self) -> Position {
        self.start
    }

    fn target(&self) -> Position {
        self.target
    }
}

/// A 4x4 grid, fully connected, except that column 2 has no
/// connectivity to/from column 1 or 3.
pub struct WallsDemoMapSource;

impl MapSource for WallsDemoMapSource {
    fn generate(&mut self, grid: &mut Grid) {
        assert_eq!((grid.width, grid.height), (4, 4), "WallsDemoMapSource requires a 4x4 grid");
        for id in 0..grid.cell_count() {
            let (x, _y) = grid.to_xy(id);
            for dir in 0..8 {
                let (dx, _, _) = crate::grid::DIRECTIONS[dir];
                let nx = x as i64 + dx as i64;
                let crosses_wall = (x == 1 && nx == 2) || (x == 2 && (nx == 1 || nx == 3));
                if !crosses_wall {
                    grid.enable(id, dir);
                }
            }
        }
    }

    fn start(&self) -> Position {
        Position::new(0, 0)
    }

    fn target(&self) -> Position {
        Position::new(3, 3)
    }
}

/// Ensures every enabled bit has a matching reverse bit on the neighbour.
fn symmetrize(grid: &mut Grid) {
    for id in 0..grid.cell_count() {
        let mask = grid.mask(id);
        for dir in 0..8u8 {
            if mask & (1 << dir) == 0 {
                continue;
            }
            let (dx, dy, _) = crate::grid::DIRECTIONS[dir as usize];
            let (x, y) = grid.to_xy(id);
            let (nx, ny) = (x as i64 + dx as i64, y as i64 + dy as i64);
            if !grid.in_range(nx, ny) {
                *grid.mask_mut(id) &= !(1 << dir);
                continue;
            }
            let neighbour = grid.to_id(nx as usize, ny as usize);
            let reverse_dir = reverse_of(dir as usize);
            *grid.mask_mut(neighbour) |= 1 << reverse_dir;
        }
    }
}

fn reverse_of(dir: usize) -> usize {
    // 0<->1, 2<->3, 4<->7, 5<->6 per the fixed DIRECTIONS layout.
    match dir {
        0 => 1,
        1 => 0,
        2 => 3,
        3 => 2,
        4 => 7,
        5 => 6,
        6 => 5,
        7 => 4,
        _ => unreachable!(),
    }
}

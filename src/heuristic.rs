//! Octile distance heuristic: admissible and consistent for an
//! 8-connected grid with axial cost 1 and diagonal cost sqrt(2).

use crate::grid::Grid;

/// `h(x, y) = min(dx, dy) * sqrt(2) + |dx - dy|`, `dx = |x - ex|`,
/// `dy = |y - ey|`.
#[inline]
pub fn octile(x: usize, y: usize, ex: usize, ey: usize) -> f32 {
    let dx = (x as i64 - ex as i64).unsigned_abs() as f32;
    let dy = (y as i64 - ey as i64).unsigned_abs() as f32;
    dx.min(dy) * std::f32::consts::SQRT_2 + (dx - dy).abs()
}

/// Octile distance from cell `id` to `target_id` on `grid`.
#[inline]
pub fn octile_to(grid: &Grid, id: usize, target_id: usize) -> f32 {
    let (x, y) = grid.to_xy(id);
    let (ex, ey) = grid.to_xy(target_id);
    octile(x, y, ex, ey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_at_target() {
        assert_eq!(octile(4, 4, 4, 4), 0.0);
    }

    #[test]
    fn pure_diagonal() {
        let h = octile(0, 0, 3, 3);
        assert!((h - 3.0 * std::f32::consts::SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn pure_axial() {
        let h = octile(0, 0, 5, 0);
        assert!((h - 5.0).abs() < 1e-5);
    }

    #[test]
    fn mixed() {
        // 2 diagonal steps + 3 remaining axial steps
        let h = octile(0, 0, 2, 5);
        let expected = 2.0 * std::f32::consts::SQRT_2 + 3.0;
        assert!((h - expected).abs() < 1e-5);
    }
}

use vicsek_common::{angle_to_vec, wrap_coordinate, Vec2};

/// Moves a particle `speed` units along `heading` and wraps the result onto
/// the `[0, width) x [0, height)` torus.
#[inline]
pub fn advance(x: f64, y: f64, heading: f64, speed: f64, width: f64, height: f64) -> (f64, f64) {
    let moved = Vec2::new(x, y).add(angle_to_vec(heading).scale(speed));
    (wrap_coordinate(moved.x, width), wrap_coordinate(moved.y, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn wraps_past_the_far_edge() {
        let (x, y) = advance(0.9, 0.9, 0.0, 1.0, 1.0, 1.0);
        assert!((x - 0.9).abs() < 1e-9, "x = {}", x);
        assert!((y - 0.9).abs() < 1e-9, "y = {}", y);
    }

    #[test]
    fn wraps_below_zero_to_the_far_edge() {
        let (x, y) = advance(0.1, 5.0, PI, 0.4, 20.0, 20.0);
        assert!((x - 19.7).abs() < 1e-9, "x = {}", x);
        assert!((y - 5.0).abs() < 1e-9, "y = {}", y);

        let (_, y) = advance(3.0, 0.0, -PI / 2.0, 0.5, 20.0, 20.0);
        assert!((y - 19.5).abs() < 1e-9, "y = {}", y);
    }

    #[test]
    fn zero_speed_stays_put() {
        assert_eq!(advance(3.25, 7.5, 1.234, 0.0, 20.0, 20.0), (3.25, 7.5));
    }

    #[test]
    fn unwrapped_heading_is_accepted() {
        let (x, y) = advance(10.0, 10.0, 2.0 * PI + PI / 2.0, 1.0, 20.0, 20.0);
        assert!((x - 10.0).abs() < 1e-9);
        assert!((y - 11.0).abs() < 1e-9);
    }
}

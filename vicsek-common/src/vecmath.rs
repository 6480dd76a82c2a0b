use serde::{Deserialize, Serialize};

// Basic 2D vector type
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline(always)]
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }
    /// Flat (non-periodic) squared distance.
    #[inline(always)]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x; let dy = self.y - other.y; dx * dx + dy * dy
    }
    #[inline(always)]
    pub fn add(self, other: Self) -> Self { Self::new(self.x + other.x, self.y + other.y) }
    #[inline(always)]
    pub fn scale(self, scalar: f64) -> Self { Self::new(self.x * scalar, self.y * scalar) }
}

#[inline(always)]
pub fn angle_to_vec(theta: f64) -> Vec2 { Vec2::new(theta.cos(), theta.sin()) }

/// Wraps a coordinate onto `[0, extent)` using the floor modulo.
///
/// `rem_euclid` can round up to exactly `extent` for tiny negative inputs;
/// that case maps to `0.0` so the half-open interval always holds.
#[inline(always)]
pub fn wrap_coordinate(value: f64, extent: f64) -> f64 {
    let wrapped = value.rem_euclid(extent);
    if wrapped >= extent { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_uses_floor_modulo() {
        assert!((wrap_coordinate(1.9, 1.0) - 0.9).abs() < 1e-12);
        assert!((wrap_coordinate(-0.25, 20.0) - 19.75).abs() < 1e-12);
        assert_eq!(wrap_coordinate(20.0, 20.0), 0.0);
        assert_eq!(wrap_coordinate(3.5, 20.0), 3.5);
    }

    #[test]
    fn wrap_never_returns_the_extent() {
        let w = wrap_coordinate(-1e-20, 20.0);
        assert!((0.0..20.0).contains(&w), "got {}", w);
    }

    #[test]
    fn vector_arithmetic() {
        let v = angle_to_vec(0.75);
        assert!((v.distance_squared(Vec2::default()) - 1.0).abs() < 1e-12);
        assert!((v.y.atan2(v.x) - 0.75).abs() < 1e-12);
        assert_eq!(Vec2::new(3.0, 4.0).distance_squared(Vec2::new(0.0, 0.0)), 25.0);
        assert_eq!(Vec2::new(-1.0, 2.0).distance_squared(Vec2::new(2.0, -2.0)), 25.0);
        assert_eq!(Vec2::new(1.0, 2.0).add(Vec2::new(1.0, 1.0)).scale(2.0), Vec2::new(4.0, 6.0));
    }
}

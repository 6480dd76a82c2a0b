//! Heading update: scalar mean of neighbor headings plus uniform noise.
//!
//! The mean is a plain arithmetic average of angles, not a circular mean.
//! Headings near +π and -π therefore average to roughly 0; this matches the
//! classic formulation of the model and is kept as is.

use rand::distr::Uniform;
use rand::prelude::*;
use vicsek_common::{Error, Result};

/// Arithmetic mean of `headings[j]` over `neighbors`.
pub fn mean_heading(headings: &[f64], neighbors: &[usize]) -> Result<f64> {
    if neighbors.is_empty() {
        return Err(Error::InvalidState("heading update with an empty neighbor set".into()));
    }
    let sum: f64 = neighbors.iter().map(|&j| headings[j]).sum();
    Ok(sum / neighbors.len() as f64)
}

/// Uniform perturbation on `[-eta, eta]`.
#[derive(Debug, Clone)]
pub struct HeadingNoise {
    dist: Uniform<f64>,
}

impl HeadingNoise {
    pub fn new(eta: f64) -> Result<Self> {
        let dist = Uniform::new_inclusive(-eta, eta)
            .map_err(|e| Error::InvalidConfig(format!("noise_eta {}: {}", eta, e)))?;
        Ok(Self { dist })
    }

    /// Draws one perturbation. Consumes exactly one sample from `rng`.
    #[inline]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.sample(&self.dist)
    }
}

/// New heading for one particle: neighbor mean plus one noise draw.
pub fn new_heading<R: Rng + ?Sized>(
    headings: &[f64],
    neighbors: &[usize],
    noise: &HeadingNoise,
    rng: &mut R,
) -> Result<f64> {
    let mean = mean_heading(headings, neighbors)?;
    Ok(mean + noise.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_headings_average_to_zero() {
        let headings = [0.2, -0.2];
        let noise = HeadingNoise::new(0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..2 {
            let h = new_heading(&headings, &[0, 1], &noise, &mut rng).unwrap();
            assert!(h.abs() < 1e-15, "got {}", h);
        }
    }

    #[test]
    fn mean_is_scalar_not_circular() {
        // Both headings point almost due west; a circular mean would be ~π.
        let headings = [3.1, -3.1];
        let mean = mean_heading(&headings, &[0, 1]).unwrap();
        assert!(mean.abs() < 1e-12);
    }

    #[test]
    fn only_listed_neighbors_contribute() {
        let headings = [1.0, 2.0, 100.0, 3.0];
        let mean = mean_heading(&headings, &[0, 1, 3]).unwrap();
        assert!((mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_neighbor_set_is_invalid_state() {
        assert!(matches!(mean_heading(&[0.5], &[]), Err(Error::InvalidState(_))));
    }

    #[test]
    fn noise_stays_within_eta() {
        let eta = 0.3;
        let noise = HeadingNoise::new(eta).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10_000 {
            let d = noise.sample(&mut rng);
            assert!((-eta..=eta).contains(&d));
        }
    }

    #[test]
    fn negative_eta_is_rejected() {
        assert!(matches!(HeadingNoise::new(-1.0), Err(Error::InvalidConfig(_))));
    }
}

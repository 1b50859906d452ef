//! Frequency conventions for stationary points.
//!
//! A mode is imaginary when its frequency lies below `-threshold` (cm^-1);
//! softer negative modes are treated as numerical noise. A saddle point has
//! exactly one imaginary mode, a minimum has none.

use super::error::ReactionFailure;

pub fn imaginary_count(frequencies: &[f64], threshold: f64) -> usize {
    frequencies.iter().filter(|&&f| f < -threshold).count()
}

pub fn is_saddle_point(frequencies: &[f64], threshold: f64) -> bool {
    imaginary_count(frequencies, threshold) == 1
}

pub fn is_minimum(frequencies: &[f64], threshold: f64) -> bool {
    imaginary_count(frequencies, threshold) == 0
}

pub fn check_saddle_point(frequencies: &[f64], threshold: f64) -> Result<(), ReactionFailure> {
    match imaginary_count(frequencies, threshold) {
        1 => Ok(()),
        found => Err(ReactionFailure::WrongImaginaryFrequencyCount { expected: 1, found }),
    }
}

pub fn check_minimum(frequencies: &[f64], threshold: f64) -> Result<(), ReactionFailure> {
    match imaginary_count(frequencies, threshold) {
        0 => Ok(()),
        found => Err(ReactionFailure::WrongImaginaryFrequencyCount { expected: 0, found }),
    }
}

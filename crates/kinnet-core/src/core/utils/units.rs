/// Hartree to kcal/mol.
pub const HARTREE_TO_KCAL_MOL: f64 = 627.5095;

/// Gas constant in cal/(mol K).
pub const GAS_CONSTANT_CAL: f64 = 1.9872036;

/// Energy difference `to - from` in kcal/mol for values given in Hartree.
#[inline]
pub fn relative_kcal(to: f64, from: f64) -> f64 {
    (to - from) * HARTREE_TO_KCAL_MOL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_energy_is_scaled_to_kcal() {
        assert!((relative_kcal(-1.0, -1.1) - 62.75095).abs() < 1e-9);
        assert_eq!(relative_kcal(-2.0, -2.0), 0.0);
    }
}

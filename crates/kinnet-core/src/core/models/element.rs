use phf::{Map, phf_map};

/// Single-bond covalent radii in Angstroms, used for bond perception.
static COVALENT_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 0.31,
    "He" => 0.28,
    "C" => 0.76,
    "N" => 0.71,
    "O" => 0.66,
    "F" => 0.57,
    "Si" => 1.11,
    "P" => 1.07,
    "S" => 1.05,
    "Cl" => 1.02,
    "Ar" => 1.06,
    "Br" => 1.20,
};

/// Typical valence used when assigning bond orders.
static VALENCES: Map<&'static str, u8> = phf_map! {
    "H" => 1,
    "He" => 0,
    "C" => 4,
    "N" => 3,
    "O" => 2,
    "F" => 1,
    "Si" => 4,
    "P" => 3,
    "S" => 2,
    "Cl" => 1,
    "Ar" => 0,
    "Br" => 1,
};

/// Standard atomic weights in amu.
static ATOMIC_MASSES: Map<&'static str, f64> = phf_map! {
    "H" => 1.008,
    "He" => 4.0026,
    "C" => 12.011,
    "N" => 14.007,
    "O" => 15.999,
    "F" => 18.998,
    "Si" => 28.085,
    "P" => 30.974,
    "S" => 32.06,
    "Cl" => 35.45,
    "Ar" => 39.948,
    "Br" => 79.904,
};

/// Standard single-bond lengths in Angstroms, keyed by the alphabetically
/// sorted element pair (e.g. `"CH"`, `"CO"`, `"OO"`).
static STANDARD_BOND_LENGTHS: Map<&'static str, f64> = phf_map! {
    "CC" => 1.54,
    "CH" => 1.09,
    "HH" => 0.74,
    "CO" => 1.43,
    "HO" => 0.96,
    "OO" => 1.48,
    "CN" => 1.47,
    "HN" => 1.01,
    "NN" => 1.45,
    "NO" => 1.40,
    "CS" => 1.82,
    "HS" => 1.34,
    "OS" => 1.57,
    "NS" => 1.68,
    "SS" => 2.05,
};

const FALLBACK_RADIUS: f64 = 0.75;

pub fn covalent_radius(symbol: &str) -> f64 {
    COVALENT_RADII
        .get(symbol)
        .copied()
        .unwrap_or(FALLBACK_RADIUS)
}

pub fn valence(symbol: &str) -> u8 {
    VALENCES.get(symbol).copied().unwrap_or(4)
}

/// Unknown elements have no tabulated mass.
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ATOMIC_MASSES.get(symbol).copied()
}

pub fn is_known(symbol: &str) -> bool {
    COVALENT_RADII.contains_key(symbol)
}

/// Looks up the standard bond length between two elements, falling back to
/// the sum of their covalent radii when no tabulated value exists.
pub fn standard_bond_length(a: &str, b: &str) -> f64 {
    let key = if a <= b {
        format!("{a}{b}")
    } else {
        format!("{b}{a}")
    };
    STANDARD_BOND_LENGTHS
        .get(key.as_str())
        .copied()
        .unwrap_or_else(|| covalent_radius(a) + covalent_radius(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_bond_length_is_order_independent() {
        assert_eq!(standard_bond_length("O", "C"), 1.43);
        assert_eq!(standard_bond_length("C", "O"), 1.43);
        assert_eq!(standard_bond_length("H", "C"), 1.09);
    }

    #[test]
    fn standard_bond_length_falls_back_to_radii() {
        let expected = covalent_radius("Cl") + covalent_radius("Br");
        assert!((standard_bond_length("Cl", "Br") - expected).abs() < 1e-12);
    }

    #[test]
    fn unknown_elements_use_fallbacks() {
        assert!(!is_known("Xx"));
        assert_eq!(covalent_radius("Xx"), FALLBACK_RADIUS);
        assert_eq!(valence("Xx"), 4);
        assert_eq!(valence("O"), 2);
        assert_eq!(atomic_mass("Xx"), None);
        assert_eq!(atomic_mass("O"), Some(15.999));
    }
}

use nalgebra::{Point3, Vector3};

pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Angle a-b-c in degrees.
pub fn angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ba = a - b;
    let bc = c - b;
    let cos = ba.dot(&bc) / (ba.norm() * bc.norm());
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Dihedral a-b-c-d in degrees, in the range (-180, 180].
pub fn dihedral(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let b1: Vector3<f64> = b - a;
    let b2: Vector3<f64> = c - b;
    let b3: Vector3<f64> = d - c;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let x = n1.dot(&n2);
    let y = b2.norm() * b1.dot(&n2);
    let value = y.atan2(x).to_degrees();
    if value <= -180.0 { value + 360.0 } else { value }
}

/// Next value of a coordinate that is walked linearly from `current` to
/// `target`, reaching it on the last step before `max_step`.
pub fn new_bond_length(current: f64, step: usize, max_step: usize, target: f64) -> f64 {
    if step + 1 >= max_step {
        return target;
    }
    current + (target - current) / (max_step - step) as f64
}

/// Ring dihedrals over consecutive windows of four atoms, each moved one step
/// closer to a planar (0 degree) arrangement.
pub fn new_ring_dihedrals(
    geometry: &[Point3<f64>],
    ring: &[usize],
    step: usize,
    total_steps: usize,
) -> Vec<f64> {
    ring.windows(4)
        .map(|w| {
            let current = dihedral(
                &geometry[w[0]],
                &geometry[w[1]],
                &geometry[w[2]],
                &geometry[w[3]],
            );
            new_bond_length(current, step, total_steps, 0.0)
        })
        .collect()
}

/// True when any two atoms are closer than `min_distance` Angstroms.
pub fn has_close_contacts(geometry: &[Point3<f64>], min_distance: f64) -> bool {
    geometry.iter().enumerate().any(|(i, a)| {
        geometry[i + 1..]
            .iter()
            .any(|b| distance(a, b) < min_distance)
    })
}

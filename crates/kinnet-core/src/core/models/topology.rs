use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BondOrder {
    Single = 1,
    Double = 2,
    Triple = 3,
}

impl Default for BondOrder {
    fn default() -> Self {
        BondOrder::Single
    }
}

impl BondOrder {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
            }
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Atom index {index} is out of range for {natoms} atoms")]
    IndexOutOfRange { index: usize, natoms: usize },
    #[error("An atom cannot be bonded to itself (atom {0})")]
    SelfBond(usize),
    #[error("Bond order {order} between atoms {i} and {j} is outside 0..=3")]
    InvalidOrder { i: usize, j: usize, order: u8 },
    #[error("Bond matrix is not symmetric at ({i}, {j})")]
    Asymmetric { i: usize, j: usize },
    #[error("Cannot combine bond matrices over {left} and {right} atoms")]
    SizeMismatch { left: usize, right: usize },
    #[error("Bond matrix row {row} has {len} entries, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },
}

/// Symmetric bond-order matrix over the atoms of one structure.
///
/// Entries are 0 (no bond) through 3 (triple bond) and the diagonal is always
/// zero. All mutating operations keep the matrix symmetric, so any value of this
/// type satisfies those invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BondMatrix {
    natoms: usize,
    orders: Vec<u8>,
}

impl BondMatrix {
    pub fn new(natoms: usize) -> Self {
        Self {
            natoms,
            orders: vec![0; natoms * natoms],
        }
    }

    /// Builds a matrix from explicit rows, validating every invariant.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, TopologyError> {
        let natoms = rows.len();
        let mut matrix = Self::new(natoms);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != natoms {
                return Err(TopologyError::RaggedRow {
                    row: i,
                    len: row.len(),
                    expected: natoms,
                });
            }
            for (j, &order) in row.iter().enumerate() {
                if i == j && order != 0 {
                    return Err(TopologyError::SelfBond(i));
                }
                if order > 3 {
                    return Err(TopologyError::InvalidOrder { i, j, order });
                }
                if rows[j][i] != order {
                    return Err(TopologyError::Asymmetric { i, j });
                }
                matrix.orders[i * natoms + j] = order;
            }
        }
        Ok(matrix)
    }

    pub fn natoms(&self) -> usize {
        self.natoms
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u8 {
        self.orders[i * self.natoms + j]
    }

    #[inline]
    pub fn is_bonded(&self, i: usize, j: usize) -> bool {
        self.get(i, j) > 0
    }

    pub fn set(&mut self, i: usize, j: usize, order: u8) -> Result<(), TopologyError> {
        for index in [i, j] {
            if index >= self.natoms {
                return Err(TopologyError::IndexOutOfRange {
                    index,
                    natoms: self.natoms,
                });
            }
        }
        if i == j {
            return Err(TopologyError::SelfBond(i));
        }
        if order > 3 {
            return Err(TopologyError::InvalidOrder { i, j, order });
        }
        self.orders[i * self.natoms + j] = order;
        self.orders[j * self.natoms + i] = order;
        Ok(())
    }

    /// Bonded neighbours of `i` in ascending index order.
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.natoms).filter(move |&j| self.get(i, j) > 0)
    }

    pub fn degree(&self, i: usize) -> usize {
        self.neighbors(i).count()
    }

    /// Sum of the bond orders around atom `i`.
    pub fn valence_used(&self, i: usize) -> u32 {
        (0..self.natoms).map(|j| self.get(i, j) as u32).sum()
    }

    /// Every bond once, as `(i, j, order)` with `i < j`.
    pub fn bonds(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        (0..self.natoms).flat_map(move |i| {
            ((i + 1)..self.natoms).filter_map(move |j| {
                let order = self.get(i, j);
                (order > 0).then_some((i, j, order))
            })
        })
    }

    /// Bonds present in either matrix, each at the higher of its two orders.
    pub fn union(&self, other: &BondMatrix) -> Result<Self, TopologyError> {
        if self.natoms != other.natoms {
            return Err(TopologyError::SizeMismatch {
                left: self.natoms,
                right: other.natoms,
            });
        }
        let orders = self
            .orders
            .iter()
            .zip(&other.orders)
            .map(|(&a, &b)| a.max(b))
            .collect();
        Ok(Self {
            natoms: self.natoms,
            orders,
        })
    }

    /// Restricts the matrix to the given atoms, renumbered in the given order.
    pub fn submatrix(&self, atoms: &[usize]) -> Self {
        let mut sub = Self::new(atoms.len());
        for (a, &i) in atoms.iter().enumerate() {
            for (b, &j) in atoms.iter().enumerate() {
                sub.orders[a * atoms.len() + b] = self.get(i, j);
            }
        }
        sub
    }

    /// Connected components, each sorted ascending, ordered by their lowest atom.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.natoms];
        let mut components = Vec::new();
        for start in 0..self.natoms {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut stack = vec![start];
            let mut component = Vec::new();
            while let Some(atom) = stack.pop() {
                component.push(atom);
                for next in self.neighbors(atom) {
                    if !seen[next] {
                        seen[next] = true;
                        stack.push(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.natoms).all(|i| {
            self.get(i, i) == 0 && (0..self.natoms).all(|j| self.get(i, j) == self.get(j, i))
        })
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.orders
            .chunks(self.natoms.max(1))
            .take(self.natoms)
            .map(|row| row.to_vec())
            .collect()
    }
}

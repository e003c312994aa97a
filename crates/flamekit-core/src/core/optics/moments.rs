use super::Matrix7;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TRANSVERSE_SCALE: f64 = 1e3;

/// Caller-contract violations of the moment algebra.
///
/// These are never produced by degenerate beam data (that yields non-finite
/// numbers instead); they signal a malformed call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MomentError {
    #[error("Coupling requires two distinct coordinates, got '{0}' twice")]
    SameCoordinate(Coordinate),
    #[error("Inputs '{first}' and '{second}' are mutually exclusive")]
    ConflictingInputs {
        first: &'static str,
        second: &'static str,
    },
    #[error("Charge state index {index} is out of range (beam has {count} charge states)")]
    ChargeStateOutOfRange { index: usize, count: usize },
    #[error("Unknown phase-space coordinate: '{0}'")]
    UnknownCoordinate(String),
    #[error("Unknown phase-space axis: '{0}'")]
    UnknownAxis(String),
}

/// A phase-space axis, i.e. a conjugate pair of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal plane `(x, x')`.
    X,
    /// Vertical plane `(y, y')`.
    Y,
    /// Longitudinal plane `(phi, dEk)`.
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Tensor index of the position-like coordinate of this axis.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 2,
            Axis::Z => 4,
        }
    }

    #[inline]
    pub fn is_transverse(self) -> bool {
        !matches!(self, Axis::Z)
    }

    /// The position-like and momentum-like coordinates of this axis.
    pub fn coordinates(self) -> [Coordinate; 2] {
        match self {
            Axis::X => [Coordinate::X, Coordinate::Xp],
            Axis::Y => [Coordinate::Y, Coordinate::Yp],
            Axis::Z => [Coordinate::Z, Coordinate::Zp],
        }
    }

    pub fn others(self) -> [Axis; 2] {
        match self {
            Axis::X => [Axis::Y, Axis::Z],
            Axis::Y => [Axis::X, Axis::Z],
            Axis::Z => [Axis::X, Axis::Y],
        }
    }

    #[inline]
    pub(crate) fn emittance_scale(self) -> f64 {
        if self.is_transverse() {
            TRANSVERSE_SCALE
        } else {
            1.0
        }
    }

    /// Scale factors `(k1, k2)` applied to the off-diagonal and momentum-like
    /// diagonal entries when building a block from Twiss parameters.
    #[inline]
    pub(crate) fn block_scales(self) -> (f64, f64) {
        if self.is_transverse() {
            (1e-3, 1e-6)
        } else {
            (1.0, 1.0)
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(label)
    }
}

impl FromStr for Axis {
    type Err = MomentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" | "phi" => Ok(Axis::Z),
            _ => Err(MomentError::UnknownAxis(s.to_string())),
        }
    }
}

/// One of the six phase-space coordinates, mapped to tensor axes 0..5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coordinate {
    X,
    Xp,
    Y,
    Yp,
    Z,
    Zp,
}

impl Coordinate {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Coordinate::X => 0,
            Coordinate::Xp => 1,
            Coordinate::Y => 2,
            Coordinate::Yp => 3,
            Coordinate::Z => 4,
            Coordinate::Zp => 5,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Coordinate::X | Coordinate::Xp => Axis::X,
            Coordinate::Y | Coordinate::Yp => Axis::Y,
            Coordinate::Z | Coordinate::Zp => Axis::Z,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Coordinate::X => "x",
            Coordinate::Xp => "xp",
            Coordinate::Y => "y",
            Coordinate::Yp => "yp",
            Coordinate::Z => "z",
            Coordinate::Zp => "zp",
        };
        f.write_str(label)
    }
}

impl FromStr for Coordinate {
    type Err = MomentError;

    /// Accepts `x`, `xp`, `x'` and the analogous `y`/`z` labels, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Coordinate::X),
            "xp" | "x'" => Ok(Coordinate::Xp),
            "y" => Ok(Coordinate::Y),
            "yp" | "y'" => Ok(Coordinate::Yp),
            "z" | "phi" => Ok(Coordinate::Z),
            "zp" | "z'" | "dek" => Ok(Coordinate::Zp),
            _ => Err(MomentError::UnknownCoordinate(s.to_string())),
        }
    }
}

/// Determinant of the symmetric 2×2 block of `axis`.
#[inline]
fn block_determinant(axis: Axis, tensor: &Matrix7) -> f64 {
    let a = axis.index();
    tensor[(a, a)] * tensor[(a + 1, a + 1)] - tensor[(a, a + 1)] * tensor[(a + 1, a)]
}

/// Geometric emittance of `axis`: `sqrt(det(block))`, in mm·mrad for the
/// transverse axes and unscaled for the longitudinal axis.
///
/// Non-finite or non-positive-definite blocks propagate `NaN` rather than failing.
pub fn emittance(axis: Axis, tensor: &Matrix7) -> f64 {
    block_determinant(axis, tensor).sqrt() * axis.emittance_scale()
}

/// Normalized emittance: the geometric emittance multiplied by the reference `beta*gamma`.
pub fn normalized_emittance(axis: Axis, tensor: &Matrix7, ref_bg: f64) -> f64 {
    ref_bg * emittance(axis, tensor)
}

/// Twiss beta of `axis`. Undefined (non-finite) for a zero emittance.
pub fn twiss_beta(axis: Axis, tensor: &Matrix7) -> f64 {
    let a = axis.index();
    tensor[(a, a)] / emittance(axis, tensor)
}

/// Twiss alpha of `axis`. Undefined (non-finite) for a zero emittance.
pub fn twiss_alpha(axis: Axis, tensor: &Matrix7) -> f64 {
    let a = axis.index();
    -tensor[(a, a + 1)] / emittance(axis, tensor) * axis.emittance_scale()
}

/// Twiss gamma of `axis`, `(1 + alpha²) / beta`.
pub fn twiss_gamma(axis: Axis, tensor: &Matrix7) -> f64 {
    let alpha = twiss_alpha(axis, tensor);
    (1.0 + alpha * alpha) / twiss_beta(axis, tensor)
}

#[inline]
pub(crate) fn normalized_term(tensor: &Matrix7, i: usize, j: usize) -> f64 {
    let denominator = (tensor[(i, i)] * tensor[(j, j)]).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        tensor[(i, j)] / denominator
    }
}

/// Normalized coupling term `T[c1,c2] / sqrt(T[c1,c1] * T[c2,c2])`.
///
/// Returns exactly `0.0` when the denominator is zero.
///
/// # Errors
///
/// Returns [`MomentError::SameCoordinate`] if `coor1 == coor2`.
pub fn coupling(coor1: Coordinate, coor2: Coordinate, tensor: &Matrix7) -> Result<f64, MomentError> {
    if coor1 == coor2 {
        return Err(MomentError::SameCoordinate(coor1));
    }
    Ok(normalized_term(tensor, coor1.index(), coor2.index()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE * b.abs().max(1.0)
    }

    fn tensor_with_x_block(xx: f64, xxp: f64, xpxp: f64) -> Matrix7 {
        let mut t = Matrix7::zeros();
        t[(0, 0)] = xx;
        t[(0, 1)] = xxp;
        t[(1, 0)] = xxp;
        t[(1, 1)] = xpxp;
        t
    }

    #[test]
    fn emittance_scales_transverse_axes_to_mm_mrad() {
        let t = tensor_with_x_block(4.0e-0, 0.0, 1.0e-6);
        // sqrt(4 * 1e-6) = 2e-3 mm·rad => 2 mm·mrad
        assert!(f64_approx_equal(emittance(Axis::X, &t), 2.0));
    }

    #[test]
    fn emittance_is_unscaled_for_longitudinal_axis() {
        let mut t = Matrix7::zeros();
        t[(4, 4)] = 9.0;
        t[(5, 5)] = 4.0;
        assert!(f64_approx_equal(emittance(Axis::Z, &t), 6.0));
    }

    #[test]
    fn normalized_emittance_multiplies_by_reference_bg() {
        let t = tensor_with_x_block(4.0, 0.0, 1.0e-6);
        assert!(f64_approx_equal(normalized_emittance(Axis::X, &t, 0.5), 1.0));
    }

    #[test]
    fn twiss_parameters_follow_block_definitions() {
        let t = tensor_with_x_block(6.0, -0.2e-3, (1.0 + 0.01) / 3.0 * 2.0 * 1e-6);
        let eps = emittance(Axis::X, &t);
        assert!(f64_approx_equal(eps, 2.0));
        assert!(f64_approx_equal(twiss_beta(Axis::X, &t), 3.0));
        assert!(f64_approx_equal(twiss_alpha(Axis::X, &t), 0.1));
        assert!(f64_approx_equal(twiss_gamma(Axis::X, &t), (1.0 + 0.01) / 3.0));
    }

    #[test]
    fn twiss_of_zero_emittance_is_non_finite() {
        let t = Matrix7::zeros();
        assert!(!twiss_beta(Axis::Y, &t).is_finite());
        assert!(!twiss_alpha(Axis::Y, &t).is_finite());
    }

    #[test]
    fn coupling_returns_normalized_off_diagonal() {
        let mut t = Matrix7::zeros();
        t[(0, 0)] = 4.0;
        t[(2, 2)] = 9.0;
        t[(0, 2)] = 3.0;
        t[(2, 0)] = 3.0;
        let c = coupling(Coordinate::X, Coordinate::Y, &t).unwrap();
        assert!(f64_approx_equal(c, 0.5));
    }

    #[test]
    fn coupling_with_zero_denominator_is_exactly_zero() {
        let mut t = Matrix7::zeros();
        t[(0, 2)] = 1.0;
        assert_eq!(coupling(Coordinate::X, Coordinate::Y, &t), Ok(0.0));
    }

    #[test]
    fn coupling_of_identical_coordinates_is_a_contract_error() {
        let t = Matrix7::identity();
        assert_eq!(
            coupling(Coordinate::X, Coordinate::X, &t),
            Err(MomentError::SameCoordinate(Coordinate::X))
        );
    }

    #[test]
    fn coordinate_parsing_accepts_prime_and_p_forms() {
        assert_eq!("x'".parse::<Coordinate>(), Ok(Coordinate::Xp));
        assert_eq!("YP".parse::<Coordinate>(), Ok(Coordinate::Yp));
        assert_eq!("z".parse::<Coordinate>(), Ok(Coordinate::Z));
        assert!(matches!(
            "w".parse::<Coordinate>(),
            Err(MomentError::UnknownCoordinate(_))
        ));
    }

    #[test]
    fn axis_parsing_and_indices() {
        assert_eq!("x".parse::<Axis>(), Ok(Axis::X));
        assert_eq!(Axis::Y.index(), 2);
        assert_eq!(Axis::Z.coordinates(), [Coordinate::Z, Coordinate::Zp]);
        assert_eq!(Axis::X.others(), [Axis::Y, Axis::Z]);
        assert!("q".parse::<Axis>().is_err());
    }
}

use super::aliases::canonical_name;
use super::snapshot::{KinematicField, MomentState, ReferenceParticle};
use crate::core::optics::moments::{self, Axis, Coordinate, MomentError};
use crate::core::optics::twiss::{self, TwissSpec};
use crate::core::optics::{Matrix7, Vector7};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateAccessError {
    #[error("Unknown beam state attribute: '{0}'")]
    UnknownName(String),
    #[error("Beam state attribute '{0}' is read-only")]
    ReadOnly(String),
    #[error("Beam state attribute '{0}' is not available from this engine")]
    Unavailable(String),
    #[error("Attribute '{name}' expects {expected}")]
    WrongKind { name: String, expected: &'static str },
    #[error("Attribute '{name}' expects {expected} entries, got {found}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Moment(#[from] MomentError),
}

/// A value read from or written to a [`BeamState`] by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Observable {
    Scalar(f64),
    /// One entry per charge state.
    Array(Vec<f64>),
    Vector(Vector7),
    Matrix(Matrix7),
    /// One centroid per charge state.
    Vectors(Vec<Vector7>),
    /// One tensor per charge state.
    Matrices(Vec<Matrix7>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    PerCharge,
    Env,
    Rms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TwissParam {
    Alpha,
    Beta,
    Gamma,
}

/// A canonical accessor name, parsed into its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantity {
    Pos,
    LastCaviPhi0,
    Reference(KinematicField),
    PerCharge(KinematicField),
    Moment0,
    Moment0Env,
    Moment0Rms,
    Moment1,
    Moment1Env,
    TransferMatrix,
    Centroid { index: usize, scope: Scope },
    Emittance { axis: Axis, normalized: bool, all: bool },
    Twiss { axis: Axis, param: TwissParam, all: bool },
    Coupling { first: Coordinate, second: Coordinate, all: bool },
}

const CENTROID_LABELS: [&str; 6] = ["x", "xp", "y", "yp", "phi", "dEk"];

fn parse_axis_prefix(s: &str) -> Option<(Axis, &str)> {
    let axis = match s.chars().next()? {
        'x' => Axis::X,
        'y' => Axis::Y,
        'z' => Axis::Z,
        _ => return None,
    };
    Some((axis, &s[1..]))
}

impl FromStr for Quantity {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let fixed = match name {
            "pos" => Some(Quantity::Pos),
            "last_caviphi0" => Some(Quantity::LastCaviPhi0),
            "moment0" => Some(Quantity::Moment0),
            "moment0_env" => Some(Quantity::Moment0Env),
            "moment0_rms" => Some(Quantity::Moment0Rms),
            "moment1" => Some(Quantity::Moment1),
            "moment1_env" => Some(Quantity::Moment1Env),
            "transfer_matrix" => Some(Quantity::TransferMatrix),
            _ => None,
        };
        if let Some(q) = fixed {
            return Ok(q);
        }
        if let Some(field) = name.strip_prefix("ref_") {
            return field.parse().map(Quantity::Reference);
        }
        if let Ok(field) = name.parse() {
            return Ok(Quantity::PerCharge(field));
        }

        let (stem, scope) = if let Some(stem) = name.strip_suffix("0_env") {
            (stem, Scope::Env)
        } else if let Some(stem) = name.strip_suffix("0_rms") {
            (stem, Scope::Rms)
        } else if let Some(stem) = name.strip_suffix('0') {
            (stem, Scope::PerCharge)
        } else {
            ("", Scope::PerCharge)
        };
        if let Some(index) = CENTROID_LABELS.iter().position(|l| *l == stem) {
            return Ok(Quantity::Centroid { index, scope });
        }

        let (base, all) = match name.strip_suffix("_all") {
            Some(base) => (base, true),
            None => (name, false),
        };
        if let Some(pair) = base.strip_prefix("couple_") {
            let (first, second) = match pair {
                "xy" => (Coordinate::X, Coordinate::Y),
                "xpy" => (Coordinate::Xp, Coordinate::Y),
                "xyp" => (Coordinate::X, Coordinate::Yp),
                "xpyp" => (Coordinate::Xp, Coordinate::Yp),
                _ => return Err(()),
            };
            return Ok(Quantity::Coupling { first, second, all });
        }
        let (axis, rest) = parse_axis_prefix(base).ok_or(())?;
        match rest {
            "emittance" => Ok(Quantity::Emittance { axis, normalized: false, all }),
            "nemittance" => Ok(Quantity::Emittance { axis, normalized: true, all }),
            "twiss_alpha" => Ok(Quantity::Twiss { axis, param: TwissParam::Alpha, all }),
            "twiss_beta" => Ok(Quantity::Twiss { axis, param: TwissParam::Beta, all }),
            "twiss_gamma" => Ok(Quantity::Twiss { axis, param: TwissParam::Gamma, all }),
            _ => Err(()),
        }
    }
}

impl Observable {
    fn scalar(self, name: &str) -> Result<f64, StateAccessError> {
        match self {
            Observable::Scalar(v) => Ok(v),
            _ => Err(wrong_kind(name, "a scalar")),
        }
    }

    fn array(self, name: &str, count: usize) -> Result<Vec<f64>, StateAccessError> {
        match self {
            Observable::Array(v) => check_len(name, count, v),
            _ => Err(wrong_kind(name, "one number per charge state")),
        }
    }
}

fn wrong_kind(name: &str, expected: &'static str) -> StateAccessError {
    StateAccessError::WrongKind {
        name: name.to_string(),
        expected,
    }
}

fn check_len<T>(name: &str, expected: usize, values: Vec<T>) -> Result<Vec<T>, StateAccessError> {
    if values.len() == expected {
        Ok(values)
    } else {
        Err(StateAccessError::ShapeMismatch {
            name: name.to_string(),
            expected,
            found: values.len(),
        })
    }
}

fn clear_constant_axis(tensor: &mut Matrix7) {
    for k in 0..7 {
        tensor[(6, k)] = 0.0;
        tensor[(k, 6)] = 0.0;
    }
}

fn copy_centroid(target: &mut Vector7, source: &Vector7) {
    for k in 0..6 {
        target[k] = source[k];
    }
}

fn set_coupling_term(tensor: &mut Matrix7, first: Coordinate, second: Coordinate, value: f64) {
    let (i, j) = (first.index(), second.index());
    let term = value * (tensor[(i, i)] * tensor[(j, j)]).sqrt();
    tensor[(i, j)] = term;
    tensor[(j, i)] = term;
}

/// Beam state of a moment-matrix simulation, with named physical accessors.
///
/// The wrapped [`MomentState`] is owned outright, so `clone()` is a deep copy.
/// Aggregate quantities (`*_env`, `*_rms`, non-`_all` derived values) read the
/// charge-weighted tensor; `_all` variants return one value per charge state.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamState {
    state: MomentState,
}

impl From<MomentState> for BeamState {
    fn from(state: MomentState) -> Self {
        Self::new(state)
    }
}

impl BeamState {
    /// Wraps an engine state.
    ///
    /// # Arguments
    ///
    /// * `state` - The moment state to own. Its envelopes are taken as they are;
    ///   call [`MomentState::update_envelopes`] first if the moments were edited.
    pub fn new(state: MomentState) -> Self {
        Self { state }
    }

    /// The wrapped engine state.
    pub fn state(&self) -> &MomentState {
        &self.state
    }

    /// Mutable access to the wrapped engine state, used by transport engines.
    ///
    /// Direct edits bypass the accessor rules of [`BeamState::set`], including the
    /// envelope refresh.
    pub fn state_mut(&mut self) -> &mut MomentState {
        &mut self.state
    }

    pub fn into_inner(self) -> MomentState {
        self.state
    }

    #[inline]
    pub fn charge_state_count(&self) -> usize {
        self.state.charge_state_count()
    }

    /// Longitudinal position in meters.
    pub fn pos(&self) -> f64 {
        self.state.pos
    }

    pub fn reference(&self) -> &ReferenceParticle {
        &self.state.reference
    }

    /// Lorentz `beta * gamma` of the reference particle.
    pub fn ref_bg(&self) -> f64 {
        self.state.reference.bg
    }

    /// Per-charge-state values of one kinematic field.
    ///
    /// # Arguments
    ///
    /// * `field` - The kinematic quantity to read.
    ///
    /// # Return
    ///
    /// Returns one value per charge state, in charge-state order.
    pub fn charge_state_values(&self, field: KinematicField) -> &[f64] {
        self.state.charge_states.get(field)
    }

    pub fn moment0(&self) -> &[Vector7] {
        &self.state.moment0
    }

    pub fn moment1(&self) -> &[Matrix7] {
        &self.state.moment1
    }

    /// Charge-weighted centroid.
    pub fn moment0_env(&self) -> &Vector7 {
        &self.state.moment0_env
    }

    /// Rms beam size per coordinate, from the diagonal of [`BeamState::moment1_env`].
    pub fn moment0_rms(&self) -> &Vector7 {
        &self.state.moment0_rms
    }

    /// Charge-weighted second-moment tensor.
    pub fn moment1_env(&self) -> &Matrix7 {
        &self.state.moment1_env
    }

    /// Engine-provided transfer map of every charge state. Read-only.
    pub fn transfer_matrix(&self) -> &[Matrix7] {
        &self.state.transfer_matrix
    }

    /// Driven phase of the last RF cavity passed, when the engine reports it.
    pub fn last_caviphi0(&self) -> Option<f64> {
        self.state.last_caviphi0
    }

    /// Centroid component `coordinate` of every charge state.
    pub fn centroid(&self, coordinate: Coordinate) -> Vec<f64> {
        self.state
            .moment0
            .iter()
            .map(|m| m[coordinate.index()])
            .collect()
    }

    /// Geometric rms emittance of `axis`, from the charge-weighted tensor.
    ///
    /// # Arguments
    ///
    /// * `axis` - The transverse or longitudinal plane.
    ///
    /// # Return
    ///
    /// Returns `sqrt(det(block))` in mm·mrad for the transverse axes, unscaled for
    /// the longitudinal axis. A block that is not positive definite yields `NaN`.
    pub fn emittance(&self, axis: Axis) -> f64 {
        moments::emittance(axis, &self.state.moment1_env)
    }

    /// [`BeamState::emittance`] of every charge state.
    pub fn emittance_all(&self, axis: Axis) -> Vec<f64> {
        self.per_charge(|t| moments::emittance(axis, t))
    }

    /// Emittance scaled by the reference `beta * gamma`.
    pub fn normalized_emittance(&self, axis: Axis) -> f64 {
        moments::normalized_emittance(axis, &self.state.moment1_env, self.ref_bg())
    }

    pub fn normalized_emittance_all(&self, axis: Axis) -> Vec<f64> {
        let bg = self.ref_bg();
        self.per_charge(|t| moments::normalized_emittance(axis, t, bg))
    }

    /// Twiss parameters of the charge-weighted tensor.
    ///
    /// Alpha, beta and gamma are non-finite when the emittance of `axis` vanishes.
    pub fn twiss_alpha(&self, axis: Axis) -> f64 {
        moments::twiss_alpha(axis, &self.state.moment1_env)
    }

    pub fn twiss_alpha_all(&self, axis: Axis) -> Vec<f64> {
        self.per_charge(|t| moments::twiss_alpha(axis, t))
    }

    pub fn twiss_beta(&self, axis: Axis) -> f64 {
        moments::twiss_beta(axis, &self.state.moment1_env)
    }

    pub fn twiss_beta_all(&self, axis: Axis) -> Vec<f64> {
        self.per_charge(|t| moments::twiss_beta(axis, t))
    }

    pub fn twiss_gamma(&self, axis: Axis) -> f64 {
        moments::twiss_gamma(axis, &self.state.moment1_env)
    }

    pub fn twiss_gamma_all(&self, axis: Axis) -> Vec<f64> {
        self.per_charge(|t| moments::twiss_gamma(axis, t))
    }

    /// Normalized coupling term of the charge-weighted tensor.
    ///
    /// # Errors
    ///
    /// Returns [`MomentError::SameCoordinate`] if both coordinates are equal.
    pub fn coupling(&self, first: Coordinate, second: Coordinate) -> Result<f64, MomentError> {
        moments::coupling(first, second, &self.state.moment1_env)
    }

    /// [`BeamState::coupling`] of every charge state.
    ///
    /// # Errors
    ///
    /// Returns [`MomentError::SameCoordinate`] if both coordinates are equal.
    pub fn coupling_all(&self, first: Coordinate, second: Coordinate) -> Result<Vec<f64>, MomentError> {
        self.state
            .moment1
            .iter()
            .map(|t| moments::coupling(first, second, t))
            .collect()
    }

    /// Rebuilds the `axis` block of charge state `cs` from Twiss parameters.
    ///
    /// # Errors
    ///
    /// Returns [`MomentError::ChargeStateOutOfRange`] for an invalid `cs`, or
    /// [`MomentError::ConflictingInputs`] for mutually exclusive inputs.
    pub fn set_twiss(&mut self, axis: Axis, spec: &TwissSpec, cs: usize) -> Result<(), MomentError> {
        let count = self.charge_state_count();
        let bg = self.ref_bg();
        let tensor = self
            .state
            .moment1
            .get_mut(cs)
            .ok_or(MomentError::ChargeStateOutOfRange { index: cs, count })?;
        twiss::set_twiss(axis, spec, tensor, bg)
    }

    /// Rebuilds the `axis` block of the charge-weighted tensor and refreshes the
    /// rms envelope accordingly.
    ///
    /// # Arguments
    ///
    /// * `axis` - The plane whose 2x2 block is replaced.
    /// * `spec` - The Twiss parameters and emittance (or rms size) to apply.
    ///
    /// # Errors
    ///
    /// Returns [`MomentError::ConflictingInputs`] for mutually exclusive inputs.
    pub fn set_twiss_env(&mut self, axis: Axis, spec: &TwissSpec) -> Result<(), MomentError> {
        let bg = self.ref_bg();
        twiss::set_twiss(axis, spec, &mut self.state.moment1_env, bg)?;
        self.state.refresh_rms();
        Ok(())
    }

    /// Reads an attribute by canonical name or alias.
    ///
    /// # Errors
    ///
    /// Returns [`StateAccessError::UnknownName`] for names that are neither
    /// canonical nor aliases, and [`StateAccessError::Unavailable`] for optional
    /// engine values that were never reported.
    pub fn get(&self, name: &str) -> Result<Observable, StateAccessError> {
        let canonical = canonical_name(name);
        let quantity: Quantity = canonical
            .parse()
            .map_err(|_| StateAccessError::UnknownName(name.to_string()))?;
        let state = &self.state;

        let value = match quantity {
            Quantity::Pos => Observable::Scalar(state.pos),
            Quantity::LastCaviPhi0 => Observable::Scalar(
                state
                    .last_caviphi0
                    .ok_or_else(|| StateAccessError::Unavailable(canonical.to_string()))?,
            ),
            Quantity::Reference(f) => Observable::Scalar(state.reference.get(f)),
            Quantity::PerCharge(f) => Observable::Array(state.charge_states.get(f).to_vec()),
            Quantity::Moment0 => Observable::Vectors(state.moment0.clone()),
            Quantity::Moment0Env => Observable::Vector(state.moment0_env),
            Quantity::Moment0Rms => Observable::Vector(state.moment0_rms),
            Quantity::Moment1 => Observable::Matrices(state.moment1.clone()),
            Quantity::Moment1Env => Observable::Matrix(state.moment1_env),
            Quantity::TransferMatrix => Observable::Matrices(state.transfer_matrix.clone()),
            Quantity::Centroid { index, scope } => match scope {
                Scope::PerCharge => {
                    Observable::Array(state.moment0.iter().map(|m| m[index]).collect())
                }
                Scope::Env => Observable::Scalar(state.moment0_env[index]),
                Scope::Rms => Observable::Scalar(state.moment0_rms[index]),
            },
            Quantity::Emittance { axis, normalized, all } => {
                let bg = if normalized { self.ref_bg() } else { 1.0 };
                let read = |t: &Matrix7| bg * moments::emittance(axis, t);
                self.reduce(all, read)
            }
            Quantity::Twiss { axis, param, all } => {
                let read = |t: &Matrix7| match param {
                    TwissParam::Alpha => moments::twiss_alpha(axis, t),
                    TwissParam::Beta => moments::twiss_beta(axis, t),
                    TwissParam::Gamma => moments::twiss_gamma(axis, t),
                };
                self.reduce(all, read)
            }
            Quantity::Coupling { first, second, all } => {
                if all {
                    Observable::Array(self.coupling_all(first, second)?)
                } else {
                    Observable::Scalar(self.coupling(first, second)?)
                }
            }
        };
        Ok(value)
    }

    /// Writes an attribute by canonical name or alias.
    ///
    /// Centroid writes never touch the trailing constant component, and tensor
    /// writes keep row/column 6 at zero. Writing a derived quantity (emittance,
    /// Twiss alpha/beta, coupling) rebuilds the underlying tensor block.
    ///
    /// # Errors
    ///
    /// Returns [`StateAccessError::ReadOnly`] for engine-derived attributes
    /// (`moment0_rms`, `*_rms`, `transfer_matrix`, Twiss gamma), and
    /// [`StateAccessError::WrongKind`] / [`StateAccessError::ShapeMismatch`] for
    /// values of the wrong shape.
    pub fn set(&mut self, name: &str, value: Observable) -> Result<(), StateAccessError> {
        let canonical = canonical_name(name);
        let quantity: Quantity = canonical
            .parse()
            .map_err(|_| StateAccessError::UnknownName(name.to_string()))?;
        let count = self.charge_state_count();
        let read_only = || StateAccessError::ReadOnly(canonical.to_string());

        match quantity {
            Quantity::Pos => self.state.pos = value.scalar(canonical)?,
            Quantity::LastCaviPhi0 => self.state.last_caviphi0 = Some(value.scalar(canonical)?),
            Quantity::Reference(f) => *self.state.reference.get_mut(f) = value.scalar(canonical)?,
            Quantity::PerCharge(f) => {
                *self.state.charge_states.get_mut(f) = value.array(canonical, count)?
            }
            Quantity::Moment0 => {
                let Observable::Vectors(vs) = value else {
                    return Err(wrong_kind(canonical, "one centroid per charge state"));
                };
                let vs = check_len(canonical, count, vs)?;
                for (target, source) in self.state.moment0.iter_mut().zip(&vs) {
                    copy_centroid(target, source);
                }
            }
            Quantity::Moment0Env => {
                let Observable::Vector(v) = value else {
                    return Err(wrong_kind(canonical, "a 7-component centroid"));
                };
                copy_centroid(&mut self.state.moment0_env, &v);
            }
            Quantity::Moment1 => {
                let Observable::Matrices(ms) = value else {
                    return Err(wrong_kind(canonical, "one tensor per charge state"));
                };
                let mut ms = check_len(canonical, count, ms)?;
                ms.iter_mut().for_each(clear_constant_axis);
                self.state.moment1 = ms;
            }
            Quantity::Moment1Env => {
                let Observable::Matrix(mut m) = value else {
                    return Err(wrong_kind(canonical, "a 7x7 tensor"));
                };
                clear_constant_axis(&mut m);
                self.state.moment1_env = m;
                self.state.refresh_rms();
            }
            Quantity::Moment0Rms | Quantity::TransferMatrix => return Err(read_only()),
            Quantity::Centroid { scope: Scope::Rms, .. } => return Err(read_only()),
            Quantity::Centroid { index, scope: Scope::Env } => {
                self.state.moment0_env[index] = value.scalar(canonical)?
            }
            Quantity::Centroid { index, scope: Scope::PerCharge } => {
                let values = value.array(canonical, count)?;
                for (m, v) in self.state.moment0.iter_mut().zip(values) {
                    m[index] = v;
                }
            }
            Quantity::Twiss { param: TwissParam::Gamma, .. } => return Err(read_only()),
            Quantity::Emittance { axis, normalized, all } => {
                let spec = |v: f64| {
                    if normalized {
                        TwissSpec::new().normalized_emittance(v)
                    } else {
                        TwissSpec::new().emittance(v)
                    }
                };
                self.apply_twiss(canonical, axis, all, value, spec)?;
            }
            Quantity::Twiss { axis, param, all } => {
                let spec = |v: f64| match param {
                    TwissParam::Alpha => TwissSpec::new().alpha(v),
                    _ => TwissSpec::new().beta(v),
                };
                self.apply_twiss(canonical, axis, all, value, spec)?;
            }
            Quantity::Coupling { first, second, all } => {
                if all {
                    let values = value.array(canonical, count)?;
                    for (t, v) in self.state.moment1.iter_mut().zip(values) {
                        set_coupling_term(t, first, second, v);
                    }
                } else {
                    set_coupling_term(&mut self.state.moment1_env, first, second, value.scalar(canonical)?);
                }
            }
        }
        Ok(())
    }

    fn apply_twiss(
        &mut self,
        name: &str,
        axis: Axis,
        all: bool,
        value: Observable,
        spec: impl Fn(f64) -> TwissSpec,
    ) -> Result<(), StateAccessError> {
        if all {
            let values = value.array(name, self.charge_state_count())?;
            for (cs, v) in values.into_iter().enumerate() {
                self.set_twiss(axis, &spec(v), cs)?;
            }
        } else {
            self.set_twiss_env(axis, &spec(value.scalar(name)?))?;
        }
        Ok(())
    }

    fn per_charge(&self, read: impl Fn(&Matrix7) -> f64) -> Vec<f64> {
        self.state.moment1.iter().map(read).collect()
    }

    fn reduce(&self, all: bool, read: impl Fn(&Matrix7) -> f64) -> Observable {
        if all {
            Observable::Array(self.per_charge(read))
        } else {
            Observable::Scalar(read(&self.state.moment1_env))
        }
    }
}

/// Formats like C's `%.{digits}g`: fixed or exponential notation, whichever is
/// shorter for the magnitude, with trailing zeros removed.
fn format_significant(v: f64, digits: usize) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let precision = digits.max(1);
    let sci = format!("{:.*e}", precision - 1, v);
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return sci;
    };
    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

impl fmt::Display for BeamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mean: Vec<String> = self
            .state
            .moment0_env
            .iter()
            .map(|v| format_significant(*v, 6))
            .collect();
        write!(f, "BeamState: moment0 mean=[7]({})", mean.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::aliases::ALIASES;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() <= TOLERANCE * b.abs().max(1.0)
    }

    fn observable_approx_equal(a: &Observable, b: &Observable) -> bool {
        match (a, b) {
            (Observable::Scalar(x), Observable::Scalar(y)) => f64_approx_equal(*x, *y),
            (Observable::Array(x), Observable::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(p, q)| f64_approx_equal(*p, *q))
            }
            _ => a == b,
        }
    }

    fn perturb(value: Observable) -> Observable {
        match value {
            Observable::Scalar(v) => Observable::Scalar(v * 1.1 + 0.01),
            Observable::Array(vs) => Observable::Array(vs.iter().map(|v| v * 1.1 + 0.01).collect()),
            other => other,
        }
    }

    fn block(t: &mut Matrix7, a: usize, aa: f64, ab: f64, bb: f64) {
        t[(a, a)] = aa;
        t[(a, a + 1)] = ab;
        t[(a + 1, a)] = ab;
        t[(a + 1, a + 1)] = bb;
    }

    fn sample_tensor(scale: f64) -> Matrix7 {
        let mut t = Matrix7::zeros();
        block(&mut t, 0, 4.0 * scale, 1.0e-3, 2.0e-6);
        block(&mut t, 2, 9.0 * scale, -2.0e-3, 3.0e-6);
        block(&mut t, 4, 0.5 * scale, 0.01, 0.02);
        let mut put = |i: usize, j: usize, v: f64| {
            t[(i, j)] = v;
            t[(j, i)] = v;
        };
        put(0, 2, 0.6);
        put(1, 2, -0.9e-3);
        put(0, 3, 0.5e-3);
        put(1, 3, 0.4e-6);
        t
    }

    fn sample_state() -> BeamState {
        let mut s = MomentState::zeros(2);
        s.pos = 1.5;
        s.reference.bg = 0.0327;
        s.reference.ion_z = 0.138655;
        s.charge_states.ion_q = vec![10111.0, 10531.0];
        s.charge_states.ion_z = vec![0.138655, 0.1439];
        for (cs, m0) in s.moment0.iter_mut().enumerate() {
            *m0 = Vector7::from_column_slice(&[
                0.1 * (cs as f64 + 1.0),
                1e-5,
                -0.2,
                2e-5,
                0.01,
                3e-4,
                1.0,
            ]);
        }
        s.moment1 = vec![sample_tensor(1.0), sample_tensor(1.2)];
        s.update_envelopes();
        s.last_caviphi0 = Some(325.2);
        BeamState::new(s)
    }

    #[test]
    fn every_alias_reads_like_its_canonical_name() {
        let state = sample_state();
        for (alias, canonical) in ALIASES.entries() {
            let a = state.get(alias).unwrap();
            let c = state.get(canonical).unwrap();
            assert_eq!(a, c, "alias '{alias}' disagrees with '{canonical}'");
        }
    }

    #[test]
    fn every_alias_writes_like_its_canonical_name() {
        for (alias, canonical) in ALIASES.entries() {
            let mut via_alias = sample_state();
            let mut via_canonical = sample_state();
            let value = perturb(via_canonical.get(canonical).unwrap());

            let r1 = via_alias.set(alias, value.clone());
            let r2 = via_canonical.set(canonical, value.clone());
            match (r1, r2) {
                (Ok(()), Ok(())) => {
                    assert_eq!(via_alias, via_canonical, "alias '{alias}' wrote differently");
                    let read_back = via_alias.get(canonical).unwrap();
                    assert!(
                        observable_approx_equal(&read_back, &value),
                        "'{canonical}' read back {read_back:?}, expected {value:?}"
                    );
                }
                (Err(e1), Err(e2)) => {
                    assert!(matches!(e1, StateAccessError::ReadOnly(_)), "{alias}: {e1}");
                    assert_eq!(e1, e2);
                }
                (r1, r2) => panic!("alias '{alias}' gave {r1:?}, canonical gave {r2:?}"),
            }
        }
    }

    #[test]
    fn set_twiss_on_one_charge_state_round_trips() {
        let mut state = sample_state();
        let spec = TwissSpec::new().alpha(0.2).beta(3.0).emittance(5.0);
        state.set_twiss(Axis::X, &spec, 0).unwrap();
        assert!(f64_approx_equal(state.twiss_alpha_all(Axis::X)[0], 0.2));
        assert!(f64_approx_equal(state.twiss_beta_all(Axis::X)[0], 3.0));
        assert!(f64_approx_equal(state.emittance_all(Axis::X)[0], 5.0));
        // The other charge state is untouched.
        assert_eq!(state.moment1()[1], sample_state().moment1()[1]);
    }

    #[test]
    fn set_twiss_rejects_unknown_charge_state() {
        let mut state = sample_state();
        assert_eq!(
            state.set_twiss(Axis::Y, &TwissSpec::new().alpha(0.0), 2),
            Err(MomentError::ChargeStateOutOfRange { index: 2, count: 2 })
        );
    }

    #[test]
    fn same_coordinate_coupling_is_a_contract_error() {
        let state = sample_state();
        assert_eq!(
            state.coupling(Coordinate::X, Coordinate::X),
            Err(MomentError::SameCoordinate(Coordinate::X))
        );
    }

    #[test]
    fn centroid_writes_keep_the_constant_component() {
        let mut state = sample_state();
        let mut v = Vector7::repeat(5.0);
        v[6] = 0.0;
        state.set("moment0_env", Observable::Vector(v)).unwrap();
        assert_eq!(state.moment0_env()[6], sample_state().moment0_env()[6]);
        assert_eq!(state.moment0_env()[0], 5.0);

        state
            .set("moment0", Observable::Vectors(vec![Vector7::zeros(); 2]))
            .unwrap();
        assert!(state.moment0().iter().all(|m| m[6] == 1.0 && m[0] == 0.0));
    }

    #[test]
    fn tensor_writes_clear_the_constant_axis() {
        let mut state = sample_state();
        let m = Matrix7::repeat(1.0);
        state.set("moment1_env", Observable::Matrix(m)).unwrap();
        for k in 0..7 {
            assert_eq!(state.moment1_env()[(6, k)], 0.0);
            assert_eq!(state.moment1_env()[(k, 6)], 0.0);
        }
        for k in 0..6 {
            assert_eq!(state.moment0_rms()[k], 1.0);
        }
    }

    #[test]
    fn shape_errors_are_reported() {
        let mut state = sample_state();
        assert_eq!(
            state.set("IonZ", Observable::Array(vec![0.1])),
            Err(StateAccessError::ShapeMismatch {
                name: "IonZ".into(),
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            state.set("pos", Observable::Array(vec![0.1, 0.2])),
            Err(StateAccessError::WrongKind { .. })
        ));
        assert_eq!(
            state.get("no_such_thing"),
            Err(StateAccessError::UnknownName("no_such_thing".into()))
        );
    }

    #[test]
    fn missing_last_caviphi0_is_unavailable() {
        let mut state = sample_state();
        state.state_mut().last_caviphi0 = None;
        assert_eq!(
            state.get("last_caviphi0"),
            Err(StateAccessError::Unavailable("last_caviphi0".into()))
        );
    }

    #[test]
    fn clone_is_independent() {
        let original = sample_state();
        let mut copy = original.clone();
        copy.set("x0", Observable::Array(vec![9.0, 9.0])).unwrap();
        assert_ne!(copy.centroid(Coordinate::X), original.centroid(Coordinate::X));
        assert_eq!(original.centroid(Coordinate::X), vec![0.1, 0.2]);
    }

    #[test]
    fn display_prints_weighted_centroid_with_six_significant_digits() {
        let mut s = MomentState::zeros(1);
        s.moment0_env =
            Vector7::from_column_slice(&[1.0, 0.001, 123456789.0, 1e-5, 0.0, -2.5, 1.0]);
        assert_eq!(
            BeamState::new(s).to_string(),
            "BeamState: moment0 mean=[7](1,0.001,1.23457e+08,1e-05,0,-2.5,1)"
        );
    }
}
